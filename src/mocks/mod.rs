//! In-memory collaborator implementations for tests and the demo binary.

pub mod checkout;
pub mod clock;
pub mod notify;
pub mod storage;

pub use checkout::MockCheckout;
pub use clock::MockClock;
pub use notify::MockNotifier;
pub use storage::MockBlobStorage;
