//! Trait abstractions for the collaborators the trade core calls out to.
//!
//! The ledger never depends on these succeeding: checkout happens before any
//! write, notification and blob cleanup happen after the write has committed.

pub mod checkout;
pub mod clock;
pub mod notify;
pub mod storage;

pub use checkout::{CheckoutProvider, CheckoutRequest, CheckoutSession, SessionStatus};
pub use clock::{Clock, SystemClock};
pub use notify::{LogNotifier, Notifier, TradeCompletedNotice};
pub use storage::{BlobStorage, FsBlobStorage};
