pub mod channel;
pub mod checkout;
pub mod config;
pub mod error;
pub mod ledger;
pub mod mocks;
pub mod model;
pub mod profile;
pub mod service;
pub mod store;
pub mod trade;
pub mod traits;
pub mod types;
pub mod utils;

pub use channel::{PendingEvaluation, TradeThread};
pub use config::MarketConfig;
pub use error::{ErrorKind, MarketError, MarketResult, ValidationError};
pub use model::{
    ImageKind, ImageUpload, Item, PaymentMethod, Purchase, PurchaseOrder, RatingEdge, Role,
    ShippingSnapshot, Trade, TradeMessage, TradeRecord,
};
pub use profile::{Profile, ProfileEntry, RatingSummary};
pub use service::{Collaborators, MarketService};
pub use types::{ItemId, MessageId, PurchaseId, TimeStamp, TradeId, UserId};
