//! Records persisted by the trade core
use chrono::Utc;

use super::config::{FIELD_MAX_CHARS, MESSAGE_MAX_CHARS, RATING_MAX, RATING_MIN};
use super::error::ValidationError;
use super::types::{ItemId, MessageId, PurchaseId, TimeStamp, TradeId, UserId};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    #[n(1)]
    ConvenienceStore,
    #[n(2)]
    Card,
}

impl PaymentMethod {
    pub fn code(&self) -> u8 {
        match self {
            PaymentMethod::ConvenienceStore => 1,
            PaymentMethod::Card => 2,
        }
    }
}

impl TryFrom<u8> for PaymentMethod {
    type Error = ValidationError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(PaymentMethod::ConvenienceStore),
            2 => Ok(PaymentMethod::Card),
            other => Err(ValidationError::InvalidPaymentMethod(other)),
        }
    }
}

/// Which side of a trade an account is on.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    #[n(0)]
    Buyer,
    #[n(1)]
    Seller,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Item {
    #[n(0)]
    pub id: ItemId,
    #[n(1)]
    pub seller: UserId,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub price: u64,
    #[n(4)]
    pub listed_at: TimeStamp<Utc>,
}

impl Item {
    pub fn new(seller: UserId, name: impl Into<String>, price: u64) -> Self {
        Self {
            id: ItemId::new(),
            seller,
            name: name.into(),
            price,
            listed_at: TimeStamp::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Missing("item name"));
        }
        if self.name.chars().count() > FIELD_MAX_CHARS {
            return Err(ValidationError::TooLong {
                field: "item name",
                max: FIELD_MAX_CHARS,
            });
        }
        if self.price == 0 {
            return Err(ValidationError::ZeroPrice);
        }
        Ok(())
    }
}

/// Shipping details frozen onto the purchase. Later edits to the buyer's
/// profile never reach a placed order.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ShippingSnapshot {
    #[n(0)]
    pub post_code: String,
    #[n(1)]
    pub address: String,
    #[n(2)]
    pub building: Option<String>,
}

impl ShippingSnapshot {
    pub fn new(post_code: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            post_code: post_code.into(),
            address: address.into(),
            building: None,
        }
    }

    pub fn with_building(mut self, building: impl Into<String>) -> Self {
        self.building = Some(building.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !is_post_code(&self.post_code) {
            return Err(ValidationError::InvalidPostCode);
        }
        if self.address.trim().is_empty() {
            return Err(ValidationError::Missing("shipping address"));
        }
        if self.address.chars().count() > FIELD_MAX_CHARS {
            return Err(ValidationError::TooLong {
                field: "shipping address",
                max: FIELD_MAX_CHARS,
            });
        }
        if let Some(building) = &self.building {
            if building.chars().count() > FIELD_MAX_CHARS {
                return Err(ValidationError::TooLong {
                    field: "shipping building",
                    max: FIELD_MAX_CHARS,
                });
            }
        }
        Ok(())
    }
}

// NNN-NNNN
fn is_post_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 8
        && bytes[3] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 3 || b.is_ascii_digit())
}

/// What the buyer submits to take an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    pub item_id: ItemId,
    pub payment_method: PaymentMethod,
    pub shipping: ShippingSnapshot,
}

impl PurchaseOrder {
    pub fn new(item_id: ItemId, payment_method: PaymentMethod, shipping: ShippingSnapshot) -> Self {
        Self {
            item_id,
            payment_method,
            shipping,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.shipping.validate()
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    #[n(0)]
    pub id: PurchaseId,
    #[n(1)]
    pub buyer: UserId,
    #[n(2)]
    pub item_id: ItemId,
    #[n(3)]
    pub payment_method: PaymentMethod,
    #[n(4)]
    pub shipping: ShippingSnapshot,
    #[n(5)]
    pub trade_id: TradeId,
    #[n(6)]
    pub created_at: TimeStamp<Utc>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    #[n(0)]
    pub id: TradeId,
    #[n(1)]
    pub purchase_id: PurchaseId,
    #[n(2)]
    pub item_id: ItemId,
    #[n(3)]
    pub buyer: UserId,
    #[n(4)]
    pub seller: UserId,
    #[n(5)]
    pub is_complete: bool,
    #[n(6)]
    pub created_at: TimeStamp<Utc>,
    #[n(7)]
    pub completed_at: Option<TimeStamp<Utc>>,
}

impl Trade {
    pub fn role_of(&self, user: &UserId) -> Option<Role> {
        if *user == self.buyer {
            Some(Role::Buyer)
        } else if *user == self.seller {
            Some(Role::Seller)
        } else {
            None
        }
    }

    pub fn counterparty(&self, user: &UserId) -> Option<UserId> {
        match self.role_of(user)? {
            Role::Buyer => Some(self.seller),
            Role::Seller => Some(self.buyer),
        }
    }
}

/// A directed score from one party of a trade to the other.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct RatingEdge {
    #[n(0)]
    pub trade_id: TradeId,
    #[n(1)]
    pub rater: UserId,
    #[n(2)]
    pub ratee: UserId,
    #[n(3)]
    pub rater_role: Role,
    #[n(4)]
    pub score: u8,
    #[n(5)]
    pub rated_at: TimeStamp<Utc>,
}

/// Checks a submitted score and narrows it to the stored width.
pub fn validate_score(score: i64) -> Result<u8, ValidationError> {
    if !(RATING_MIN..=RATING_MAX).contains(&score) {
        return Err(ValidationError::RatingOutOfRange(score));
    }
    Ok(score as u8)
}

/// A trade together with the scores each party has given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeRecord {
    pub trade: Trade,
    /// Score authored by the buyer.
    pub buyer_rating: Option<u8>,
    /// Score authored by the seller.
    pub seller_rating: Option<u8>,
}

impl TradeRecord {
    pub fn rating_by(&self, role: Role) -> Option<u8> {
        match role {
            Role::Buyer => self.buyer_rating,
            Role::Seller => self.seller_rating,
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct TradeMessage {
    #[n(0)]
    pub id: MessageId,
    #[n(1)]
    pub trade_id: TradeId,
    #[n(2)]
    pub author: UserId,
    #[n(3)]
    pub body: String,
    #[n(4)]
    pub image_path: Option<String>,
    #[n(5)]
    pub is_read: bool,
    #[n(6)]
    pub created_at: TimeStamp<Utc>,
    #[n(7)]
    pub edited_at: Option<TimeStamp<Utc>>,
}

/// A body is rejected when blank or longer than the limit. Length is counted
/// in characters.
pub fn validate_body(body: &str) -> Result<(), ValidationError> {
    if body.trim().is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    let len = body.chars().count();
    if len > MESSAGE_MAX_CHARS {
        return Err(ValidationError::BodyTooLong {
            max: MESSAGE_MAX_CHARS,
            len,
        });
    }
    Ok(())
}

/// Image formats accepted on messages, told apart by their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    const PNG_SIGNATURE: &'static [u8] = b"\x89PNG\r\n\x1a\n";
    const JPEG_SIGNATURE: &'static [u8] = &[0xFF, 0xD8, 0xFF];

    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(Self::PNG_SIGNATURE) {
            Some(ImageKind::Png)
        } else if bytes.starts_with(Self::JPEG_SIGNATURE) {
            Some(ImageKind::Jpeg)
        } else {
            None
        }
    }

    /// Extension the stored blob is given.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
        }
    }
}

/// A raw image attached to a message, before it reaches blob storage. The
/// client's file name is kept for logs only; the format comes from the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn validate(&self) -> Result<ImageKind, ValidationError> {
        ImageKind::sniff(&self.bytes).ok_or(ValidationError::UnsupportedImage)
    }
}
