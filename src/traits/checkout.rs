//! External checkout session provider.

/// Everything the provider needs to open a hosted payment page for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub item_name: String,
    /// Price in the currency's minor unit.
    pub unit_amount: u64,
    pub currency: String,
    pub quantity: u32,
    pub customer_email: String,
    /// Echoed back by [`CheckoutProvider::session_status`]; binds the session
    /// to one buyer and item.
    pub client_reference: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Opaque handle returned to the buyer's client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub paid: bool,
    pub client_reference: String,
}

pub trait CheckoutProvider: Send + Sync {
    fn create_session(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutSession>;

    fn session_status(&self, session_id: &str) -> anyhow::Result<SessionStatus>;
}
