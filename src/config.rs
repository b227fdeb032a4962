//! Configuration values and limits for the trade core.
//!
//! Limits are constants; deployment specific values live on [`MarketConfig`]
//! and can be overridden from the environment.

use std::path::PathBuf;

/// Maximum length of a trade message body, in characters.
pub const MESSAGE_MAX_CHARS: usize = 400;

/// Maximum length of listing names and shipping address lines.
pub const FIELD_MAX_CHARS: usize = 255;

/// Inclusive bounds of a rating score.
pub const RATING_MIN: i64 = 1;
pub const RATING_MAX: i64 = 5;

/// Blob storage directory for message images.
pub const MESSAGE_IMAGE_DIR: &str = "images/trade_messages";

/// Placeholder the checkout provider substitutes with the session id.
pub const CHECKOUT_SESSION_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Environment variable overriding the sled database directory.
pub const DATA_DIR_ENV: &str = "MARKET_DATA_DIR";

/// Environment variable overriding the frontend base url used in callbacks.
pub const FRONTEND_URL_ENV: &str = "MARKET_FRONTEND_URL";

/// Environment variable overriding the checkout currency.
pub const CURRENCY_ENV: &str = "MARKET_CURRENCY";

/// Environment variable overriding the blob storage root.
pub const BLOB_DIR_ENV: &str = "MARKET_BLOB_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketConfig {
    pub data_dir: PathBuf,
    pub blob_dir: PathBuf,
    pub frontend_url: String,
    pub currency: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("market-data"),
            blob_dir: PathBuf::from("market-data/storage"),
            frontend_url: "http://localhost:3000".to_string(),
            currency: "jpy".to_string(),
        }
    }
}

impl MarketConfig {
    /// Defaults with any `MARKET_*` environment overrides applied.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(dir) = lookup(DATA_DIR_ENV) {
            config.blob_dir = PathBuf::from(&dir).join("storage");
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(BLOB_DIR_ENV) {
            config.blob_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup(FRONTEND_URL_ENV) {
            config.frontend_url = url.trim_end_matches('/').to_string();
        }
        if let Some(currency) = lookup(CURRENCY_ENV) {
            config.currency = currency.to_lowercase();
        }
        config
    }

    pub fn checkout_success_url(&self, item: &impl std::fmt::Display) -> String {
        format!(
            "{}/purchase/{item}/complete?session_id={CHECKOUT_SESSION_PLACEHOLDER}",
            self.frontend_url
        )
    }

    pub fn checkout_cancel_url(&self, item: &impl std::fmt::Display) -> String {
        format!("{}/purchase/{item}", self.frontend_url)
    }

    pub fn trade_thread_url(&self, trade: &impl std::fmt::Display) -> String {
        format!("{}/trades/{trade}/messages", self.frontend_url)
    }
}
