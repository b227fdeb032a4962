/// Caller input that failed validation. Never retried.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("rating must be an integer between 1 and 5, got {0}")]
    RatingOutOfRange(i64),
    #[error("message body is required")]
    EmptyBody,
    #[error("message body must be at most {max} characters, got {len}")]
    BodyTooLong { max: usize, len: usize },
    #[error("image must be a PNG or JPEG")]
    UnsupportedImage,
    #[error("unknown payment method {0}")]
    InvalidPaymentMethod(u8),
    #[error("postal code must be formatted as 123-4567")]
    InvalidPostCode,
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("price must be greater than zero")]
    ZeroPrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Conflict,
    NotFound,
    External,
    Internal,
}

#[derive(thiserror::Error, Debug)]
pub enum MarketError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("external service failed: {0:#}")]
    External(anyhow::Error),

    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),

    #[error("record codec failure: {0}")]
    Codec(String),
}

impl MarketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketError::Validation(_) => ErrorKind::Validation,
            MarketError::Forbidden(_) => ErrorKind::Authorization,
            MarketError::Conflict(_) => ErrorKind::Conflict,
            MarketError::NotFound(_) => ErrorKind::NotFound,
            MarketError::External(_) => ErrorKind::External,
            MarketError::Storage(_) | MarketError::Codec(_) => ErrorKind::Internal,
        }
    }

    /// HTTP-equivalent status for a transport binding.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 422,
            ErrorKind::Authorization => 403,
            ErrorKind::Conflict => 409,
            ErrorKind::NotFound => 404,
            ErrorKind::External => 502,
            ErrorKind::Internal => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

pub type MarketResult<T> = Result<T, MarketError>;
