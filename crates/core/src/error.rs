use thiserror::Error;

pub type MarketResult<T> = Result<T, MarketError>;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backing store unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl MarketError {
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        MarketError::NotFound(format!("{kind} {id}"))
    }

    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            MarketError::NotFound(_) => "not_found",
            MarketError::Validation(_) => "validation_failed",
            MarketError::Unavailable(_) => "unavailable",
            MarketError::Config(_) => "config_error",
            MarketError::Serialization(_) => "serialization_error",
            MarketError::Internal(_) => "internal_error",
        }
    }
}
