//! Observability errors

/// Errors raised while setting up logging
#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("logging error: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ObservabilityError {
    pub fn logging(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ObservabilityError>;
