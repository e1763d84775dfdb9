use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("tensor backend: {0}")]
    Candle(#[from] candle_core::Error),
    #[error("parameter {0} is missing from the source network")]
    MissingParameter(String),
    #[error("parameter store lock poisoned")]
    LockPoisoned,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
