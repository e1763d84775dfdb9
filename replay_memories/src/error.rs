use replay_data::codec::CodecError;
use replay_data::{InvalidSign, RewardSign};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no stored transitions with {sign} reward, cannot draw a batch of {requested}")]
    InsufficientData { sign: RewardSign, requested: usize },
    #[error("no validation set {}", .0.map_or_else(|| "stored".to_string(), |id| format!("with id {id}")))]
    NotFound(Option<u64>),
    #[error("database: {0}")]
    Database(#[from] sled::Error),
    #[error("row encoding: {0}")]
    Codec(#[from] CodecError),
}

impl From<InvalidSign> for StoreError {
    fn from(err: InvalidSign) -> Self {
        StoreError::InvalidArgument(err.to_string())
    }
}

impl From<sled::transaction::TransactionError<StoreError>> for StoreError {
    fn from(err: sled::transaction::TransactionError<StoreError>) -> Self {
        match err {
            sled::transaction::TransactionError::Abort(err) => err,
            sled::transaction::TransactionError::Storage(err) => StoreError::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
