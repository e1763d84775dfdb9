use crate::ModelKey;
use model::ModelError;
use replay_data::codec::CodecError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no model entry for {0}")]
    NotFound(ModelKey),
    #[error("no model versions for tag {0:?}")]
    UnknownTag(String),
    #[error("cannot merge values recorded for {found} into the entry of {expected}")]
    KeyMismatch { expected: ModelKey, found: ModelKey },
    #[error("{0} was minted by another writer")]
    VersionTaken(ModelKey),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no weights at {}", .0.display())]
    MissingWeights(PathBuf),
    #[error("no deployed model at {}", .0.display())]
    NotDeployed(PathBuf),
    #[error("database: {0}")]
    Database(#[from] sled::Error),
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("entry document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("row encoding: {0}")]
    Codec(#[from] CodecError),
    #[error("model: {0}")]
    Model(#[from] ModelError),
}

impl From<sled::transaction::TransactionError<RegistryError>> for RegistryError {
    fn from(err: sled::transaction::TransactionError<RegistryError>) -> Self {
        match err {
            sled::transaction::TransactionError::Abort(err) => err,
            sled::transaction::TransactionError::Storage(err) => RegistryError::Database(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
