use model::ModelError;
use model_registry::{ModelKey, RegistryError};
use replay_memories::StoreError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no model entry for {0}")]
    NotFound(ModelKey),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("settings document: {0}")]
    Settings(#[from] serde_json::Error),
}

/// Coarse failure classes callers branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller error, never worth retrying as is.
    InvalidArgument,
    NotFound,
    /// A reward class has no rows yet; more gameplay may fix it.
    InsufficientData,
    KeyMismatch,
    Storage,
    Model,
}

impl TrainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrainError::InvalidArgument(_) | TrainError::Settings(_) => ErrorKind::InvalidArgument,
            TrainError::NotFound(_) => ErrorKind::NotFound,
            TrainError::Store(err) => match err {
                StoreError::InvalidArgument(_) => ErrorKind::InvalidArgument,
                StoreError::InsufficientData { .. } => ErrorKind::InsufficientData,
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::Database(_) | StoreError::Codec(_) => ErrorKind::Storage,
            },
            TrainError::Registry(err) => match err {
                RegistryError::NotFound(_)
                | RegistryError::UnknownTag(_)
                | RegistryError::MissingWeights(_)
                | RegistryError::NotDeployed(_) => ErrorKind::NotFound,
                RegistryError::KeyMismatch { .. } => ErrorKind::KeyMismatch,
                RegistryError::InvalidArgument(_) => ErrorKind::InvalidArgument,
                RegistryError::Model(_) => ErrorKind::Model,
                RegistryError::VersionTaken(_)
                | RegistryError::Database(_)
                | RegistryError::Io(_)
                | RegistryError::Json(_)
                | RegistryError::Codec(_) => ErrorKind::Storage,
            },
            TrainError::Model(ModelError::InvalidArgument(_)) => ErrorKind::InvalidArgument,
            TrainError::Model(_) => ErrorKind::Model,
            TrainError::Io(_) => ErrorKind::Storage,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrainError>;
