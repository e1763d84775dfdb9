use model::ModelError;
use model_registry::RegistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("deployed snapshot: {0}")]
    Snapshot(#[from] RegistryError),
    #[error("model: {0}")]
    Model(#[from] ModelError),
    #[error("model {what} is {model}, expected {expected}")]
    ShapeMismatch {
        what: &'static str,
        model: usize,
        expected: usize,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("action set is empty")]
    NoActions,
}

pub type Result<T> = std::result::Result<T, AgentError>;
