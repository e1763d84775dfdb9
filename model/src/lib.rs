mod dqn_model;
mod error;
mod qnet;
mod soft_update;
pub mod traits;

pub use dqn_model::{encode_states, DqnHyperparams, DqnModel, EncodedBatch, LossKind};
pub use error::{ModelError, Result};
pub use qnet::{MlpFactory, QNet};
pub use soft_update::soft_update;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LearningStepInfo {
    pub loss: f32,
    pub average_q_val: f32,
}
