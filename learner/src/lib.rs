mod error;
mod settings;
mod trainer;

pub use error::{ErrorKind, Result, TrainError};
pub use settings::{HarnessSettings, TrainerSettings};
pub use trainer::Trainer;
