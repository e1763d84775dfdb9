use crate::{Result, TrainError};
use actor::EpsilonSchedule;
use file_io::open_file_buf_read;
use model::DqnHyperparams;
use model_registry::HarnessPaths;
use replay_memories::StoreSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerSettings {
    #[serde(flatten)]
    pub hyperparams: DqnHyperparams,
    /// Score the policy on the latest validation set after every session.
    pub evaluate_validation: bool,
    /// Seeds batch sampling; drawn from entropy when absent.
    pub seed: Option<u64>,
}

impl TrainerSettings {
    pub fn new(hyperparams: DqnHyperparams) -> Self {
        Self {
            hyperparams,
            evaluate_validation: true,
            seed: None,
        }
    }
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self::new(DqnHyperparams::default())
    }
}

/// Everything the `learner` binary reads from its settings file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    pub paths: HarnessPaths,
    pub store: StoreSettings,
    pub trainer: TrainerSettings,
    pub epsilon: EpsilonSchedule,
    pub hidden_len: usize,
    /// Moves without a new best score before an episode is cut short.
    pub stall_limit: u32,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            paths: HarnessPaths::default(),
            store: StoreSettings::default(),
            trainer: TrainerSettings::default(),
            epsilon: EpsilonSchedule::default(),
            hidden_len: 64,
            stall_limit: 100,
        }
    }
}

impl HarnessSettings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = open_file_buf_read(path)?;
        let settings: Self = serde_json::from_reader(file)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.trainer
            .hyperparams
            .validate()
            .map_err(|e| TrainError::InvalidArgument(e.to_string()))?;
        self.epsilon
            .validate()
            .map_err(|e| TrainError::InvalidArgument(e.to_string()))?;
        if self.hidden_len == 0 {
            return Err(TrainError::InvalidArgument(
                "hidden layer width must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
