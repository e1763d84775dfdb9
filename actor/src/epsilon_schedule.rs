use crate::{AgentError, Result};
use serde::{Deserialize, Serialize};

/// Exploration probability decaying exponentially with episodes played:
/// `end + (start - end) * exp(-episodes / decay_rate)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpsilonSchedule {
    pub start: f64,
    pub end: f64,
    pub decay_rate: f64,
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        Self {
            start: 0.9,
            end: 0.05,
            decay_rate: 200.0,
        }
    }
}

impl EpsilonSchedule {
    pub fn constant(eps: f64) -> Self {
        Self {
            start: eps,
            end: eps,
            decay_rate: 1.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AgentError::InvalidArgument(msg));
        if !(0.0..=1.0).contains(&self.start) {
            return invalid(format!("epsilon start must lie in [0, 1], got {}", self.start));
        }
        if !(0.0..=1.0).contains(&self.end) {
            return invalid(format!("epsilon end must lie in [0, 1], got {}", self.end));
        }
        if !(self.decay_rate > 0.0 && self.decay_rate.is_finite()) {
            return invalid(format!("decay rate must be positive, got {}", self.decay_rate));
        }
        Ok(())
    }

    pub fn eps(&self, episodes_played: u64) -> f64 {
        let eps = self.end
            + (self.start - self.end) * (-(episodes_played as f64) / self.decay_rate).exp();
        eps.clamp(0.0, 1.0)
    }
}
