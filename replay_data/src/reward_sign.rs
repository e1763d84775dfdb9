use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RewardSign {
    Negative,
    Zero,
    Positive,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("reward sign must be one of -1, 0, 1, got {0}")]
pub struct InvalidSign(pub i64);

impl RewardSign {
    pub const ALL: [RewardSign; 3] = [RewardSign::Positive, RewardSign::Zero, RewardSign::Negative];

    /// NaN rewards are classed as zero.
    pub fn of(reward: f64) -> Self {
        if reward > 0.0 {
            RewardSign::Positive
        } else if reward < 0.0 {
            RewardSign::Negative
        } else {
            RewardSign::Zero
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            RewardSign::Negative => -1,
            RewardSign::Zero => 0,
            RewardSign::Positive => 1,
        }
    }
}

impl TryFrom<i64> for RewardSign {
    type Error = InvalidSign;

    fn try_from(sign: i64) -> Result<Self, Self::Error> {
        match sign {
            -1 => Ok(RewardSign::Negative),
            0 => Ok(RewardSign::Zero),
            1 => Ok(RewardSign::Positive),
            other => Err(InvalidSign(other)),
        }
    }
}

impl fmt::Display for RewardSign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RewardSign::Negative => "negative",
            RewardSign::Zero => "zero",
            RewardSign::Positive => "positive",
        };
        f.write_str(name)
    }
}
