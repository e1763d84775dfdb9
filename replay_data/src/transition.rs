use crate::RewardSign;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition<S, A> {
    pub state: S,
    pub action: A,
    pub next_state: S,
    pub reward: f64,
    pub terminal: bool,
}

impl<S, A> Transition<S, A> {
    pub fn reward_sign(&self) -> RewardSign {
        RewardSign::of(self.reward)
    }
}

/// A transition together with where it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredTransition<S, A> {
    pub transition: Transition<S, A>,
    pub episode: u64,
    pub move_index: u32,
}
