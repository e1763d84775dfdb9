pub mod codec;
mod reward_sign;
mod state;
mod transition;

pub use reward_sign::{InvalidSign, RewardSign};
pub use state::{Action, State};
pub use transition::{StoredTransition, Transition};
