mod agent;
mod env;
mod episode;
mod epsilon_schedule;
mod error;

pub use agent::{ActionSelector, Agent, UniformRandom};
pub use env::{Done, Environment, Status, TimeLimitedWrapper};
pub use episode::{play_episode, EpisodeRecord};
pub use epsilon_schedule::EpsilonSchedule;
pub use error::{AgentError, Result};
