mod time_limited;

pub use time_limited::TimeLimitedWrapper;

use replay_data::{Action, State, Transition};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Running,
    Done(Done),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Done {
    // termination comes from the environment itself, truncation is decided
    // from outside (see TimeLimitedWrapper). a truncated transition is not
    // marked terminal, its next state still has a value
    Terminated,
    ShouldTruncate,
}

impl Status {
    pub fn from_terminal(terminal: bool) -> Self {
        if terminal {
            Status::Done(Done::Terminated)
        } else {
            Status::Running
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Status::Done(_))
    }
}

/// Producer of transitions for one agent.
pub trait Environment {
    type State: State;
    type Action: Action;

    /// Starts a new episode and returns its first state.
    fn reset(&mut self) -> Self::State;

    fn state(&self) -> Self::State;

    fn step(&mut self, action: Self::Action) -> (Transition<Self::State, Self::Action>, Status);
}
