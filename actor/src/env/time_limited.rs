use super::{Done, Environment, Status};
use replay_data::Transition;

/// Truncates episodes that go `stall_limit` moves without beating their
/// best cumulative score.
pub struct TimeLimitedWrapper<E> {
    env: E,
    stall_limit: u32,
    truncation_timer: u32,
    score: f64,
    score_record: f64,
}

impl<E: Environment> TimeLimitedWrapper<E> {
    pub fn new(env: E, stall_limit: u32) -> Self {
        Self {
            env,
            stall_limit,
            truncation_timer: 0,
            score: 0.0,
            score_record: 0.0,
        }
    }

    pub fn inner(&self) -> &E {
        &self.env
    }

    fn reset_timer(&mut self) {
        self.truncation_timer = 0;
        self.score = 0.0;
        self.score_record = 0.0;
    }

    fn receive_reward(&mut self, reward: f64) -> bool {
        self.score += reward;
        let exceeded_record = self.score > self.score_record;
        if exceeded_record {
            self.score_record = self.score;
        }
        exceeded_record
    }
}

impl<E: Environment> Environment for TimeLimitedWrapper<E> {
    type State = E::State;
    type Action = E::Action;

    fn reset(&mut self) -> E::State {
        self.reset_timer();
        self.env.reset()
    }

    fn state(&self) -> E::State {
        self.env.state()
    }

    fn step(&mut self, action: E::Action) -> (Transition<E::State, E::Action>, Status) {
        let (transition, status) = self.env.step(action);
        if self.receive_reward(transition.reward) {
            self.truncation_timer = 0;
        } else {
            self.truncation_timer += 1;
        }
        let status = match status {
            Status::Done(Done::Terminated) => {
                self.reset_timer();
                status
            }
            Status::Running if self.truncation_timer >= self.stall_limit => {
                Status::Done(Done::ShouldTruncate)
            }
            Status::Running | Status::Done(Done::ShouldTruncate) => status,
        };
        (transition, status)
    }
}
