use crate::{AgentError, EpsilonSchedule, Result};
use model::traits::{Actor, DifferentiableModel, ModelFactory};
use model_registry::{DeployedSnapshot, ModelEntry};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use replay_data::{Action, State};
use std::marker::PhantomData;
use std::path::Path;
use tracing::{debug, info};

/// Picks the action to take in a state, episode by episode.
pub trait ActionSelector<S, A> {
    fn start_new_episode(&mut self);
    fn choose_action(&mut self, state: &S) -> Result<A>;
}

/// Chooses uniformly among all actions; used to seed an empty store.
pub struct UniformRandom<R> {
    rng: R,
}

impl<R: Rng> UniformRandom<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<S, A: Action, R: Rng> ActionSelector<S, A> for UniformRandom<R> {
    fn start_new_episode(&mut self) {}

    fn choose_action(&mut self, _state: &S) -> Result<A> {
        A::ordered()
            .choose(&mut self.rng)
            .copied()
            .ok_or(AgentError::NoActions)
    }
}

/// Epsilon-greedy wrapper around a deployed policy network. Inference only.
pub struct Agent<S, A, M, R = StdRng> {
    model: M,
    entry: ModelEntry,
    schedule: EpsilonSchedule,
    episodes_played: u64,
    epsilon: f64,
    actions: Vec<A>,
    rng: R,
    _state: PhantomData<fn(&S)>,
}

impl<S: State, A: Action, M: DifferentiableModel> Agent<S, A, M, StdRng> {
    /// Loads the snapshot most recently deployed into `deploy_dir`.
    pub fn from_deployment<F>(
        deploy_dir: &Path,
        factory: &F,
        schedule: EpsilonSchedule,
    ) -> Result<Self>
    where
        F: ModelFactory<Model = M>,
    {
        let snapshot = DeployedSnapshot::read(deploy_dir)?;
        let mut model = factory.build()?;
        model.load(&snapshot.policy_weights)?;
        info!(key = %snapshot.entry.key, "loaded deployed model");
        Self::new(model, snapshot.entry, schedule, StdRng::from_entropy())
    }
}

impl<S: State, A: Action, M: DifferentiableModel, R: Rng> Agent<S, A, M, R> {
    pub fn new(model: M, entry: ModelEntry, schedule: EpsilonSchedule, rng: R) -> Result<Self> {
        schedule.validate()?;
        let actions = A::ordered();
        if actions.is_empty() {
            return Err(AgentError::NoActions);
        }
        if model.action_count() != actions.len() {
            return Err(AgentError::ShapeMismatch {
                what: "action count",
                model: model.action_count(),
                expected: actions.len(),
            });
        }
        if model.input_len() != S::INPUT_LEN {
            return Err(AgentError::ShapeMismatch {
                what: "input length",
                model: model.input_len(),
                expected: S::INPUT_LEN,
            });
        }
        let episodes_played = entry.num_episodes_played;
        Ok(Self {
            epsilon: schedule.eps(episodes_played),
            model,
            entry,
            schedule,
            episodes_played,
            actions,
            rng,
            _state: PhantomData,
        })
    }

    pub fn entry(&self) -> &ModelEntry {
        &self.entry
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn episodes_played(&self) -> u64 {
        self.episodes_played
    }

    pub fn greedy_action(&self, state: &S) -> Result<A> {
        let best = self.model.best_action(&state.to_input())?;
        Ok(self.actions[best])
    }
}

impl<S: State, A: Action, M: DifferentiableModel, R: Rng> ActionSelector<S, A>
    for Agent<S, A, M, R>
{
    fn start_new_episode(&mut self) {
        self.episodes_played += 1;
        self.epsilon = self.schedule.eps(self.episodes_played);
        debug!(
            episodes = self.episodes_played,
            epsilon = self.epsilon,
            "new episode"
        );
    }

    fn choose_action(&mut self, state: &S) -> Result<A> {
        if self.rng.gen_bool(self.epsilon) {
            self.actions
                .choose(&mut self.rng)
                .copied()
                .ok_or(AgentError::NoActions)
        } else {
            self.greedy_action(state)
        }
    }
}
