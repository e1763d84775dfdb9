use crate::{ActionSelector, Environment, Result};
use model_registry::OnlineMetrics;
use replay_data::Transition;
use tracing::debug;

/// Transitions of one episode, in the order they were played.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeRecord<S, A> {
    pub episode: u64,
    pub transitions: Vec<Transition<S, A>>,
}

impl<S, A> EpisodeRecord<S, A> {
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn score(&self) -> f64 {
        self.transitions.iter().map(|t| t.reward).sum()
    }

    pub fn online_metrics(&self) -> OnlineMetrics {
        OnlineMetrics::from_episode(self.len(), self.score())
    }
}

/// Plays one episode from a fresh reset until the environment terminates
/// or asks for truncation.
pub fn play_episode<E, P>(
    env: &mut E,
    selector: &mut P,
    episode: u64,
) -> Result<EpisodeRecord<E::State, E::Action>>
where
    E: Environment,
    P: ActionSelector<E::State, E::Action>,
{
    selector.start_new_episode();
    let mut state = env.reset();
    let mut transitions = Vec::new();
    loop {
        let action = selector.choose_action(&state)?;
        let (transition, status) = env.step(action);
        state = transition.next_state.clone();
        transitions.push(transition);
        if status.is_done() {
            break;
        }
    }
    let record = EpisodeRecord {
        episode,
        transitions,
    };
    debug!(episode, moves = record.len(), score = record.score(), "episode finished");
    Ok(record)
}
