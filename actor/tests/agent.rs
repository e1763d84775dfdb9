use actor::{
    play_episode, ActionSelector, Agent, AgentError, Done, Environment, EpsilonSchedule, Status,
    TimeLimitedWrapper,
};
use model::traits::{Actor, ModelFactory};
use model::{MlpFactory, QNet};
use model_registry::{HarnessPaths, ModelEntry, ModelKey, ModelRegistry};
use rand::rngs::StdRng;
use rand::SeedableRng;
use replay_data::{Action, State, Transition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Spot(usize);

impl State for Spot {
    const INPUT_LEN: usize = 4;

    fn to_input(&self) -> Vec<f32> {
        let mut input = vec![0.0; 4];
        input[self.0] = 1.0;
        input
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
enum Hop {
    Left,
    Right,
}

impl Action for Hop {
    const ALL: &'static [Self] = &[Hop::Left, Hop::Right];
}

/// Four spots; hopping right from the last spot ends the episode.
struct Line {
    at: usize,
}

impl Environment for Line {
    type State = Spot;
    type Action = Hop;

    fn reset(&mut self) -> Spot {
        self.at = 0;
        Spot(0)
    }

    fn state(&self) -> Spot {
        Spot(self.at)
    }

    fn step(&mut self, action: Hop) -> (Transition<Spot, Hop>, Status) {
        let state = Spot(self.at);
        let terminal = action == Hop::Right && self.at == 3;
        self.at = match action {
            Hop::Left => self.at.saturating_sub(1),
            Hop::Right => (self.at + 1).min(3),
        };
        let transition = Transition {
            state,
            action,
            next_state: Spot(self.at),
            reward: if terminal { 1.0 } else { 0.0 },
            terminal,
        };
        (transition, Status::from_terminal(terminal))
    }
}

fn factory() -> MlpFactory {
    MlpFactory {
        input_len: 4,
        hidden_len: 8,
        action_count: 2,
    }
}

fn agent(eps: f64, seed: u64) -> Agent<Spot, Hop, QNet> {
    let entry = ModelEntry::new(ModelKey::new("test", 0), PathBuf::new());
    Agent::new(
        factory().build().unwrap(),
        entry,
        EpsilonSchedule::constant(eps),
        StdRng::seed_from_u64(seed),
    )
    .unwrap()
}

#[test]
fn zero_epsilon_always_acts_greedily() {
    let mut agent = agent(0.0, 1);
    for spot in 0..4 {
        let state = Spot(spot);
        let greedy = agent.greedy_action(&state).unwrap();
        for _ in 0..20 {
            assert_eq!(agent.choose_action(&state).unwrap(), greedy);
        }
    }
}

#[test]
fn full_epsilon_explores_every_action() {
    let mut agent = agent(1.0, 2);
    let chosen: BTreeSet<Hop> = (0..64)
        .map(|_| agent.choose_action(&Spot(0)).unwrap())
        .collect();
    assert_eq!(chosen.len(), Hop::count());
}

#[test]
fn epsilon_follows_episodes_played() {
    let entry = ModelEntry::new(ModelKey::new("test", 0), PathBuf::new());
    let schedule = EpsilonSchedule::default();
    let mut agent: Agent<Spot, Hop, QNet> = Agent::new(
        factory().build().unwrap(),
        entry,
        schedule.clone(),
        StdRng::seed_from_u64(0),
    )
    .unwrap();
    assert_eq!(agent.epsilon(), schedule.eps(0));

    let before = agent.epsilon();
    agent.start_new_episode();
    assert_eq!(agent.episodes_played(), 1);
    assert!(agent.epsilon() < before);
}

#[test]
fn mismatched_model_shape_is_rejected() {
    let wide = MlpFactory {
        input_len: 4,
        hidden_len: 8,
        action_count: 3,
    };
    let entry = ModelEntry::new(ModelKey::new("test", 0), PathBuf::new());
    let result: actor::Result<Agent<Spot, Hop, QNet>> = Agent::new(
        wide.build().unwrap(),
        entry,
        EpsilonSchedule::default(),
        StdRng::seed_from_u64(0),
    );
    assert!(matches!(
        result,
        Err(AgentError::ShapeMismatch {
            model: 3,
            expected: 2,
            ..
        })
    ));
}

#[test]
fn zero_decay_rate_is_rejected() {
    let entry = ModelEntry::new(ModelKey::new("test", 0), PathBuf::new());
    let result: actor::Result<Agent<Spot, Hop, QNet>> = Agent::new(
        factory().build().unwrap(),
        entry,
        EpsilonSchedule {
            start: 0.9,
            end: 0.05,
            decay_rate: 0.0,
        },
        StdRng::seed_from_u64(0),
    );
    assert!(matches!(result, Err(AgentError::InvalidArgument(_))));
}

#[test]
fn loads_the_deployed_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ModelRegistry::open(&HarnessPaths::under(dir.path())).unwrap();
    let factory = factory();
    let policy = factory.build().unwrap();
    let target = factory.build().unwrap();
    let key = registry
        .publish_new_version("line", Some(&policy), Some(&target))
        .unwrap();
    registry
        .publish_online_metrics(&key, &model_registry::OnlineMetrics::from_episode(4, 1.0))
        .unwrap();
    registry.deploy(&key).unwrap();

    let agent: Agent<Spot, Hop, QNet> =
        Agent::from_deployment(registry.deploy_dir(), &factory, EpsilonSchedule::default())
            .unwrap();
    assert_eq!(agent.entry().key, key);
    assert_eq!(agent.episodes_played(), 1);
    let input = Spot(2).to_input();
    assert_eq!(
        agent.greedy_action(&Spot(2)).unwrap(),
        Hop::from_index(policy.best_action(&input).unwrap()).unwrap()
    );
}

#[test]
fn deployment_is_required() {
    let dir = tempfile::tempdir().unwrap();
    let result: actor::Result<Agent<Spot, Hop, QNet>> = Agent::from_deployment(
        &dir.path().join("deployed"),
        &factory(),
        EpsilonSchedule::default(),
    );
    assert!(matches!(result, Err(AgentError::Snapshot(_))));
}

#[test]
fn episodes_run_until_terminal() {
    let mut env = Line { at: 0 };
    let mut agent = agent(1.0, 5);
    let record = play_episode(&mut env, &mut agent, 9).unwrap();
    assert_eq!(record.episode, 9);
    assert!(record.len() >= 4);
    assert!(record.transitions.last().unwrap().terminal);
    assert!(record.transitions[..record.len() - 1].iter().all(|t| !t.terminal));
    assert_eq!(record.score(), 1.0);

    let metrics = record.online_metrics();
    assert_eq!(metrics.num_episodes, 1);
    assert_eq!(metrics.avg_episode_length, record.len() as f64);
}

#[test]
fn stalled_episodes_are_truncated() {
    let mut env = TimeLimitedWrapper::new(Line { at: 0 }, 3);
    env.reset();
    assert_eq!(env.step(Hop::Left).1, Status::Running);
    assert_eq!(env.step(Hop::Right).1, Status::Running);
    let (transition, status) = env.step(Hop::Left);
    assert_eq!(status, Status::Done(Done::ShouldTruncate));
    assert!(!transition.terminal);
    assert_eq!(env.inner().state(), Spot(0));
}
