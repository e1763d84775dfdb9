mod args;

use actor::{play_episode, Agent, TimeLimitedWrapper, UniformRandom};
use anyhow::{bail, Context, Result};
use args::{Args, Command, TrainArgs};
use clap::Parser;
use corridor::{Cell, Corridor, Move};
use learner::{HarnessSettings, Trainer};
use model::{MlpFactory, QNet};
use model_registry::HarnessPaths;
use rand::rngs::StdRng;
use rand::SeedableRng;
use replay_data::{Action, RewardSign, State};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type CorridorTrainer = Trainer<Cell, Move, MlpFactory>;

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    let settings = match &args.settings {
        Some(path) => HarnessSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => HarnessSettings::default(),
    };
    let paths = args
        .data_dir
        .as_ref()
        .map_or_else(|| settings.paths.clone(), HarnessPaths::under);
    info!(?paths, ?settings, "starting learner");

    let factory = MlpFactory {
        input_len: Cell::INPUT_LEN,
        hidden_len: settings.hidden_len,
        action_count: Move::count(),
    };
    let mut trainer: CorridorTrainer = Trainer::open(&paths, factory.clone(), settings.trainer.clone())
        .context("opening transition store and model registry")?;

    match args.command {
        Command::ColdStart {
            tag,
            max_seed_episodes,
        } => cold_start(&trainer, &settings, &tag, max_seed_episodes),
        Command::Train(train_args) => train(&mut trainer, &factory, &settings, &train_args),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn next_episode(trainer: &CorridorTrainer) -> Result<u64> {
    Ok(trainer.store().latest_episode()?.map_or(0, |e| e + 1))
}

fn cold_start(
    trainer: &CorridorTrainer,
    settings: &HarnessSettings,
    tag: &str,
    max_seed_episodes: u32,
) -> Result<()> {
    let mut env = TimeLimitedWrapper::new(Corridor::default(), settings.stall_limit);
    let mut random = UniformRandom::new(match settings.trainer.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    });

    // sampling needs every reward class, keep playing until all are present
    for _ in 0..max_seed_episodes.max(1) {
        let episode = next_episode(trainer)?;
        let record = play_episode(&mut env, &mut random, episode)?;
        trainer.store().append(&record.transitions, episode, 0)?;
        info!(episode, moves = record.len(), "seeded random episode");
        if RewardSign::ALL
            .iter()
            .all(|sign| trainer.store().count(*sign) > 0)
        {
            break;
        }
    }
    if let Some(missing) = RewardSign::ALL
        .iter()
        .find(|sign| trainer.store().count(**sign) == 0)
    {
        warn!(%missing, "store still lacks a reward class, training will fail until it is played");
    }

    let validation = play_episode(&mut env, &mut random, 0)?;
    let set = trainer
        .store()
        .push_validation_episode(&validation.transitions)?;
    info!(set, moves = validation.len(), "stored validation episode");

    let key = trainer.cold_start(tag)?;
    info!(%key, "run `learner train --tag {}` to start training", key.tag);
    Ok(())
}

fn train(
    trainer: &mut CorridorTrainer,
    factory: &MlpFactory,
    settings: &HarnessSettings,
    args: &TrainArgs,
) -> Result<()> {
    let key = match args.version {
        Some(version) => trainer.registry().model_key(&args.tag, version),
        None => match trainer.registry().get_latest_version(&args.tag)? {
            Some(key) => key,
            None => bail!("no model tagged {:?}, run cold-start first", args.tag),
        },
    };
    let mut env = TimeLimitedWrapper::new(Corridor::default(), settings.stall_limit);

    for _ in 0..args.num_episodes {
        trainer.registry().deploy(&key)?;
        let mut agent: Agent<Cell, Move, QNet> = Agent::from_deployment(
            trainer.registry().deploy_dir(),
            factory,
            settings.epsilon.clone(),
        )?;
        let episode = next_episode(trainer)?;
        let record = play_episode(&mut env, &mut agent, episode)?;
        trainer.store().append(&record.transitions, episode, 0)?;
        let entry = trainer
            .registry()
            .publish_online_metrics(&key, &record.online_metrics())?;
        info!(
            episode,
            epsilon = agent.epsilon(),
            moves = record.len(),
            score = record.score(),
            episodes_played = entry.num_episodes_played,
            "episode played"
        );

        trainer
            .retrain_and_publish(&key, args.batch_size, args.num_batches)
            .with_context(|| format!("retraining {key}"))?;
    }
    let entry = trainer.registry().deploy(&key)?;
    info!(
        %key,
        episodes = entry.num_episodes_played,
        batches = entry.num_batches_trained,
        "deployed trained model"
    );

    let capacity = settings.store.capacity;
    for sign in [RewardSign::Zero, RewardSign::Negative] {
        let removed = trainer.store().retain(sign, capacity)?;
        info!(%sign, removed, capacity, "pruned old transitions");
    }
    Ok(())
}
