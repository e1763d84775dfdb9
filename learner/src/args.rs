use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// JSON file with harness settings. Defaults are used when omitted.
    #[arg(short, long)]
    pub settings: Option<PathBuf>,
    /// Directory holding the databases, model weights and deployed snapshot.
    /// Overrides the paths from the settings file.
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Seeds the transition store with random play and publishes a fresh model.
    ColdStart {
        #[arg(long, default_value = "throwaway")]
        tag: String,
        /// Upper bound on random episodes played while some reward class is empty.
        #[arg(long, default_value_t = 50)]
        max_seed_episodes: u32,
    },
    /// Plays episodes with the deployed model, retraining after each one.
    Train(TrainArgs),
}

#[derive(clap::Args, Debug)]
pub struct TrainArgs {
    #[arg(long, default_value = "throwaway")]
    pub tag: String,
    /// Version to train. The latest version of the tag when omitted.
    #[arg(long)]
    pub version: Option<u32>,
    #[arg(long, default_value_t = 10)]
    pub num_episodes: u32,
    /// Transitions per batch, balanced across positive, zero and negative reward.
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,
    #[arg(long, default_value_t = 1)]
    pub num_batches: usize,
}
