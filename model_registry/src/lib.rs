mod entry;
mod error;
mod key;
mod metrics;
mod paths;
mod registry;

pub use entry::ModelEntry;
pub use error::{RegistryError, Result};
pub use key::ModelKey;
pub use metrics::{Metrics, OfflineMetrics, OnlineMetrics, RunningAverage};
pub use paths::{DeployedSnapshot, HarnessPaths, ENTRY_FILE, POLICY_FILE, TARGET_FILE};
pub use registry::ModelRegistry;
