use crate::{ModelEntry, RegistryError, Result};
use file_io::open_file_buf_read;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const POLICY_FILE: &str = "policy.safetensors";
pub const TARGET_FILE: &str = "target.safetensors";
pub const ENTRY_FILE: &str = "entry.json";

/// Filesystem locations shared by the trainer and the agent runtime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HarnessPaths {
    pub db_root: PathBuf,
    /// Holds `<tag>/<version>/{policy,target}.safetensors`.
    pub weights_root: PathBuf,
    /// The live snapshot read by the agent runtime.
    pub deploy_dir: PathBuf,
}

impl HarnessPaths {
    pub fn under<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            db_root: root.join("db"),
            weights_root: root.join("models"),
            deploy_dir: root.join("deployed"),
        }
    }

    pub fn transitions_db(&self) -> PathBuf {
        self.db_root.join("transitions")
    }

    pub fn registry_db(&self) -> PathBuf {
        self.db_root.join("registry")
    }
}

impl Default for HarnessPaths {
    fn default() -> Self {
        Self::under("data")
    }
}

/// The model currently deployed for the agent runtime.
#[derive(Clone, Debug, PartialEq)]
pub struct DeployedSnapshot {
    pub entry: ModelEntry,
    pub policy_weights: PathBuf,
}

impl DeployedSnapshot {
    pub fn read<P: AsRef<Path>>(deploy_dir: P) -> Result<Self> {
        let deploy_dir = deploy_dir.as_ref();
        let entry_path = deploy_dir.join(ENTRY_FILE);
        if !entry_path.is_file() {
            return Err(RegistryError::NotDeployed(deploy_dir.to_path_buf()));
        }
        let entry = serde_json::from_reader(open_file_buf_read(&entry_path)?)?;
        let policy_weights = deploy_dir.join(POLICY_FILE);
        if !policy_weights.is_file() {
            return Err(RegistryError::MissingWeights(policy_weights));
        }
        Ok(Self {
            entry,
            policy_weights,
        })
    }
}
