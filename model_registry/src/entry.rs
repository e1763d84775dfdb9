use crate::metrics::{Metrics, OfflineMetrics, OnlineMetrics};
use crate::{ModelKey, RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Registry record of one model version.
///
/// `online_metrics` is `None` exactly when no episode has been played, and
/// `offline_metrics` is `None` exactly when no batch has been trained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub key: ModelKey,
    pub weights_location: PathBuf,
    pub num_episodes_played: u64,
    pub num_batches_trained: u64,
    pub online_metrics: Option<OnlineMetrics>,
    pub offline_metrics: Option<OfflineMetrics>,
}

impl ModelEntry {
    pub fn new(key: ModelKey, weights_location: PathBuf) -> Self {
        Self {
            key,
            weights_location,
            num_episodes_played: 0,
            num_batches_trained: 0,
            online_metrics: None,
            offline_metrics: None,
        }
    }

    /// An update carrying only gameplay results for `key`.
    pub fn online_update(key: ModelKey, metrics: OnlineMetrics) -> Self {
        Self {
            num_episodes_played: metrics.count(),
            online_metrics: Some(metrics),
            ..Self::new(key, PathBuf::new())
        }
    }

    /// An update carrying only training results for `key`.
    pub fn offline_update(key: ModelKey, metrics: OfflineMetrics) -> Self {
        Self {
            num_batches_trained: metrics.count(),
            offline_metrics: Some(metrics),
            ..Self::new(key, PathBuf::new())
        }
    }

    /// Folds the counters and metrics of `update` into this entry. The
    /// weights location is left alone.
    pub fn update_with_new_values(&mut self, update: &ModelEntry) -> Result<()> {
        if update.key != self.key {
            return Err(RegistryError::KeyMismatch {
                expected: self.key.clone(),
                found: update.key.clone(),
            });
        }
        self.num_episodes_played += update.num_episodes_played;
        self.num_batches_trained += update.num_batches_trained;
        self.online_metrics = merge(&self.online_metrics, &update.online_metrics);
        self.offline_metrics = merge(&self.offline_metrics, &update.offline_metrics);
        Ok(())
    }

    pub fn is_consistent(&self) -> bool {
        self.online_metrics.is_some() == (self.num_episodes_played > 0)
            && self.offline_metrics.is_some() == (self.num_batches_trained > 0)
    }
}

fn merge<M: Metrics + Clone>(current: &Option<M>, update: &Option<M>) -> Option<M> {
    match (current, update) {
        (Some(current), Some(update)) => Some(current.merge(update)),
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (None, None) => None,
    }
}
