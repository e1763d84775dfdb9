use crate::key::{self, ModelKey};
use crate::metrics::{Metrics, OfflineMetrics, OnlineMetrics};
use crate::paths::{HarnessPaths, ENTRY_FILE, POLICY_FILE, TARGET_FILE};
use crate::{ModelEntry, RegistryError, Result};
use file_io::{copy_dir_files, create_file_buf_write, replace_dir_with, StagedFiles};
use model::traits::Persistable;
use replay_data::codec;
use sled::transaction::{ConflictableTransactionError, TransactionalTree};
use sled::{Db, Transactional, Tree};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

type TxResult<T> = std::result::Result<T, ConflictableTransactionError<RegistryError>>;

fn abort<T>(err: impl Into<RegistryError>) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(err.into()))
}

/// Versioned model weights plus their performance history.
///
/// Entries live in the `models` tree. Every per-batch loss, every published
/// gameplay result and every training summary is also kept as an audit row
/// keyed by model key and batch, episode or session number.
///
/// Weight files are staged beside their destination and only moved into
/// place once the database commit that accounts for them has succeeded.
pub struct ModelRegistry {
    db: Db,
    models: Tree,
    loss_history: Tree,
    online_metrics: Tree,
    offline_metrics: Tree,
    sessions: Tree,
    weights_root: PathBuf,
    deploy_dir: PathBuf,
}

impl ModelRegistry {
    pub fn open(paths: &HarnessPaths) -> Result<Self> {
        let db = sled::open(paths.registry_db())?;
        Ok(Self {
            models: db.open_tree("models")?,
            loss_history: db.open_tree("loss_history")?,
            online_metrics: db.open_tree("online_metrics")?,
            offline_metrics: db.open_tree("offline_metrics")?,
            sessions: db.open_tree("offline_sessions")?,
            db,
            weights_root: paths.weights_root.clone(),
            deploy_dir: paths.deploy_dir.clone(),
        })
    }

    pub fn model_key(&self, tag: &str, version: u32) -> ModelKey {
        ModelKey::new(tag, version)
    }

    pub fn weights_location(&self, key: &ModelKey) -> PathBuf {
        self.weights_root
            .join(&key.tag)
            .join(key.version.to_string())
    }

    pub fn deploy_dir(&self) -> &Path {
        &self.deploy_dir
    }

    /// Mints the next version of `tag` (0 for a new tag), writing whichever
    /// weights are given. Omitted weights are left for a later
    /// [`ModelRegistry::update_weights`].
    pub fn publish_new_version(
        &self,
        tag: &str,
        policy: Option<&dyn Persistable>,
        target: Option<&dyn Persistable>,
    ) -> Result<ModelKey> {
        let version = match self.get_latest_version(tag)? {
            Some(latest) => latest.version.checked_add(1).ok_or_else(|| {
                RegistryError::InvalidArgument(format!("tag {tag:?} ran out of versions"))
            })?,
            None => 0,
        };
        let key = ModelKey::new(tag, version);
        let weights_location = self.weights_location(&key);
        fs::create_dir_all(&weights_location)?;
        let staged = stage_weights(&weights_location, policy, target)?;

        let entry = ModelEntry::new(key.clone(), weights_location);
        let swapped = self.models.compare_and_swap(
            key::encode(&key),
            None as Option<&[u8]>,
            Some(codec::encode(&entry)?),
        )?;
        if swapped.is_err() {
            return Err(RegistryError::VersionTaken(key));
        }
        self.db.flush()?;
        staged.commit()?;
        info!(%key, "published new model version");
        Ok(key)
    }

    pub fn get_latest_version(&self, tag: &str) -> Result<Option<ModelKey>> {
        let latest = self
            .models
            .scan_prefix(key::tag_prefix(tag))
            .keys()
            .filter_map(|k| k.map(|k| key::decode(&k)).transpose())
            .next_back()
            .transpose()?;
        Ok(latest)
    }

    pub fn get_entry(&self, key: &ModelKey) -> Result<Option<ModelEntry>> {
        match self.models.get(key::encode(key))? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn require_entry(&self, key: &ModelKey) -> Result<ModelEntry> {
        self.get_entry(key)?
            .ok_or_else(|| RegistryError::NotFound(key.clone()))
    }

    /// All versions of `tag`, oldest first.
    pub fn entries(&self, tag: &str) -> Result<Vec<ModelEntry>> {
        self.models
            .scan_prefix(key::tag_prefix(tag))
            .values()
            .map(|bytes| Ok(codec::decode(&bytes?)?))
            .collect()
    }

    /// Overwrites the weight blobs of `key` without touching its metrics.
    pub fn update_weights(
        &self,
        key: &ModelKey,
        policy: Option<&dyn Persistable>,
        target: Option<&dyn Persistable>,
    ) -> Result<()> {
        let entry = self.require_entry(key)?;
        fs::create_dir_all(&entry.weights_location)?;
        stage_weights(&entry.weights_location, policy, target)?.commit()?;
        debug!(%key, "updated weights");
        Ok(())
    }

    pub fn publish_online_metrics(
        &self,
        key: &ModelKey,
        metrics: &OnlineMetrics,
    ) -> Result<ModelEntry> {
        if metrics.count() == 0 {
            return Err(RegistryError::InvalidArgument(
                "online metrics must cover at least one episode".to_string(),
            ));
        }
        let update = ModelEntry::online_update(key.clone(), metrics.clone());
        let history_row = codec::encode(metrics)?;
        let entry = (&self.models, &self.online_metrics).transaction(|(models, history)| {
            let entry = merge_into_entry(models, key, &update)?;
            let episode = entry.num_episodes_played - update.num_episodes_played;
            history.insert(key::child(key, episode), history_row.as_slice())?;
            Ok::<_, ConflictableTransactionError<RegistryError>>(entry)
        })?;
        self.db.flush()?;
        info!(
            %key,
            episodes = entry.num_episodes_played,
            avg_length = entry.online_metrics.as_ref().map(|m| m.avg_episode_length),
            "merged online metrics"
        );
        Ok(entry)
    }

    pub fn publish_offline_metrics(
        &self,
        key: &ModelKey,
        metrics: &OfflineMetrics,
    ) -> Result<ModelEntry> {
        self.commit_offline(key, metrics, &[])
    }

    /// Persists the outcome of one training session: the new weights, one
    /// loss-history row per batch and the merged offline metrics.
    ///
    /// Both weight files are saved before the database transaction and
    /// renamed into place after it commits, so a failed save or commit
    /// leaves the previous weights and metrics as they were.
    pub fn record_training_session(
        &self,
        key: &ModelKey,
        policy: &dyn Persistable,
        target: &dyn Persistable,
        losses: &[f32],
        metrics: &OfflineMetrics,
    ) -> Result<ModelEntry> {
        if losses.is_empty() || metrics.num_batches != losses.len() as u64 {
            return Err(RegistryError::InvalidArgument(format!(
                "{} losses recorded for a session of {} batches",
                losses.len(),
                metrics.num_batches
            )));
        }
        let entry = self.require_entry(key)?;
        fs::create_dir_all(&entry.weights_location)?;
        let staged = stage_weights(&entry.weights_location, Some(policy), Some(target))?;
        let entry = self.commit_offline(key, metrics, losses)?;
        staged.commit()?;
        Ok(entry)
    }

    fn commit_offline(
        &self,
        key: &ModelKey,
        metrics: &OfflineMetrics,
        losses: &[f32],
    ) -> Result<ModelEntry> {
        if metrics.count() == 0 {
            return Err(RegistryError::InvalidArgument(
                "offline metrics must cover at least one batch".to_string(),
            ));
        }
        let update = ModelEntry::offline_update(key.clone(), metrics.clone());
        let summary_row = codec::encode(metrics)?;
        let loss_rows = losses
            .iter()
            .map(codec::encode)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let db_key = key::encode(key);
        let (entry, session) = (
            &self.models,
            &self.loss_history,
            &self.offline_metrics,
            &self.sessions,
        )
            .transaction(|(models, loss_history, offline_metrics, sessions)| {
                let entry = merge_into_entry(models, key, &update)?;
                let first_batch = entry.num_batches_trained - update.num_batches_trained;
                for (i, row) in loss_rows.iter().enumerate() {
                    loss_history.insert(key::child(key, first_batch + i as u64), row.as_slice())?;
                }
                let session = sessions
                    .get(&db_key)?
                    .and_then(|v| key::decode_count(&v))
                    .unwrap_or(0);
                offline_metrics.insert(key::child(key, session), summary_row.as_slice())?;
                sessions.insert(db_key.as_slice(), &(session + 1).to_be_bytes()[..])?;
                Ok::<_, ConflictableTransactionError<RegistryError>>((entry, session))
            })?;
        self.db.flush()?;
        info!(
            %key,
            session,
            batches = entry.num_batches_trained,
            session_loss = metrics.avg_batch_loss,
            "merged offline metrics"
        );
        Ok(entry)
    }

    /// Per-batch losses of `key` as `(batch_number, loss)`, in batch order.
    pub fn loss_history(&self, key: &ModelKey) -> Result<Vec<(u64, f32)>> {
        history(&self.loss_history, key)
    }

    /// Per-episode results of `key` as `(episode_number, metrics)`.
    pub fn online_history(&self, key: &ModelKey) -> Result<Vec<(u64, OnlineMetrics)>> {
        history(&self.online_metrics, key)
    }

    /// Per-session summaries of `key` as `(session_number, metrics)`.
    pub fn offline_history(&self, key: &ModelKey) -> Result<Vec<(u64, OfflineMetrics)>> {
        history(&self.offline_metrics, key)
    }

    /// Publishes the weights of `key` and a snapshot of its entry as the
    /// live model read by the agent runtime.
    pub fn deploy(&self, key: &ModelKey) -> Result<ModelEntry> {
        let entry = self.require_entry(key)?;
        let policy = entry.weights_location.join(POLICY_FILE);
        if !policy.is_file() {
            return Err(RegistryError::MissingWeights(policy));
        }
        replace_dir_with(&self.deploy_dir, |staged| -> Result<()> {
            copy_dir_files(&entry.weights_location, staged)?;
            let mut writer = create_file_buf_write(staged.join(ENTRY_FILE))?;
            serde_json::to_writer_pretty(&mut writer, &entry)?;
            writer.flush()?;
            Ok(())
        })?;
        info!(%key, dir = %self.deploy_dir.display(), "deployed model");
        Ok(entry)
    }

    /// Deploys the version of `tag` with the longest average episode. Versions
    /// without gameplay rank below all others; ties go to the newer version.
    pub fn deploy_best(&self, tag: &str) -> Result<ModelEntry> {
        let best = self
            .entries(tag)?
            .into_iter()
            .max_by(|a, b| {
                let score = |e: &ModelEntry| {
                    e.online_metrics
                        .as_ref()
                        .map_or(f64::NEG_INFINITY, |m| m.avg_episode_length)
                };
                score(a)
                    .total_cmp(&score(b))
                    .then(a.key.version.cmp(&b.key.version))
            })
            .ok_or_else(|| RegistryError::UnknownTag(tag.to_string()))?;
        self.deploy(&best.key)
    }
}

fn stage_weights(
    dir: &Path,
    policy: Option<&dyn Persistable>,
    target: Option<&dyn Persistable>,
) -> Result<StagedFiles> {
    let mut staged = StagedFiles::new();
    for (file, weights) in [(POLICY_FILE, policy), (TARGET_FILE, target)] {
        if let Some(weights) = weights {
            staged.stage(dir.join(file), |tmp| -> Result<()> {
                Ok(weights.save(tmp)?)
            })?;
        }
    }
    Ok(staged)
}

fn merge_into_entry(
    models: &TransactionalTree,
    key: &ModelKey,
    update: &ModelEntry,
) -> TxResult<ModelEntry> {
    let db_key = key::encode(key);
    let mut entry: ModelEntry = match models.get(&db_key)? {
        Some(bytes) => match codec::decode(&bytes) {
            Ok(entry) => entry,
            Err(err) => return abort(err),
        },
        None => return abort(RegistryError::NotFound(key.clone())),
    };
    if let Err(err) = entry.update_with_new_values(update) {
        return abort(err);
    }
    match codec::encode(&entry) {
        Ok(bytes) => {
            models.insert(db_key, bytes)?;
        }
        Err(err) => return abort(err),
    }
    Ok(entry)
}

fn history<T: serde::de::DeserializeOwned>(tree: &Tree, key: &ModelKey) -> Result<Vec<(u64, T)>> {
    tree.scan_prefix(key::encode(key))
        .map(|row| {
            let (k, v) = row?;
            let index = key::child_index(&k).ok_or_else(|| {
                RegistryError::InvalidArgument("malformed history key".to_string())
            })?;
            Ok((index, codec::decode(&v)?))
        })
        .collect()
}
