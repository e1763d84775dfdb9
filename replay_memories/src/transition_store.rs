use crate::keys;
use crate::row::{decode_row, encode_row};
use crate::sampling::BalancedDraw;
use crate::{Result, StoreError};
use rand::Rng;
use replay_data::{Action, RewardSign, State, StoredTransition, Transition};
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionalTree};
use sled::{Db, IVec, Transactional, Tree};
use std::marker::PhantomData;
use std::path::Path;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Rows kept per reward class by a retention pass.
    pub capacity: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

/// Durable transition log, partitioned by reward sign, plus a separate
/// validation partition that is never pruned.
///
/// Rows of each sign live in their own tree, keyed by a database-wide
/// monotonic id, so key order is append order.
pub struct TransitionStore<S, A> {
    db: Db,
    positive: Tree,
    zero: Tree,
    negative: Tree,
    validation: Tree,
    meta: Tree,
    _row: PhantomData<fn() -> (S, A)>,
}

impl<S: State, A: Action> TransitionStore<S, A> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Ok(Self {
            positive: db.open_tree("data.positive")?,
            zero: db.open_tree("data.zero")?,
            negative: db.open_tree("data.negative")?,
            validation: db.open_tree("validation_data")?,
            meta: db.open_tree("meta")?,
            db,
            _row: PhantomData,
        })
    }

    fn tree(&self, sign: RewardSign) -> &Tree {
        match sign {
            RewardSign::Positive => &self.positive,
            RewardSign::Zero => &self.zero,
            RewardSign::Negative => &self.negative,
        }
    }

    /// Appends the transitions of one episode; the i-th transition is
    /// recorded with move index `move_offset + i`.
    pub fn append(
        &self,
        transitions: &[Transition<S, A>],
        episode: u64,
        move_offset: u32,
    ) -> Result<()> {
        if transitions.is_empty() {
            return Ok(());
        }
        let mut rows = Vec::with_capacity(transitions.len());
        for (i, transition) in transitions.iter().enumerate() {
            let move_index = u32::try_from(i)
                .ok()
                .and_then(|i| move_offset.checked_add(i))
                .ok_or_else(|| {
                    StoreError::InvalidArgument("move index overflows u32".to_string())
                })?;
            let id = self.db.generate_id()?;
            rows.push((
                transition.reward_sign(),
                keys::row_key(id),
                encode_row(transition, episode, move_index)?,
            ));
        }

        (&self.positive, &self.zero, &self.negative, &self.meta).transaction(
            |(positive, zero, negative, meta)| {
                for (sign, key, row) in &rows {
                    let tree: &TransactionalTree = match sign {
                        RewardSign::Positive => positive,
                        RewardSign::Zero => zero,
                        RewardSign::Negative => negative,
                    };
                    tree.insert(&key[..], row.as_slice())?;
                }
                let latest = meta
                    .get(keys::LATEST_EPISODE)?
                    .and_then(|v| keys::decode_u64(&v));
                if latest.map_or(true, |latest| latest < episode) {
                    meta.insert(keys::LATEST_EPISODE, &episode.to_be_bytes()[..])?;
                }
                Ok::<_, ConflictableTransactionError<StoreError>>(())
            },
        )?;
        self.db.flush()?;
        debug!(episode, rows = rows.len(), "appended transitions");
        Ok(())
    }

    pub fn sample(&self, batch_size: usize) -> Result<Vec<Transition<S, A>>> {
        self.sample_with_rng(batch_size, &mut rand::thread_rng())
    }

    /// Draws exactly `batch_size` transitions with roughly equal thirds of
    /// positive, zero and negative reward. Scarce classes are oversampled
    /// by repetition; an empty class fails the draw.
    pub fn sample_with_rng<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        rng: &mut R,
    ) -> Result<Vec<Transition<S, A>>> {
        self.sampler(batch_size)?.sample(rng)
    }

    /// Snapshots the row keys of every reward class once, for drawing many
    /// batches of `batch_size` without rescanning the store.
    pub fn sampler(&self, batch_size: usize) -> Result<BatchSampler<'_, S, A>> {
        if batch_size == 0 {
            return Err(StoreError::InvalidArgument(
                "batch size must be positive".to_string(),
            ));
        }
        let mut classes = Vec::with_capacity(RewardSign::ALL.len());
        for sign in RewardSign::ALL {
            let keys = self
                .tree(sign)
                .iter()
                .keys()
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if keys.is_empty() {
                return Err(StoreError::InsufficientData {
                    sign,
                    requested: batch_size,
                });
            }
            classes.push((sign, keys));
        }
        let draw = BalancedDraw::new(classes.iter().map(|(_, keys)| keys.len()).collect()).ok_or(
            StoreError::InsufficientData {
                sign: RewardSign::Zero,
                requested: batch_size,
            },
        )?;
        if draw.pool_len() < batch_size {
            debug!(
                pool = draw.pool_len(),
                batch_size, "batch exceeds expanded pool, rows repeat"
            );
        }
        Ok(BatchSampler {
            store: self,
            classes,
            draw,
            batch_size,
        })
    }

    /// Deletes all but the newest `keep_count` rows whose reward has `sign`.
    pub fn retain(&self, sign: RewardSign, keep_count: usize) -> Result<usize> {
        let tree = self.tree(sign);
        let mut batch = sled::Batch::default();
        let mut removed = 0;
        for key in tree.iter().keys().rev().skip(keep_count) {
            batch.remove(key?);
            removed += 1;
        }
        if removed > 0 {
            tree.apply_batch(batch)?;
            self.db.flush()?;
        }
        info!(%sign, keep_count, removed, "retention pass");
        Ok(removed)
    }

    /// Stores one held-out episode and returns its validation set id.
    pub fn push_validation_episode(&self, transitions: &[Transition<S, A>]) -> Result<u64> {
        if transitions.is_empty() {
            return Err(StoreError::InvalidArgument(
                "validation episode has no transitions".to_string(),
            ));
        }
        let mut rows = Vec::with_capacity(transitions.len());
        for (i, transition) in transitions.iter().enumerate() {
            let move_index = u32::try_from(i).map_err(|_| {
                StoreError::InvalidArgument("validation episode too long".to_string())
            })?;
            rows.push((move_index, encode_row(transition, 0, move_index)?));
        }
        let set_id = (&self.validation, &self.meta).transaction(|(validation, meta)| {
            let set_id = match meta.get(keys::LATEST_VALIDATION_SET)? {
                Some(latest) => keys::decode_u64(&latest).map_or(0, |id| id + 1),
                None => 0,
            };
            for (move_index, row) in &rows {
                validation.insert(
                    &keys::validation_key(set_id, *move_index)[..],
                    row.as_slice(),
                )?;
            }
            meta.insert(keys::LATEST_VALIDATION_SET, &set_id.to_be_bytes()[..])?;
            Ok::<_, ConflictableTransactionError<StoreError>>(set_id)
        })?;
        self.db.flush()?;
        info!(set_id, rows = rows.len(), "stored validation episode");
        Ok(set_id)
    }

    /// Returns the validation set `id`, or the most recently stored one.
    pub fn get_validation_set(&self, id: Option<u64>) -> Result<Vec<Transition<S, A>>> {
        let set_id = match id {
            Some(id) => id,
            None => self
                .latest_validation_set()?
                .ok_or(StoreError::NotFound(None))?,
        };
        let transitions = self
            .validation
            .scan_prefix(keys::validation_prefix(set_id))
            .values()
            .map(|row| {
                let stored: StoredTransition<S, A> = decode_row(&row?)?;
                Ok(stored.transition)
            })
            .collect::<Result<Vec<_>>>()?;
        if transitions.is_empty() {
            return Err(StoreError::NotFound(Some(set_id)));
        }
        Ok(transitions)
    }

    pub fn latest_validation_set(&self) -> Result<Option<u64>> {
        Ok(self
            .meta
            .get(keys::LATEST_VALIDATION_SET)?
            .and_then(|v| keys::decode_u64(&v)))
    }

    /// Highest episode number appended so far.
    pub fn latest_episode(&self) -> Result<Option<u64>> {
        Ok(self
            .meta
            .get(keys::LATEST_EPISODE)?
            .and_then(|v| keys::decode_u64(&v)))
    }

    pub fn count(&self, sign: RewardSign) -> usize {
        self.tree(sign).len()
    }

    pub fn len(&self) -> usize {
        RewardSign::ALL.iter().map(|&sign| self.count(sign)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows of one sign in append order, with provenance.
    pub fn rows(&self, sign: RewardSign) -> Result<Vec<StoredTransition<S, A>>> {
        self.tree(sign)
            .iter()
            .values()
            .map(|row| Ok(decode_row(&row?)?))
            .collect()
    }
}

/// Balanced batches over the rows present when the sampler was taken.
/// Only the drawn rows are read from the store.
pub struct BatchSampler<'a, S, A> {
    store: &'a TransitionStore<S, A>,
    classes: Vec<(RewardSign, Vec<IVec>)>,
    draw: BalancedDraw,
    batch_size: usize,
}

impl<S: State, A: Action> BatchSampler<'_, S, A> {
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Transition<S, A>>> {
        self.draw
            .draw(self.batch_size, rng)
            .into_iter()
            .map(|(class, row)| {
                let (sign, keys) = &self.classes[class];
                let bytes = self.store.tree(*sign).get(&keys[row])?.ok_or(
                    StoreError::InsufficientData {
                        sign: *sign,
                        requested: self.batch_size,
                    },
                )?;
                let stored: StoredTransition<S, A> = decode_row(&bytes)?;
                Ok(stored.transition)
            })
            .collect()
    }
}
