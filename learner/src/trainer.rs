use crate::{Result, TrainError, TrainerSettings};
use model::traits::{BasicLearner, DifferentiableModel, ModelFactory, Persistable, TargetNet};
use model::{encode_states, soft_update, DqnModel, EncodedBatch};
use model_registry::{
    HarnessPaths, ModelKey, ModelRegistry, OfflineMetrics, RegistryError, POLICY_FILE, TARGET_FILE,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use replay_data::{Action, State};
use replay_memories::{StoreError, TransitionStore};
use std::path::Path;
use tracing::{debug, info};

/// Offline DQN training over the transition store, publishing every
/// session to the model registry.
pub struct Trainer<S, A, F, R = StdRng> {
    store: TransitionStore<S, A>,
    registry: ModelRegistry,
    factory: F,
    settings: TrainerSettings,
    rng: R,
}

impl<S: State, A: Action, F: ModelFactory> Trainer<S, A, F, StdRng> {
    pub fn open(paths: &HarnessPaths, factory: F, settings: TrainerSettings) -> Result<Self> {
        let store = TransitionStore::open(paths.transitions_db())?;
        let registry = ModelRegistry::open(paths)?;
        let rng = settings
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
        Self::new(store, registry, factory, settings, rng)
    }
}

impl<S: State, A: Action, F: ModelFactory, R: Rng> Trainer<S, A, F, R> {
    pub fn new(
        store: TransitionStore<S, A>,
        registry: ModelRegistry,
        factory: F,
        settings: TrainerSettings,
        rng: R,
    ) -> Result<Self> {
        settings
            .hyperparams
            .validate()
            .map_err(|err| TrainError::InvalidArgument(err.to_string()))?;
        Ok(Self {
            store,
            registry,
            factory,
            settings,
            rng,
        })
    }

    pub fn store(&self) -> &TransitionStore<S, A> {
        &self.store
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &TrainerSettings {
        &self.settings
    }

    /// Publishes an untrained policy and an identical target as the next
    /// version of `tag`.
    pub fn cold_start(&self, tag: &str) -> Result<ModelKey> {
        let policy = self.factory.build()?;
        let target = self.factory.build()?;
        soft_update(policy.varmap(), target.varmap(), 1.0)?;
        let key = self
            .registry
            .publish_new_version(tag, Some(&policy), Some(&target))?;
        info!(%key, "cold started model");
        Ok(key)
    }

    /// Runs `num_batches` training steps on `key` and publishes the result.
    ///
    /// Nothing is persisted unless every batch succeeds: weights, loss rows
    /// and the merged offline metrics are written together at the end.
    pub fn retrain_and_publish(
        &mut self,
        key: &ModelKey,
        batch_size: usize,
        num_batches: usize,
    ) -> Result<OfflineMetrics> {
        if batch_size == 0 {
            return Err(TrainError::InvalidArgument(
                "batch size must be positive".to_string(),
            ));
        }
        if num_batches == 0 {
            return Err(TrainError::InvalidArgument(
                "number of batches must be positive".to_string(),
            ));
        }
        let entry = self
            .registry
            .get_entry(key)?
            .ok_or_else(|| TrainError::NotFound(key.clone()))?;

        let policy = self.load_model(&entry.weights_location.join(POLICY_FILE))?;
        let target = self.load_model(&entry.weights_location.join(TARGET_FILE))?;
        let device = policy.device().clone();
        let tau = self.settings.hyperparams.tau;
        let mut model = DqnModel::new(policy, target, self.settings.hyperparams.clone())?;

        let sampler = self.store.sampler(batch_size)?;
        let mut losses = Vec::with_capacity(num_batches);
        for batch_number in 0..num_batches {
            let transitions = sampler.sample(&mut self.rng)?;
            let batch = EncodedBatch::from_transitions(&transitions, &device)?;
            let step = model.train_batch(&batch)?;
            model.soft_update_target(tau)?;
            debug!(
                batch_number,
                loss = step.loss,
                average_q_val = step.average_q_val,
                "trained batch"
            );
            losses.push(step.loss);
        }

        let validation_max_q = self.validation_max_q(&model)?;
        let metrics = OfflineMetrics::from_losses(&losses, validation_max_q).ok_or_else(|| {
            TrainError::InvalidArgument("training session produced no losses".to_string())
        })?;
        let entry = self.registry.record_training_session(
            key,
            model.policy(),
            model.target(),
            &losses,
            &metrics,
        )?;
        info!(
            %key,
            batches = num_batches,
            batch_size,
            loss_kind = ?self.settings.hyperparams.loss,
            session_loss = metrics.avg_batch_loss,
            validation_max_q,
            total_batches = entry.num_batches_trained,
            "training session published"
        );
        Ok(metrics)
    }

    fn load_model(&self, weights: &Path) -> Result<F::Model> {
        if !weights.is_file() {
            return Err(RegistryError::MissingWeights(weights.to_path_buf()).into());
        }
        let mut model = self.factory.build()?;
        model.load(weights)?;
        Ok(model)
    }

    fn validation_max_q(&self, model: &DqnModel<F::Model>) -> Result<Option<f32>> {
        if !self.settings.evaluate_validation {
            return Ok(None);
        }
        let validation = match self.store.get_validation_set(None) {
            Ok(validation) => validation,
            Err(StoreError::NotFound(_)) => {
                debug!("no validation set stored, skipping evaluation");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        let states: Vec<S> = validation.into_iter().map(|t| t.state).collect();
        if states.is_empty() {
            return Ok(None);
        }
        let encoded = encode_states(&states, model.policy().device())?;
        Ok(Some(model.average_max_q(&encoded)?))
    }
}
