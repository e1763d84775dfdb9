mod batch;
mod loss;

pub use batch::{encode_states, EncodedBatch};
pub use loss::LossKind;

use crate::soft_update::soft_update;
use crate::traits::{BasicLearner, DifferentiableModel, TargetNet};
use crate::{LearningStepInfo, ModelError, Result};
use candle_core::backprop::GradStore;
use candle_core::{Tensor, Var};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DqnHyperparams {
    pub discount: f64,
    pub tau: f64,
    pub learning_rate: f64,
    /// Component-wise bound applied to every gradient before the optimizer step.
    pub grad_clip: f64,
    pub loss: LossKind,
}

impl Default for DqnHyperparams {
    fn default() -> Self {
        Self {
            discount: 0.99,
            tau: 0.005,
            learning_rate: 1e-4,
            grad_clip: 100.0,
            loss: LossKind::Huber,
        }
    }
}

impl DqnHyperparams {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ModelError::InvalidArgument(msg));
        if !(0.0..=1.0).contains(&self.discount) {
            return invalid(format!("discount must lie in [0, 1], got {}", self.discount));
        }
        if !(self.tau > 0.0 && self.tau <= 1.0) {
            return invalid(format!("tau must lie in (0, 1], got {}", self.tau));
        }
        if !(self.learning_rate > 0.0) {
            return invalid(format!("learning rate must be positive, got {}", self.learning_rate));
        }
        if !(self.grad_clip > 0.0) {
            return invalid(format!("gradient clip must be positive, got {}", self.grad_clip));
        }
        Ok(())
    }
}

/// Policy/target network pair trained with one-step temporal difference
/// targets computed from the target network.
pub struct DqnModel<M> {
    policy: M,
    target: M,
    optimizer: AdamW,
    hyperparams: DqnHyperparams,
}

impl<M: DifferentiableModel> DqnModel<M> {
    pub fn new(policy: M, target: M, hyperparams: DqnHyperparams) -> Result<Self> {
        hyperparams.validate()?;
        let params = ParamsAdamW {
            lr: hyperparams.learning_rate,
            ..Default::default()
        };
        let optimizer = AdamW::new(policy.varmap().all_vars(), params)?;
        Ok(Self {
            policy,
            target,
            optimizer,
            hyperparams,
        })
    }

    pub fn policy(&self) -> &M {
        &self.policy
    }

    pub fn target(&self) -> &M {
        &self.target
    }

    pub fn hyperparams(&self) -> &DqnHyperparams {
        &self.hyperparams
    }

    /// Mean over `states` of the policy network's highest action value.
    pub fn average_max_q(&self, states: &Tensor) -> Result<f32> {
        Ok(self
            .policy
            .forward(states)?
            .max(1)?
            .mean_all()?
            .to_scalar::<f32>()?)
    }

    fn td_targets(&self, batch: &EncodedBatch) -> Result<Tensor> {
        let next_values = self
            .target
            .forward(&batch.next_states)?
            .max(1)?
            .mul(&batch.not_terminal)?;
        Ok(batch
            .rewards
            .add(&next_values.affine(self.hyperparams.discount, 0.0)?)?
            .detach())
    }
}

fn clip_gradients(grads: &mut GradStore, vars: &[Var], bound: f64) -> Result<()> {
    let bound = bound as f32;
    for var in vars {
        if let Some(grad) = grads.get(var.as_tensor()) {
            let clipped = grad.clamp(-bound, bound)?;
            grads.insert(var.as_tensor(), clipped);
        }
    }
    Ok(())
}

impl<M: DifferentiableModel> BasicLearner for DqnModel<M> {
    fn train_batch(&mut self, batch: &EncodedBatch) -> Result<LearningStepInfo> {
        let targets = self.td_targets(batch)?;
        let q_taken = self
            .policy
            .forward(&batch.states)?
            .gather(&batch.actions, 1)?
            .squeeze(1)?;
        let loss = self.hyperparams.loss.compute(&q_taken, &targets)?;

        let mut grads = loss.backward()?;
        clip_gradients(
            &mut grads,
            &self.policy.varmap().all_vars(),
            self.hyperparams.grad_clip,
        )?;
        self.optimizer.step(&grads)?;

        let info = LearningStepInfo {
            loss: loss.to_scalar::<f32>()?,
            average_q_val: q_taken.mean_all()?.to_scalar::<f32>()?,
        };
        trace!(loss = info.loss, average_q_val = info.average_q_val, "train step");
        Ok(info)
    }
}

impl<M: DifferentiableModel> TargetNet for DqnModel<M> {
    fn soft_update_target(&mut self, tau: f64) -> Result<()> {
        soft_update(self.policy.varmap(), self.target.varmap(), tau)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Actor, ModelFactory};
    use crate::MlpFactory;
    use candle_core::{DType, Device};
    use replay_data::{Action, State, Transition};
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct Spot(usize);

    impl State for Spot {
        const INPUT_LEN: usize = 3;

        fn to_input(&self) -> Vec<f32> {
            let mut input = vec![0.0; 3];
            input[self.0] = 1.0;
            input
        }
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
    enum Push {
        Left,
        Right,
    }

    impl Action for Push {
        const ALL: &'static [Self] = &[Push::Left, Push::Right];
    }

    fn factory() -> MlpFactory {
        MlpFactory {
            input_len: 3,
            hidden_len: 16,
            action_count: 2,
        }
    }

    fn terminal_batch() -> Vec<Transition<Spot, Push>> {
        vec![
            Transition {
                state: Spot(0),
                action: Push::Left,
                next_state: Spot(0),
                reward: -1.0,
                terminal: true,
            },
            Transition {
                state: Spot(2),
                action: Push::Right,
                next_state: Spot(2),
                reward: 1.0,
                terminal: true,
            },
            Transition {
                state: Spot(1),
                action: Push::Right,
                next_state: Spot(2),
                reward: 0.0,
                terminal: false,
            },
        ]
    }

    fn pair(hyperparams: DqnHyperparams) -> DqnModel<crate::QNet> {
        let factory = factory();
        DqnModel::new(factory.build().unwrap(), factory.build().unwrap(), hyperparams).unwrap()
    }

    #[test]
    fn training_reduces_loss_on_a_fixed_batch() {
        let mut model = pair(DqnHyperparams {
            learning_rate: 1e-2,
            ..Default::default()
        });
        let batch = EncodedBatch::from_transitions(&terminal_batch(), &Device::Cpu).unwrap();
        let first = model.train_batch(&batch).unwrap().loss;
        let mut last = first;
        for _ in 0..300 {
            last = model.train_batch(&batch).unwrap().loss;
        }
        assert!(first.is_finite());
        assert!(last < first, "loss went from {first} to {last}");
    }

    #[test]
    fn training_moves_policy_but_not_target() {
        let mut model = pair(DqnHyperparams::default());
        let input = [0.0, 1.0, 0.0];
        let policy_before = model.policy().q_values(&input).unwrap();
        let target_before = model.target().q_values(&input).unwrap();

        let batch = EncodedBatch::from_transitions(&terminal_batch(), &Device::Cpu).unwrap();
        model.train_batch(&batch).unwrap();

        assert_ne!(model.policy().q_values(&input).unwrap(), policy_before);
        assert_eq!(model.target().q_values(&input).unwrap(), target_before);

        model.copy_policy_to_target().unwrap();
        assert_eq!(
            model.target().q_values(&input).unwrap(),
            model.policy().q_values(&input).unwrap()
        );
    }

    #[test]
    fn terminal_transitions_ignore_next_state_value() {
        let model = pair(DqnHyperparams::default());
        let batch = EncodedBatch::from_transitions(&terminal_batch(), &Device::Cpu).unwrap();
        let targets = model.td_targets(&batch).unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(targets[0], -1.0);
        assert_eq!(targets[1], 1.0);

        let next_max = model
            .target()
            .q_values(&Spot(2).to_input())
            .unwrap()
            .into_iter()
            .fold(f32::MIN, f32::max);
        assert!((targets[2] - 0.99 * next_max).abs() < 1e-5);
    }

    #[test]
    fn gradients_are_clipped_componentwise() {
        let var = Var::from_tensor(&Tensor::new(&[1.0f32, -1.0, 0.5], &Device::Cpu).unwrap())
            .unwrap();
        let loss = var.affine(1000.0, 0.0).unwrap().sum_all().unwrap();
        let mut grads = loss.backward().unwrap();
        clip_gradients(&mut grads, &[var.clone()], 100.0).unwrap();
        let grad = grads.get(var.as_tensor()).unwrap().to_vec1::<f32>().unwrap();
        assert_eq!(grad, vec![100.0, 100.0, 100.0]);
    }

    #[test]
    fn rejects_invalid_hyperparams() {
        let factory = factory();
        let result = DqnModel::new(
            factory.build().unwrap(),
            factory.build().unwrap(),
            DqnHyperparams {
                tau: 0.0,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
    }

    #[test]
    fn average_max_q_matches_per_state_maxima() {
        let model = pair(DqnHyperparams::default());
        let states = [Spot(0), Spot(1), Spot(2)];
        let encoded = encode_states(&states, &Device::Cpu).unwrap();
        assert_eq!(encoded.dtype(), DType::F32);
        let expected = states
            .iter()
            .map(|s| {
                model
                    .policy()
                    .q_values(&s.to_input())
                    .unwrap()
                    .into_iter()
                    .fold(f32::MIN, f32::max)
            })
            .sum::<f32>()
            / 3.0;
        assert!((model.average_max_q(&encoded).unwrap() - expected).abs() < 1e-5);
    }
}
