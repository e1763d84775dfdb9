use crate::{EncodedBatch, LearningStepInfo, Result};
use candle_core::{Device, Module, Tensor};
use candle_nn::VarMap;
use std::path::Path;

pub trait Actor {
    fn q_values(&self, input: &[f32]) -> Result<Vec<f32>>;

    /// Index of the highest action value; ties go to the lowest index.
    fn best_action(&self, input: &[f32]) -> Result<usize> {
        let q_values = self.q_values(input)?;
        let mut best = 0;
        for (i, q) in q_values.iter().enumerate().skip(1) {
            if q.total_cmp(&q_values[best]).is_gt() {
                best = i;
            }
        }
        Ok(best)
    }
}

pub trait BasicLearner {
    fn train_batch(&mut self, batch: &EncodedBatch) -> Result<LearningStepInfo>;
}

pub trait TargetNet {
    /// `target = tau * policy + (1 - tau) * target` over every parameter.
    fn soft_update_target(&mut self, tau: f64) -> Result<()>;

    fn copy_policy_to_target(&mut self) -> Result<()> {
        self.soft_update_target(1.0)
    }
}

pub trait Persistable {
    fn save(&self, path: &Path) -> Result<()>;
    fn load(&mut self, path: &Path) -> Result<()>;
}

/// A network mapping a batch of encoded states `(batch, input_len)` to
/// action values `(batch, action_count)`, with named trainable parameters.
pub trait DifferentiableModel: Module + Persistable {
    fn varmap(&self) -> &VarMap;
    fn device(&self) -> &Device;
    fn input_len(&self) -> usize;
    fn action_count(&self) -> usize;
}

/// Builds untrained models of one fixed shape.
pub trait ModelFactory {
    type Model: DifferentiableModel;

    fn build(&self) -> Result<Self::Model>;
}

impl<M: DifferentiableModel> Actor for M {
    fn q_values(&self, input: &[f32]) -> Result<Vec<f32>> {
        let xs = Tensor::from_slice(input, (1, input.len()), self.device())?;
        Ok(self.forward(&xs)?.squeeze(0)?.to_vec1::<f32>()?)
    }
}
