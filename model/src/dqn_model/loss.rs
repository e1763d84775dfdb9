use candle_core::{Result, Tensor};
use serde::{Deserialize, Serialize};

/// Regression loss between predicted and target action values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    /// Smooth L1 with a threshold of 1.
    #[default]
    Huber,
    L1,
    Mse,
}

impl LossKind {
    pub fn compute(self, predicted: &Tensor, target: &Tensor) -> Result<Tensor> {
        let diff = predicted.sub(target)?;
        match self {
            LossKind::Huber => {
                let abs_diff = diff.abs()?;
                let quadratic = diff.sqr()?.affine(0.5, 0.0)?;
                let linear = abs_diff.affine(1.0, -0.5)?;
                abs_diff
                    .lt(&abs_diff.ones_like()?)?
                    .where_cond(&quadratic, &linear)?
                    .mean_all()
            }
            LossKind::L1 => diff.abs()?.mean_all(),
            LossKind::Mse => diff.sqr()?.mean_all(),
        }
    }
}
