use crate::traits::{DifferentiableModel, ModelFactory, Persistable};
use crate::Result;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder, VarMap};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Three layer perceptron with ReLU activations.
pub struct QNet {
    fc1: Linear,
    fc2: Linear,
    fc3: Linear,
    varmap: VarMap,
    device: Device,
    input_len: usize,
    action_count: usize,
}

impl QNet {
    pub fn new(
        input_len: usize,
        hidden_len: usize,
        action_count: usize,
        device: &Device,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let fc1 = linear(input_len, hidden_len, vb.pp("fc1"))?;
        let fc2 = linear(hidden_len, hidden_len, vb.pp("fc2"))?;
        let fc3 = linear(hidden_len, action_count, vb.pp("fc3"))?;
        Ok(Self {
            fc1,
            fc2,
            fc3,
            varmap,
            device: device.clone(),
            input_len,
            action_count,
        })
    }
}

impl Module for QNet {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = self.fc1.forward(xs)?.relu()?;
        let xs = self.fc2.forward(&xs)?.relu()?;
        self.fc3.forward(&xs)
    }
}

impl Persistable for QNet {
    fn save(&self, path: &Path) -> Result<()> {
        Ok(self.varmap.save(path)?)
    }
    fn load(&mut self, path: &Path) -> Result<()> {
        Ok(self.varmap.load(path)?)
    }
}

impl DifferentiableModel for QNet {
    fn varmap(&self) -> &VarMap {
        &self.varmap
    }
    fn device(&self) -> &Device {
        &self.device
    }
    fn input_len(&self) -> usize {
        self.input_len
    }
    fn action_count(&self) -> usize {
        self.action_count
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MlpFactory {
    pub input_len: usize,
    pub hidden_len: usize,
    pub action_count: usize,
}

impl ModelFactory for MlpFactory {
    type Model = QNet;

    fn build(&self) -> Result<QNet> {
        QNet::new(
            self.input_len,
            self.hidden_len,
            self.action_count,
            &Device::Cpu,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Actor;

    #[test]
    fn forward_shape_matches_action_count() {
        let net = MlpFactory {
            input_len: 4,
            hidden_len: 16,
            action_count: 3,
        }
        .build()
        .unwrap();
        let xs = Tensor::zeros((5, 4), DType::F32, &Device::Cpu).unwrap();
        assert_eq!(net.forward(&xs).unwrap().dims(), &[5, 3]);
        assert_eq!(net.q_values(&[0.0, 1.0, 0.0, 0.0]).unwrap().len(), 3);
    }

    #[test]
    fn saved_weights_load_into_fresh_net() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("policy.safetensors");
        let factory = MlpFactory {
            input_len: 3,
            hidden_len: 8,
            action_count: 2,
        };
        let net = factory.build().unwrap();
        net.save(&path).unwrap();

        let mut other = factory.build().unwrap();
        let input = [0.5, -1.0, 2.0];
        assert_ne!(net.q_values(&input).unwrap(), other.q_values(&input).unwrap());
        other.load(&path).unwrap();
        assert_eq!(net.q_values(&input).unwrap(), other.q_values(&input).unwrap());
    }
}
