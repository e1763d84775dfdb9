use crate::{ModelError, Result};
use candle_core::{Device, Tensor};
use replay_data::{Action, State, Transition};

/// A batch of transitions laid out as model-ready tensors.
pub struct EncodedBatch {
    pub states: Tensor,
    pub next_states: Tensor,
    /// `(batch, 1)` action indices in sorted action order.
    pub actions: Tensor,
    pub rewards: Tensor,
    /// 1 for transitions that bootstrap from the next state, 0 for terminal ones.
    pub not_terminal: Tensor,
    len: usize,
}

impl EncodedBatch {
    pub fn from_transitions<S: State, A: Action>(
        batch: &[Transition<S, A>],
        device: &Device,
    ) -> Result<Self> {
        if batch.is_empty() {
            return Err(ModelError::InvalidArgument("empty batch".to_string()));
        }
        let len = batch.len();
        let mut states = Vec::with_capacity(len * S::INPUT_LEN);
        let mut next_states = Vec::with_capacity(len * S::INPUT_LEN);
        let mut actions = Vec::with_capacity(len);
        let mut rewards = Vec::with_capacity(len);
        let mut not_terminal = Vec::with_capacity(len);
        let ordered = A::ordered();
        for transition in batch {
            states.extend(checked_input(&transition.state)?);
            next_states.extend(checked_input(&transition.next_state)?);
            let action = transition.action.index_in(&ordered).ok_or_else(|| {
                ModelError::InvalidArgument(format!(
                    "{:?} is not in the action set",
                    transition.action
                ))
            })?;
            actions.push(action as u32);
            rewards.push(transition.reward as f32);
            not_terminal.push(if transition.terminal { 0.0f32 } else { 1.0 });
        }
        Ok(Self {
            states: Tensor::from_vec(states, (len, S::INPUT_LEN), device)?,
            next_states: Tensor::from_vec(next_states, (len, S::INPUT_LEN), device)?,
            actions: Tensor::from_vec(actions, (len, 1), device)?,
            rewards: Tensor::from_vec(rewards, len, device)?,
            not_terminal: Tensor::from_vec(not_terminal, len, device)?,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

pub fn encode_states<S: State>(states: &[S], device: &Device) -> Result<Tensor> {
    let mut inputs = Vec::with_capacity(states.len() * S::INPUT_LEN);
    for state in states {
        inputs.extend(checked_input(state)?);
    }
    Ok(Tensor::from_vec(inputs, (states.len(), S::INPUT_LEN), device)?)
}

fn checked_input<S: State>(state: &S) -> Result<Vec<f32>> {
    let input = state.to_input();
    if input.len() != S::INPUT_LEN {
        return Err(ModelError::InvalidArgument(format!(
            "state encodes to {} values, expected {}",
            input.len(),
            S::INPUT_LEN
        )));
    }
    Ok(input)
}
