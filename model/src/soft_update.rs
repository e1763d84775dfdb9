use crate::{ModelError, Result};
use candle_nn::VarMap;

/// Blends every parameter of `target` towards the parameter of the same
/// name in `policy`: `target = tau * policy + (1 - tau) * target`.
///
/// `tau = 1` copies `policy` exactly and `tau = 0` leaves `target` as is.
pub fn soft_update(policy: &VarMap, target: &VarMap, tau: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&tau) {
        return Err(ModelError::InvalidArgument(format!(
            "tau must lie in [0, 1], got {tau}"
        )));
    }
    if tau == 0.0 || std::ptr::eq(policy.data(), target.data()) {
        return Ok(());
    }
    let policy_vars = policy.data().lock().map_err(|_| ModelError::LockPoisoned)?;
    let target_vars = target.data().lock().map_err(|_| ModelError::LockPoisoned)?;
    for (name, target_var) in target_vars.iter() {
        let policy_var = policy_vars
            .get(name)
            .ok_or_else(|| ModelError::MissingParameter(name.clone()))?;
        let blended = if tau == 1.0 {
            policy_var.as_tensor().detach()
        } else {
            policy_var
                .affine(tau, 0.0)?
                .add(&target_var.affine(1.0 - tau, 0.0)?)?
        };
        target_var.set(&blended)?;
    }
    Ok(())
}
