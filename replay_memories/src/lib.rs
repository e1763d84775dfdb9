mod error;
mod keys;
mod row;
mod sampling;
mod transition_store;

pub use error::{Result, StoreError};
pub use sampling::BalancedDraw;
pub use transition_store::{BatchSampler, StoreSettings, TransitionStore};
