//! Policy and parameter-store capabilities
//!
//! The self-play core drives two policies of identical architecture through
//! the [`Policy`] trait and moves their weights around through
//! [`ParameterStore`]. The concrete tch-rs network lives in [`mlp`] behind
//! the `training` feature.

use anyhow::Result;
use std::path::Path;

#[cfg(feature = "training")]
pub mod mlp;

/// Memory carried between steps by a policy
#[derive(Debug, Clone, PartialEq)]
pub enum RecurrentState {
    /// The policy has no memory
    Stateless,

    /// Flattened hidden state, `num_envs * hidden_size` values
    Hidden(Vec<f32>),
}

/// Output of one batched policy query
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStep {
    /// Sampled action per environment instance
    pub actions: Vec<i64>,

    /// Value estimate per instance
    pub values: Vec<f32>,

    /// Log-probability of each sampled action
    pub log_probs: Vec<f32>,

    /// State to feed into the next query
    pub state: RecurrentState,
}

/// A parameterized function from observations to actions and values
///
/// `observations[n]` is the flattened observation of instance n and
/// `dones[n]` tells a recurrent policy to clear its memory for that slot.
pub trait Policy {
    /// State to use before the first step of a rollout
    fn initial_state(&self) -> RecurrentState {
        RecurrentState::Stateless
    }

    /// Sample actions for a batch of observations
    fn step(
        &mut self,
        observations: &[Vec<f32>],
        state: &RecurrentState,
        dones: &[bool],
    ) -> Result<PolicyStep>;

    /// Value estimates only, used for the bootstrap value after a rollout
    fn value(
        &mut self,
        observations: &[Vec<f32>],
        state: &RecurrentState,
        dones: &[bool],
    ) -> Result<Vec<f32>>;
}

/// Whole-model save and load of parameters
///
/// Implementations write the full parameter set at once; a failed load must
/// leave an error rather than a partially updated model in use.
pub trait ParameterStore {
    /// Persist every parameter to `path`
    fn save(&self, path: &Path) -> Result<()>;

    /// Replace every parameter with the contents of `path`
    fn load(&mut self, path: &Path) -> Result<()>;
}
