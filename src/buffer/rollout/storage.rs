//! Trajectory storage for one rollout
//!
//! Data is kept time-major, `[num_steps][num_envs]`, while it is being
//! collected, and flattened env-major when handed to the trainer.

use super::gae::compute_gae;

/// Rollout buffer for PPO training
///
/// Holds the primary agent's view of one fixed-horizon rollout.
///
/// # Example
///
/// ```rust
/// use duel_rl::buffer::rollout::RolloutBuffer;
///
/// // 128 steps across 4 environments with 4D observations
/// let mut buffer = RolloutBuffer::new(128, 4, 4);
///
/// buffer.add(
///     0,                        // step
///     0,                        // env_id
///     vec![0.1, 0.2, 0.3, 0.4], // observation
///     2,                        // action
///     1.0,                      // reward
///     0.5,                      // value estimate
///     -0.1,                     // log probability
///     false,                    // done flag before the step
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RolloutBuffer {
    num_steps: usize,
    num_envs: usize,
    obs_dim: usize,

    /// Observations: [num_steps, num_envs, obs_dim]
    observations: Vec<Vec<Vec<f32>>>,
    /// Actions: [num_steps, num_envs]
    actions: Vec<Vec<i64>>,
    /// Rewards: [num_steps, num_envs]
    rewards: Vec<Vec<f32>>,
    /// Value estimates: [num_steps, num_envs]
    values: Vec<Vec<f32>>,
    /// Log probabilities: [num_steps, num_envs]
    log_probs: Vec<Vec<f32>>,
    /// Done flags observed before each step: [num_steps, num_envs]
    dones: Vec<Vec<bool>>,

    /// Set by `compute_advantages`
    advantages: Option<(Vec<Vec<f32>>, Vec<Vec<f32>>)>,
}

impl RolloutBuffer {
    /// Create a new rollout buffer
    ///
    /// # Arguments
    ///
    /// * `num_steps` - Number of timesteps per rollout
    /// * `num_envs` - Number of parallel environments
    /// * `obs_dim` - Dimensionality of observations
    pub fn new(num_steps: usize, num_envs: usize, obs_dim: usize) -> Self {
        Self {
            num_steps,
            num_envs,
            obs_dim,
            observations: vec![vec![vec![0.0; obs_dim]; num_envs]; num_steps],
            actions: vec![vec![0; num_envs]; num_steps],
            rewards: vec![vec![0.0; num_envs]; num_steps],
            values: vec![vec![0.0; num_envs]; num_steps],
            log_probs: vec![vec![0.0; num_envs]; num_steps],
            dones: vec![vec![false; num_envs]; num_steps],
            advantages: None,
        }
    }

    /// Add a transition to the buffer
    ///
    /// `done` is the flag that was fed to the policy together with `obs`,
    /// i.e. whether `obs` is the first observation of a new episode.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        step: usize,
        env_id: usize,
        obs: Vec<f32>,
        action: i64,
        reward: f32,
        value: f32,
        log_prob: f32,
        done: bool,
    ) {
        assert!(step < self.num_steps, "Step index out of bounds");
        assert!(env_id < self.num_envs, "Environment index out of bounds");
        assert_eq!(obs.len(), self.obs_dim, "Observation dimension mismatch");

        self.observations[step][env_id] = obs;
        self.actions[step][env_id] = action;
        self.rewards[step][env_id] = reward;
        self.values[step][env_id] = value;
        self.log_probs[step][env_id] = log_prob;
        self.dones[step][env_id] = done;

        self.advantages = None;
    }

    /// Compute advantages and returns with GAE
    ///
    /// # Arguments
    ///
    /// * `last_values` - Value of the observation after the final step
    /// * `last_dones` - Done flags after the final step
    /// * `gamma` - Discount factor
    /// * `gae_lambda` - GAE lambda parameter
    pub fn compute_advantages(
        &mut self,
        last_values: &[f32],
        last_dones: &[bool],
        gamma: f32,
        gae_lambda: f32,
    ) {
        assert_eq!(
            last_values.len(),
            self.num_envs,
            "Last values must match number of environments"
        );
        self.advantages = Some(compute_gae(
            &self.rewards,
            &self.values,
            &self.dones,
            last_values,
            last_dones,
            gamma,
            gae_lambda,
        ));
    }

    /// Flatten the rollout into a training batch
    ///
    /// Time and environment axes are swapped before flattening, so sample
    /// `n * num_steps + t` is step `t` of environment `n`.
    ///
    /// # Panics
    ///
    /// Panics if advantages haven't been computed yet.
    pub fn get_batch(&self) -> RolloutBatch {
        let Some((advantages, returns)) = self.advantages.as_ref() else {
            panic!("Must compute advantages before getting batch");
        };

        let total = self.num_steps * self.num_envs;
        let mut batch = RolloutBatch {
            obs_dim: self.obs_dim,
            observations: Vec::with_capacity(total * self.obs_dim),
            actions: Vec::with_capacity(total),
            values: Vec::with_capacity(total),
            log_probs: Vec::with_capacity(total),
            dones: Vec::with_capacity(total),
            advantages: Vec::with_capacity(total),
            returns: Vec::with_capacity(total),
        };

        for env_id in 0..self.num_envs {
            for step in 0..self.num_steps {
                batch
                    .observations
                    .extend_from_slice(&self.observations[step][env_id]);
                batch.actions.push(self.actions[step][env_id]);
                batch.values.push(self.values[step][env_id]);
                batch.log_probs.push(self.log_probs[step][env_id]);
                batch.dones.push(self.dones[step][env_id]);
                batch.advantages.push(advantages[step][env_id]);
                batch.returns.push(returns[step][env_id]);
            }
        }

        batch
    }

    /// Get buffer dimensions `(num_steps, num_envs, obs_dim)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.num_steps, self.num_envs, self.obs_dim)
    }
}

/// A flattened rollout ready for training
///
/// Every per-sample vector has length `num_steps * num_envs`.
#[derive(Debug, Clone, Default)]
pub struct RolloutBatch {
    /// Width of one observation row
    pub obs_dim: usize,

    /// Observations, row-major \[batch_size * obs_dim\]
    pub observations: Vec<f32>,

    /// Actions: \[batch_size\]
    pub actions: Vec<i64>,

    /// Value estimates at collection time: \[batch_size\]
    pub values: Vec<f32>,

    /// Log probabilities at collection time: \[batch_size\]
    pub log_probs: Vec<f32>,

    /// Pre-step done flags: \[batch_size\]
    pub dones: Vec<bool>,

    /// GAE advantages: \[batch_size\]
    pub advantages: Vec<f32>,

    /// Bootstrapped returns: \[batch_size\]
    pub returns: Vec<f32>,
}

impl RolloutBatch {
    /// Get batch size
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Observation row of sample `index`
    pub fn observation(&self, index: usize) -> &[f32] {
        &self.observations[index * self.obs_dim..(index + 1) * self.obs_dim]
    }
}
