//! PPO configuration and hyperparameters
//!
//! This module defines the configuration parameters for PPO training
//! and provides validation and builder pattern methods.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::schedule::Schedule;

/// PPO configuration parameters
///
/// Covers rollout shape (`n_envs` x `n_steps`), the advantage estimator and
/// the optimization phase. Missing fields take their defaults when loaded
/// from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PPOConfig {
    /// Number of parallel environment instances
    pub n_envs: usize,

    /// Rollout horizon per environment
    pub n_steps: usize,

    /// Discount factor (gamma)
    pub gamma: f64,

    /// GAE lambda parameter
    pub gae_lambda: f64,

    /// Learning rate schedule
    pub learning_rate: Schedule,

    /// PPO clipping parameter (epsilon) schedule; also clips value updates
    pub clip_range: Schedule,

    /// Entropy bonus coefficient
    pub ent_coef: f64,

    /// Value function loss coefficient
    pub vf_coef: f64,

    /// Maximum global gradient norm; `None` disables clipping
    pub max_grad_norm: Option<f64>,

    /// Minibatches per epoch
    pub n_minibatches: usize,

    /// Training epochs per rollout
    pub n_epochs: usize,

    /// Seed for minibatch shuffling and network initialization
    pub seed: Option<u64>,
}

impl Default for PPOConfig {
    fn default() -> Self {
        Self {
            n_envs: 8,
            n_steps: 128,
            gamma: 0.99,
            gae_lambda: 0.95,
            learning_rate: Schedule::Constant(3e-4),
            clip_range: Schedule::Constant(0.2),
            ent_coef: 0.01,
            vf_coef: 0.5,
            max_grad_norm: Some(0.5),
            n_minibatches: 4,
            n_epochs: 4,
            seed: None,
        }
    }
}

impl PPOConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples per rollout
    pub fn batch_size(&self) -> usize {
        self.n_envs * self.n_steps
    }

    /// Samples per minibatch
    pub fn minibatch_size(&self) -> usize {
        self.batch_size() / self.n_minibatches.max(1)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.n_envs == 0 {
            bail!("n_envs must be positive");
        }
        if self.n_steps == 0 {
            bail!("n_steps must be positive");
        }
        if self.n_minibatches == 0 {
            bail!("n_minibatches must be positive");
        }
        if self.batch_size() % self.n_minibatches != 0 {
            bail!(
                "n_envs * n_steps ({}) must be divisible by n_minibatches ({})",
                self.batch_size(),
                self.n_minibatches
            );
        }
        if self.n_epochs == 0 {
            bail!("n_epochs must be positive");
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            bail!("gamma must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.gae_lambda) {
            bail!("gae_lambda must be in [0, 1]");
        }
        if self.learning_rate.initial() <= 0.0 {
            bail!("learning_rate must be positive");
        }
        if self.clip_range.initial() <= 0.0 {
            bail!("clip_range must be positive");
        }
        if self.vf_coef < 0.0 {
            bail!("vf_coef must be non-negative");
        }
        if self.ent_coef < 0.0 {
            bail!("ent_coef must be non-negative");
        }
        if matches!(self.max_grad_norm, Some(norm) if norm <= 0.0) {
            bail!("max_grad_norm must be positive when set");
        }
        Ok(())
    }

    /// Set number of parallel environments
    pub fn n_envs(mut self, n: usize) -> Self {
        self.n_envs = n;
        self
    }

    /// Set rollout horizon
    pub fn n_steps(mut self, n: usize) -> Self {
        self.n_steps = n;
        self
    }

    /// Set discount factor
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set GAE lambda
    pub fn gae_lambda(mut self, lambda: f64) -> Self {
        self.gae_lambda = lambda;
        self
    }

    /// Set learning rate schedule
    pub fn learning_rate(mut self, lr: impl Into<Schedule>) -> Self {
        self.learning_rate = lr.into();
        self
    }

    /// Set PPO clipping schedule
    pub fn clip_range(mut self, clip: impl Into<Schedule>) -> Self {
        self.clip_range = clip.into();
        self
    }

    /// Set entropy bonus coefficient
    pub fn ent_coef(mut self, coef: f64) -> Self {
        self.ent_coef = coef;
        self
    }

    /// Set value function loss coefficient
    pub fn vf_coef(mut self, coef: f64) -> Self {
        self.vf_coef = coef;
        self
    }

    /// Set maximum gradient norm
    pub fn max_grad_norm(mut self, norm: Option<f64>) -> Self {
        self.max_grad_norm = norm;
        self
    }

    /// Set minibatches per epoch
    pub fn n_minibatches(mut self, n: usize) -> Self {
        self.n_minibatches = n;
        self
    }

    /// Set number of training epochs
    pub fn n_epochs(mut self, epochs: usize) -> Self {
        self.n_epochs = epochs;
        self
    }

    /// Set random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PPOConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size(), 1024);
        assert_eq!(config.minibatch_size(), 256);
    }

    #[test]
    fn test_config_validation() {
        assert!(PPOConfig::new().learning_rate(-1.0).validate().is_err());
        assert!(PPOConfig::new().gamma(1.5).validate().is_err());
        assert!(PPOConfig::new().n_epochs(0).validate().is_err());
        assert!(PPOConfig::new().clip_range(-0.1).validate().is_err());
        assert!(PPOConfig::new().vf_coef(-0.1).validate().is_err());
        assert!(PPOConfig::new().max_grad_norm(Some(0.0)).validate().is_err());

        // Valid edge values
        assert!(PPOConfig::new().vf_coef(0.0).validate().is_ok());
        assert!(PPOConfig::new().max_grad_norm(None).validate().is_ok());
    }

    #[test]
    fn test_uneven_minibatches_rejected() {
        let config = PPOConfig::new().n_envs(3).n_steps(5).n_minibatches(4);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("divisible"));
    }

    #[test]
    fn test_config_builder() {
        let config = PPOConfig::new()
            .n_envs(2)
            .n_steps(64)
            .learning_rate(Schedule::Linear { start: 1e-3, end: 0.0 })
            .n_epochs(5)
            .seed(9);

        assert_eq!(config.batch_size(), 128);
        assert_eq!(config.learning_rate.initial(), 1e-3);
        assert_eq!(config.seed, Some(9));

        // Other values should remain default
        assert_eq!(config.gae_lambda, 0.95);
        assert_eq!(config.vf_coef, 0.5);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PPOConfig = serde_json::from_str(r#"{"n_envs": 16, "max_grad_norm": null}"#).unwrap();
        assert_eq!(config.n_envs, 16);
        assert_eq!(config.max_grad_norm, None);
        assert_eq!(config.n_steps, 128);
    }
}
