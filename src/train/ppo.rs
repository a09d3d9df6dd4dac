//! Proximal Policy Optimization (PPO) algorithm
//!
//! PPO is a policy gradient method that uses a clipped surrogate objective
//! to ensure stable, reliable policy updates.
//!
//! # Algorithm Overview
//!
//! ```text
//! For each update:
//!   1. Collect trajectories using current policy
//!   2. Compute advantages using GAE
//!   3. For n_epochs epochs:
//!      a. Shuffle and split the batch into n_minibatches slices
//!      b. Normalize each slice's advantages
//!      c. Take one gradient step on the clipped objective
//! ```
//!
//! # References
//!
//! - [Proximal Policy Optimization Algorithms](https://arxiv.org/abs/1707.06347)

pub mod config;
#[cfg(feature = "training")]
pub mod loss;
pub mod schedule;
pub mod stats;
pub mod trainer;

pub use config::PPOConfig;
#[cfg(feature = "training")]
pub use loss::{compute_policy_loss, compute_ppo_loss, compute_value_loss, LossCoefficients};
pub use schedule::{frac_remaining, Schedule};
pub use stats::TrainingStats;
pub use trainer::{PPOTrainer, PpoModel};
