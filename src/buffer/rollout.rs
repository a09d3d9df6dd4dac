//! Rollout buffer for storing and processing trajectories
//!
//! This module implements experience storage for PPO training, including:
//! - Trajectory storage (observations, actions, rewards, etc.)
//! - GAE (Generalized Advantage Estimation) computation
//! - Minibatch partitioning for epoch training
//!
//! # Buffer Layout
//!
//! Collection writes into a `[num_steps, num_envs]` layout. The training
//! batch is flattened env-major: sample `n * num_steps + t` is step `t` of
//! environment `n`.

pub mod gae;
pub mod sampling;
pub mod storage;

pub use gae::compute_gae;
pub use sampling::{minibatch_partition, Minibatch};
pub use storage::{RolloutBatch, RolloutBuffer};
