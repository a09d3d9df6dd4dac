//! # duel-rl
//!
//! Self-play reinforcement learning for two-seat grid games in Rust
//!
//! A primary policy is trained with PPO while the second seat is played by
//! snapshots of its own past parameters, sampled from a fixed-size pool.
//! Networks and the PPO loss use PyTorch through tch-rs and sit behind the
//! `training` feature; rollout collection, GAE, the opponent pool and the
//! training loop itself only depend on the [`policy::Policy`] and
//! [`train::PpoModel`] traits.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use duel_rl::prelude::*;
//! use duel_rl::policy::mlp::MlpPolicy;
//!
//! let ppo = PPOConfig::new().n_envs(8);
//! let selfplay = SelfPlayConfig::new().total_timesteps(100_000);
//! let env = EnvPool::new(|| DuelSnake::new(10, 10, 2), ppo.n_envs);
//! let dim = env.observation_space().flat_dim();
//! let primary = MlpPolicy::new(dim, 3, 64)?;
//! let opponent = MlpPolicy::new(dim, 3, 64)?;
//!
//! let mut trainer = SelfPlayTrainer::new(ppo, selfplay, env, primary, Some(opponent))?;
//! trainer.add_sink(Box::new(LogSink));
//! let summary = trainer.run()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Environment traits, the vectorized pool and the duel snake game
pub mod env;

/// Policy capabilities; the tch-rs network requires the training feature
pub mod policy;

/// Rollout storage, GAE and minibatch sampling
pub mod buffer;

/// PPO optimization and the self-play training loop
pub mod train;

/// Rollout runner and opponent pool
pub mod multi_agent;

/// Snapshot files written during a run
pub mod checkpoint;

/// Metric rows, sinks and episode statistics
pub mod metrics;

/// Utility functions and helpers
pub mod utils;

/// Prelude module for convenient imports
///
/// This module re-exports commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::env::pool::EnvPool;
    pub use crate::env::snake::DuelSnake;
    pub use crate::env::{DuelEnvironment, VecEnv};
    pub use crate::metrics::{JsonLinesSink, LogSink, MetricsSink};
    pub use crate::multi_agent::{MultiAgentRunner, OpponentPool};
    pub use crate::policy::{ParameterStore, Policy};
    pub use crate::train::{PPOConfig, PpoModel, SelfPlayConfig, SelfPlayTrainer};
}

/// Current version of duel-rl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
