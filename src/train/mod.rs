//! Training algorithms
//!
//! [`ppo`] holds the optimization phase; [`selfplay`] is the outer loop that
//! alternates rollouts against sampled opponents with PPO updates.

pub mod ppo;
pub mod selfplay;

pub use ppo::{PPOConfig, PPOTrainer, PpoModel, Schedule, TrainingStats};
pub use selfplay::{RunSummary, SelfPlayConfig, SelfPlayTrainer};
