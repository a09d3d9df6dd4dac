//! Self-play infrastructure
//!
//! # Architecture
//!
//! - **MultiAgentRunner**: steps the vectorized game with the primary policy
//!   in seat one and an opponent (or a placeholder action) in seat two, and
//!   records the primary agent's trajectory
//! - **OpponentPool**: ring buffer of past primary snapshots the opponent is
//!   sampled from before every rollout

pub mod opponent_pool;
pub mod runner;

pub use opponent_pool::{OpponentPool, OpponentSlot};
pub use runner::{MultiAgentRunner, Rollout};
