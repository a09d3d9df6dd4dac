//! Self-play run configuration

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

use crate::env::{snake::PLACEHOLDER_ACTION, Action};
use crate::train::ppo::PPOConfig;

/// Settings of the outer self-play loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfPlayConfig {
    /// Environment steps to train for; updates = total / (n_envs * n_steps)
    pub total_timesteps: usize,

    /// 1 trains alone against a placeholder seat, 2 trains against snapshots
    pub num_agents: usize,

    /// Maximum number of opponent snapshots kept
    pub opponent_pool_capacity: usize,

    /// Updates between opponent snapshots
    pub opponent_save_interval: usize,

    /// Updates between metric rows (update 1 is always logged)
    pub log_interval: usize,

    /// Updates between numbered checkpoints; 0 disables them
    pub save_interval: usize,

    /// Directory for snapshots and progress files
    pub run_dir: PathBuf,

    /// Rolling reward that triggers the first highscore snapshot
    pub initial_highscore: f64,

    /// Threshold increase after each highscore
    pub highscore_increment: f64,

    /// Number of recent episodes averaged for reporting
    pub episode_window: usize,

    /// Snapshot loaded into both policies before training
    pub baseline: Option<PathBuf>,

    /// Second-seat action when there is no opponent
    pub placeholder_action: Action,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            total_timesteps: 1_000_000,
            num_agents: 2,
            opponent_pool_capacity: 10,
            opponent_save_interval: 10,
            log_interval: 1,
            save_interval: 0,
            run_dir: PathBuf::from("runs/duel"),
            initial_highscore: 5.0,
            highscore_increment: 1.0,
            episode_window: 100,
            baseline: None,
            placeholder_action: PLACEHOLDER_ACTION,
        }
    }
}

impl SelfPlayConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a second policy plays the other seat
    pub fn has_opponent(&self) -> bool {
        self.num_agents == 2
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.num_agents != 1 && self.num_agents != 2 {
            bail!("num_agents must be 1 or 2, got {}", self.num_agents);
        }
        if self.opponent_pool_capacity == 0 {
            bail!("opponent_pool_capacity must be positive");
        }
        if self.opponent_save_interval == 0 {
            bail!("opponent_save_interval must be positive");
        }
        if self.log_interval == 0 {
            bail!("log_interval must be positive");
        }
        if self.episode_window == 0 {
            bail!("episode_window must be positive");
        }
        if self.highscore_increment <= 0.0 {
            bail!("highscore_increment must be positive");
        }
        Ok(())
    }

    /// Set total environment steps
    pub fn total_timesteps(mut self, steps: usize) -> Self {
        self.total_timesteps = steps;
        self
    }

    /// Set number of agents (1 or 2)
    pub fn num_agents(mut self, n: usize) -> Self {
        self.num_agents = n;
        self
    }

    /// Set opponent pool capacity
    pub fn opponent_pool_capacity(mut self, capacity: usize) -> Self {
        self.opponent_pool_capacity = capacity;
        self
    }

    /// Set updates between opponent snapshots
    pub fn opponent_save_interval(mut self, interval: usize) -> Self {
        self.opponent_save_interval = interval;
        self
    }

    /// Set updates between metric rows
    pub fn log_interval(mut self, interval: usize) -> Self {
        self.log_interval = interval;
        self
    }

    /// Set updates between numbered checkpoints
    pub fn save_interval(mut self, interval: usize) -> Self {
        self.save_interval = interval;
        self
    }

    /// Set run directory
    pub fn run_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.run_dir = dir.into();
        self
    }

    /// Set the highscore threshold and its increment
    pub fn highscore(mut self, initial: f64, increment: f64) -> Self {
        self.initial_highscore = initial;
        self.highscore_increment = increment;
        self
    }

    /// Set warm-start snapshot
    pub fn baseline(mut self, path: impl Into<PathBuf>) -> Self {
        self.baseline = Some(path.into());
        self
    }
}

/// Complete training configuration as stored in a JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Rollout and optimization settings
    pub ppo: PPOConfig,

    /// Outer loop settings
    pub selfplay: SelfPlayConfig,
}

impl TrainConfig {
    /// Read a configuration file; absent fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    /// Validate both sections
    pub fn validate(&self) -> Result<()> {
        self.ppo.validate().context("invalid ppo config")?;
        self.selfplay.validate().context("invalid selfplay config")
    }
}
