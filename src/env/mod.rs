//! Environment traits and implementations
//!
//! The training core only talks to a [`VecEnv`]: a batch of N two-seat game
//! instances stepped together with one joint action per instance. Individual
//! games implement [`DuelEnvironment`] and are vectorized by
//! [`pool::EnvPool`].

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod pool;
pub mod snake;

/// Discrete action index for one seat
pub type Action = i64;

/// Per-instance joint action, ordered primary first, opponent second
pub type JointAction = [Action; 2];

/// Observation of one game instance from both seats
#[derive(Debug, Clone, PartialEq)]
pub struct DuelObservation {
    /// What the primary (trained) agent sees
    pub primary: Vec<f32>,

    /// What the opponent sees
    pub opponent: Vec<f32>,
}

/// Summary of an episode that just finished
///
/// Serialized with the short `r`/`l` keys used in progress files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    /// Undiscounted return of the primary agent
    #[serde(rename = "r")]
    pub reward: f32,

    /// Episode length in steps
    #[serde(rename = "l")]
    pub length: usize,
}

/// Additional step information
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepInfo {
    /// Set on the step that ended an episode
    pub episode: Option<EpisodeInfo>,
}

/// Result of stepping a single game instance
#[derive(Debug, Clone)]
pub struct StepResult {
    /// Next observation
    pub observation: DuelObservation,

    /// Reward received by the primary agent
    pub reward: f32,

    /// Whether the episode ended (death or step limit)
    pub done: bool,

    /// Additional info
    pub info: StepInfo,
}

/// Result of stepping every instance of a [`VecEnv`]
#[derive(Debug, Clone, Default)]
pub struct VecStep {
    /// Next observation per instance (already reset where `dones` is set)
    pub observations: Vec<DuelObservation>,

    /// Primary-agent reward per instance
    pub rewards: Vec<f32>,

    /// Episode-ended flag per instance
    pub dones: Vec<bool>,

    /// Info per instance
    pub infos: Vec<StepInfo>,
}

/// A single two-seat game
pub trait DuelEnvironment {
    /// Reset the game and return the initial observation
    fn reset(&mut self) -> Result<DuelObservation>;

    /// Advance one tick with both seats' actions
    fn step(&mut self, action: JointAction) -> Result<StepResult>;

    /// Get the observation space dimensions (per seat)
    fn observation_space(&self) -> SpaceInfo;

    /// Get the action space dimensions (per seat)
    fn action_space(&self) -> SpaceInfo;
}

/// A batch of game instances stepped in lockstep
///
/// Instances that finish an episode are reset by the implementation, so the
/// observations returned from [`VecEnv::step`] are always ready to act on.
pub trait VecEnv {
    /// Number of parallel instances
    fn num_envs(&self) -> usize;

    /// Reset every instance
    fn reset(&mut self) -> Result<Vec<DuelObservation>>;

    /// Step every instance with `actions[n]`
    fn step(&mut self, actions: &[JointAction]) -> Result<VecStep>;

    /// Release the environment resources
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Space information for observations and actions
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceInfo {
    /// Shape of the space
    pub shape: Vec<usize>,

    /// Data type
    pub dtype: SpaceType,
}

impl SpaceInfo {
    /// Number of scalars in one sample of the space
    pub fn flat_dim(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Space data types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpaceType {
    /// Discrete space with n options
    Discrete(usize),

    /// Continuous space (Box)
    Continuous,
}
