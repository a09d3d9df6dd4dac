//! Vectorized environment pool for parallel execution
//!
//! Runs N [`DuelEnvironment`] instances on Rayon's thread pool and exposes
//! them as one [`VecEnv`]. Instances that finish an episode are reset in the
//! same step and report an [`EpisodeInfo`] with the primary agent's return
//! and the episode length.
//!
//! # Example
//!
//! ```rust
//! use duel_rl::env::{pool::EnvPool, snake::DuelSnake, VecEnv};
//!
//! let mut pool = EnvPool::new(|| DuelSnake::new(8, 8, 2), 4);
//! let observations = pool.reset().unwrap();
//! assert_eq!(observations.len(), 4);
//!
//! let step = pool.step(&[[1, 1]; 4]).unwrap();
//! assert_eq!(step.rewards.len(), 4);
//! ```

use anyhow::Result;
use rayon::prelude::*;

use crate::env::{
    DuelEnvironment, DuelObservation, EpisodeInfo, JointAction, SpaceInfo, StepInfo, VecEnv,
    VecStep,
};

/// Running return and length of the current episode in one slot
#[derive(Debug, Clone, Copy, Default)]
struct EpisodeTracker {
    reward: f32,
    length: usize,
}

impl EpisodeTracker {
    fn record(&mut self, reward: f32) {
        self.reward += reward;
        self.length += 1;
    }

    fn finish(&mut self) -> EpisodeInfo {
        let info = EpisodeInfo {
            reward: self.reward,
            length: self.length,
        };
        *self = Self::default();
        info
    }
}

/// A pool of environments for parallel execution
pub struct EnvPool<E: DuelEnvironment> {
    /// Environment instances paired with their episode bookkeeping
    slots: Vec<(E, EpisodeTracker)>,
}

impl<E: DuelEnvironment + Send> EnvPool<E> {
    /// Create a new environment pool
    ///
    /// # Arguments
    ///
    /// * `env_fn` - Factory function to create environment instances
    /// * `num_envs` - Number of parallel environments
    pub fn new<F>(env_fn: F, num_envs: usize) -> Self
    where
        F: Fn() -> E,
    {
        assert!(num_envs > 0, "EnvPool needs at least one environment");
        let slots = (0..num_envs)
            .map(|_| (env_fn(), EpisodeTracker::default()))
            .collect();
        Self { slots }
    }

    /// Get observation space information from first environment
    pub fn observation_space(&self) -> SpaceInfo {
        self.slots[0].0.observation_space()
    }

    /// Get action space information from first environment
    pub fn action_space(&self) -> SpaceInfo {
        self.slots[0].0.action_space()
    }

    /// Borrow one instance, e.g. for rendering
    pub fn env(&self, index: usize) -> &E {
        &self.slots[index].0
    }
}

impl<E: DuelEnvironment + Send> VecEnv for EnvPool<E> {
    fn num_envs(&self) -> usize {
        self.slots.len()
    }

    fn reset(&mut self) -> Result<Vec<DuelObservation>> {
        self.slots
            .par_iter_mut()
            .map(|(env, tracker)| {
                *tracker = EpisodeTracker::default();
                env.reset()
            })
            .collect()
    }

    fn step(&mut self, actions: &[JointAction]) -> Result<VecStep> {
        assert_eq!(
            actions.len(),
            self.slots.len(),
            "Number of actions must match number of environments"
        );

        let results: Vec<(DuelObservation, f32, bool, StepInfo)> = self
            .slots
            .par_iter_mut()
            .zip(actions.par_iter())
            .map(|((env, tracker), &action)| {
                let mut result = env.step(action)?;
                tracker.record(result.reward);

                if result.done {
                    result.info.episode = Some(tracker.finish());
                    result.observation = env.reset()?;
                }

                Ok((result.observation, result.reward, result.done, result.info))
            })
            .collect::<Result<_>>()?;

        let mut step = VecStep::default();
        for (observation, reward, done, info) in results {
            step.observations.push(observation);
            step.rewards.push(reward);
            step.dones.push(done);
            step.infos.push(info);
        }
        Ok(step)
    }
}
