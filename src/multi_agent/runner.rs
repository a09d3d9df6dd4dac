//! Rollout collection for two-seat self-play
//!
//! The runner steps a [`VecEnv`] for a fixed horizon, asking the primary
//! policy and (when present) the opponent policy for actions every step.
//! Only the primary agent's experience is stored for training.

use anyhow::Result;

use crate::buffer::rollout::{RolloutBatch, RolloutBuffer};
use crate::env::{Action, DuelObservation, EpisodeInfo, JointAction, VecEnv};
use crate::policy::{Policy, RecurrentState};

/// Output of one [`MultiAgentRunner::run`]
#[derive(Debug, Clone)]
pub struct Rollout {
    /// Flattened primary-agent trajectory with advantages and returns
    pub batch: RolloutBatch,

    /// Episodes that finished during the rollout
    pub episodes: Vec<EpisodeInfo>,

    /// Primary policy state after the last step
    pub final_state: RecurrentState,
}

/// Drives a vectorized environment with a primary and an optional opponent
pub struct MultiAgentRunner<E: VecEnv> {
    env: E,
    num_steps: usize,
    gamma: f32,
    gae_lambda: f32,
    /// Action sent for the second seat when no opponent policy is given
    placeholder_action: Action,

    /// Latest observation per instance
    observations: Vec<DuelObservation>,
    /// Whether each latest observation starts a new episode
    dones: Vec<bool>,
    primary_state: RecurrentState,
    opponent_state: RecurrentState,
}

impl<E: VecEnv> MultiAgentRunner<E> {
    /// Reset `env` and prepare to collect `num_steps` per rollout
    ///
    /// # Arguments
    ///
    /// * `env` - Vectorized environment, owned by the runner
    /// * `primary` - Policy being trained, used for its initial state
    /// * `num_steps` - Horizon H of every rollout
    /// * `gamma` - Discount factor
    /// * `gae_lambda` - GAE lambda parameter
    /// * `placeholder_action` - Second-seat action in single-agent mode
    pub fn new<P: Policy + ?Sized>(
        mut env: E,
        primary: &P,
        num_steps: usize,
        gamma: f32,
        gae_lambda: f32,
        placeholder_action: Action,
    ) -> Result<Self> {
        let observations = env.reset()?;
        let dones = vec![false; env.num_envs()];

        Ok(Self {
            env,
            num_steps,
            gamma,
            gae_lambda,
            placeholder_action,
            observations,
            dones,
            primary_state: primary.initial_state(),
            opponent_state: RecurrentState::Stateless,
        })
    }

    /// Start the opponent from a fresh state, e.g. after loading new parameters
    pub fn reset_opponent_state<O: Policy + ?Sized>(&mut self, opponent: &O) {
        self.opponent_state = opponent.initial_state();
    }

    /// Number of parallel environment instances
    pub fn num_envs(&self) -> usize {
        self.env.num_envs()
    }

    /// Samples produced per rollout (`num_steps * num_envs`)
    pub fn batch_size(&self) -> usize {
        self.num_steps * self.num_envs()
    }

    /// Borrow the environment
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Release the environment
    pub fn close(&mut self) -> Result<()> {
        self.env.close()
    }

    /// Collect one rollout and compute its advantages
    ///
    /// With `opponent` set to `None`, the second seat receives the
    /// placeholder action every step.
    pub fn run<P, O>(&mut self, primary: &mut P, mut opponent: Option<&mut O>) -> Result<Rollout>
    where
        P: Policy + ?Sized,
        O: Policy + ?Sized,
    {
        let num_envs = self.num_envs();
        let obs_dim = self.observations.first().map_or(0, |o| o.primary.len());
        let mut buffer = RolloutBuffer::new(self.num_steps, num_envs, obs_dim);
        let mut episodes = Vec::new();

        for step in 0..self.num_steps {
            let primary_obs = self.primary_observations();
            let out = primary.step(&primary_obs, &self.primary_state, &self.dones)?;

            let opponent_actions = match opponent.as_deref_mut() {
                Some(policy) => {
                    let opponent_obs: Vec<Vec<f32>> =
                        self.observations.iter().map(|o| o.opponent.clone()).collect();
                    let opp = policy.step(&opponent_obs, &self.opponent_state, &self.dones)?;
                    self.opponent_state = opp.state;
                    opp.actions
                }
                None => vec![self.placeholder_action; num_envs],
            };

            let joint: Vec<JointAction> = out
                .actions
                .iter()
                .zip(&opponent_actions)
                .map(|(&a, &b)| [a, b])
                .collect();

            let result = self.env.step(&joint)?;

            for (n, obs) in primary_obs.into_iter().enumerate() {
                buffer.add(
                    step,
                    n,
                    obs,
                    out.actions[n],
                    result.rewards[n],
                    out.values[n],
                    out.log_probs[n],
                    self.dones[n],
                );
            }
            episodes.extend(result.infos.iter().filter_map(|info| info.episode));

            self.primary_state = out.state;
            self.observations = result.observations;
            self.dones = result.dones;
        }

        let last_values =
            primary.value(&self.primary_observations(), &self.primary_state, &self.dones)?;
        buffer.compute_advantages(&last_values, &self.dones, self.gamma, self.gae_lambda);

        Ok(Rollout {
            batch: buffer.get_batch(),
            episodes,
            final_state: self.primary_state.clone(),
        })
    }

    fn primary_observations(&self) -> Vec<Vec<f32>> {
        self.observations.iter().map(|o| o.primary.clone()).collect()
    }
}
