//! Self-play training loop
//!
//! Each update:
//!
//! ```text
//! 1. (two agents) sample an opponent slot and load it into the opponent
//! 2. evaluate learning-rate and clip-range schedules
//! 3. collect one rollout and compute GAE
//! 4. run PPO epochs over the flattened batch
//! 5. (two agents) every opponent_save_interval updates, snapshot the primary
//! 6. every log_interval updates (and update 1), write a metrics row
//! 7. every save_interval updates (and update 1), write a numbered checkpoint
//! 8. (one agent) save a highscore snapshot when the rolling reward beats
//!    the current threshold
//! ```
//!
//! After the last update, or once a shutdown is requested between updates,
//! the final snapshot is written and the environment is closed. A failed
//! update closes the environment as well before its error is returned.

pub mod config;
pub mod highscore;

pub use config::{SelfPlayConfig, TrainConfig};
pub use highscore::HighscoreTracker;

use anyhow::{bail, Context, Result};
use rand::{rngs::StdRng, SeedableRng};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use crate::checkpoint::{SnapshotDir, SnapshotId};
use crate::env::VecEnv;
use crate::metrics::{EpisodeWindow, MetricsRow, MetricsSink};
use crate::multi_agent::{MultiAgentRunner, OpponentPool, Rollout};
use crate::policy::{ParameterStore, Policy};
use crate::train::ppo::{frac_remaining, PPOConfig, PPOTrainer, PpoModel, TrainingStats};
use crate::utils::stats::explained_variance;

/// What a finished run achieved
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Updates completed
    pub updates: usize,
    /// Environment steps collected
    pub timesteps: usize,
    /// Rolling mean episode reward at the end
    pub mean_reward: f64,
    /// Highscore snapshots written
    pub highscores: usize,
    /// Opponent snapshots available at the end
    pub num_opponents: usize,
    /// Location of the final snapshot
    pub final_snapshot: PathBuf,
}

/// Orchestrates self-play PPO
///
/// `P` is the trained policy. `O` plays the second seat; it is never trained
/// and only ever holds parameters loaded from the opponent pool.
pub struct SelfPlayTrainer<E, P, O>
where
    E: VecEnv,
    P: Policy + PpoModel + ParameterStore,
    O: Policy + ParameterStore,
{
    config: SelfPlayConfig,
    trainer: PPOTrainer,
    runner: MultiAgentRunner<E>,
    primary: P,
    opponent: Option<O>,
    pool: OpponentPool,
    snapshots: SnapshotDir,
    highscore: HighscoreTracker,
    episodes: EpisodeWindow,
    sinks: Vec<Box<dyn MetricsSink>>,
    rng: StdRng,
    shutdown: Arc<AtomicBool>,
    start: Instant,
}

impl<E, P, O> SelfPlayTrainer<E, P, O>
where
    E: VecEnv,
    P: Policy + PpoModel + ParameterStore,
    O: Policy + ParameterStore,
{
    /// Validate the configuration and set up the run
    ///
    /// `opponent` must be `Some` exactly when `config.num_agents == 2`.
    /// With a baseline configured, both policies start from it.
    pub fn new(
        ppo: PPOConfig,
        config: SelfPlayConfig,
        env: E,
        mut primary: P,
        mut opponent: Option<O>,
    ) -> Result<Self> {
        config.validate()?;
        if env.num_envs() != ppo.n_envs {
            bail!(
                "environment has {} instances but n_envs is {}",
                env.num_envs(),
                ppo.n_envs
            );
        }
        if config.has_opponent() != opponent.is_some() {
            bail!(
                "num_agents is {} but an opponent policy was {}",
                config.num_agents,
                if opponent.is_some() { "given" } else { "not given" }
            );
        }
        if config.total_timesteps < ppo.batch_size() {
            bail!(
                "total_timesteps ({}) is smaller than one rollout ({})",
                config.total_timesteps,
                ppo.batch_size()
            );
        }

        if let Some(baseline) = &config.baseline {
            primary
                .load(baseline)
                .with_context(|| format!("failed to load baseline {}", baseline.display()))?;
            if let Some(opponent) = opponent.as_mut() {
                opponent
                    .load(baseline)
                    .with_context(|| format!("failed to load baseline {}", baseline.display()))?;
            }
            tracing::info!("Loaded baseline from {}", baseline.display());
        }

        let snapshots = SnapshotDir::create(&config.run_dir)?;
        let pool = OpponentPool::new(config.opponent_pool_capacity, snapshots.clone());
        let runner = MultiAgentRunner::new(
            env,
            &primary,
            ppo.n_steps,
            ppo.gamma as f32,
            ppo.gae_lambda as f32,
            config.placeholder_action,
        )?;
        let rng = match ppo.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            highscore: HighscoreTracker::new(config.initial_highscore, config.highscore_increment),
            episodes: EpisodeWindow::new(config.episode_window),
            trainer: PPOTrainer::new(ppo)?,
            config,
            runner,
            primary,
            opponent,
            pool,
            snapshots,
            sinks: Vec::new(),
            rng,
            shutdown: Arc::new(AtomicBool::new(false)),
            start: Instant::now(),
        })
    }

    /// Send metric rows to `sink` as well
    pub fn add_sink(&mut self, sink: Box<dyn MetricsSink>) {
        self.sinks.push(sink);
    }

    /// Flag that stops the loop before the next update when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// The trained policy
    pub fn primary(&self) -> &P {
        &self.primary
    }

    /// The second-seat policy, if any
    pub fn opponent(&self) -> Option<&O> {
        self.opponent.as_ref()
    }

    /// The opponent pool
    pub fn pool(&self) -> &OpponentPool {
        &self.pool
    }

    /// Snapshot locations of this run
    pub fn snapshots(&self) -> &SnapshotDir {
        &self.snapshots
    }

    /// Number of updates `run` will perform
    pub fn num_updates(&self) -> usize {
        self.config.total_timesteps / self.runner.batch_size()
    }

    /// Train until every update has run or shutdown is requested
    pub fn run(&mut self) -> Result<RunSummary> {
        let num_updates = self.num_updates();
        self.start = Instant::now();
        tracing::info!(
            "Starting self-play: {} updates of {} steps, {} agent(s)",
            num_updates,
            self.runner.batch_size(),
            self.config.num_agents
        );

        let (completed, final_snapshot) = match self.train_and_save(num_updates) {
            Ok(done) => done,
            Err(err) => {
                if let Err(close_err) = self.runner.close() {
                    tracing::warn!("Failed to close environment: {:#}", close_err);
                }
                return Err(err);
            }
        };
        self.runner.close()?;
        tracing::info!("Saved final model to {}", final_snapshot.display());

        Ok(RunSummary {
            updates: completed,
            timesteps: completed * self.runner.batch_size(),
            mean_reward: self.episodes.mean_reward(),
            highscores: self.highscore.hits(),
            num_opponents: self.pool.known_count(),
            final_snapshot,
        })
    }

    fn train_and_save(&mut self, num_updates: usize) -> Result<(usize, PathBuf)> {
        if self.opponent.is_some() {
            self.pool.record_snapshot(&self.primary)?;
        }

        let mut completed = 0;
        for update in 1..=num_updates {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::warn!("Shutdown requested, stopping after {} updates", completed);
                break;
            }
            self.update(update, num_updates)?;
            completed = update;
        }

        let final_snapshot = self.snapshots.save(SnapshotId::Final, &self.primary)?;
        Ok((completed, final_snapshot))
    }

    fn update(&mut self, update: usize, num_updates: usize) -> Result<()> {
        let tstart = Instant::now();

        if let Some(opponent) = self.opponent.as_mut() {
            self.pool.sample_into(&mut self.rng, opponent)?;
            self.runner.reset_opponent_state(&*opponent);
        }

        let frac = frac_remaining(update, num_updates);
        let learning_rate = self.trainer.config().learning_rate.value(frac);
        let clip_range = self.trainer.config().clip_range.value(frac);

        let rollout = self.runner.run(&mut self.primary, self.opponent.as_mut())?;
        self.episodes.extend(rollout.episodes.iter().copied());

        let stats = self
            .trainer
            .update(&mut self.primary, learning_rate, clip_range, &rollout.batch)?;
        let fps = rollout.batch.len() as f64 / tstart.elapsed().as_secs_f64().max(1e-9);

        if self.opponent.is_some() && update % self.config.opponent_save_interval == 0 {
            self.pool.record_snapshot(&self.primary)?;
        }

        if update % self.config.log_interval == 0 || update == 1 {
            let row = self.metrics_row(update, fps, &rollout, &stats);
            for sink in &mut self.sinks {
                sink.write(&row)?;
            }
        }

        if self.config.save_interval > 0
            && (update % self.config.save_interval == 0 || update == 1)
        {
            let path = self
                .snapshots
                .save(SnapshotId::Checkpoint(update), &self.primary)?;
            tracing::info!("Saved checkpoint to {}", path.display());
        }

        if self.opponent.is_none() {
            let threshold = self.highscore.threshold();
            if self.highscore.observe(self.episodes.mean_reward()) {
                let path = self.snapshots.save(SnapshotId::Highscore, &self.primary)?;
                tracing::info!(
                    "New highscore above {}, saved to {}",
                    threshold,
                    path.display()
                );
            }
        }

        Ok(())
    }

    fn metrics_row(
        &self,
        update: usize,
        fps: f64,
        rollout: &Rollout,
        stats: &TrainingStats,
    ) -> MetricsRow {
        let ppo = self.trainer.config();
        let mut row = MetricsRow::new();

        if self.opponent.is_some() {
            row.record("num_opponents", self.pool.known_count() as f64);
        } else {
            row.record("next_highscore", self.highscore.threshold());
        }
        row.record("serial_timesteps", (update * ppo.n_steps) as f64)
            .record("nupdates", update as f64)
            .record("total_timesteps", (update * rollout.batch.len()) as f64)
            .record("fps", fps)
            .record(
                "explained_variance",
                explained_variance(&rollout.batch.values, &rollout.batch.returns),
            )
            .record("eprewmean", self.episodes.mean_reward())
            .record("eplenmean", self.episodes.mean_length())
            .record("time_elapsed", self.start.elapsed().as_secs_f64())
            .record("nenvs", ppo.n_envs as f64)
            .record("nsteps", ppo.n_steps as f64)
            .record("nminibatches", ppo.n_minibatches as f64)
            .record("noptepochs", ppo.n_epochs as f64)
            .record("policy_loss", stats.policy_loss)
            .record("value_loss", stats.value_loss)
            .record("policy_entropy", stats.entropy)
            .record("approxkl", stats.approx_kl)
            .record("clipfrac", stats.clip_fraction);
        row
    }
}
