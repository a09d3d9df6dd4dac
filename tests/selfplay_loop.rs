//! End-to-end runs of the self-play loop with lightweight stand-ins
//!
//! The policies here keep a single integer "version" as their parameters,
//! which makes it easy to see which snapshot the opponent plays with.

use anyhow::{bail, Result};
use std::{cell::RefCell, fs, path::Path, rc::Rc, sync::atomic::Ordering};
use tempfile::tempdir;

use duel_rl::{
    buffer::rollout::Minibatch,
    checkpoint::SnapshotId,
    env::{DuelObservation, EpisodeInfo, JointAction, StepInfo, VecEnv, VecStep},
    metrics::{MetricsRow, MetricsSink},
    policy::{ParameterStore, Policy, PolicyStep, RecurrentState},
    train::{PPOConfig, PpoModel, Schedule, SelfPlayConfig, SelfPlayTrainer, TrainingStats},
};

/// Every episode lasts two steps and is worth `episode_reward`
struct TwoStepEnv {
    num_envs: usize,
    t: Vec<usize>,
    episode_reward: f32,
    fail_after: Option<usize>,
    steps: usize,
    closed: Rc<RefCell<bool>>,
}

impl TwoStepEnv {
    fn new(num_envs: usize, episode_reward: f32) -> Self {
        Self {
            num_envs,
            t: vec![0; num_envs],
            episode_reward,
            fail_after: None,
            steps: 0,
            closed: Rc::new(RefCell::new(false)),
        }
    }

    /// Make every `step` after the first `steps` ones fail
    fn failing_after(mut self, steps: usize) -> Self {
        self.fail_after = Some(steps);
        self
    }

    fn observe(&self, n: usize) -> DuelObservation {
        DuelObservation {
            primary: vec![self.t[n] as f32, 1.0],
            opponent: vec![self.t[n] as f32, -1.0],
        }
    }
}

impl VecEnv for TwoStepEnv {
    fn num_envs(&self) -> usize {
        self.num_envs
    }

    fn reset(&mut self) -> Result<Vec<DuelObservation>> {
        self.t = vec![0; self.num_envs];
        Ok((0..self.num_envs).map(|n| self.observe(n)).collect())
    }

    fn step(&mut self, _actions: &[JointAction]) -> Result<VecStep> {
        if self.fail_after.is_some_and(|limit| self.steps >= limit) {
            bail!("emulator crashed");
        }
        self.steps += 1;
        let mut out = VecStep::default();
        for n in 0..self.num_envs {
            self.t[n] += 1;
            let done = self.t[n] == 2;
            let mut info = StepInfo::default();
            if done {
                info.episode = Some(EpisodeInfo {
                    reward: self.episode_reward,
                    length: 2,
                });
                self.t[n] = 0;
            }
            out.observations.push(self.observe(n));
            out.rewards.push(if done { self.episode_reward } else { 0.0 });
            out.dones.push(done);
            out.infos.push(info);
        }
        Ok(out)
    }

    fn close(&mut self) -> Result<()> {
        *self.closed.borrow_mut() = true;
        Ok(())
    }
}

/// Parameters are one integer; every gradient step bumps it
#[derive(Default)]
struct VersionPolicy {
    version: u32,
    learning_rates: Vec<f64>,
    loaded: Vec<u32>,
}

impl Policy for VersionPolicy {
    fn step(
        &mut self,
        observations: &[Vec<f32>],
        state: &RecurrentState,
        _dones: &[bool],
    ) -> Result<PolicyStep> {
        let n = observations.len();
        Ok(PolicyStep {
            actions: vec![1; n],
            values: vec![0.0; n],
            log_probs: vec![-1.0; n],
            state: state.clone(),
        })
    }

    fn value(
        &mut self,
        observations: &[Vec<f32>],
        _state: &RecurrentState,
        _dones: &[bool],
    ) -> Result<Vec<f32>> {
        Ok(vec![0.0; observations.len()])
    }
}

impl PpoModel for VersionPolicy {
    fn train_minibatch(
        &mut self,
        learning_rate: f64,
        _clip_range: f64,
        _minibatch: &Minibatch,
    ) -> Result<TrainingStats> {
        self.version += 1;
        self.learning_rates.push(learning_rate);
        Ok(TrainingStats::new(0.1, 0.2, 0.3, 0.0, 0.0))
    }
}

impl ParameterStore for VersionPolicy {
    fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.version.to_string())?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        self.version = fs::read_to_string(path)?.trim().parse()?;
        self.loaded.push(self.version);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct CollectSink(Rc<RefCell<Vec<MetricsRow>>>);

impl MetricsSink for CollectSink {
    fn write(&mut self, row: &MetricsRow) -> Result<()> {
        self.0.borrow_mut().push(row.clone());
        Ok(())
    }
}

/// 2 envs * 4 steps = 8 samples per update, one epoch of two minibatches
fn small_ppo() -> PPOConfig {
    PPOConfig::new()
        .n_envs(2)
        .n_steps(4)
        .n_minibatches(2)
        .n_epochs(1)
        .seed(7)
}

#[test]
fn test_two_agent_run_fills_pool_and_logs() {
    let dir = tempdir().unwrap();
    let selfplay = SelfPlayConfig::new()
        .total_timesteps(40)
        .opponent_pool_capacity(2)
        .opponent_save_interval(2)
        .log_interval(2)
        .save_interval(2)
        .run_dir(dir.path());
    let ppo = small_ppo().learning_rate(Schedule::Linear {
        start: 1.0,
        end: 0.0,
    });

    let env = TwoStepEnv::new(2, 3.0);
    let closed = Rc::clone(&env.closed);
    let rows = CollectSink::default();

    let mut trainer = SelfPlayTrainer::new(
        ppo,
        selfplay,
        env,
        VersionPolicy::default(),
        Some(VersionPolicy::default()),
    )
    .unwrap();
    trainer.add_sink(Box::new(rows.clone()));
    assert_eq!(trainer.num_updates(), 5);

    let summary = trainer.run().unwrap();

    assert_eq!(summary.updates, 5);
    assert_eq!(summary.timesteps, 40);
    assert_eq!(summary.mean_reward, 3.0);
    assert_eq!(summary.highscores, 0);
    // Initial snapshot plus updates 2 and 4, capped by capacity
    assert_eq!(summary.num_opponents, 2);
    assert_eq!(trainer.pool().next_slot(), 1);
    assert!(*closed.borrow());

    // Two minibatches per update
    let primary = trainer.primary();
    assert_eq!(primary.version, 10);
    assert_eq!(primary.learning_rates[0], 1.0);
    assert!((primary.learning_rates[2] - 0.8).abs() < 1e-12);
    assert!((primary.learning_rates[9] - 0.2).abs() < 1e-12);

    // Slot 0 holds the version after update 4, slot 1 the one after update 2
    let snapshots = trainer.snapshots();
    assert_eq!(
        fs::read_to_string(snapshots.path(SnapshotId::Opponent(0))).unwrap(),
        "8"
    );
    assert_eq!(
        fs::read_to_string(snapshots.path(SnapshotId::Opponent(1))).unwrap(),
        "4"
    );
    assert_eq!(fs::read_to_string(&summary.final_snapshot).unwrap(), "10");

    for update in [1, 2, 4] {
        assert!(snapshots.exists(SnapshotId::Checkpoint(update)));
    }
    assert!(!snapshots.exists(SnapshotId::Checkpoint(3)));
    assert!(!snapshots.exists(SnapshotId::Highscore));

    let rows = rows.0.borrow();
    let logged: Vec<f64> = rows.iter().map(|r| r.get("nupdates").unwrap()).collect();
    assert_eq!(logged, vec![1.0, 2.0, 4.0]);
    assert_eq!(rows[0].get("num_opponents"), Some(1.0));
    assert_eq!(rows[0].get("total_timesteps"), Some(8.0));
    assert_eq!(rows[0].get("serial_timesteps"), Some(4.0));
    assert_eq!(rows[0].get("policy_loss"), Some(0.1));
    assert_eq!(rows[0].get("eprewmean"), Some(3.0));
    assert_eq!(rows[0].get("next_highscore"), None);
}

#[test]
fn test_opponent_only_plays_snapshots() {
    let dir = tempdir().unwrap();
    let selfplay = SelfPlayConfig::new()
        .total_timesteps(24)
        .opponent_save_interval(1)
        .run_dir(dir.path());

    let mut trainer = SelfPlayTrainer::new(
        small_ppo(),
        selfplay,
        TwoStepEnv::new(2, 1.0),
        VersionPolicy::default(),
        Some(VersionPolicy::default()),
    )
    .unwrap();
    trainer.run().unwrap();
    assert_eq!(trainer.pool().known_count(), 4);

    // Update 1 can only draw the initial snapshot; later ones draw past versions
    let loaded = &trainer.opponent().unwrap().loaded;
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded[0], 0);
    for (i, &version) in loaded.iter().enumerate() {
        assert!(version % 2 == 0 && version <= 2 * i as u32);
    }
    assert_eq!(trainer.opponent().unwrap().version, *loaded.last().unwrap());
}

#[test]
fn test_single_agent_saves_highscores() {
    let dir = tempdir().unwrap();
    let selfplay = SelfPlayConfig::new()
        .num_agents(1)
        .total_timesteps(80)
        .highscore(5.0, 1.0)
        .run_dir(dir.path());
    let rows = CollectSink::default();

    let mut trainer = SelfPlayTrainer::new(
        small_ppo(),
        selfplay,
        TwoStepEnv::new(2, 10.0),
        VersionPolicy::default(),
        None::<VersionPolicy>,
    )
    .unwrap();
    trainer.add_sink(Box::new(rows.clone()));
    let summary = trainer.run().unwrap();

    // Rolling mean is always 10: thresholds 5, 6, 7, 8 and 9 are beaten once each
    assert_eq!(summary.highscores, 5);
    assert_eq!(summary.num_opponents, 0);
    assert!(trainer.snapshots().exists(SnapshotId::Highscore));
    assert!(!trainer.snapshots().exists(SnapshotId::Opponent(0)));

    let rows = rows.0.borrow();
    assert_eq!(rows[0].get("next_highscore"), Some(5.0));
    assert_eq!(rows[1].get("next_highscore"), Some(6.0));
    assert_eq!(rows[0].get("num_opponents"), None);
}

#[test]
fn test_shutdown_before_first_update() {
    let dir = tempdir().unwrap();
    let selfplay = SelfPlayConfig::new().total_timesteps(80).run_dir(dir.path());

    let mut trainer = SelfPlayTrainer::new(
        small_ppo(),
        selfplay,
        TwoStepEnv::new(2, 1.0),
        VersionPolicy::default(),
        Some(VersionPolicy::default()),
    )
    .unwrap();
    trainer.shutdown_handle().store(true, Ordering::SeqCst);

    let summary = trainer.run().unwrap();
    assert_eq!(summary.updates, 0);
    assert!(summary.mean_reward.is_nan());
    assert!(summary.final_snapshot.exists());
}

#[test]
fn test_baseline_is_loaded_into_both_seats() {
    let dir = tempdir().unwrap();
    let baseline = dir.path().join("baseline.ot");
    fs::write(&baseline, "42").unwrap();

    let selfplay = SelfPlayConfig::new()
        .total_timesteps(8)
        .run_dir(dir.path())
        .baseline(&baseline);
    let mut trainer = SelfPlayTrainer::new(
        small_ppo(),
        selfplay,
        TwoStepEnv::new(2, 1.0),
        VersionPolicy::default(),
        Some(VersionPolicy::default()),
    )
    .unwrap();
    assert_eq!(trainer.primary().version, 42);

    trainer.run().unwrap();
    // The first opponent snapshot is the untrained baseline
    assert_eq!(
        fs::read_to_string(trainer.snapshots().path(SnapshotId::Opponent(0))).unwrap(),
        "42"
    );
}

#[test]
fn test_rejects_inconsistent_setup() {
    let dir = tempdir().unwrap();

    // Two agents configured but no opponent given
    let missing_opponent = SelfPlayTrainer::new(
        small_ppo(),
        SelfPlayConfig::new().total_timesteps(80).run_dir(dir.path()),
        TwoStepEnv::new(2, 1.0),
        VersionPolicy::default(),
        None::<VersionPolicy>,
    );
    assert!(missing_opponent.is_err());

    // Environment size differs from n_envs
    let wrong_envs = SelfPlayTrainer::new(
        small_ppo(),
        SelfPlayConfig::new().total_timesteps(80).run_dir(dir.path()),
        TwoStepEnv::new(3, 1.0),
        VersionPolicy::default(),
        Some(VersionPolicy::default()),
    );
    assert!(wrong_envs.is_err());

    // Budget smaller than one rollout
    let no_updates = SelfPlayTrainer::new(
        small_ppo(),
        SelfPlayConfig::new().total_timesteps(7).run_dir(dir.path()),
        TwoStepEnv::new(2, 1.0),
        VersionPolicy::default(),
        Some(VersionPolicy::default()),
    );
    assert!(no_updates.is_err());
}

#[test]
fn test_failed_update_still_closes_env() {
    let dir = tempdir().unwrap();
    let selfplay = SelfPlayConfig::new().total_timesteps(40).run_dir(dir.path());

    // Fails during the second rollout
    let env = TwoStepEnv::new(2, 1.0).failing_after(6);
    let closed = Rc::clone(&env.closed);
    let mut trainer = SelfPlayTrainer::new(
        small_ppo(),
        selfplay,
        env,
        VersionPolicy::default(),
        Some(VersionPolicy::default()),
    )
    .unwrap();

    let err = trainer.run().unwrap_err();
    assert!(format!("{err:#}").contains("emulator crashed"));
    assert!(*closed.borrow());
    assert!(!trainer.snapshots().exists(SnapshotId::Final));
    assert_eq!(trainer.primary().version, 2);
}
