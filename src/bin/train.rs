//! Train a duel snake policy with self-play PPO
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --features training --bin train -- --total-timesteps 2000000
//! cargo run --release --features training --bin train -- --config duel.json --num-agents 1
//! ```
//!
//! Progress rows are logged and appended to `<run_dir>/progress.jsonl`.

use anyhow::{bail, Result};
use clap::Parser;
use std::{cell::Cell, path::PathBuf};

use duel_rl::{
    env::{pool::EnvPool, snake::DuelSnake, SpaceType},
    metrics::{JsonLinesSink, LogSink},
    policy::mlp::{MlpConfig, MlpPolicy},
    train::{ppo::LossCoefficients, selfplay::TrainConfig, SelfPlayTrainer},
};

#[derive(Parser)]
#[command(name = "train", about = "Self-play PPO on two-player snake")]
struct Args {
    /// JSON file with `ppo` and `selfplay` sections
    #[arg(long)]
    config: Option<PathBuf>,
    /// Board width
    #[arg(long, default_value_t = 10)]
    width: i32,
    /// Board height
    #[arg(long, default_value_t = 10)]
    height: i32,
    /// Hidden layer width
    #[arg(long, default_value_t = 64)]
    hidden: i64,
    /// Hidden layers (2 or 3)
    #[arg(long, default_value_t = 2)]
    layers: usize,
    #[arg(long)]
    num_agents: Option<usize>,
    #[arg(long)]
    total_timesteps: Option<usize>,
    #[arg(long)]
    n_envs: Option<usize>,
    #[arg(long)]
    run_dir: Option<PathBuf>,
    #[arg(long)]
    baseline: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Train on CPU even if CUDA is available
    #[arg(long, default_value_t = false)]
    cpu: bool,
}

impl Args {
    fn train_config(&self) -> Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::from_json_file(path)?,
            None => TrainConfig::default(),
        };
        if let Some(n) = self.num_agents {
            config.selfplay.num_agents = n;
        }
        if let Some(steps) = self.total_timesteps {
            config.selfplay.total_timesteps = steps;
        }
        if let Some(n) = self.n_envs {
            config.ppo.n_envs = n;
        }
        if let Some(dir) = &self.run_dir {
            config.selfplay.run_dir = dir.clone();
        }
        if let Some(path) = &self.baseline {
            config.selfplay.baseline = Some(path.clone());
        }
        if let Some(seed) = self.seed {
            config.ppo.seed = Some(seed);
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let TrainConfig { ppo, selfplay } = args.train_config()?;

    if let Some(seed) = ppo.seed {
        tch::manual_seed(seed as i64);
    }
    let device = if args.cpu {
        tch::Device::Cpu
    } else {
        tch::Device::cuda_if_available()
    };

    let (width, height, num_agents) = (args.width, args.height, selfplay.num_agents);
    let seed = ppo.seed;
    let instance = Cell::new(0_u64);
    let env = EnvPool::new(
        || {
            let game = DuelSnake::new(width, height, num_agents);
            let index = instance.replace(instance.get() + 1);
            match seed {
                Some(seed) => game.with_seed(seed.wrapping_add(index)),
                None => game,
            }
        },
        ppo.n_envs,
    );
    let obs_dim = env.observation_space().flat_dim();
    let action_dim = match env.action_space().dtype {
        SpaceType::Discrete(n) => n,
        SpaceType::Continuous => bail!("expected a discrete action space"),
    };

    tracing::info!("Environment: {}x{} duel snake, {} agent(s)", width, height, num_agents);
    tracing::info!("  Observation dim: {}", obs_dim);
    tracing::info!("  Action dim: {}", action_dim);
    tracing::info!("  Num envs: {}", ppo.n_envs);
    tracing::info!("  Steps per rollout: {}", ppo.n_steps);

    let mlp = MlpConfig {
        num_layers: args.layers,
        hidden_dim: args.hidden,
        ..Default::default()
    };
    let primary = MlpPolicy::with_config(obs_dim, action_dim, mlp.clone(), device)?
        .with_loss(LossCoefficients::from(&ppo));
    let opponent = if selfplay.has_opponent() {
        Some(MlpPolicy::with_config(obs_dim, action_dim, mlp, device)?)
    } else {
        None
    };

    let progress = selfplay.run_dir.join("progress.jsonl");
    let mut trainer = SelfPlayTrainer::new(ppo, selfplay, env, primary, opponent)?;
    trainer.add_sink(Box::new(LogSink));
    trainer.add_sink(Box::new(JsonLinesSink::create(&progress)?));

    let summary = trainer.run()?;
    tracing::info!(
        "Finished {} updates ({} steps), mean episode reward {:.3}",
        summary.updates,
        summary.timesteps,
        summary.mean_reward
    );
    tracing::info!("Final model: {}", summary.final_snapshot.display());
    if summary.highscores > 0 {
        tracing::info!("Highscore snapshots written: {}", summary.highscores);
    }

    Ok(())
}
