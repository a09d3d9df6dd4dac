//! Watch saved snapshots play duel snake in the terminal
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --features training --bin play -- --primary runs/duel/final_model.ot \
//!     --opponent runs/duel/opponents/opponent_3.ot
//! ```
//!
//! Without `--opponent` the second seat is empty and the primary plays alone.

use anyhow::{bail, Result};
use clap::Parser;
use std::{
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use duel_rl::{
    env::{
        snake::{DuelSnake, PLACEHOLDER_ACTION},
        DuelEnvironment, EpisodeInfo, SpaceType,
    },
    metrics::EpisodeWindow,
    policy::{
        mlp::{MlpConfig, MlpPolicy},
        ParameterStore, Policy, RecurrentState,
    },
};

#[derive(Parser)]
#[command(name = "play", about = "Render games between saved snake policies")]
struct Args {
    /// Snapshot for the first seat
    #[arg(long)]
    primary: PathBuf,
    /// Snapshot for the second seat
    #[arg(long)]
    opponent: Option<PathBuf>,
    #[arg(long, default_value_t = 10)]
    width: i32,
    #[arg(long, default_value_t = 10)]
    height: i32,
    /// Must match the trained network
    #[arg(long, default_value_t = 64)]
    hidden: i64,
    #[arg(long, default_value_t = 2)]
    layers: usize,
    #[arg(long, default_value_t = 3)]
    episodes: usize,
    /// Pause between frames; 0 prints only episode results
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,
}

fn load_policy(path: &Path, obs_dim: usize, action_dim: usize, args: &Args) -> Result<MlpPolicy> {
    let config = MlpConfig {
        num_layers: args.layers,
        hidden_dim: args.hidden,
        ..Default::default()
    };
    let mut policy = MlpPolicy::with_config(obs_dim, action_dim, config, tch::Device::Cpu)?;
    policy.load(path)?;
    tracing::info!("Loaded {}", path.display());
    Ok(policy)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let num_agents = if args.opponent.is_some() { 2 } else { 1 };
    let mut game = DuelSnake::new(args.width, args.height, num_agents);

    let obs_dim = game.observation_space().flat_dim();
    let action_dim = match game.action_space().dtype {
        SpaceType::Discrete(n) => n,
        SpaceType::Continuous => bail!("expected a discrete action space"),
    };

    let mut primary = load_policy(&args.primary, obs_dim, action_dim, &args)?;
    let mut opponent = match &args.opponent {
        Some(path) => Some(load_policy(path, obs_dim, action_dim, &args)?),
        None => None,
    };

    let delay = Duration::from_millis(args.delay_ms);
    let mut results = EpisodeWindow::new(args.episodes.max(1));

    for episode in 1..=args.episodes {
        let mut obs = game.reset()?;
        let mut primary_state = primary.initial_state();
        let mut opponent_state = opponent
            .as_ref()
            .map_or(RecurrentState::Stateless, |p| p.initial_state());
        let mut total = 0.0;
        let mut first = true;

        loop {
            if !delay.is_zero() {
                println!("\x1b[2J\x1b[Hepisode {episode}  step {}  reward {total:.2}", game.steps());
                print!("{}", game.render());
                thread::sleep(delay);
            }

            let out = primary.step(&[obs.primary.clone()], &primary_state, &[first])?;
            primary_state = out.state;
            let second = match opponent.as_mut() {
                Some(policy) => {
                    let opp = policy.step(&[obs.opponent.clone()], &opponent_state, &[first])?;
                    opponent_state = opp.state;
                    opp.actions[0]
                }
                None => PLACEHOLDER_ACTION,
            };
            first = false;

            let result = game.step([out.actions[0], second])?;
            total += result.reward;
            obs = result.observation;
            if result.done {
                break;
            }
        }

        tracing::info!("Episode {}: reward {:.2}, length {}", episode, total, game.steps());
        results.extend([EpisodeInfo {
            reward: total,
            length: game.steps(),
        }]);
    }

    tracing::info!(
        "Mean reward {:.3}, mean length {:.1} over {} episodes",
        results.mean_reward(),
        results.mean_length(),
        results.len()
    );
    Ok(())
}
