//! Multi-Layer Perceptron (MLP) policy for discrete actions
//!
//! A feedforward actor-critic network on tch-rs. The same type plays both
//! seats: the primary instance owns an Adam optimizer and takes PPO steps,
//! the opponent instance only ever loads snapshots and samples actions.
//!
//! # Architecture
//!
//! ```text
//! Input (flattened observation planes)
//!         |
//!     [Dense(h)]
//!         |
//!      Tanh
//!         |
//!     [Dense(h)]
//!         |
//!      Tanh
//!         |
//!    [Dense(h)] (optional 3rd layer)
//!         |
//!      Tanh
//!      /     \
//!  Policy   Value
//!  Network  Network
//!     |        |
//! [Dense(n)]  [Dense(1)]
//!     |        |
//!  Actions   Value
//! ```

use anyhow::{bail, Result};
use std::path::Path;
use tch::{
    nn::{self, Init, Module, OptimizerConfig},
    Device, Kind, Tensor,
};

use crate::buffer::rollout::Minibatch;
use crate::policy::{ParameterStore, Policy, PolicyStep, RecurrentState};
use crate::train::ppo::{compute_ppo_loss, LossCoefficients, PPOConfig, PpoModel, TrainingStats};

/// Configuration for MLP policy architecture
#[derive(Debug, Clone)]
pub struct MlpConfig {
    /// Number of shared hidden layers (2 or 3)
    pub num_layers: usize,
    /// Width of every hidden layer
    pub hidden_dim: i64,
    /// Orthogonal init with sqrt(2) gain for hidden layers, 0.01 for heads
    pub use_orthogonal_init: bool,
    /// Hidden activation
    pub activation: Activation,
}

/// Hidden-layer nonlinearity
#[derive(Debug, Clone, Copy)]
pub enum Activation {
    /// Rectified linear unit
    ReLU,
    /// Hyperbolic tangent
    Tanh,
}

impl Activation {
    fn apply(self, x: &Tensor) -> Tensor {
        match self {
            Activation::ReLU => x.relu(),
            Activation::Tanh => x.tanh(),
        }
    }
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            num_layers: 2,
            hidden_dim: 64,
            use_orthogonal_init: true,
            activation: Activation::Tanh,
        }
    }
}

/// Multi-layer perceptron policy for discrete actions
///
/// Implements an actor-critic architecture with:
/// - Shared feature extraction layers (2-3 layers)
/// - Orthogonal weight initialization
/// - Separate policy head (outputs action logits)
/// - Separate value head (outputs state value estimate)
pub struct MlpPolicy {
    vs: nn::VarStore,
    shared: nn::Sequential,
    policy_head: nn::Linear,
    value_head: nn::Linear,
    optimizer: nn::Optimizer,
    coefs: LossCoefficients,
    obs_dim: i64,
    device: Device,
}

impl MlpPolicy {
    /// Create a new MLP policy with default 2-layer architecture
    ///
    /// # Arguments
    ///
    /// * `obs_dim` - Length of a flattened observation
    /// * `action_dim` - Number of discrete actions
    /// * `hidden_dim` - Size of hidden layers
    pub fn new(obs_dim: usize, action_dim: usize, hidden_dim: i64) -> Result<Self> {
        let config = MlpConfig {
            hidden_dim,
            ..Default::default()
        };
        Self::with_config(obs_dim, action_dim, config, Device::cuda_if_available())
    }

    /// Create a new MLP policy with custom configuration on `device`
    pub fn with_config(
        obs_dim: usize,
        action_dim: usize,
        config: MlpConfig,
        device: Device,
    ) -> Result<Self> {
        tracing::info!("MlpPolicy using device: {:?}", device);
        let obs_dim = obs_dim as i64;
        let vs = nn::VarStore::new(device);
        let root = vs.root();

        let hidden_init = if config.use_orthogonal_init {
            Init::Orthogonal {
                gain: 2.0_f64.sqrt(),
            }
        } else {
            Init::Randn {
                mean: 0.0,
                stdev: 0.01,
            }
        };
        let hidden_config = nn::LinearConfig {
            ws_init: hidden_init,
            ..Default::default()
        };

        let activation = config.activation;
        let mut shared = nn::seq();
        let mut in_dim = obs_dim;
        for layer in 1..=config.num_layers.clamp(2, 3) {
            shared = shared
                .add(nn::linear(
                    &root / "shared" / format!("fc{layer}"),
                    in_dim,
                    config.hidden_dim,
                    hidden_config,
                ))
                .add_fn(move |x| activation.apply(x));
            in_dim = config.hidden_dim;
        }

        // Smaller gain for output layers
        let output_init = if config.use_orthogonal_init {
            Init::Orthogonal { gain: 0.01 }
        } else {
            Init::Randn {
                mean: 0.0,
                stdev: 0.01,
            }
        };
        let output_config = nn::LinearConfig {
            ws_init: output_init,
            ..Default::default()
        };

        let policy_head = nn::linear(
            &root / "policy",
            config.hidden_dim,
            action_dim as i64,
            output_config,
        );
        let value_head = nn::linear(&root / "value", config.hidden_dim, 1, output_config);

        let defaults = PPOConfig::default();
        let optimizer = nn::Adam {
            eps: 1e-5,
            ..Default::default()
        }
        .build(&vs, defaults.learning_rate.initial())?;

        Ok(Self {
            vs,
            shared,
            policy_head,
            value_head,
            optimizer,
            coefs: LossCoefficients::from(&defaults),
            obs_dim,
            device,
        })
    }

    /// Use these loss weights and gradient bound for PPO steps
    pub fn with_loss(mut self, coefs: LossCoefficients) -> Self {
        self.coefs = coefs;
        self
    }

    /// Forward pass: compute action logits and values
    pub fn forward(&self, obs: &Tensor) -> (Tensor, Tensor) {
        let features = self.shared.forward(obs);
        let logits = self.policy_head.forward(&features);
        let values = self.value_head.forward(&features).squeeze_dim(-1);
        (logits, values)
    }

    /// Sample actions; returns `(actions, log_probs, values)`
    pub fn get_action(&self, obs: &Tensor) -> (Tensor, Tensor, Tensor) {
        let (logits, values) = self.forward(obs);
        let log_probs_all = logits.log_softmax(-1, Kind::Float);
        let actions = log_probs_all.exp().multinomial(1, true).squeeze_dim(-1);
        let log_probs = log_probs_all
            .gather(-1, &actions.unsqueeze(-1), false)
            .squeeze_dim(-1);
        (actions, log_probs, values)
    }

    /// Log probabilities of `actions`, mean entropy, and values
    pub fn evaluate_actions(&self, obs: &Tensor, actions: &Tensor) -> (Tensor, Tensor, Tensor) {
        let (logits, values) = self.forward(obs);
        let log_probs = logits.log_softmax(-1, Kind::Float);
        let probs = log_probs.exp();

        let action_log_probs = log_probs
            .gather(-1, &actions.unsqueeze(-1), false)
            .squeeze_dim(-1);
        let entropy = -(probs * log_probs)
            .sum_dim_intlist(-1, false, Kind::Float)
            .mean(Kind::Float);
        (action_log_probs, entropy, values)
    }

    /// Get the device this policy is on (CPU or CUDA)
    pub fn device(&self) -> Device {
        self.device
    }

    /// Get reference to variable store
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    fn observation_tensor(&self, observations: &[Vec<f32>]) -> Result<Tensor> {
        let flat = observations.concat();
        if flat.len() as i64 != observations.len() as i64 * self.obs_dim {
            bail!(
                "expected observations of length {}, got {} values for {} rows",
                self.obs_dim,
                flat.len(),
                observations.len()
            );
        }
        Ok(Tensor::from_slice(&flat)
            .view([observations.len() as i64, self.obs_dim])
            .to_device(self.device))
    }
}

impl Policy for MlpPolicy {
    fn step(
        &mut self,
        observations: &[Vec<f32>],
        state: &RecurrentState,
        _dones: &[bool],
    ) -> Result<PolicyStep> {
        let obs = self.observation_tensor(observations)?;
        let (actions, log_probs, values) = tch::no_grad(|| self.get_action(&obs));

        Ok(PolicyStep {
            actions: Vec::<i64>::try_from(&actions.to_device(Device::Cpu))?,
            values: Vec::<f32>::try_from(&values.to_device(Device::Cpu))?,
            log_probs: Vec::<f32>::try_from(&log_probs.to_device(Device::Cpu))?,
            state: state.clone(),
        })
    }

    fn value(
        &mut self,
        observations: &[Vec<f32>],
        _state: &RecurrentState,
        _dones: &[bool],
    ) -> Result<Vec<f32>> {
        let obs = self.observation_tensor(observations)?;
        let values = tch::no_grad(|| self.forward(&obs).1);
        Ok(Vec::<f32>::try_from(&values.to_device(Device::Cpu))?)
    }
}

impl PpoModel for MlpPolicy {
    fn train_minibatch(
        &mut self,
        learning_rate: f64,
        clip_range: f64,
        minibatch: &Minibatch,
    ) -> Result<TrainingStats> {
        let rows = minibatch.len() as i64;
        let device = self.device;
        let column = |values: &[f32]| Tensor::from_slice(values).to_device(device);

        let obs = Tensor::from_slice(&minibatch.observations)
            .view([rows, minibatch.obs_dim as i64])
            .to_device(device);
        let actions = Tensor::from_slice(&minibatch.actions).to_device(device);

        let (log_probs, entropy, values) = self.evaluate_actions(&obs, &actions);
        let (loss, stats) = compute_ppo_loss(
            &log_probs,
            &entropy,
            &values,
            &column(&minibatch.old_log_probs),
            &column(&minibatch.old_values),
            &column(&minibatch.advantages),
            &column(&minibatch.returns),
            clip_range,
            &self.coefs,
        )?;

        self.optimizer.set_lr(learning_rate);
        self.optimizer.zero_grad();
        loss.backward();
        if let Some(max_norm) = self.coefs.max_grad_norm {
            self.optimizer.clip_grad_norm(max_norm);
        }
        self.optimizer.step();

        Ok(stats)
    }
}

impl ParameterStore for MlpPolicy {
    fn save(&self, path: &Path) -> Result<()> {
        self.vs.save(path)?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        self.vs.load(path)?;
        Ok(())
    }
}
