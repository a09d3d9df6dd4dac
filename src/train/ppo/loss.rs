//! Loss computation functions for PPO
//!
//! The clipped surrogate objective from Schulman et al. (2017), with the
//! value head clipped around its old predictions as in the OpenAI baselines
//! implementation. All losses are minimized.

use anyhow::Result;
use tch::{Kind, Tensor};

use super::{config::PPOConfig, stats::TrainingStats};

/// Weights of the loss terms and the gradient clip bound
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossCoefficients {
    /// Entropy bonus coefficient
    pub ent_coef: f64,
    /// Value loss coefficient
    pub vf_coef: f64,
    /// Global gradient-norm bound, if any
    pub max_grad_norm: Option<f64>,
}

impl From<&PPOConfig> for LossCoefficients {
    fn from(config: &PPOConfig) -> Self {
        Self {
            ent_coef: config.ent_coef,
            vf_coef: config.vf_coef,
            max_grad_norm: config.max_grad_norm,
        }
    }
}

/// Compute PPO policy loss with clipping
///
/// Returns `(policy_loss, clip_fraction, approx_kl)`.
///
/// # Arguments
/// * `log_probs` - Log probabilities of actions under current policy
/// * `old_log_probs` - Log probabilities of actions under old policy
/// * `advantages` - Normalized advantages
/// * `clip_range` - PPO clipping parameter (epsilon)
pub fn compute_policy_loss(
    log_probs: &Tensor,
    old_log_probs: &Tensor,
    advantages: &Tensor,
    clip_range: f64,
) -> Result<(Tensor, f64, f64)> {
    let ratio = (log_probs - old_log_probs).exp();

    let loss_unclipped = -advantages * &ratio;
    let loss_clipped = -advantages * ratio.clamp(1.0 - clip_range, 1.0 + clip_range);
    let policy_loss = loss_unclipped.maximum(&loss_clipped).mean(Kind::Float);

    let clip_fraction = (&ratio - 1.0)
        .abs()
        .gt(clip_range)
        .to_kind(Kind::Float)
        .mean(Kind::Float);
    let approx_kl = 0.5 * (log_probs - old_log_probs).square().mean(Kind::Float);

    Ok((
        policy_loss,
        f64::try_from(&clip_fraction)?,
        f64::try_from(&approx_kl)?,
    ))
}

/// Compute value function loss, clipped around the old predictions
///
/// Takes the larger of the clipped and unclipped squared errors.
///
/// # Arguments
/// * `values` - Predicted values under current value function
/// * `old_values` - Value predictions recorded during the rollout
/// * `returns` - Computed returns (targets)
/// * `clip_range` - Bound on the change of a value prediction
pub fn compute_value_loss(
    values: &Tensor,
    old_values: &Tensor,
    returns: &Tensor,
    clip_range: f64,
) -> Tensor {
    let values_clipped = old_values + (values - old_values).clamp(-clip_range, clip_range);
    let loss_unclipped = (values - returns).square();
    let loss_clipped = (values_clipped - returns).square();
    0.5 * loss_unclipped.maximum(&loss_clipped).mean(Kind::Float)
}

/// Total objective `policy - ent_coef * entropy + vf_coef * value`
///
/// Returns the loss tensor to backpropagate and the scalar statistics of
/// this step.
#[allow(clippy::too_many_arguments)]
pub fn compute_ppo_loss(
    log_probs: &Tensor,
    entropy: &Tensor,
    values: &Tensor,
    old_log_probs: &Tensor,
    old_values: &Tensor,
    advantages: &Tensor,
    returns: &Tensor,
    clip_range: f64,
    coefs: &LossCoefficients,
) -> Result<(Tensor, TrainingStats)> {
    let (policy_loss, clip_fraction, approx_kl) =
        compute_policy_loss(log_probs, old_log_probs, advantages, clip_range)?;
    let value_loss = compute_value_loss(values, old_values, returns, clip_range);

    let loss = &policy_loss - coefs.ent_coef * entropy + coefs.vf_coef * &value_loss;

    let stats = TrainingStats::new(
        f64::try_from(&policy_loss)?,
        f64::try_from(&value_loss)?,
        f64::try_from(entropy)?,
        approx_kl,
        clip_fraction,
    );
    Ok((loss, stats))
}
