//! Training statistics for PPO
//!
//! Per-minibatch losses are summed with [`TrainingStats::add`] and reduced
//! to a per-update mean with [`TrainingStats::average`].

use std::ops::AddAssign;

/// Training statistics for a PPO update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingStats {
    /// Clipped surrogate policy loss
    pub policy_loss: f64,

    /// Clipped value function loss
    pub value_loss: f64,

    /// Mean policy entropy
    pub entropy: f64,

    /// Approximate KL divergence between old and new policies
    pub approx_kl: f64,

    /// Fraction of samples whose ratio left the clip range
    pub clip_fraction: f64,

    /// Number of gradient steps summed into this value
    pub num_updates: usize,
}

impl TrainingStats {
    /// Create zero-initialized statistics
    pub fn zeros() -> Self {
        Self::default()
    }

    /// Statistics of a single gradient step
    pub fn new(
        policy_loss: f64,
        value_loss: f64,
        entropy: f64,
        approx_kl: f64,
        clip_fraction: f64,
    ) -> Self {
        Self {
            policy_loss,
            value_loss,
            entropy,
            approx_kl,
            clip_fraction,
            num_updates: 1,
        }
    }

    /// Add another statistics instance to this one
    pub fn add(&mut self, other: &TrainingStats) {
        self.policy_loss += other.policy_loss;
        self.value_loss += other.value_loss;
        self.entropy += other.entropy;
        self.approx_kl += other.approx_kl;
        self.clip_fraction += other.clip_fraction;
        self.num_updates += other.num_updates;
    }

    /// Compute average statistics across multiple updates
    pub fn average(&self) -> Self {
        let scale = self.num_updates as f64;
        if scale == 0.0 {
            return Self::zeros();
        }

        Self {
            policy_loss: self.policy_loss / scale,
            value_loss: self.value_loss / scale,
            entropy: self.entropy / scale,
            approx_kl: self.approx_kl / scale,
            clip_fraction: self.clip_fraction / scale,
            num_updates: self.num_updates,
        }
    }
}

impl AddAssign<&TrainingStats> for TrainingStats {
    fn add_assign(&mut self, other: &TrainingStats) {
        self.add(other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_over_steps() {
        let mut sum = TrainingStats::zeros();
        sum += &TrainingStats::new(1.0, 2.0, 0.5, 0.01, 0.1);
        sum += &TrainingStats::new(3.0, 4.0, 1.5, 0.03, 0.3);

        let avg = sum.average();
        assert_eq!(avg.policy_loss, 2.0);
        assert_eq!(avg.value_loss, 3.0);
        assert_eq!(avg.entropy, 1.0);
        assert!((avg.approx_kl - 0.02).abs() < 1e-12);
        assert!((avg.clip_fraction - 0.2).abs() < 1e-12);
        assert_eq!(avg.num_updates, 2);
    }

    #[test]
    fn test_average_of_nothing_is_zero() {
        assert_eq!(TrainingStats::zeros().average(), TrainingStats::zeros());
    }
}
