//! PPO Trainer implementation
//!
//! [`PPOTrainer`] owns the epoch/minibatch schedule. The gradient step itself
//! belongs to the model through [`PpoModel`], so the trainer never touches
//! network or optimizer internals.

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};

use super::{config::PPOConfig, stats::TrainingStats};
use crate::buffer::rollout::{minibatch_partition, Minibatch, RolloutBatch};

/// A model that can take one clipped-surrogate gradient step
pub trait PpoModel {
    /// Run one optimizer step on `minibatch` and report its losses
    ///
    /// Advantages in `minibatch` are already normalized.
    fn train_minibatch(
        &mut self,
        learning_rate: f64,
        clip_range: f64,
        minibatch: &Minibatch,
    ) -> Result<TrainingStats>;
}

/// PPO Trainer for policy optimization
///
/// Runs `n_epochs` passes over each rollout, reshuffling the sample order
/// every epoch and cutting it into `n_minibatches` equal slices.
#[derive(Debug)]
pub struct PPOTrainer {
    config: PPOConfig,
    rng: StdRng,
    total_updates: usize,
}

impl PPOTrainer {
    /// Create a new PPO trainer
    ///
    /// # Arguments
    ///
    /// * `config` - PPO configuration parameters
    pub fn new(config: PPOConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            rng,
            total_updates: 0,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &PPOConfig {
        &self.config
    }

    /// Number of completed `update` calls
    pub fn total_updates(&self) -> usize {
        self.total_updates
    }

    /// Train on one rollout
    ///
    /// Every minibatch gets its advantages normalized before the gradient
    /// step. The returned statistics are the mean over all
    /// `n_epochs * n_minibatches` steps.
    ///
    /// # Panics
    ///
    /// Panics if the batch size is not divisible by `n_minibatches`.
    pub fn update<M: PpoModel + ?Sized>(
        &mut self,
        model: &mut M,
        learning_rate: f64,
        clip_range: f64,
        batch: &RolloutBatch,
    ) -> Result<TrainingStats> {
        let mut stats_sum = TrainingStats::zeros();

        for _epoch in 0..self.config.n_epochs {
            let partition =
                minibatch_partition(batch.len(), self.config.n_minibatches, &mut self.rng);

            for indices in &partition {
                let mut minibatch = Minibatch::gather(batch, indices);
                minibatch.normalize_advantages();

                stats_sum += &model.train_minibatch(learning_rate, clip_range, &minibatch)?;
            }
        }

        self.total_updates += 1;
        Ok(stats_sum.average())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records what it was trained on; loss equals the call index
    #[derive(Default)]
    struct RecordingModel {
        calls: Vec<(f64, f64, Vec<i64>, Vec<f32>)>,
    }

    impl PpoModel for RecordingModel {
        fn train_minibatch(
            &mut self,
            learning_rate: f64,
            clip_range: f64,
            minibatch: &Minibatch,
        ) -> Result<TrainingStats> {
            let step = self.calls.len() as f64;
            self.calls.push((
                learning_rate,
                clip_range,
                minibatch.actions.clone(),
                minibatch.advantages.clone(),
            ));
            Ok(TrainingStats::new(step, 2.0 * step, 1.0, 0.0, 0.5))
        }
    }

    fn batch(size: usize) -> RolloutBatch {
        RolloutBatch {
            obs_dim: 1,
            observations: (0..size).map(|i| i as f32).collect(),
            actions: (0..size as i64).collect(),
            values: vec![0.0; size],
            log_probs: vec![-1.0; size],
            dones: vec![false; size],
            advantages: (0..size).map(|i| (i * i) as f32).collect(),
            returns: vec![1.0; size],
        }
    }

    fn trainer(n_epochs: usize, n_minibatches: usize) -> PPOTrainer {
        let config = PPOConfig::new()
            .n_envs(2)
            .n_steps(6)
            .n_epochs(n_epochs)
            .n_minibatches(n_minibatches)
            .seed(5);
        PPOTrainer::new(config).unwrap()
    }

    #[test]
    fn test_epochs_cover_every_sample_once() {
        let mut trainer = trainer(3, 4);
        let mut model = RecordingModel::default();

        trainer.update(&mut model, 1e-3, 0.2, &batch(12)).unwrap();

        assert_eq!(model.calls.len(), 12);
        for epoch in model.calls.chunks(4) {
            let mut seen: Vec<i64> = epoch.iter().flat_map(|c| c.2.clone()).collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..12).collect::<Vec<_>>());
        }
        assert!(model.calls.iter().all(|c| c.0 == 1e-3 && c.1 == 0.2));
        assert_eq!(trainer.total_updates(), 1);
    }

    #[test]
    fn test_advantages_normalized_per_minibatch() {
        let mut trainer = trainer(1, 2);
        let mut model = RecordingModel::default();

        trainer.update(&mut model, 1e-3, 0.2, &batch(12)).unwrap();

        for (_, _, _, advantages) in &model.calls {
            let n = advantages.len() as f32;
            let mean = advantages.iter().sum::<f32>() / n;
            let var = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n;
            assert!(mean.abs() < 1e-5, "mean {mean}");
            assert!((var - 1.0).abs() < 1e-3, "var {var}");
        }
    }

    #[test]
    fn test_reported_losses_are_means() {
        let mut trainer = trainer(2, 2);
        let mut model = RecordingModel::default();

        let stats = trainer.update(&mut model, 1e-3, 0.2, &batch(12)).unwrap();

        // Four steps with policy losses 0, 1, 2, 3
        assert_eq!(stats.policy_loss, 1.5);
        assert_eq!(stats.value_loss, 3.0);
        assert_eq!(stats.clip_fraction, 0.5);
        assert_eq!(stats.num_updates, 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PPOConfig::new().n_envs(3).n_steps(3).n_minibatches(2);
        assert!(PPOTrainer::new(config).is_err());
    }

    #[test]
    fn test_same_seed_same_order() {
        let mut a = RecordingModel::default();
        let mut b = RecordingModel::default();
        trainer(2, 3).update(&mut a, 1e-3, 0.1, &batch(12)).unwrap();
        trainer(2, 3).update(&mut b, 1e-3, 0.1, &batch(12)).unwrap();

        let order = |m: &RecordingModel| m.calls.iter().map(|c| c.2.clone()).collect::<Vec<_>>();
        assert_eq!(order(&a), order(&b));
    }
}
