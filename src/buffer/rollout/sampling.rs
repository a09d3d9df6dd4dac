//! Minibatch partitioning for PPO epochs
//!
//! Each epoch shuffles the full index range and cuts it into equal
//! contiguous slices, so every sample lands in exactly one minibatch.

use rand::{seq::SliceRandom, Rng};

use super::storage::RolloutBatch;
use crate::utils::stats::mean_std;

/// Shuffle `0..batch_size` and split it into `num_minibatches` equal parts
///
/// # Panics
///
/// Panics unless `batch_size` is a non-zero multiple of `num_minibatches`.
pub fn minibatch_partition<R: Rng + ?Sized>(
    batch_size: usize,
    num_minibatches: usize,
    rng: &mut R,
) -> Vec<Vec<usize>> {
    assert!(num_minibatches > 0, "num_minibatches must be positive");
    assert!(
        batch_size > 0 && batch_size % num_minibatches == 0,
        "batch size {batch_size} is not divisible into {num_minibatches} minibatches"
    );

    let mut indices: Vec<usize> = (0..batch_size).collect();
    indices.shuffle(rng);

    indices
        .chunks(batch_size / num_minibatches)
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// One minibatch gathered from a [`RolloutBatch`]
#[derive(Debug, Clone, Default)]
pub struct Minibatch {
    /// Width of one observation row
    pub obs_dim: usize,
    /// Observations, row-major \[size * obs_dim\]
    pub observations: Vec<f32>,
    /// Actions taken
    pub actions: Vec<i64>,
    /// Value estimates at collection time
    pub old_values: Vec<f32>,
    /// Log probabilities at collection time
    pub old_log_probs: Vec<f32>,
    /// Advantages (normalized by the trainer before use)
    pub advantages: Vec<f32>,
    /// Bootstrapped returns
    pub returns: Vec<f32>,
}

impl Minibatch {
    /// Gather the samples at `indices`
    pub fn gather(batch: &RolloutBatch, indices: &[usize]) -> Self {
        let mut mb = Self {
            obs_dim: batch.obs_dim,
            observations: Vec::with_capacity(indices.len() * batch.obs_dim),
            ..Default::default()
        };

        for &i in indices {
            mb.observations.extend_from_slice(batch.observation(i));
            mb.actions.push(batch.actions[i]);
            mb.old_values.push(batch.values[i]);
            mb.old_log_probs.push(batch.log_probs[i]);
            mb.advantages.push(batch.advantages[i]);
            mb.returns.push(batch.returns[i]);
        }
        mb
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if the minibatch is empty
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Shift and scale advantages to zero mean and unit variance
    pub fn normalize_advantages(&mut self) {
        let (mean, std) = mean_std(&self.advantages);
        for adv in &mut self.advantages {
            *adv = (*adv - mean) / (std + 1e-8);
        }
    }
}
