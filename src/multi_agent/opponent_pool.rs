//! Pool of past primary-policy snapshots used as self-play opponents
//!
//! The pool is a ring buffer of `capacity` slots. Recording writes the slot
//! under the cursor and advances it modulo the capacity; once every slot has
//! been written, new snapshots overwrite the oldest ones.

use anyhow::{bail, Result};
use rand::Rng;
use std::path::PathBuf;

use crate::checkpoint::{SnapshotDir, SnapshotId};
use crate::policy::ParameterStore;

/// Slot index in an [`OpponentPool`]
pub type OpponentSlot = usize;

/// Fixed-capacity ring buffer of opponent snapshots
#[derive(Debug)]
pub struct OpponentPool {
    /// One entry per slot, `Some(path)` once written
    slots: Vec<Option<PathBuf>>,

    /// Next slot to write
    next_slot: OpponentSlot,

    /// Number of slots holding a snapshot, never more than the capacity
    known_count: usize,

    snapshots: SnapshotDir,
}

impl OpponentPool {
    /// Create an empty pool that stores its snapshots under `snapshots`
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, snapshots: SnapshotDir) -> Self {
        assert!(capacity >= 1, "opponent pool capacity must be at least 1");
        Self {
            slots: vec![None; capacity],
            next_slot: 0,
            known_count: 0,
            snapshots,
        }
    }

    /// Maximum number of snapshots kept
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot the next snapshot will be written to
    pub fn next_slot(&self) -> OpponentSlot {
        self.next_slot
    }

    /// Number of valid snapshots
    pub fn known_count(&self) -> usize {
        self.known_count
    }

    /// Whether no snapshot has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.known_count == 0
    }

    /// Persist `model` into the next slot and advance the cursor
    ///
    /// Returns the slot that was written.
    pub fn record_snapshot<M: ParameterStore + ?Sized>(&mut self, model: &M) -> Result<OpponentSlot> {
        let slot = self.next_slot;
        let path = self.snapshots.save(SnapshotId::Opponent(slot), model)?;

        self.slots[slot] = Some(path);
        self.known_count = self.known_count.max(slot + 1);
        self.next_slot = (slot + 1) % self.capacity();

        tracing::info!(
            "Saved opponent snapshot to slot {} ({} of {} known)",
            slot,
            self.known_count,
            self.capacity()
        );
        Ok(slot)
    }

    /// Pick a valid slot uniformly at random
    ///
    /// An empty pool has nothing to offer; slot 0 is returned and loading it
    /// will fail.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> OpponentSlot {
        if self.is_empty() {
            tracing::warn!("Sampling from an empty opponent pool");
            return 0;
        }
        rng.gen_range(0..self.known_count)
    }

    /// Overwrite `model` with the snapshot in `slot`
    pub fn load_into<M: ParameterStore + ?Sized>(&self, slot: OpponentSlot, model: &mut M) -> Result<()> {
        match self.slots.get(slot) {
            Some(Some(_)) => self.snapshots.load(SnapshotId::Opponent(slot), model),
            Some(None) => bail!("opponent slot {slot} has no snapshot"),
            None => bail!(
                "opponent slot {slot} is out of range for capacity {}",
                self.capacity()
            ),
        }
    }

    /// Sample a slot and load it into `model`
    pub fn sample_into<M, R>(&self, rng: &mut R, model: &mut M) -> Result<OpponentSlot>
    where
        M: ParameterStore + ?Sized,
        R: Rng + ?Sized,
    {
        let slot = self.sample(rng);
        self.load_into(slot, model)?;
        tracing::debug!("Loaded opponent from slot {}", slot);
        Ok(slot)
    }
}
