//! Per-iteration training metrics and where they go
//!
//! The training loop fills one [`MetricsRow`] per logging interval and hands
//! it to each [`MetricsSink`] once.

use anyhow::{Context, Result};
use serde_json::{Map, Number, Value};
use std::{
    collections::VecDeque,
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::env::EpisodeInfo;
use crate::utils::stats::safe_mean;

/// Ordered key/value pairs for one logging step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsRow {
    entries: Vec<(&'static str, f64)>,
}

impl MetricsRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value, replacing an earlier one under the same key
    pub fn record(&mut self, key: &'static str, value: impl Into<f64>) -> &mut Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.iter().find(|(k, _)| *k == key).map(|&(_, v)| v)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the row is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Destination for metric rows
pub trait MetricsSink {
    /// Accept one row; called once per logging interval
    fn write(&mut self, row: &MetricsRow) -> Result<()>;
}

/// Writes every row as one `tracing` event
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl MetricsSink for LogSink {
    fn write(&mut self, row: &MetricsRow) -> Result<()> {
        let line = row
            .iter()
            .map(|(k, v)| format!("{k}={v:.6}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!("{}", line);
        Ok(())
    }
}

/// Appends every row as a JSON object to a file, one per line
///
/// Non-finite values are written as `null`.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it if needed
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open metrics file {}", path.display()))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// File being written
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsSink for JsonLinesSink {
    fn write(&mut self, row: &MetricsRow) -> Result<()> {
        let object: Map<String, Value> = row
            .iter()
            .map(|(k, v)| {
                let value = Number::from_f64(v).map_or(Value::Null, Value::Number);
                (k.to_string(), value)
            })
            .collect();

        serde_json::to_writer(&mut self.writer, &object)?;
        self.writer.write_all(b"\n")?;
        self.writer
            .flush()
            .with_context(|| format!("failed to write metrics to {}", self.path.display()))
    }
}

/// Rolling window over the most recently finished episodes
#[derive(Debug, Clone)]
pub struct EpisodeWindow {
    episodes: VecDeque<EpisodeInfo>,
    capacity: usize,
}

impl EpisodeWindow {
    /// Keep at most `capacity` episodes
    pub fn new(capacity: usize) -> Self {
        Self {
            episodes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add finished episodes, evicting the oldest beyond capacity
    pub fn extend(&mut self, episodes: impl IntoIterator<Item = EpisodeInfo>) {
        for episode in episodes {
            if self.capacity == 0 {
                return;
            }
            if self.episodes.len() == self.capacity {
                self.episodes.pop_front();
            }
            self.episodes.push_back(episode);
        }
    }

    /// Mean episode reward, `NaN` when empty
    pub fn mean_reward(&self) -> f64 {
        safe_mean(self.episodes.iter().map(|e| e.reward))
    }

    /// Mean episode length, `NaN` when empty
    pub fn mean_length(&self) -> f64 {
        safe_mean(self.episodes.iter().map(|e| e.length as f64))
    }

    /// Number of episodes in the window
    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    /// Check if no episode has finished yet
    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }
}
