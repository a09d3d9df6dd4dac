//! Rising reward threshold for single-agent highscore snapshots

/// Tracks the next rolling reward worth a highscore snapshot
#[derive(Debug, Clone)]
pub struct HighscoreTracker {
    threshold: f64,
    increment: f64,
    hits: usize,
}

impl HighscoreTracker {
    /// Start at `initial`, raising by `increment` after every hit
    pub fn new(initial: f64, increment: f64) -> Self {
        Self {
            threshold: initial,
            increment,
            hits: 0,
        }
    }

    /// Reward that must be exceeded for the next hit
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Number of hits so far
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Check a rolling reward; on a hit the threshold is raised once
    ///
    /// `NaN` (no finished episodes) never hits.
    pub fn observe(&mut self, mean_reward: f64) -> bool {
        if mean_reward > self.threshold {
            self.threshold += self.increment;
            self.hits += 1;
            true
        } else {
            false
        }
    }
}
