//! Hyperparameter schedules over the course of a run
//!
//! Schedules are evaluated at the fraction of training *remaining*: 1.0 on
//! the first update, approaching 0.0 on the last.

use serde::{Deserialize, Serialize};

/// A scalar hyperparameter that may decay during training
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    /// Same value on every update
    Constant(f64),

    /// Linear interpolation from `start` (first update) towards `end`
    Linear {
        /// Value when all of training remains
        start: f64,
        /// Value when no training remains
        end: f64,
    },
}

impl Schedule {
    /// Value at `frac_remaining` in `[0, 1]`
    pub fn value(&self, frac_remaining: f64) -> f64 {
        match *self {
            Schedule::Constant(v) => v,
            Schedule::Linear { start, end } => end + (start - end) * frac_remaining,
        }
    }

    /// Value on the first update
    pub fn initial(&self) -> f64 {
        self.value(1.0)
    }
}

impl From<f64> for Schedule {
    fn from(v: f64) -> Self {
        Schedule::Constant(v)
    }
}

/// Fraction of training remaining at the start of 1-based `update`
pub fn frac_remaining(update: usize, total_updates: usize) -> f64 {
    if total_updates == 0 {
        return 0.0;
    }
    1.0 - (update.saturating_sub(1)) as f64 / total_updates as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_schedule() {
        let s = Schedule::from(3e-4);
        assert_eq!(s.value(1.0), 3e-4);
        assert_eq!(s.value(0.1), 3e-4);
    }

    #[test]
    fn test_linear_schedule() {
        let s = Schedule::Linear {
            start: 1.0,
            end: 0.0,
        };
        assert_eq!(s.initial(), 1.0);
        assert!((s.value(0.25) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_frac_remaining() {
        assert_eq!(frac_remaining(1, 4), 1.0);
        assert_eq!(frac_remaining(2, 4), 0.75);
        assert_eq!(frac_remaining(4, 4), 0.25);
    }

    #[test]
    fn test_schedule_json() {
        let s: Schedule = serde_json::from_str(r#"{"linear":{"start":0.2,"end":0.1}}"#).unwrap();
        assert_eq!(s, Schedule::Linear { start: 0.2, end: 0.1 });
        let c: Schedule = serde_json::from_str(r#"{"constant":0.5}"#).unwrap();
        assert_eq!(c, Schedule::Constant(0.5));
    }
}
