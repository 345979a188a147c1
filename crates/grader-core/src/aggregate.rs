//! Cross-task benchmark accumulator.
//!
//! An explicitly passed aggregation context: the batch driver owns one
//! instance and threads it through task invocations. No ambient state.
//! Concurrent increments are safe via an interior mutex over scalar
//! roll-ups only (weighted sum, total weight, per-task score list).

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Totals {
    weighted_sum: f64,
    total_weight: f64,
    scores: Vec<u32>,
}

/// Thread-safe accumulator for scalar score roll-ups across tasks.
#[derive(Debug, Default)]
pub struct BenchmarkAccumulator {
    totals: Mutex<Totals>,
}

/// Point-in-time copy of the accumulator's roll-ups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSnapshot {
    /// Sum of `score * weight` over all recorded tasks.
    pub weighted_sum: f64,

    /// Sum of weights over all recorded tasks.
    pub total_weight: f64,

    /// Per-task scores in recording order.
    pub scores: Vec<u32>,

    /// `weighted_sum / total_weight`, or 0.0 when nothing was recorded.
    pub weighted_mean: f64,
}

impl BenchmarkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one task's final score under the given tier weight.
    pub fn add(&self, score: u32, weight: f64) {
        let mut totals = self.totals.lock().unwrap();
        totals.weighted_sum += f64::from(score) * weight;
        totals.total_weight += weight;
        totals.scores.push(score);
    }

    /// Copy out the current roll-ups.
    pub fn snapshot(&self) -> BenchmarkSnapshot {
        let totals = self.totals.lock().unwrap();
        let weighted_mean = if totals.total_weight > 0.0 {
            totals.weighted_sum / totals.total_weight
        } else {
            0.0
        };
        BenchmarkSnapshot {
            weighted_sum: totals.weighted_sum,
            total_weight: totals.total_weight,
            scores: totals.scores.clone(),
            weighted_mean,
        }
    }

    /// Discard all recorded roll-ups.
    pub fn reset(&self) {
        let mut totals = self.totals.lock().unwrap();
        *totals = Totals::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_snapshot() {
        let acc = BenchmarkAccumulator::new();
        let snap = acc.snapshot();
        assert_eq!(snap.total_weight, 0.0);
        assert_eq!(snap.weighted_mean, 0.0);
        assert!(snap.scores.is_empty());
    }

    #[test]
    fn test_weighted_mean() {
        let acc = BenchmarkAccumulator::new();
        acc.add(100, 0.6);
        acc.add(50, 1.4);
        let snap = acc.snapshot();
        assert_eq!(snap.scores, vec![100, 50]);
        let expected = (100.0 * 0.6 + 50.0 * 1.4) / 2.0;
        assert!((snap.weighted_mean - expected).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_rollups() {
        let acc = BenchmarkAccumulator::new();
        acc.add(80, 1.0);
        acc.reset();
        let snap = acc.snapshot();
        assert_eq!(snap.total_weight, 0.0);
        assert!(snap.scores.is_empty());
    }

    #[test]
    fn test_concurrent_increments() {
        let acc = Arc::new(BenchmarkAccumulator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let acc = Arc::clone(&acc);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    acc.add(10, 1.0);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let snap = acc.snapshot();
        assert_eq!(snap.scores.len(), 800);
        assert!((snap.total_weight - 800.0).abs() < 1e-9);
        assert!((snap.weighted_mean - 10.0).abs() < 1e-9);
    }
}
