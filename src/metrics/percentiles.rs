// ============================================================================
// Latency Percentiles
// ============================================================================

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Summary of a window of latency samples, all in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LatencyStats {
    pub samples: u64,
    pub min: u64,
    pub p50: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
    pub mean: f64,
}

impl LatencyStats {
    /// Sorts `samples` in place.
    pub fn from_samples(samples: &mut [u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_unstable();
        let total: u128 = samples.iter().map(|&s| s as u128).sum();
        Self {
            samples: samples.len() as u64,
            min: samples[0],
            p50: nearest_rank(samples, 50.0),
            p99: nearest_rank(samples, 99.0),
            p999: nearest_rank(samples, 99.9),
            max: samples[samples.len() - 1],
            mean: total as f64 / samples.len() as f64,
        }
    }
}

/// Nearest-rank percentile of an ascending slice: the smallest sample with
/// at least `pct` percent of samples at or below it.
pub fn nearest_rank(sorted: &[u64], pct: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let n = sorted.len();
    let rank = ((pct / 100.0) * n as f64).ceil() as usize;
    sorted[rank.clamp(1, n) - 1]
}
