//! Round-trip latency histogram
//!
//! Each session records the time from starting an order send to the first
//! reply byte. Histograms merge by summing bucket counts, so merging is
//! order-independent.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Latency histogram bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyBucket {
    pub label: String,
    pub lower_us: u64,
    pub upper_us: u64,
    pub count: u64,
}

/// Fixed-bucket latency histogram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyHistogram {
    pub buckets: Vec<LatencyBucket>,
}

impl LatencyHistogram {
    /// Create empty histogram with default buckets.
    pub fn new() -> Self {
        Self { buckets: default_buckets() }
    }

    /// Record one round-trip sample.
    pub fn record(&mut self, latency: Duration) {
        let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        for bucket in &mut self.buckets {
            if us >= bucket.lower_us && us < bucket.upper_us {
                bucket.count += 1;
                return;
            }
        }
        // Overflow bucket (last)
        if let Some(last) = self.buckets.last_mut() {
            last.count += 1;
        }
    }

    /// Add another histogram's counts into this one.
    pub fn merge(&mut self, other: &LatencyHistogram) {
        for (mine, theirs) in self.buckets.iter_mut().zip(&other.buckets) {
            mine.count += theirs.count;
        }
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// One line per non-empty bucket.
    pub fn summary(&self) -> String {
        self.buckets
            .iter()
            .filter(|b| b.count > 0)
            .map(|b| format!("{:>10}: {}", b.label, b.count))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Default latency histogram buckets.
fn default_buckets() -> Vec<LatencyBucket> {
    vec![
        LatencyBucket { label: "<1ms".into(), lower_us: 0, upper_us: 1_000, count: 0 },
        LatencyBucket { label: "1-5ms".into(), lower_us: 1_000, upper_us: 5_000, count: 0 },
        LatencyBucket { label: "5-10ms".into(), lower_us: 5_000, upper_us: 10_000, count: 0 },
        LatencyBucket { label: "10-50ms".into(), lower_us: 10_000, upper_us: 50_000, count: 0 },
        LatencyBucket { label: "50-100ms".into(), lower_us: 50_000, upper_us: 100_000, count: 0 },
        LatencyBucket { label: "100-500ms".into(), lower_us: 100_000, upper_us: 500_000, count: 0 },
        LatencyBucket { label: ">500ms".into(), lower_us: 500_000, upper_us: u64::MAX, count: 0 },
    ]
}
