//! Aggregate run report
//!
//! Folds session outcomes into counters. The fold only sums, so the report
//! is the same whatever order sessions finished in.

use crate::metrics::LatencyHistogram;
use crate::session::SessionOutcome;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Running totals over session outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportAccumulator {
    pub sessions: u64,
    pub successful: u64,
    pub registered: u64,
    pub total_orders: u64,
    pub skipped_orders: u64,
    pub latency: LatencyHistogram,
}

impl ReportAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one outcome in.
    pub fn record(&mut self, outcome: &SessionOutcome) {
        self.sessions += 1;
        if outcome.success {
            self.successful += 1;
        }
        if outcome.registered {
            self.registered += 1;
        }
        self.total_orders += outcome.orders_sent;
        self.skipped_orders += outcome.orders_skipped;
        self.latency.merge(&outcome.latency);
    }

    /// Combine two partial folds.
    pub fn merge(&mut self, other: &ReportAccumulator) {
        self.sessions += other.sessions;
        self.successful += other.successful;
        self.registered += other.registered;
        self.total_orders += other.total_orders;
        self.skipped_orders += other.skipped_orders;
        self.latency.merge(&other.latency);
    }

    /// Freeze the totals into a report for a run that took `wall_clock`.
    pub fn finish(&self, wall_clock: Duration) -> AggregateReport {
        let seconds = wall_clock.as_secs_f64();
        let throughput = if seconds > 0.0 {
            self.total_orders as f64 / seconds
        } else {
            0.0
        };
        let average_per_success = if self.successful > 0 {
            self.total_orders as f64 / self.successful as f64
        } else {
            0.0
        };

        AggregateReport {
            sessions: self.sessions,
            successful: self.successful,
            failed: self.sessions - self.successful,
            registered: self.registered,
            total_orders: self.total_orders,
            skipped_orders: self.skipped_orders,
            wall_clock,
            throughput,
            average_per_success,
            latency: self.latency.clone(),
        }
    }
}

impl<'a> Extend<&'a SessionOutcome> for ReportAccumulator {
    fn extend<I: IntoIterator<Item = &'a SessionOutcome>>(&mut self, iter: I) {
        for outcome in iter {
            self.record(outcome);
        }
    }
}

/// Final summary of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub sessions: u64,
    pub successful: u64,
    pub failed: u64,
    /// Sessions whose registration acknowledgement was recognized
    pub registered: u64,
    pub total_orders: u64,
    pub skipped_orders: u64,
    pub wall_clock: Duration,
    /// Orders per second of wall-clock time
    pub throughput: f64,
    pub average_per_success: f64,
    pub latency: LatencyHistogram,
}

impl AggregateReport {
    /// Plain-text summary for the console.
    pub fn render(&self) -> String {
        let rule = "=".repeat(70);
        let mut lines = vec![
            rule.clone(),
            "Simulation Complete".to_string(),
            rule.clone(),
            format!("Successful traders:          {}", self.successful),
            format!("Failed traders:              {}", self.failed),
            format!("Registration confirmed:      {}", self.registered),
            format!("Total time:                  {:.2} seconds", self.wall_clock.as_secs_f64()),
            format!("Total orders submitted:      {}", self.total_orders),
            format!("Orders skipped (I/O faults): {}", self.skipped_orders),
            format!("Average orders per trader:   {:.1}", self.average_per_success),
            format!("Orders per second:           {:.1}", self.throughput),
        ];
        if self.latency.total() > 0 {
            lines.push("Round-trip latency:".to_string());
            lines.push(self.latency.summary());
        }
        lines.push(rule);
        lines.join("\n")
    }
}

/// Build the report for a completed run.
pub fn compute_report(outcomes: &[SessionOutcome], wall_clock: Duration) -> AggregateReport {
    let mut acc = ReportAccumulator::new();
    acc.extend(outcomes);
    acc.finish(wall_clock)
}
