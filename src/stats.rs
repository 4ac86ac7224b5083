//! Self-monitoring counters for the poll loop
//!
//! Tracks how much the scheduler has done and how often things went wrong,
//! so a shutdown (or a debug log line) can summarize the run.

use chrono::{DateTime, Utc};
use log::info;

/// Counters accumulated by the scheduler over its lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailStats {
    /// When the scheduler was created
    pub started_at: DateTime<Utc>,
    /// Completed passes over the registry
    pub passes: u64,
    /// Records accepted by the sink
    pub records_forwarded: u64,
    /// Records the sink refused
    pub sink_failures: u64,
    /// Polls that ended in a transient error
    pub transient_errors: u64,
    /// Files replaced under a monitored path
    pub rotations: u64,
    /// Files truncated in place
    pub truncations: u64,
    /// Checkpoint writes that failed
    pub persist_failures: u64,
}

impl Default for TailStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TailStats {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            passes: 0,
            records_forwarded: 0,
            sink_failures: 0,
            transient_errors: 0,
            rotations: 0,
            truncations: 0,
            persist_failures: 0,
        }
    }

    /// Log a one-line summary at info level
    pub fn log_summary(&self) {
        let uptime = Utc::now() - self.started_at;
        info!(
            "Tail statistics after {}s: {} passes, {} records forwarded, {} sink failures, \
             {} transient errors, {} rotations, {} truncations, {} persist failures",
            uptime.num_seconds(),
            self.passes,
            self.records_forwarded,
            self.sink_failures,
            self.transient_errors,
            self.rotations,
            self.truncations,
            self.persist_failures
        );
    }
}
