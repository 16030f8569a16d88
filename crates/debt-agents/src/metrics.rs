//! Per-scan metrics.
//!
//! A collector accumulates phase timings and counters during the run and
//! finalizes into the snapshot attached to the scan outcome.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Snapshot of one scan's activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanMetrics {
    /// Wall-clock per phase, in order of execution.
    pub phase_ms: BTreeMap<String, u64>,
    /// Findings discovered per agent role.
    pub findings_by_agent: BTreeMap<String, usize>,
    pub llm_calls: u32,
    pub debates: usize,
    pub conflicts: usize,
    pub validated: usize,
    pub rejected: usize,
    pub merged: usize,
    pub errors: usize,
    pub total_ms: u64,
}

/// Accumulates metrics while the pipeline runs.
pub struct MetricsCollector {
    started: Instant,
    phase_started: Option<(String, Instant)>,
    metrics: ScanMetrics,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            phase_started: None,
            metrics: ScanMetrics::default(),
        }
    }

    /// Close the previous phase (if any) and start timing a new one.
    pub fn enter_phase(&mut self, name: &str) {
        self.close_phase();
        self.phase_started = Some((name.to_string(), Instant::now()));
    }

    fn close_phase(&mut self) {
        if let Some((name, started)) = self.phase_started.take() {
            self.metrics
                .phase_ms
                .insert(name, started.elapsed().as_millis() as u64);
        }
    }

    pub fn record_agent(&mut self, role: &str, findings: usize, llm_calls: u32) {
        *self
            .metrics
            .findings_by_agent
            .entry(role.to_string())
            .or_insert(0) += findings;
        self.metrics.llm_calls += llm_calls;
    }

    pub fn record_debates(&mut self, count: usize) {
        self.metrics.debates += count;
    }

    pub fn record_conflicts(&mut self, count: usize) {
        self.metrics.conflicts += count;
    }

    pub fn record_outcome(&mut self, validated: usize, rejected: usize, merged: usize) {
        self.metrics.validated = validated;
        self.metrics.rejected = rejected;
        self.metrics.merged = merged;
    }

    pub fn record_errors(&mut self, count: usize) {
        self.metrics.errors = count;
    }

    pub fn finalize(mut self) -> ScanMetrics {
        self.close_phase();
        self.metrics.total_ms = self.started.elapsed().as_millis() as u64;
        self.metrics
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_are_timed_in_entry_order() {
        let mut collector = MetricsCollector::new();
        collector.enter_phase("discovery");
        collector.record_agent("scanner", 3, 2);
        collector.enter_phase("debate");
        collector.record_agent("critic", 0, 3);
        let metrics = collector.finalize();
        assert!(metrics.phase_ms.contains_key("discovery"));
        assert!(metrics.phase_ms.contains_key("debate"));
        assert_eq!(metrics.findings_by_agent["scanner"], 3);
        assert_eq!(metrics.llm_calls, 5);
    }
}
