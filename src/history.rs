//! Append-only execution history and performance reporting
//!
//! The history is the only state shared across concurrent runs: a
//! capacity-bounded ring of per-run records (oldest evicted) plus running
//! per-group aggregates, so reporting is cheap and never blocks appenders
//! meaningfully. Reports may be slightly stale under concurrent appends;
//! this is a diagnostics surface, not a correctness-critical path.

use crate::synthesizer::GroupSummary;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Default number of records retained in the ring
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Unique identifier for one orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-group metadata retained for one run (prose is dropped to bound memory)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Group name
    pub name: String,
    /// Configured weight
    pub weight: f64,
    /// Group confidence for this run
    pub confidence: f64,
    /// Members that succeeded
    pub succeeded: usize,
    /// Members that failed
    pub failed: usize,
    /// Group critical path: the slowest member's latency
    pub latency: Duration,
}

/// One orchestration run, summarized for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Run identifier
    pub run_id: RunId,
    /// When the run completed
    pub timestamp: DateTime<Utc>,
    /// Routing command, if any
    pub command: Option<String>,
    /// Per-group metadata
    pub groups: Vec<GroupRecord>,
    /// Final weighted confidence
    pub final_confidence: f64,
    /// Wall-clock duration of the run
    pub total_latency: Duration,
}

impl ExecutionRecord {
    /// Build a record from a run's group summaries, keeping metadata only
    pub fn from_run(
        command: Option<String>,
        summaries: &[GroupSummary],
        final_confidence: f64,
        total_latency: Duration,
    ) -> Self {
        let groups = summaries
            .iter()
            .map(|s| GroupRecord {
                name: s.group_name.clone(),
                weight: s.weight,
                confidence: s.confidence,
                succeeded: s.succeeded,
                failed: s.failed,
                latency: s
                    .members
                    .iter()
                    .map(|m| m.latency)
                    .max()
                    .unwrap_or(Duration::ZERO),
            })
            .collect();

        Self {
            run_id: RunId::new(),
            timestamp: Utc::now(),
            command,
            groups,
            final_confidence,
            total_latency,
        }
    }
}

/// Aggregate performance over one group's appearances in the history
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GroupPerformance {
    /// Runs this group participated in
    pub runs: u64,
    /// Mean confidence across those runs
    pub avg_confidence: f64,
    /// Mean group latency across those runs
    pub avg_latency: Duration,
}

/// Read-only performance report over all recorded runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Total runs ever appended (not bounded by ring capacity)
    pub total_runs: u64,
    /// Per-group aggregates
    pub per_group: HashMap<String, GroupPerformance>,
}

#[derive(Debug, Default, Clone, Copy)]
struct GroupTotals {
    runs: u64,
    confidence_sum: f64,
    latency_sum: Duration,
}

/// Concurrency-safe, capacity-bounded run history
///
/// Safe for concurrent appends from overlapping runs and concurrent report
/// reads. The running aggregates cover every appended run; the ring bounds
/// what `snapshot` retains, not what `report` counts.
pub struct ExecutionHistory {
    capacity: usize,
    records: RwLock<VecDeque<ExecutionRecord>>,
    totals: DashMap<String, GroupTotals>,
    total_runs: AtomicU64,
}

impl ExecutionHistory {
    /// Create a history retaining at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: RwLock::new(VecDeque::with_capacity(capacity.max(1).min(1024))),
            totals: DashMap::new(),
            total_runs: AtomicU64::new(0),
        }
    }

    /// Append one run record, evicting the oldest past capacity
    pub fn append(&self, record: ExecutionRecord) {
        for group in &record.groups {
            let mut totals = self.totals.entry(group.name.clone()).or_default();
            totals.runs += 1;
            totals.confidence_sum += group.confidence;
            totals.latency_sum += group.latency;
        }
        self.total_runs.fetch_add(1, Ordering::Relaxed);

        let mut records = self.records.write();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Aggregate performance report across all appended runs
    pub fn report(&self) -> PerformanceReport {
        let per_group = self
            .totals
            .iter()
            .map(|entry| {
                let totals = entry.value();
                (
                    entry.key().clone(),
                    GroupPerformance {
                        runs: totals.runs,
                        avg_confidence: totals.confidence_sum / totals.runs as f64,
                        avg_latency: totals.latency_sum / totals.runs as u32,
                    },
                )
            })
            .collect();

        PerformanceReport {
            total_runs: self.total_runs.load(Ordering::Relaxed),
            per_group,
        }
    }

    /// Clone of the retained records, oldest first
    pub fn snapshot(&self) -> Vec<ExecutionRecord> {
        self.records.read().iter().cloned().collect()
    }

    /// Number of retained records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether any record is retained
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
