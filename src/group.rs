//! Named, weighted worker groups
//!
//! A group executes its members concurrently, harvests every outcome
//! (including panics) as data, and reduces them into one [`GroupSummary`].
//! A group failing entirely is a normal result the orchestrator tolerates,
//! never an error.

use crate::request::Request;
use crate::synthesizer::{GroupSummary, Synthesizer};
use crate::worker::{PartialResult, Worker, WorkerErrorKind, WorkerSpec};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Immutable description of a group: configuration, not runtime state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Unique group name
    pub name: String,
    /// Importance weight in (0, 1]
    pub weight: f64,
    /// Specialty area shared by the members
    pub specialty: String,
    /// Member descriptions
    pub workers: Vec<WorkerSpec>,
}

/// A named, weighted collection of workers sharing a specialty
pub struct Group {
    name: String,
    weight: f64,
    specialty: String,
    workers: Vec<Arc<Worker>>,
    synthesizer: Arc<Synthesizer>,
}

impl Group {
    /// Create a new group
    pub fn new(
        name: impl Into<String>,
        weight: f64,
        specialty: impl Into<String>,
        workers: Vec<Worker>,
        synthesizer: Arc<Synthesizer>,
    ) -> Self {
        Self {
            name: name.into(),
            weight,
            specialty: specialty.into(),
            workers: workers.into_iter().map(Arc::new).collect(),
            synthesizer,
        }
    }

    /// Group name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured importance weight
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Specialty area
    pub fn specialty(&self) -> &str {
        &self.specialty
    }

    /// Number of member workers
    pub fn member_count(&self) -> usize {
        self.workers.len()
    }

    /// Immutable snapshot of this group's configuration
    pub fn spec(&self) -> GroupSpec {
        GroupSpec {
            name: self.name.clone(),
            weight: self.weight,
            specialty: self.specialty.clone(),
            workers: self.workers.iter().map(|w| w.spec().clone()).collect(),
        }
    }

    /// Run all members concurrently and reduce their results
    ///
    /// Each member runs as its own task under the group deadline (members run
    /// in parallel, so every one gets the full budget without any of them
    /// exceeding it). A panicking member is folded into a `Panicked` partial;
    /// its siblings are unaffected.
    pub async fn run(&self, request: &Request, deadline: Duration) -> GroupSummary {
        debug!(group = %self.name, members = self.workers.len(), "dispatching group");

        let ids: Vec<String> = self.workers.iter().map(|w| w.id().to_string()).collect();
        let handles: Vec<_> = self
            .workers
            .iter()
            .map(|worker| {
                let worker = worker.clone();
                let request = request.clone();
                tokio::spawn(async move { worker.execute(&request, deadline).await })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (id, joined) in ids.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(partial) => results.push(partial),
                Err(e) => {
                    warn!(group = %self.name, worker = %id, error = %e, "worker task panicked");
                    results.push(PartialResult::failure(
                        id,
                        WorkerErrorKind::Panicked,
                        Duration::ZERO,
                    ));
                }
            }
        }

        self.synthesizer
            .reduce_group(&self.name, self.weight, results)
            .await
    }
}
