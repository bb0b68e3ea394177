//! Top-level coordination
//!
//! One `run` walks a fixed pipeline: route, dispatch every selected group
//! concurrently under a single shared deadline, collect whatever summaries
//! come back (total-failure groups included), reduce, record, return. The
//! only error a caller can see at run time is `NoGroupsSelected`; everything
//! below the orchestrator boundary is converted into lower-confidence data.

use crate::error::{Error, Result};
use crate::group::{Group, GroupSpec};
use crate::history::{ExecutionHistory, ExecutionRecord, PerformanceReport};
use crate::request::Request;
use crate::router::Router;
use crate::synthesizer::{FinalDecision, GroupSummary, Synthesizer};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Default engine-wide deadline per run
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// The top-level coordinator
///
/// Groups, router, and synthesizer are frozen at construction; the history
/// is the only state shared across concurrent `run` calls.
pub struct Orchestrator {
    groups: Vec<Arc<Group>>,
    router: Router,
    synthesizer: Arc<Synthesizer>,
    history: Arc<ExecutionHistory>,
    deadline: Duration,
}

impl Orchestrator {
    /// Create an orchestrator builder
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Immutable snapshot of the registered groups
    pub fn group_specs(&self) -> Vec<GroupSpec> {
        self.groups.iter().map(|g| g.spec()).collect()
    }

    /// The run history
    pub fn history(&self) -> &ExecutionHistory {
        &self.history
    }

    /// Read-only performance report over recorded runs
    pub fn report(&self) -> PerformanceReport {
        self.history.report()
    }

    /// Orchestrate one request into a final decision
    ///
    /// Errors only when the router selects zero groups (a configuration
    /// mistake). A run where every group fails still returns a
    /// `FinalDecision` with zero confidence and explanatory text.
    pub async fn run(&self, request: &Request) -> Result<FinalDecision> {
        let start = Instant::now();

        let selected = self.router.select(request.command.as_deref(), &self.groups);
        if selected.is_empty() {
            return Err(Error::NoGroupsSelected(request.command.clone()));
        }
        info!(
            command = ?request.command,
            groups = selected.len(),
            "dispatching request"
        );

        let deadline = self.deadline;
        let metas: Vec<(String, f64, usize)> = selected
            .iter()
            .map(|g| (g.name().to_string(), g.weight(), g.member_count()))
            .collect();
        let handles: Vec<_> = selected
            .iter()
            .map(|group| {
                let group = group.clone();
                let request = request.clone();
                tokio::spawn(async move {
                    tokio::time::timeout(deadline, group.run(&request, deadline)).await
                })
            })
            .collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for ((name, weight, members), joined) in metas.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(Ok(summary)) => summaries.push(summary),
                Ok(Err(_)) => {
                    warn!(group = %name, ?deadline, "group exceeded the run deadline");
                    summaries.push(GroupSummary::total_failure(name, weight, members));
                }
                Err(e) => {
                    warn!(group = %name, error = %e, "group task panicked");
                    summaries.push(GroupSummary::total_failure(name, weight, members));
                }
            }
        }

        let mut decision = self.synthesizer.reduce_final(request, &summaries).await;
        decision.total_latency = start.elapsed();

        // Best effort; recording must never fail the primary request.
        self.history.append(ExecutionRecord::from_run(
            request.command.clone(),
            &summaries,
            decision.confidence,
            decision.total_latency,
        ));

        info!(
            confidence = decision.confidence,
            groups_failed = decision.groups_failed,
            latency_ms = decision.total_latency.as_millis() as u64,
            "run complete"
        );
        Ok(decision)
    }
}

/// Builder for [`Orchestrator`] with fail-fast validation
pub struct OrchestratorBuilder {
    groups: Vec<Group>,
    router: Router,
    synthesizer: Option<Arc<Synthesizer>>,
    history: Option<Arc<ExecutionHistory>>,
    deadline: Duration,
}

impl OrchestratorBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            router: Router::new(),
            synthesizer: None,
            history: None,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Add a group
    pub fn group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Set the router
    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Set the synthesizer (required)
    pub fn synthesizer(mut self, synthesizer: Arc<Synthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Use an existing history instead of a fresh default one
    pub fn history(mut self, history: Arc<ExecutionHistory>) -> Self {
        self.history = Some(history);
        self
    }

    /// Set the engine-wide per-run deadline
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Validate the configuration and build the orchestrator
    pub fn build(self) -> Result<Orchestrator> {
        if self.groups.is_empty() {
            return Err(Error::config("at least one group is required"));
        }

        let mut seen = HashSet::new();
        for group in &self.groups {
            if !(group.weight() > 0.0 && group.weight() <= 1.0) {
                return Err(Error::config(format!(
                    "group {:?} has weight {} outside (0, 1]",
                    group.name(),
                    group.weight()
                )));
            }
            if !seen.insert(group.name().to_string()) {
                return Err(Error::config(format!(
                    "duplicate group name {:?}",
                    group.name()
                )));
            }
        }

        let known: HashSet<&str> = self.groups.iter().map(|g| g.name()).collect();
        self.router.validate(&known)?;

        let synthesizer = self
            .synthesizer
            .ok_or_else(|| Error::config("a synthesizer is required"))?;

        Ok(Orchestrator {
            groups: self.groups.into_iter().map(Arc::new).collect(),
            router: self.router,
            synthesizer,
            history: self.history.unwrap_or_default(),
            deadline: self.deadline,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::stubs::{FailingGenerator, SleepyGenerator, StaticGenerator};
    use crate::generator::Generator;
    use crate::worker::{Worker, WorkerSpec};

    fn single_worker_group(
        name: &str,
        weight: f64,
        confidence: f64,
        generator: Arc<dyn Generator>,
        synthesizer: &Arc<Synthesizer>,
    ) -> Group {
        let worker = Worker::new(WorkerSpec::new(format!("{name}-1"), name), "answer", generator)
            .with_fixed_confidence(confidence);
        Group::new(name, weight, "testing", vec![worker], synthesizer.clone())
    }

    fn engine(fail_group_a: bool) -> Orchestrator {
        let generator: Arc<dyn Generator> = Arc::new(StaticGenerator("content"));
        let synthesizer = Arc::new(Synthesizer::new(generator.clone()));
        let a_generator: Arc<dyn Generator> = if fail_group_a {
            Arc::new(FailingGenerator)
        } else {
            generator.clone()
        };

        Orchestrator::builder()
            .group(single_worker_group("A", 0.5, 0.9, a_generator, &synthesizer))
            .group(single_worker_group("B", 0.3, 0.6, generator.clone(), &synthesizer))
            .group(single_worker_group("C", 0.2, 0.8, generator, &synthesizer))
            .router(Router::new().with_route("status", Vec::<String>::new()))
            .synthesizer(synthesizer)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn all_groups_succeeding_uses_configured_weights() {
        let decision = engine(false).run(&Request::new("q")).await.unwrap();

        // 0.5 * 0.9 + 0.3 * 0.6 + 0.2 * 0.8
        assert!((decision.confidence - 0.79).abs() < 1e-9);
        assert_eq!(decision.groups_considered, 3);
        assert_eq!(decision.groups_failed, 0);
        assert_eq!(decision.request_echo, "q");
    }

    #[tokio::test]
    async fn losing_a_group_renormalizes_instead_of_deflating() {
        let decision = engine(true).run(&Request::new("q")).await.unwrap();

        // A fails; 0.3 and 0.2 renormalize to 0.6 and 0.4.
        assert!((decision.confidence - 0.68).abs() < 1e-9);
        assert_eq!(decision.groups_failed, 1);
        assert!(!decision.per_group_weights.contains_key("A"));
        assert!((decision.per_group_weights["B"] - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn command_routed_to_zero_groups_is_a_hard_error() {
        let err = engine(false)
            .run(&Request::new("q").with_command("status"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NoGroupsSelected(Some(ref c)) if c == "status"));
    }

    #[tokio::test]
    async fn every_group_failing_is_a_reportable_decision_not_an_error() {
        let generator: Arc<dyn Generator> = Arc::new(FailingGenerator);
        let synthesizer = Arc::new(Synthesizer::new(generator.clone()));
        let orchestrator = Orchestrator::builder()
            .group(single_worker_group("A", 0.5, 0.9, generator, &synthesizer))
            .synthesizer(synthesizer)
            .build()
            .unwrap();

        let decision = orchestrator.run(&Request::new("q")).await.unwrap();
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.groups_failed, 1);
        assert!(!decision.text.is_empty());
    }

    #[tokio::test]
    async fn deadline_bounds_the_whole_run() {
        let fast: Arc<dyn Generator> = Arc::new(StaticGenerator("content"));
        let slow: Arc<dyn Generator> = Arc::new(SleepyGenerator(Duration::from_secs(30)));
        let synthesizer = Arc::new(Synthesizer::new(fast.clone()));
        let orchestrator = Orchestrator::builder()
            .group(single_worker_group("Slow", 0.5, 0.9, slow, &synthesizer))
            .group(single_worker_group("Fast", 0.3, 0.6, fast, &synthesizer))
            .synthesizer(synthesizer)
            .deadline(Duration::from_millis(100))
            .build()
            .unwrap();

        let start = Instant::now();
        let decision = orchestrator.run(&Request::new("q")).await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(decision.groups_failed, 1);
        // The fast group finished before the deadline and still counts.
        assert!((decision.confidence - 0.6).abs() < 1e-9);
        assert!((decision.per_group_weights["Fast"] - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn runs_are_recorded_in_history() {
        let orchestrator = engine(false);
        orchestrator.run(&Request::new("one")).await.unwrap();
        orchestrator
            .run(&Request::new("two").with_command("unknown"))
            .await
            .unwrap();

        let report = orchestrator.report();
        assert_eq!(report.total_runs, 2);
        assert_eq!(report.per_group["A"].runs, 2);
        assert!((report.per_group["A"].avg_confidence - 0.9).abs() < 1e-9);

        let snapshot = orchestrator.history().snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].command.as_deref(), Some("unknown"));
    }

    #[tokio::test]
    async fn builder_rejects_misconfiguration() {
        let generator: Arc<dyn Generator> = Arc::new(StaticGenerator("x"));
        let synthesizer = Arc::new(Synthesizer::new(generator.clone()));

        let no_groups = Orchestrator::builder()
            .synthesizer(synthesizer.clone())
            .build();
        assert!(matches!(no_groups, Err(Error::Config(_))));

        let bad_weight = Orchestrator::builder()
            .group(single_worker_group("A", 0.0, 0.9, generator.clone(), &synthesizer))
            .synthesizer(synthesizer.clone())
            .build();
        assert!(matches!(bad_weight, Err(Error::Config(_))));

        let duplicate = Orchestrator::builder()
            .group(single_worker_group("A", 0.5, 0.9, generator.clone(), &synthesizer))
            .group(single_worker_group("A", 0.3, 0.6, generator.clone(), &synthesizer))
            .synthesizer(synthesizer.clone())
            .build();
        assert!(matches!(duplicate, Err(Error::Config(_))));

        let ghost_route = Orchestrator::builder()
            .group(single_worker_group("A", 0.5, 0.9, generator, &synthesizer))
            .router(Router::new().with_route("plan", ["Ghost"]))
            .synthesizer(synthesizer)
            .build();
        assert!(matches!(ghost_route, Err(Error::Config(_))));
    }
}
