//! Worker execution and partial results
//!
//! A worker wraps one named capability and a prompt-shaping step, invokes the
//! injected [`Generator`] under its deadline, and packages whatever happened
//! as a [`PartialResult`]. Execution never fails across the worker boundary:
//! generator errors, blank output, and deadline expiry all come back as
//! `ok: false` data for the group to aggregate.

use crate::generator::Generator;
use crate::request::Request;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Immutable description of what a worker claims to do
///
/// Created at engine construction time and never mutated. Capabilities are
/// diagnostics, not dispatch logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSpec {
    /// Unique worker identifier
    pub id: String,
    /// Name of the group this worker belongs to
    pub group_name: String,
    /// Capability tags for diagnostics
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
}

impl WorkerSpec {
    /// Create a new worker spec
    pub fn new(id: impl Into<String>, group_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group_name: group_name.into(),
            capabilities: BTreeSet::new(),
        }
    }

    /// Add a capability tag
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }
}

/// Why a worker's execution produced no usable content
///
/// This is data, not a propagated error: it travels inside
/// [`PartialResult`] and is only ever inspected for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerErrorKind {
    /// The generator call returned an error
    GeneratorFailed,
    /// The generator returned blank output
    EmptyOutput,
    /// The deadline elapsed before the generator answered
    Canceled,
    /// The worker task panicked
    Panicked,
}

impl fmt::Display for WorkerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GeneratorFailed => "generator_failed",
            Self::EmptyOutput => "empty_output",
            Self::Canceled => "canceled",
            Self::Panicked => "panicked",
        };
        write!(f, "{s}")
    }
}

/// One worker's independent result for a single request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialResult {
    /// Id of the worker that produced this result
    pub worker_id: String,
    /// Generated content (empty on failure)
    pub content: String,
    /// Confidence in [0, 1]; 0 on failure
    pub confidence: f64,
    /// Wall-clock execution time
    pub latency: Duration,
    /// Whether the worker produced usable content
    pub ok: bool,
    /// Failure classification when `ok` is false
    pub error_kind: Option<WorkerErrorKind>,
}

impl PartialResult {
    /// Create a successful result
    pub fn success(
        worker_id: impl Into<String>,
        content: impl Into<String>,
        confidence: f64,
        latency: Duration,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            content: content.into(),
            confidence: confidence.clamp(0.0, 1.0),
            latency,
            ok: true,
            error_kind: None,
        }
    }

    /// Create a failed result with zero confidence
    pub fn failure(worker_id: impl Into<String>, kind: WorkerErrorKind, latency: Duration) -> Self {
        Self {
            worker_id: worker_id.into(),
            content: String::new(),
            confidence: 0.0,
            latency,
            ok: false,
            error_kind: Some(kind),
        }
    }
}

/// Where a worker's confidence score comes from
#[derive(Debug, Clone, Copy)]
pub enum ConfidenceSource {
    /// Deterministic length-scaled score from the generated content
    Heuristic,
    /// Fixed score for every successful execution
    Fixed(f64),
}

/// Closure that turns a request into the generator input for one worker
pub type PromptShaper = dyn Fn(&WorkerSpec, &Request) -> String + Send + Sync;

/// A single unit of work: one capability, one generator call per request
///
/// Workers are stateless across invocations; any adaptation or learning lives
/// outside this engine.
pub struct Worker {
    spec: WorkerSpec,
    instruction: String,
    confidence: ConfidenceSource,
    shaper: Option<Arc<PromptShaper>>,
    generator: Arc<dyn Generator>,
}

impl Worker {
    /// Create a new worker
    pub fn new(
        spec: WorkerSpec,
        instruction: impl Into<String>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            spec,
            instruction: instruction.into(),
            confidence: ConfidenceSource::Heuristic,
            shaper: None,
            generator,
        }
    }

    /// Pin the confidence reported on success (clamped to [0, 1])
    pub fn with_fixed_confidence(mut self, confidence: f64) -> Self {
        self.confidence = ConfidenceSource::Fixed(confidence.clamp(0.0, 1.0));
        self
    }

    /// Set a custom prompt shaper
    pub fn with_shaper(mut self, shaper: Arc<PromptShaper>) -> Self {
        self.shaper = Some(shaper);
        self
    }

    /// Get the worker spec
    pub fn spec(&self) -> &WorkerSpec {
        &self.spec
    }

    /// Get the worker id
    pub fn id(&self) -> &str {
        &self.spec.id
    }

    /// Execute this worker for one request under the given deadline
    ///
    /// Never fails across this boundary: every internal failure is converted
    /// into a `PartialResult { ok: false, confidence: 0 }`.
    pub async fn execute(&self, request: &Request, deadline: Duration) -> PartialResult {
        let start = Instant::now();
        let input = self.shape(request);

        match tokio::time::timeout(deadline, self.generator.generate(&self.instruction, &input))
            .await
        {
            Err(_) => {
                warn!(worker = %self.spec.id, ?deadline, "worker canceled at deadline");
                PartialResult::failure(&self.spec.id, WorkerErrorKind::Canceled, start.elapsed())
            }
            Ok(Err(e)) => {
                warn!(worker = %self.spec.id, error = %e, "generator call failed");
                PartialResult::failure(
                    &self.spec.id,
                    WorkerErrorKind::GeneratorFailed,
                    start.elapsed(),
                )
            }
            Ok(Ok(content)) if content.trim().is_empty() => {
                warn!(worker = %self.spec.id, "generator returned blank output");
                PartialResult::failure(&self.spec.id, WorkerErrorKind::EmptyOutput, start.elapsed())
            }
            Ok(Ok(content)) => {
                let confidence = self.score(&content);
                PartialResult::success(&self.spec.id, content, confidence, start.elapsed())
            }
        }
    }

    fn shape(&self, request: &Request) -> String {
        match &self.shaper {
            Some(shaper) => shaper(&self.spec, request),
            None => request.text.clone(),
        }
    }

    fn score(&self, content: &str) -> f64 {
        match self.confidence {
            ConfidenceSource::Fixed(c) => c,
            ConfidenceSource::Heuristic => heuristic_confidence(content),
        }
    }
}

/// Deterministic length-scaled confidence: longer answers score higher, up to
/// a fixed cap, so repeated runs over the same content agree exactly.
fn heuristic_confidence(content: &str) -> f64 {
    const SATURATION: f64 = 800.0;
    let len = content.trim().len() as f64;
    0.5 + 0.4 * (len.min(SATURATION) / SATURATION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::stubs::{EchoGenerator, FailingGenerator, SleepyGenerator, StaticGenerator};

    fn spec() -> WorkerSpec {
        WorkerSpec::new("w-1", "Research").with_capability("search")
    }

    #[tokio::test]
    async fn successful_execution_packages_content() {
        let worker = Worker::new(spec(), "summarize", Arc::new(EchoGenerator));
        let request = Request::new("quarterly numbers");

        let result = worker.execute(&request, Duration::from_secs(1)).await;

        assert!(result.ok);
        assert_eq!(result.worker_id, "w-1");
        assert_eq!(result.content, "[summarize] quarterly numbers");
        assert!(result.error_kind.is_none());
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
    }

    #[tokio::test]
    async fn generator_failure_becomes_failed_partial() {
        let worker = Worker::new(spec(), "summarize", Arc::new(FailingGenerator));
        let result = worker
            .execute(&Request::new("x"), Duration::from_secs(1))
            .await;

        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(WorkerErrorKind::GeneratorFailed));
        assert_eq!(result.confidence, 0.0);
        assert!(result.content.is_empty());
    }

    #[tokio::test]
    async fn blank_output_is_classified_as_empty() {
        let worker = Worker::new(spec(), "summarize", Arc::new(StaticGenerator("   ")));
        let result = worker
            .execute(&Request::new("x"), Duration::from_secs(1))
            .await;

        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(WorkerErrorKind::EmptyOutput));
    }

    #[tokio::test]
    async fn deadline_expiry_is_classified_as_canceled() {
        let worker = Worker::new(
            spec(),
            "summarize",
            Arc::new(SleepyGenerator(Duration::from_secs(30))),
        );
        let start = Instant::now();
        let result = worker
            .execute(&Request::new("x"), Duration::from_millis(50))
            .await;

        assert!(!result.ok);
        assert_eq!(result.error_kind, Some(WorkerErrorKind::Canceled));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn fixed_confidence_overrides_heuristic() {
        let worker =
            Worker::new(spec(), "summarize", Arc::new(EchoGenerator)).with_fixed_confidence(0.9);
        let result = worker
            .execute(&Request::new("x"), Duration::from_secs(1))
            .await;

        assert!(result.ok);
        assert_eq!(result.confidence, 0.9);
    }

    #[tokio::test]
    async fn shaper_controls_generator_input() {
        let worker = Worker::new(spec(), "summarize", Arc::new(EchoGenerator)).with_shaper(
            Arc::new(|spec: &WorkerSpec, request: &Request| {
                format!("{}: {}", spec.group_name, request.text)
            }),
        );
        let result = worker
            .execute(&Request::new("topic"), Duration::from_secs(1))
            .await;

        assert_eq!(result.content, "[summarize] Research: topic");
    }

    #[test]
    fn heuristic_is_deterministic_and_bounded() {
        let short = heuristic_confidence("ok");
        let long = heuristic_confidence(&"x".repeat(10_000));
        assert_eq!(short, heuristic_confidence("ok"));
        assert!(short >= 0.5 && short <= 0.9);
        assert_eq!(long, 0.9);
    }
}
