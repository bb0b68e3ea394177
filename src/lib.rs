//! # Converge
//!
//! A weighted multi-group fan-out/fan-in orchestration and synthesis engine.
//!
//! A request is fanned out to several named worker groups, each holding
//! multiple specialized workers. Every worker produces an independent
//! [`PartialResult`]; results are synthesized per group, then combined across
//! groups using importance weights into one [`FinalDecision`]. Weights are
//! renormalized over the groups that actually produced a usable result, so a
//! sibling group failing never silently down-weights the groups that
//! delivered.
//!
//! ## Features
//!
//! - **Two-level concurrent fan-out**: groups run in parallel, workers run in
//!   parallel inside each group, all under one shared deadline
//! - **Failure as data**: worker and group failures degrade confidence
//!   instead of propagating errors
//! - **Deterministic synthesis math**: weighting and aggregation are owned by
//!   the engine; only prose passes through the pluggable [`Generator`]
//! - **Static routing**: a command table selects group subsets, falling back
//!   to all groups for anything it does not recognize
//! - **Built-in diagnostics**: an append-only run history with a per-group
//!   performance report
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use converge::{EngineConfig, HttpGenerator, Request};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> converge::Result<()> {
//!     let generator = Arc::new(HttpGenerator::from_env()?);
//!     let orchestrator =
//!         EngineConfig::from_file("engine.yaml")?.into_orchestrator(generator)?;
//!
//!     let decision = orchestrator
//!         .run(&Request::new("Should we enter the APAC market?").with_command("plan"))
//!         .await?;
//!
//!     println!("{} (confidence {:.2})", decision.text, decision.confidence);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod generator;
pub mod group;
pub mod history;
pub mod http;
pub mod orchestrator;
pub mod request;
pub mod router;
pub mod synthesizer;
pub mod worker;

// Re-exports for convenience
pub use config::{EngineConfig, GroupConfig, WorkerConfig};
pub use error::{Error, Result};
pub use generator::Generator;
pub use group::{Group, GroupSpec};
pub use history::{
    ExecutionHistory, ExecutionRecord, GroupPerformance, PerformanceReport, RunId,
};
pub use http::{HttpGenerator, HttpGeneratorConfig};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, DEFAULT_DEADLINE};
pub use request::Request;
pub use router::Router;
pub use synthesizer::{FinalDecision, GroupSummary, Synthesizer};
pub use worker::{ConfidenceSource, PartialResult, Worker, WorkerErrorKind, WorkerSpec};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::error::{Error, Result};
    pub use crate::generator::Generator;
    pub use crate::group::Group;
    pub use crate::orchestrator::Orchestrator;
    pub use crate::request::Request;
    pub use crate::router::Router;
    pub use crate::synthesizer::{FinalDecision, Synthesizer};
    pub use crate::worker::Worker;
}
