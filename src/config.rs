//! Engine configuration from YAML
//!
//! The startup surface of the engine: a list of weighted group definitions,
//! the router command table, and run-level knobs. Loading is strict —
//! anything structurally valid but semantically wrong (zero weight, route
//! to a group that does not exist, worker-less group) fails at construction,
//! not at run time.

use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::group::Group;
use crate::history::{ExecutionHistory, DEFAULT_HISTORY_CAPACITY};
use crate::orchestrator::Orchestrator;
use crate::request::Request;
use crate::router::Router;
use crate::synthesizer::Synthesizer;
use crate::worker::{Worker, WorkerSpec};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine-wide per-run deadline in seconds
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    /// Number of run records retained by the history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Weighted group definitions
    pub groups: Vec<GroupConfig>,
    /// Router command table: command -> group names
    #[serde(default)]
    pub routes: HashMap<String, Vec<String>>,
}

/// One group definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Unique group name
    pub name: String,
    /// Importance weight in (0, 1]
    pub weight: f64,
    /// Specialty area folded into each member's prompt
    pub specialty: String,
    /// Member definitions
    pub workers: Vec<WorkerConfig>,
}

/// One worker definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Unique worker id
    pub id: String,
    /// Instruction handed to the generator on every execution
    pub instruction: String,
    /// Capability tags for diagnostics
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    /// Optional fixed confidence reported on success
    #[serde(default)]
    pub confidence: Option<f64>,
}

fn default_deadline_secs() -> u64 {
    30
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl EngineConfig {
    /// Load configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("failed to parse YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::config(format!("failed to read file: {e}")))?;
        Self::from_yaml(&content)
    }

    /// Check the configuration for semantic mistakes
    pub fn validate(&self) -> Result<()> {
        if self.groups.is_empty() {
            return Err(Error::config("at least one group is required"));
        }
        if self.deadline_secs == 0 {
            return Err(Error::config("deadline_secs must be positive"));
        }

        for group in &self.groups {
            if !(group.weight > 0.0 && group.weight <= 1.0) {
                return Err(Error::config(format!(
                    "group {:?} has weight {} outside (0, 1]",
                    group.name, group.weight
                )));
            }
            if group.workers.is_empty() {
                return Err(Error::config(format!("group {:?} has no workers", group.name)));
            }
            for worker in &group.workers {
                if let Some(confidence) = worker.confidence {
                    if !(0.0..=1.0).contains(&confidence) {
                        return Err(Error::config(format!(
                            "worker {:?} has confidence {confidence} outside [0, 1]",
                            worker.id
                        )));
                    }
                }
            }
        }

        // Duplicate names and route targets are re-checked by the builder;
        // checking here keeps file-load errors close to the file.
        let known: std::collections::HashSet<&str> =
            self.groups.iter().map(|g| g.name.as_str()).collect();
        if known.len() != self.groups.len() {
            return Err(Error::config("duplicate group names"));
        }
        Router::from_table(self.routes.clone()).validate(&known)?;

        Ok(())
    }

    /// Build an orchestrator from this configuration and a generator
    pub fn into_orchestrator(self, generator: Arc<dyn Generator>) -> Result<Orchestrator> {
        self.validate()?;

        let synthesizer = Arc::new(Synthesizer::new(generator.clone()));
        let mut builder = Orchestrator::builder()
            .router(Router::from_table(self.routes))
            .synthesizer(synthesizer.clone())
            .history(Arc::new(ExecutionHistory::new(self.history_capacity)))
            .deadline(Duration::from_secs(self.deadline_secs));

        for group_config in self.groups {
            let workers = group_config
                .workers
                .into_iter()
                .map(|w| build_worker(w, &group_config.name, &group_config.specialty, &generator))
                .collect();
            builder = builder.group(Group::new(
                group_config.name,
                group_config.weight,
                group_config.specialty,
                workers,
                synthesizer.clone(),
            ));
        }

        builder.build()
    }
}

fn build_worker(
    config: WorkerConfig,
    group_name: &str,
    specialty: &str,
    generator: &Arc<dyn Generator>,
) -> Worker {
    let mut spec = WorkerSpec::new(config.id, group_name);
    spec.capabilities = config.capabilities;

    let specialty = specialty.to_string();
    let mut worker = Worker::new(spec, config.instruction, generator.clone()).with_shaper(
        Arc::new(move |_: &WorkerSpec, request: &Request| {
            format!("[{specialty}] {}", request.text)
        }),
    );
    if let Some(confidence) = config.confidence {
        worker = worker.with_fixed_confidence(confidence);
    }
    worker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::stubs::StaticGenerator;

    const FULL: &str = r#"
deadline_secs: 10
groups:
  - name: BusinessStrategy
    weight: 0.5
    specialty: "market and business strategy"
    workers:
      - id: strategy-1
        instruction: "Lay out strategic options."
        capabilities: [planning, swot]
      - id: strategy-2
        instruction: "Stress-test the options."
        confidence: 0.8
  - name: AnalysisIntelligence
    weight: 0.3
    specialty: "data analysis"
    workers:
      - id: analyst-1
        instruction: "Extract the numbers."
routes:
  plan: [BusinessStrategy, AnalysisIntelligence]
  analyze: [AnalysisIntelligence]
  status: []
"#;

    #[test]
    fn parses_a_full_config() {
        let config = EngineConfig::from_yaml(FULL).unwrap();
        assert_eq!(config.deadline_secs, 10);
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(config.groups.len(), 2);
        assert_eq!(config.groups[0].workers[1].confidence, Some(0.8));
        assert_eq!(config.routes["status"], Vec::<String>::new());
    }

    #[test]
    fn deadline_defaults_when_omitted() {
        let config = EngineConfig::from_yaml(
            r#"
groups:
  - name: A
    weight: 0.5
    specialty: s
    workers:
      - id: a-1
        instruction: i
"#,
        )
        .unwrap();
        assert_eq!(config.deadline_secs, 30);
    }

    #[test]
    fn rejects_zero_weight() {
        let err = EngineConfig::from_yaml(
            r#"
groups:
  - name: A
    weight: 0.0
    specialty: s
    workers:
      - id: a-1
        instruction: i
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("weight"));
    }

    #[test]
    fn rejects_worker_less_group() {
        let err = EngineConfig::from_yaml(
            r#"
groups:
  - name: A
    weight: 0.5
    specialty: s
    workers: []
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("no workers"));
    }

    #[test]
    fn rejects_route_to_unknown_group() {
        let err = EngineConfig::from_yaml(
            r#"
groups:
  - name: A
    weight: 0.5
    specialty: s
    workers:
      - id: a-1
        instruction: i
routes:
  plan: [Ghost]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Ghost"));
    }

    #[test]
    fn rejects_out_of_range_worker_confidence() {
        let err = EngineConfig::from_yaml(
            r#"
groups:
  - name: A
    weight: 0.5
    specialty: s
    workers:
      - id: a-1
        instruction: i
        confidence: 1.5
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("confidence"));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, FULL).unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.groups.len(), 2);
    }

    #[tokio::test]
    async fn builds_a_working_orchestrator() {
        let config = EngineConfig::from_yaml(FULL).unwrap();
        let orchestrator = config
            .into_orchestrator(Arc::new(StaticGenerator("content")))
            .unwrap();

        let specs = orchestrator.group_specs();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "BusinessStrategy");
        assert_eq!(specs[0].workers.len(), 2);

        let decision = orchestrator
            .run(&Request::new("q").with_command("analyze"))
            .await
            .unwrap();
        assert_eq!(decision.groups_considered, 1);
        assert!(decision.confidence > 0.0);
    }
}
