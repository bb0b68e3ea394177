//! End-to-end demo: three weighted groups, static routing, scripted generator.
//!
//! Run with: `cargo run --example weighted_fanout`

use async_trait::async_trait;
use converge::{EngineConfig, Generator, Request};
use std::sync::Arc;

const CONFIG: &str = r#"
deadline_secs: 10
groups:
  - name: BusinessStrategy
    weight: 0.5
    specialty: "market and business strategy"
    workers:
      - id: strategy-options
        instruction: "Lay out the strategic options with tradeoffs."
        capabilities: [planning]
      - id: strategy-risks
        instruction: "Stress-test the options for downside risk."
        capabilities: [risk]
  - name: AnalysisIntelligence
    weight: 0.3
    specialty: "data analysis"
    workers:
      - id: analyst
        instruction: "Extract the relevant numbers and trends."
  - name: Research
    weight: 0.2
    specialty: "background research"
    workers:
      - id: researcher
        instruction: "Summarize relevant prior art and context."
routes:
  plan: [BusinessStrategy, AnalysisIntelligence]
  analyze: [AnalysisIntelligence]
"#;

/// Stands in for a real model call; answers depend only on the instruction.
struct ScriptedGenerator;

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, instruction: &str, input: &str) -> converge::Result<String> {
        Ok(format!(
            "({instruction}) Considered: {}",
            input.chars().take(60).collect::<String>()
        ))
    }

    fn generator_type(&self) -> &str {
        "scripted"
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let orchestrator =
        EngineConfig::from_yaml(CONFIG)?.into_orchestrator(Arc::new(ScriptedGenerator))?;

    for request in [
        Request::new("Should we enter the APAC market next quarter?").with_command("plan"),
        Request::new("Summarize everything we know about supplier churn."),
    ] {
        let decision = orchestrator.run(&request).await?;
        println!("== {:?}", request.command);
        println!("confidence: {:.3}", decision.confidence);
        println!(
            "groups: {} considered, {} failed",
            decision.groups_considered, decision.groups_failed
        );
        println!("{}\n", decision.text);
    }

    let report = orchestrator.report();
    println!("total runs: {}", report.total_runs);
    for (group, perf) in &report.per_group {
        println!(
            "  {group}: {} runs, avg confidence {:.3}, avg latency {:?}",
            perf.runs, perf.avg_confidence, perf.avg_latency
        );
    }

    Ok(())
}
