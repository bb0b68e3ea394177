//! Group and final reduction
//!
//! Two reductions turn many independent results into one decision: member
//! `PartialResult`s fold into a `GroupSummary`, and group summaries fold into
//! the terminal `FinalDecision`. The combination math is deterministic and
//! owned here; only the prose passes through the [`Generator`], and a
//! generator failure falls back to sorted concatenation so partial results
//! are never lost.

use crate::generator::Generator;
use crate::request::Request;
use crate::worker::PartialResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const GROUP_SYNTHESIS_INSTRUCTION: &str =
    "Synthesize the member findings below into one coherent answer for this \
     group's specialty. Keep every load-bearing fact.";

const FINAL_SYNTHESIS_INSTRUCTION: &str =
    "Combine the group summaries below into one final answer. Give more \
     emphasis to higher-weighted groups while preserving points the others \
     contribute.";

/// One group's reduced result for a single request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    /// Group name
    pub group_name: String,
    /// Configured importance weight
    pub weight: f64,
    /// Mean confidence over succeeded members (0 if none succeeded)
    pub confidence: f64,
    /// Number of members that produced usable content
    pub succeeded: usize,
    /// Number of members that failed
    pub failed: usize,
    /// Synthesized group prose (empty on total failure)
    pub synthesized_text: String,
    /// All member results, sorted by worker id
    pub members: Vec<PartialResult>,
}

impl GroupSummary {
    /// Whether this group contributed a usable result
    pub fn is_usable(&self) -> bool {
        self.confidence > 0.0
    }

    /// Summary for a group whose every member failed
    pub(crate) fn total_failure(name: impl Into<String>, weight: f64, failed: usize) -> Self {
        Self {
            group_name: name.into(),
            weight,
            confidence: 0.0,
            succeeded: 0,
            failed,
            synthesized_text: String::new(),
            members: Vec::new(),
        }
    }
}

/// Terminal artifact of one orchestration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalDecision {
    /// The request text this decision answers
    pub request_echo: String,
    /// Number of groups engaged for this request
    pub groups_considered: usize,
    /// Number of engaged groups that produced nothing usable
    pub groups_failed: usize,
    /// Weighted confidence over the usable groups
    pub confidence: f64,
    /// Final synthesized prose
    pub text: String,
    /// Effective (renormalized) weight per usable group
    pub per_group_weights: HashMap<String, f64>,
    /// Wall-clock duration of the whole run
    pub total_latency: Duration,
    /// When the decision was produced
    pub timestamp: DateTime<Utc>,
}

/// Reduces partial results into group summaries and summaries into decisions
pub struct Synthesizer {
    generator: Arc<dyn Generator>,
}

impl Synthesizer {
    /// Create a synthesizer delegating prose to the given generator
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    /// Reduce one group's member results into a summary
    ///
    /// Confidence is the mean over succeeded members; member order never
    /// affects the output (results are sorted by worker id before synthesis
    /// and concatenation).
    pub async fn reduce_group(
        &self,
        group_name: &str,
        weight: f64,
        mut results: Vec<PartialResult>,
    ) -> GroupSummary {
        results.sort_by(|a, b| a.worker_id.cmp(&b.worker_id));

        let succeeded: Vec<&PartialResult> = results.iter().filter(|r| r.ok).collect();
        let failed = results.len() - succeeded.len();

        if succeeded.is_empty() {
            return GroupSummary {
                group_name: group_name.to_string(),
                weight,
                confidence: 0.0,
                succeeded: 0,
                failed,
                synthesized_text: String::new(),
                members: results,
            };
        }

        let confidence =
            succeeded.iter().map(|r| r.confidence).sum::<f64>() / succeeded.len() as f64;

        let concatenated = succeeded
            .iter()
            .map(|r| format!("## {}\n\n{}", r.worker_id, r.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        let synthesized_text = self
            .prose(GROUP_SYNTHESIS_INSTRUCTION, &concatenated)
            .await
            .unwrap_or(concatenated);

        GroupSummary {
            group_name: group_name.to_string(),
            weight,
            confidence,
            succeeded: succeeded.len(),
            failed,
            synthesized_text,
            members: results,
        }
    }

    /// Reduce group summaries into the final decision
    ///
    /// Weights are renormalized over the usable groups only, so losing some
    /// groups lowers coverage proportionally without zeroing out what the
    /// remaining groups still support. Appending an all-failed summary to the
    /// input changes nothing but the `groups_failed` count.
    pub async fn reduce_final(
        &self,
        request: &Request,
        summaries: &[GroupSummary],
    ) -> FinalDecision {
        let groups_considered = summaries.len();
        let mut usable: Vec<&GroupSummary> = summaries.iter().filter(|s| s.is_usable()).collect();
        let groups_failed = groups_considered - usable.len();

        if usable.is_empty() {
            return FinalDecision {
                request_echo: request.text.clone(),
                groups_considered,
                groups_failed,
                confidence: 0.0,
                text: "No group produced a usable result for this request.".to_string(),
                per_group_weights: HashMap::new(),
                total_latency: Duration::ZERO,
                timestamp: Utc::now(),
            };
        }

        // Weight-ordered, ties broken by name, so output is deterministic.
        usable.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.group_name.cmp(&b.group_name))
        });

        let total_weight: f64 = usable.iter().map(|s| s.weight).sum();
        let per_group_weights: HashMap<String, f64> = usable
            .iter()
            .map(|s| (s.group_name.clone(), s.weight / total_weight))
            .collect();
        let confidence = usable
            .iter()
            .map(|s| (s.weight / total_weight) * s.confidence)
            .sum();

        let concatenated = usable
            .iter()
            .map(|s| {
                format!(
                    "## {} (weight {:.2})\n\n{}",
                    s.group_name, s.weight, s.synthesized_text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        let text = self
            .prose(FINAL_SYNTHESIS_INSTRUCTION, &concatenated)
            .await
            .unwrap_or(concatenated);

        FinalDecision {
            request_echo: request.text.clone(),
            groups_considered,
            groups_failed,
            confidence,
            text,
            per_group_weights,
            total_latency: Duration::ZERO,
            timestamp: Utc::now(),
        }
    }

    /// One generator call; `None` means "use the concatenation fallback"
    async fn prose(&self, instruction: &str, input: &str) -> Option<String> {
        match self.generator.generate(instruction, input).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                warn!("synthesis generator returned blank output, falling back to concatenation");
                None
            }
            Err(e) => {
                warn!(error = %e, "synthesis generator failed, falling back to concatenation");
                None
            }
        }
    }
}
