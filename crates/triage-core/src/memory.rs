//! Memory service interface for recalling past corrections.
//!
//! The classifier queries it before calling the model and cites whatever it
//! used. Implementations live outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Pipeline stage a memory belongs to.
///
/// Only classification memories are queried or written by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStage {
    Classify,
}

impl MemoryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryStage::Classify => "classify",
        }
    }
}

/// How a remembered decision turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryOutcome {
    Success,
    Failure,
    /// A human replaced the decision with a different one.
    Corrected,
}

impl MemoryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryOutcome::Success => "success",
            MemoryOutcome::Failure => "failure",
            MemoryOutcome::Corrected => "corrected",
        }
    }
}

/// A memory returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevantMemory {
    pub id: String,
    /// Similarity score in [0, 1].
    pub score: f32,
    /// The situation the memory was recorded for.
    pub situation: String,
    /// The decision that was taken.
    pub decision: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MemoryOutcome>,
    /// What the decision should have been, for corrected memories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
}

/// Store of past decisions queried by similarity.
#[async_trait]
pub trait MemoryService: Send + Sync {
    /// Returns up to `limit` memories for `stage` scoring at least `threshold`.
    async fn query_memories_for_stage(
        &self,
        app_id: &str,
        stage: MemoryStage,
        situation: &str,
        limit: usize,
        threshold: f32,
    ) -> anyhow::Result<Vec<RelevantMemory>>;

    /// Records that a run consulted the given memories.
    async fn cite_memories(&self, memory_ids: &[String], run_id: &str, app_id: &str)
        -> anyhow::Result<()>;

    /// Renders memories as prompt context.
    fn format_memories_compact(&self, memories: &[RelevantMemory]) -> String {
        format_memories_compact(memories)
    }
}

const SITUATION_PREVIEW_CHARS: usize = 160;

/// Renders memories one per line, most relevant first.
pub fn format_memories_compact(memories: &[RelevantMemory]) -> String {
    let mut sorted: Vec<&RelevantMemory> = memories.iter().collect();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut out = String::from("## Past decisions on similar messages\n");
    for memory in sorted {
        let situation: String = memory
            .situation
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .take(SITUATION_PREVIEW_CHARS)
            .collect();

        let verdict = match (&memory.outcome, &memory.correction) {
            (Some(MemoryOutcome::Corrected), Some(correction)) => {
                format!("classified {}, corrected to {}", memory.decision, correction)
            }
            (Some(outcome), _) => format!("classified {} ({})", memory.decision, outcome.as_str()),
            (None, _) => format!("classified {}", memory.decision),
        };

        out.push_str(&format!(
            "- [{:.2}] \"{}\": {}\n",
            memory.score, situation, verdict
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(id: &str, score: f32, outcome: Option<MemoryOutcome>) -> RelevantMemory {
        RelevantMemory {
            id: id.to_string(),
            score,
            situation: "Can I get an invoice\n   for my   company?".to_string(),
            decision: "support_refund".to_string(),
            outcome,
            correction: None,
        }
    }

    #[test]
    fn compact_format_orders_by_score() {
        let text = format_memories_compact(&[
            memory("a", 0.61, None),
            memory("b", 0.93, Some(MemoryOutcome::Success)),
        ]);
        let first = text.find("0.93").unwrap();
        let second = text.find("0.61").unwrap();
        assert!(first < second);
        assert!(text.contains("(success)"));
    }

    #[test]
    fn compact_format_shows_corrections() {
        let mut m = memory("a", 0.8, Some(MemoryOutcome::Corrected));
        m.correction = Some("support_billing".to_string());
        let text = format_memories_compact(&[m]);
        assert!(text.contains("classified support_refund, corrected to support_billing"));
        assert!(text.contains("\"Can I get an invoice for my company?\""));
    }

    #[test]
    fn outcome_wire_names() {
        assert_eq!(
            serde_json::to_string(&MemoryOutcome::Corrected).unwrap(),
            "\"corrected\""
        );
        assert_eq!(MemoryStage::Classify.as_str(), "classify");
    }
}
