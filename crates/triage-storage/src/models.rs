//! Data models for storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triage_core::{MemoryOutcome, MemoryStage, MessageCategory};

/// A stored human correction.
///
/// The message itself is kept as a hash plus a short preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMisclassification {
    /// Unique identifier.
    pub id: i64,
    pub app_id: String,
    pub conversation_id: String,
    /// Pipeline stage the corrected decision came from.
    pub stage: MemoryStage,
    /// SHA-256 hash of the message text (for deduplication).
    pub text_hash: String,
    /// Short preview of the message text.
    pub preview: String,
    pub original_category: MessageCategory,
    pub corrected_category: MessageCategory,
    pub outcome: MemoryOutcome,
    pub run_id: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome recorded for a memory cited during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationOutcomeRecord {
    pub id: i64,
    pub memory_id: String,
    pub run_id: String,
    pub app_id: String,
    pub outcome: MemoryOutcome,
    pub created_at: DateTime<Utc>,
}

/// Number of decisions seen for a category within an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryVolume {
    pub app_id: String,
    pub category: MessageCategory,
    pub count: u64,
}

/// Parses a stored stage name.
pub(crate) fn parse_stage(s: &str) -> Option<MemoryStage> {
    match s {
        "classify" => Some(MemoryStage::Classify),
        _ => None,
    }
}

/// Parses a stored outcome name.
pub(crate) fn parse_outcome(s: &str) -> Option<MemoryOutcome> {
    match s {
        "success" => Some(MemoryOutcome::Success),
        "failure" => Some(MemoryOutcome::Failure),
        "corrected" => Some(MemoryOutcome::Corrected),
        _ => None,
    }
}
