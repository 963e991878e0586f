//! Records human corrections so future classifications can learn from them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::MessageCategory;
use crate::error::{Result, TriageError};
use crate::memory::{MemoryOutcome, MemoryStage};

/// Persistence for corrections and citation outcomes.
#[async_trait]
pub trait MisclassificationStore: Send + Sync {
    /// Stores a correction as a memory for the classify stage.
    async fn store_misclassification(&self, record: &MisclassificationRecord) -> anyhow::Result<()>;

    /// Marks memories cited during a run with the given outcome.
    async fn record_citation_outcome(
        &self,
        memory_ids: &[String],
        run_id: &str,
        outcome: MemoryOutcome,
        app_id: &str,
    ) -> anyhow::Result<()>;
}

/// A human correction of a classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MisclassificationInput {
    pub app_id: String,
    pub conversation_id: String,
    /// Message text that was misclassified.
    pub text: String,
    pub original_category: MessageCategory,
    pub corrected_category: MessageCategory,
    /// Run that produced the original classification.
    pub run_id: Option<String>,
    /// Memories that run cited.
    pub cited_memory_ids: Vec<String>,
}

/// A correction as it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisclassificationRecord {
    pub app_id: String,
    pub conversation_id: String,
    pub stage: MemoryStage,
    pub text: String,
    pub original_category: MessageCategory,
    pub corrected_category: MessageCategory,
    pub outcome: MemoryOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub tags: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

impl MisclassificationRecord {
    fn from_input(input: &MisclassificationInput) -> Self {
        Self {
            app_id: input.app_id.clone(),
            conversation_id: input.conversation_id.clone(),
            stage: MemoryStage::Classify,
            text: input.text.clone(),
            original_category: input.original_category,
            corrected_category: input.corrected_category,
            outcome: MemoryOutcome::Corrected,
            run_id: input.run_id.clone(),
            tags: vec![
                "misclassification".to_string(),
                format!("original:{}", input.original_category),
                format!("corrected:{}", input.corrected_category),
            ],
            recorded_at: Utc::now(),
        }
    }
}

/// Stores a correction and marks the memories the wrong run relied on.
///
/// Returns `Ok(false)` when the categories agree and there is nothing to
/// record. Marking citations is best-effort; storing the record is not.
pub async fn record_misclassification(
    store: &dyn MisclassificationStore,
    input: MisclassificationInput,
) -> Result<bool> {
    if input.original_category == input.corrected_category {
        tracing::debug!(
            conversation_id = %input.conversation_id,
            category = %input.original_category,
            "correction matches original, nothing to record"
        );
        return Ok(false);
    }

    let record = MisclassificationRecord::from_input(&input);
    store
        .store_misclassification(&record)
        .await
        .map_err(TriageError::Store)?;

    tracing::info!(
        app_id = %record.app_id,
        conversation_id = %record.conversation_id,
        original = %record.original_category,
        corrected = %record.corrected_category,
        "recorded misclassification"
    );

    if let Some(run_id) = &input.run_id {
        if !input.cited_memory_ids.is_empty() {
            if let Err(e) = store
                .record_citation_outcome(
                    &input.cited_memory_ids,
                    run_id,
                    MemoryOutcome::Failure,
                    &input.app_id,
                )
                .await
            {
                tracing::warn!(error = %e, run_id = %run_id, "failed to mark cited memories");
            }
        }
    }

    Ok(true)
}
