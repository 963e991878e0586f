//! Tiered classification pipeline.
//!
//! 1. Extract signals (always)
//! 2. Run the rule cascade and short-circuit on a match
//! 3. Otherwise recall past corrections and ask the model
//!
//! Memory is strictly optional: a failing memory service degrades the prompt,
//! never the classification.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::llm::{self, LlmClassification, LlmClient};
use super::{
    extract_signals, fast_classify, fast_classify_thread, ClassificationTier, ClassifyOutput,
    MessageInput, ThreadClassifyOutput,
};
use crate::error::{Result, TriageError};
use crate::memory::{MemoryService, MemoryStage};
use crate::thread::{compute_thread_signals, ThreadInput};

/// Default model identifier handed to the client.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Longest situation text sent to the memory service.
const MAX_SITUATION_CHARS: usize = 2000;

/// Configuration for the tiered classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Model identifier passed to [`LlmClient::generate`].
    pub model: String,
    /// Maximum memories recalled per classification.
    pub memory_limit: usize,
    /// Minimum similarity for a memory to be recalled.
    pub memory_threshold: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            memory_limit: 5,
            memory_threshold: 0.6,
        }
    }
}

/// Per-call context for memory lookups and citations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifyOptions {
    pub app_id: String,
    /// Pipeline run identifier; citations are only recorded when present.
    pub run_id: Option<String>,
}

impl ClassifyOptions {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            run_id: None,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}

/// Recalled memory rendered for the prompt, plus the ids that were used.
#[derive(Debug, Default)]
struct Recall {
    context: Option<String>,
    cited_ids: Vec<String>,
}

/// Fast paths first, language model second.
pub struct TriageClassifier {
    llm: Arc<dyn LlmClient>,
    memory: Option<Arc<dyn MemoryService>>,
    config: ClassifierConfig,
}

impl TriageClassifier {
    /// Creates a classifier without memory augmentation.
    pub fn new(llm: Arc<dyn LlmClient>, config: ClassifierConfig) -> Self {
        Self {
            llm,
            memory: None,
            config,
        }
    }

    /// Adds a memory service for recalling past corrections.
    pub fn with_memory(mut self, memory: Arc<dyn MemoryService>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classifies a single message.
    pub async fn classify(
        &self,
        input: &MessageInput,
        options: &ClassifyOptions,
    ) -> Result<ClassifyOutput> {
        let start = Instant::now();
        let signals = extract_signals(input);

        if let Some(mut output) = fast_classify(input, &signals) {
            output.duration_us = start.elapsed().as_micros() as u64;
            return Ok(output);
        }

        let recall = self.recall(options, &input.full_text()).await;
        let system = llm::system_prompt(recall.context.as_deref(), false);
        let user = llm::message_prompt(input, &signals);
        let answer = self.ask(&system, &user).await?;

        let duration_us = start.elapsed().as_micros() as u64;
        tracing::info!(
            app_id = %options.app_id,
            category = %answer.category,
            confidence = answer.confidence,
            cited = recall.cited_ids.len(),
            duration_us,
            "message classified by model"
        );

        Ok(ClassifyOutput {
            category: answer.category,
            confidence: answer.confidence,
            signals,
            reasoning: answer.reasoning,
            cited_memory_ids: recall.cited_ids,
            tier: ClassificationTier::Llm,
            duration_us,
        })
    }

    /// Classifies a whole thread.
    pub async fn classify_thread(
        &self,
        input: &ThreadInput,
        options: &ClassifyOptions,
    ) -> Result<ThreadClassifyOutput> {
        let start = Instant::now();
        let signals = compute_thread_signals(input)?;

        if let Some(mut output) = fast_classify_thread(input, &signals) {
            output.duration_us = start.elapsed().as_micros() as u64;
            return Ok(output);
        }

        let situation = input
            .trigger_message
            .as_ref()
            .map(|m| m.body.as_str())
            .unwrap_or_default();
        let recall = self.recall(options, situation).await;
        let system = llm::system_prompt(recall.context.as_deref(), true);
        let user = llm::thread_prompt(input, &signals);
        let answer = self.ask(&system, &user).await?;

        let duration_us = start.elapsed().as_micros() as u64;
        tracing::info!(
            app_id = %options.app_id,
            conversation_id = %input.conversation_id,
            category = %answer.category,
            confidence = answer.confidence,
            thread_length = signals.thread_length,
            duration_us,
            "thread classified by model"
        );

        Ok(ThreadClassifyOutput {
            category: answer.category,
            confidence: answer.confidence,
            signals,
            reasoning: answer.reasoning,
            cited_memory_ids: recall.cited_ids,
            tier: ClassificationTier::Llm,
            duration_us,
        })
    }

    async fn ask(&self, system: &str, user: &str) -> Result<LlmClassification> {
        let schema = llm::classification_schema();
        let value = self
            .llm
            .generate(&self.config.model, &schema, system, user)
            .await
            .map_err(TriageError::Llm)?;

        LlmClassification::from_value(value).inspect_err(|e| {
            tracing::warn!(error = %e, model = %self.config.model, "rejected model output");
        })
    }

    /// Queries and cites memories. Every failure is logged and swallowed.
    async fn recall(&self, options: &ClassifyOptions, situation: &str) -> Recall {
        let Some(memory) = &self.memory else {
            return Recall::default();
        };

        let situation: String = situation.chars().take(MAX_SITUATION_CHARS).collect();
        let memories = match memory
            .query_memories_for_stage(
                &options.app_id,
                MemoryStage::Classify,
                &situation,
                self.config.memory_limit,
                self.config.memory_threshold,
            )
            .await
        {
            Ok(memories) => memories,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    app_id = %options.app_id,
                    "memory query failed, classifying without past decisions"
                );
                return Recall::default();
            }
        };

        if memories.is_empty() {
            return Recall::default();
        }

        let cited_ids: Vec<String> = memories.iter().map(|m| m.id.clone()).collect();
        if let Some(run_id) = &options.run_id {
            if let Err(e) = memory
                .cite_memories(&cited_ids, run_id, &options.app_id)
                .await
            {
                tracing::warn!(error = %e, run_id = %run_id, "failed to cite memories");
            }
        }

        tracing::debug!(count = cited_ids.len(), "recalled memories for classification");
        Recall {
            context: Some(memory.format_memories_compact(&memories)),
            cited_ids,
        }
    }
}
