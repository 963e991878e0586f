//! Language model fallback (Tier 2).
//!
//! Builds the prompts and response schema, and validates whatever the model
//! returns before it becomes a [`MessageCategory`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{MessageCategory, MessageInput, MessageSignals};
use crate::error::{Result, TriageError};
use crate::thread::{ThreadInput, ThreadSignals};

/// Structured-output model client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates a JSON value that should satisfy `schema`.
    async fn generate(
        &self,
        model: &str,
        schema: &Value,
        system_prompt: &str,
        user_prompt: &str,
    ) -> anyhow::Result<Value>;
}

/// A validated model answer.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmClassification {
    pub category: MessageCategory,
    pub confidence: f32,
    pub reasoning: Option<String>,
}

#[derive(Deserialize)]
struct RawClassification {
    category: String,
    confidence: f64,
    #[serde(default)]
    reasoning: Option<String>,
}

impl LlmClassification {
    /// Validates a raw model response.
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: RawClassification = serde_json::from_value(value)
            .map_err(|e| TriageError::InvalidLlmOutput(format!("malformed response: {}", e)))?;

        let category: MessageCategory = raw.category.parse()?;

        if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
            return Err(TriageError::InvalidLlmOutput(format!(
                "confidence {} outside [0, 1]",
                raw.confidence
            )));
        }

        let reasoning = raw
            .reasoning
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        Ok(Self {
            category,
            confidence: raw.confidence as f32,
            reasoning,
        })
    }
}

/// JSON schema the model must answer with.
pub fn classification_schema() -> Value {
    let categories: Vec<&str> = MessageCategory::all().iter().map(|c| c.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "category": { "type": "string", "enum": categories },
            "confidence": { "type": "number", "minimum": 0, "maximum": 1 },
            "reasoning": { "type": "string" }
        },
        "required": ["category", "confidence", "reasoning"],
        "additionalProperties": false
    })
}

fn category_list() -> String {
    MessageCategory::all()
        .iter()
        .map(|c| format!("- {}: {}", c.as_str(), c.description()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// System prompt, optionally prefixed with recalled memories.
pub fn system_prompt(memory_context: Option<&str>, thread: bool) -> String {
    let unit = if thread { "support thread" } else { "support message" };
    let mut prompt = String::new();

    if let Some(context) = memory_context {
        prompt.push_str(context);
        prompt.push_str("\nPrefer the corrected category when a past decision was corrected.\n\n");
    }

    prompt.push_str(&format!(
        "You triage a {unit} for an online course business. \
         Pick exactly one category:\n{}\n\n\
         Confidence is how sure you are, from 0 to 1. Keep reasoning to one sentence.",
        category_list()
    ));

    if thread {
        prompt.push_str(
            "\nClassify the thread as a whole, judging by its latest state rather than its first message.",
        );
    }

    prompt
}

fn signal_line(signals: &MessageSignals) -> String {
    let active = signals.active();
    if active.is_empty() {
        "none".to_string()
    } else {
        active.join(", ")
    }
}

/// User prompt for a single message.
pub fn message_prompt(input: &MessageInput, signals: &MessageSignals) -> String {
    format!(
        "Subject: {}\n\n{}\n\nDetected signals: {}",
        input.subject,
        input.body,
        signal_line(signals)
    )
}

/// User prompt for a whole thread, oldest message first.
pub fn thread_prompt(input: &ThreadInput, signals: &ThreadSignals) -> String {
    let mut prompt = String::new();
    for (i, message) in input.sorted_messages().into_iter().enumerate() {
        let role = message.role(input.instructor_teammate_id.as_deref());
        prompt.push_str(&format!(
            "[{}] {} ({}, {}):\n{}\n\n",
            i + 1,
            role.as_str(),
            message.direction.as_str(),
            message.timestamp.format("%Y-%m-%d %H:%M"),
            message.body.trim()
        ));
    }

    prompt.push_str(&format!(
        "Thread: {} messages over {:.1} hours, pattern {}, last from {}.\nDetected signals: {}",
        signals.thread_length,
        signals.thread_duration_hours,
        signals.thread_pattern,
        signals.last_responder_type.as_str(),
        signal_line(&signals.message)
    ));
    prompt
}
