//! Triage Core - Classification, thread analysis, and routing logic.
//!
//! This crate decides what kind of support message arrived and what should
//! happen next. Deterministic signal extraction and rule cascades handle the
//! common cases; a language model handles the rest; a routing policy turns
//! the result into an action.
//!
//! External collaborators (language model, memory service, correction store)
//! are traits injected by the caller.

pub mod classifier;
pub mod error;
pub mod escalation_rules;
pub mod memory;
pub mod recorder;
pub mod rule_engine;
pub mod thread;
pub mod thresholds;

pub use classifier::{
    extract_signals, fast_classify, fast_classify_thread, ClassificationTier, ClassifierConfig,
    ClassifyOptions, ClassifyOutput, LlmClient, MessageCategory, MessageInput, MessageSignals,
    ThreadClassifyOutput, TriageClassifier,
};
pub use error::{Result, TriageError};
pub use escalation_rules::{AppConfig, Condition, EscalationRule};
pub use memory::{MemoryOutcome, MemoryService, MemoryStage, RelevantMemory};
pub use recorder::{
    record_misclassification, MisclassificationInput, MisclassificationRecord,
    MisclassificationStore,
};
pub use rule_engine::{RouteAction, RouteInput, RouteOutput, Router, ThreadRouteInput};
pub use thread::{
    compute_thread_signals, is_thread_resolved, should_support_teammate, AuthorRole, Direction,
    MessageAuthor, ThreadInput, ThreadMessage, ThreadSignals,
};
pub use thresholds::{get_category_threshold, CategoryThreshold, ThresholdConfig};
