//! Message and thread classification.
//!
//! Signals are extracted first, then a priority-ordered rule cascade gets a
//! chance to answer. Only when no rule applies is the language model asked.

mod category;
mod fast_path;
pub mod llm;
pub(crate) mod patterns;
mod signals;
mod tiered;

pub use category::{ClassificationTier, ClassifyOutput, MessageCategory, ThreadClassifyOutput};
pub use fast_path::{
    fast_classify, fast_classify_thread, fast_detect_spam, MessageContext, MessageRule,
    ThreadContext, ThreadRule, MESSAGE_RULES, THREAD_RULES,
};
pub use llm::{LlmClassification, LlmClient};
pub use signals::{extract_signals, MessageInput, MessageSignals};
pub use tiered::{ClassifierConfig, ClassifyOptions, TriageClassifier, DEFAULT_MODEL};
