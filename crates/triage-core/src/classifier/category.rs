//! Message categories and classification outputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::MessageSignals;
use crate::error::TriageError;
use crate::thread::ThreadSignals;

/// Categories an inbound message or thread can be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageCategory {
    /// Customer cannot get into the product they bought.
    SupportAccess,
    /// Customer wants their money back.
    SupportRefund,
    /// Customer wants a purchase moved to another account or email.
    SupportTransfer,
    /// Bug reports and technical problems.
    SupportTechnical,
    /// Invoices, receipts and billing details.
    SupportBilling,
    /// Personal message for the instructor.
    FanMail,
    /// Unsolicited vendor or marketing outreach.
    Spam,
    /// Autoresponders, bounces and other machine-generated mail.
    System,
    /// Nothing else fits.
    Unknown,
    /// Internal conversation between the instructor and the team.
    InstructorStrategy,
    /// The customer confirmed their issue is fixed.
    Resolved,
    /// We replied last and are waiting on the customer.
    AwaitingCustomer,
    /// Reply to an outbound survey or outreach email.
    VocResponse,
    /// Pre-purchase question with a known answer.
    PresalesFaq,
    /// Pre-purchase question that needs judgement.
    PresalesConsult,
    /// Team or bulk licensing inquiry.
    PresalesTeam,
}

impl MessageCategory {
    /// Returns all categories.
    pub fn all() -> &'static [MessageCategory] {
        &[
            MessageCategory::SupportAccess,
            MessageCategory::SupportRefund,
            MessageCategory::SupportTransfer,
            MessageCategory::SupportTechnical,
            MessageCategory::SupportBilling,
            MessageCategory::FanMail,
            MessageCategory::Spam,
            MessageCategory::System,
            MessageCategory::Unknown,
            MessageCategory::InstructorStrategy,
            MessageCategory::Resolved,
            MessageCategory::AwaitingCustomer,
            MessageCategory::VocResponse,
            MessageCategory::PresalesFaq,
            MessageCategory::PresalesConsult,
            MessageCategory::PresalesTeam,
        ]
    }

    /// Returns the wire name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageCategory::SupportAccess => "support_access",
            MessageCategory::SupportRefund => "support_refund",
            MessageCategory::SupportTransfer => "support_transfer",
            MessageCategory::SupportTechnical => "support_technical",
            MessageCategory::SupportBilling => "support_billing",
            MessageCategory::FanMail => "fan_mail",
            MessageCategory::Spam => "spam",
            MessageCategory::System => "system",
            MessageCategory::Unknown => "unknown",
            MessageCategory::InstructorStrategy => "instructor_strategy",
            MessageCategory::Resolved => "resolved",
            MessageCategory::AwaitingCustomer => "awaiting_customer",
            MessageCategory::VocResponse => "voc_response",
            MessageCategory::PresalesFaq => "presales_faq",
            MessageCategory::PresalesConsult => "presales_consult",
            MessageCategory::PresalesTeam => "presales_team",
        }
    }

    /// One-line description used when listing categories for the model.
    pub fn description(&self) -> &'static str {
        match self {
            MessageCategory::SupportAccess => "cannot log in or lost access to a purchased product",
            MessageCategory::SupportRefund => "asks for a refund or to cancel a purchase",
            MessageCategory::SupportTransfer => {
                "wants a license moved to another person or email address"
            }
            MessageCategory::SupportTechnical => "bug report or technical problem with the product",
            MessageCategory::SupportBilling => "invoice, receipt, tax or billing question",
            MessageCategory::FanMail => "personal note or appreciation addressed to the instructor",
            MessageCategory::Spam => "vendor pitch, partnership, SEO or other unsolicited outreach",
            MessageCategory::System => "autoresponder, bounce or other automated mail",
            MessageCategory::Unknown => "does not fit any other category",
            MessageCategory::InstructorStrategy => {
                "internal discussion between the instructor and the team"
            }
            MessageCategory::Resolved => "customer confirmed the issue is fixed",
            MessageCategory::AwaitingCustomer => "we replied last and wait on the customer",
            MessageCategory::VocResponse => "reply to a survey or outreach email we sent",
            MessageCategory::PresalesFaq => "pre-purchase question answered by the FAQ",
            MessageCategory::PresalesConsult => "pre-purchase question that needs advice",
            MessageCategory::PresalesTeam => "team, bulk or enterprise licensing inquiry",
        }
    }

    /// Returns true for the `support_*` family.
    pub fn is_support(&self) -> bool {
        matches!(
            self,
            MessageCategory::SupportAccess
                | MessageCategory::SupportRefund
                | MessageCategory::SupportTransfer
                | MessageCategory::SupportTechnical
                | MessageCategory::SupportBilling
        )
    }
}

impl fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageCategory {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        MessageCategory::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| TriageError::InvalidLlmOutput(format!("unknown category '{}'", s)))
    }
}

/// Which tier of the pipeline produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationTier {
    /// Deterministic rule cascade.
    #[default]
    FastPath,
    /// Language model fallback.
    Llm,
}

/// Result of classifying a single message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyOutput {
    pub category: MessageCategory,
    /// Calibration hint in [0, 1], not a probability.
    pub confidence: f32,
    pub signals: MessageSignals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Memory entries consulted while classifying.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cited_memory_ids: Vec<String>,
    #[serde(default)]
    pub tier: ClassificationTier,
    /// Classification duration in microseconds.
    #[serde(default)]
    pub duration_us: u64,
}

impl ClassifyOutput {
    /// Creates a fast-path result.
    pub fn fast_path(category: MessageCategory, confidence: f32, signals: MessageSignals) -> Self {
        Self {
            category,
            confidence: confidence.clamp(0.0, 1.0),
            signals,
            reasoning: None,
            cited_memory_ids: Vec::new(),
            tier: ClassificationTier::FastPath,
            duration_us: 0,
        }
    }
}

/// Result of classifying a whole thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadClassifyOutput {
    pub category: MessageCategory,
    pub confidence: f32,
    pub signals: ThreadSignals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cited_memory_ids: Vec<String>,
    #[serde(default)]
    pub tier: ClassificationTier,
    #[serde(default)]
    pub duration_us: u64,
}

impl ThreadClassifyOutput {
    /// Creates a fast-path result.
    pub fn fast_path(category: MessageCategory, confidence: f32, signals: ThreadSignals) -> Self {
        Self {
            category,
            confidence: confidence.clamp(0.0, 1.0),
            signals,
            reasoning: None,
            cited_memory_ids: Vec::new(),
            tier: ClassificationTier::FastPath,
            duration_us: 0,
        }
    }
}
