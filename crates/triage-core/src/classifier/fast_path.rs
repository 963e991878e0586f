//! Rule-based fast paths (Tier 1).
//!
//! Both cascades are ordered tables evaluated top to bottom; the first rule
//! that applies wins and later rules are never consulted. Returning `None`
//! means "ask the model", not failure.
//!
//! Fan mail and presales are deliberately absent: telling them apart takes
//! more judgement than a regex can offer.

use tracing::debug;

use super::patterns::{self, normalize};
use super::{ClassifyOutput, MessageCategory, MessageInput, MessageSignals, ThreadClassifyOutput};
use crate::thread::{is_thread_resolved, Direction, ThreadInput, ThreadSignals};

/// What a single-message rule can look at.
pub struct MessageContext<'a> {
    /// Normalized subject and body.
    pub text: &'a str,
    pub signals: &'a MessageSignals,
}

/// What a thread rule can look at.
pub struct ThreadContext<'a> {
    pub input: &'a ThreadInput,
    pub signals: &'a ThreadSignals,
}

/// One entry in the single-message cascade.
pub struct MessageRule {
    pub name: &'static str,
    pub category: MessageCategory,
    pub confidence: f32,
    predicate: fn(&MessageContext<'_>) -> bool,
}

impl MessageRule {
    /// Returns true if this rule applies.
    pub fn applies(&self, ctx: &MessageContext<'_>) -> bool {
        (self.predicate)(ctx)
    }
}

/// One entry in the thread cascade.
pub struct ThreadRule {
    pub name: &'static str,
    pub category: MessageCategory,
    pub confidence: f32,
    predicate: fn(&ThreadContext<'_>) -> bool,
}

impl ThreadRule {
    /// Returns true if this rule applies.
    pub fn applies(&self, ctx: &ThreadContext<'_>) -> bool {
        (self.predicate)(ctx)
    }
}

/// Single-message cascade, highest priority first.
pub const MESSAGE_RULES: &[MessageRule] = &[
    MessageRule {
        name: "automated",
        category: MessageCategory::System,
        confidence: 0.95,
        predicate: is_automated,
    },
    MessageRule {
        name: "vendor_outreach",
        category: MessageCategory::Spam,
        confidence: 0.9,
        predicate: is_vendor_without_reply_address,
    },
    MessageRule {
        name: "refund_request",
        category: MessageCategory::SupportRefund,
        confidence: 0.85,
        predicate: is_refund_request,
    },
    MessageRule {
        name: "access_loss",
        category: MessageCategory::SupportAccess,
        confidence: 0.85,
        predicate: is_access_loss,
    },
    MessageRule {
        name: "transfer_request",
        category: MessageCategory::SupportTransfer,
        confidence: 0.8,
        predicate: is_transfer_request,
    },
    MessageRule {
        name: "billing_request",
        category: MessageCategory::SupportBilling,
        confidence: 0.85,
        predicate: is_billing_request,
    },
];

/// Thread cascade, highest priority first.
pub const THREAD_RULES: &[ThreadRule] = &[
    ThreadRule {
        name: "automated_single_message",
        category: MessageCategory::System,
        confidence: 0.95,
        predicate: is_automated_single_message,
    },
    ThreadRule {
        name: "ad_tag",
        category: MessageCategory::Spam,
        confidence: 0.95,
        predicate: has_ad_tag,
    },
    ThreadRule {
        name: "spam_pitch",
        category: MessageCategory::Spam,
        confidence: 0.9,
        predicate: is_spam_pitch,
    },
    ThreadRule {
        name: "vendor_outreach_short_thread",
        category: MessageCategory::Spam,
        confidence: 0.85,
        predicate: is_vendor_short_thread,
    },
    ThreadRule {
        name: "internal_or_instructor_authored",
        category: MessageCategory::InstructorStrategy,
        confidence: 0.9,
        predicate: is_internal_or_instructor_authored,
    },
    ThreadRule {
        name: "resolved",
        category: MessageCategory::Resolved,
        confidence: 0.85,
        predicate: is_resolved,
    },
    ThreadRule {
        name: "last_message_outbound",
        category: MessageCategory::AwaitingCustomer,
        confidence: 0.9,
        predicate: is_last_message_outbound,
    },
];

// === Single-message predicates ===

fn is_automated(ctx: &MessageContext<'_>) -> bool {
    ctx.signals.is_automated
}

// A pitch that carries a reply address might be a real partnership inquiry.
fn is_vendor_without_reply_address(ctx: &MessageContext<'_>) -> bool {
    ctx.signals.is_vendor_outreach && !ctx.signals.has_email_in_body
}

fn is_refund_request(ctx: &MessageContext<'_>) -> bool {
    patterns::REFUND_REQUEST.is_match(ctx.text)
}

fn is_access_loss(ctx: &MessageContext<'_>) -> bool {
    patterns::ACCESS_LOSS.is_match(ctx.text)
}

fn is_transfer_request(ctx: &MessageContext<'_>) -> bool {
    patterns::TRANSFER_REQUEST.is_match(ctx.text)
}

fn is_billing_request(ctx: &MessageContext<'_>) -> bool {
    patterns::BILLING_REQUEST.is_match(ctx.text)
}

// === Thread predicates ===

fn is_automated_single_message(ctx: &ThreadContext<'_>) -> bool {
    ctx.signals.message.is_automated && ctx.signals.thread_length == 1
}

fn has_ad_tag(ctx: &ThreadContext<'_>) -> bool {
    ctx.input.has_tag("AD")
}

fn is_spam_pitch(ctx: &ThreadContext<'_>) -> bool {
    fast_detect_spam(ctx.input)
}

fn is_vendor_short_thread(ctx: &ThreadContext<'_>) -> bool {
    ctx.signals.message.is_vendor_outreach && ctx.signals.thread_length <= 2
}

fn is_internal_or_instructor_authored(ctx: &ThreadContext<'_>) -> bool {
    ctx.signals.is_internal_thread || ctx.signals.instructor_is_author
}

fn is_resolved(ctx: &ThreadContext<'_>) -> bool {
    is_thread_resolved(ctx.signals)
}

fn is_last_message_outbound(ctx: &ThreadContext<'_>) -> bool {
    ctx.signals.last_message_direction == Direction::Out
}

/// Minimum inbound and outbound counts that make a thread a real conversation.
const ENGAGED_MIN_INBOUND: usize = 3;
const ENGAGED_MIN_OUTBOUND: usize = 2;

/// Detects outreach spam from the opening inbound message.
///
/// Only the first inbound message is checked, so a pitch quoted later in a
/// reply does not taint the thread. A matching opener is still not spam when
/// the thread turned into a sustained back-and-forth.
pub fn fast_detect_spam(input: &ThreadInput) -> bool {
    let Some(first_inbound) = input
        .sorted_messages()
        .into_iter()
        .find(|m| m.direction == Direction::In)
    else {
        return false;
    };

    let text = match &first_inbound.subject {
        Some(subject) => normalize(&format!("{}\n{}", subject, first_inbound.body)),
        None => normalize(&first_inbound.body),
    };
    let Some(matched) = patterns::SPAM_PITCH.first_match(&text) else {
        return false;
    };

    let inbound = input.count_direction(Direction::In);
    let outbound = input.count_direction(Direction::Out);
    if inbound >= ENGAGED_MIN_INBOUND && outbound >= ENGAGED_MIN_OUTBOUND {
        debug!(
            matched,
            inbound, outbound, "spam pitch in opener, but thread is engaged; deferring"
        );
        return false;
    }

    debug!(pattern_set = patterns::SPAM_PITCH.name(), matched, "spam pitch detected");
    true
}

/// Runs the single-message cascade.
pub fn fast_classify(input: &MessageInput, signals: &MessageSignals) -> Option<ClassifyOutput> {
    let text = normalize(&input.full_text());
    let ctx = MessageContext {
        text: &text,
        signals,
    };

    for rule in MESSAGE_RULES {
        if rule.applies(&ctx) {
            debug!(rule = rule.name, category = %rule.category, "fast path matched");
            return Some(ClassifyOutput::fast_path(
                rule.category,
                rule.confidence,
                *signals,
            ));
        }
    }

    None
}

/// Runs the thread cascade.
pub fn fast_classify_thread(
    input: &ThreadInput,
    signals: &ThreadSignals,
) -> Option<ThreadClassifyOutput> {
    let ctx = ThreadContext { input, signals };

    for rule in THREAD_RULES {
        if rule.applies(&ctx) {
            debug!(
                rule = rule.name,
                category = %rule.category,
                conversation_id = %input.conversation_id,
                "thread fast path matched"
            );
            return Some(ThreadClassifyOutput::fast_path(
                rule.category,
                rule.confidence,
                signals.clone(),
            ));
        }
    }

    None
}
