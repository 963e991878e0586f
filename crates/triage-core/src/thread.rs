//! Thread structure analysis.
//!
//! Derives conversation-level facts (who wrote what, in which order, whether
//! the customer confirmed a fix, whose turn it is) from an ordered message
//! list, and merges them with text signals from the trigger message and the
//! whole thread.
//!
//! ## Resolution
//!
//! A thread only counts as resolved when the last customer message contains an
//! explicit resolution phrase ("that worked", "all set"). A plain "thanks" is
//! not enough: "thanks in advance" on a fresh request must stay open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::patterns::{self, normalize};
use crate::classifier::{extract_signals, MessageInput, MessageSignals};
use crate::error::{Result, TriageError};

/// Direction of a message relative to the support inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Sent by the customer to us.
    #[default]
    In,
    /// Sent by us to the customer.
    Out,
}

impl Direction {
    /// Short name used in thread patterns ("in-out-in").
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    #[default]
    Customer,
    /// Human member of the support team.
    Teammate,
    /// Automated agent or autoresponder.
    Agent,
    Instructor,
}

impl AuthorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorRole::Customer => "customer",
            AuthorRole::Teammate => "teammate",
            AuthorRole::Agent => "agent",
            AuthorRole::Instructor => "instructor",
        }
    }

    /// Returns true for humans on our side (teammates and the instructor).
    pub fn is_human_teammate(&self) -> bool {
        matches!(self, AuthorRole::Teammate | AuthorRole::Instructor)
    }
}

/// Author details attached by the helpdesk platform.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageAuthor {
    pub role: AuthorRole,
    /// Helpdesk teammate identifier, used to spot the instructor by id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teammate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MessageAuthor {
    /// Creates an author with the given role.
    pub fn new(role: AuthorRole) -> Self {
        Self {
            role,
            teammate_id: None,
            name: None,
        }
    }

    /// Sets the helpdesk teammate id.
    pub fn with_teammate_id(mut self, id: impl Into<String>) -> Self {
        self.teammate_id = Some(id.into());
        self
    }
}

/// One message in a helpdesk thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub direction: Direction,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<MessageAuthor>,
    /// Sender address, when the platform exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl ThreadMessage {
    /// Creates an inbound message.
    pub fn inbound(body: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Direction::In, body, timestamp)
    }

    /// Creates an outbound message.
    pub fn outbound(body: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Direction::Out, body, timestamp)
    }

    fn new(direction: Direction, body: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            direction,
            body: body.into(),
            timestamp,
            subject: None,
            author: None,
            from: None,
        }
    }

    /// Sets the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Sets the author.
    pub fn with_author(mut self, author: MessageAuthor) -> Self {
        self.author = Some(author);
        self
    }

    /// Sets the sender address.
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Resolves the effective author role.
    ///
    /// Messages without an author are attributed by direction: inbound to the
    /// customer, outbound to an automated agent.
    pub fn role(&self, instructor_teammate_id: Option<&str>) -> AuthorRole {
        match &self.author {
            Some(author) => {
                let is_instructor_by_id = instructor_teammate_id.is_some()
                    && author.teammate_id.as_deref() == instructor_teammate_id;
                if is_instructor_by_id {
                    AuthorRole::Instructor
                } else {
                    author.role
                }
            }
            None => match self.direction {
                Direction::In => AuthorRole::Customer,
                Direction::Out => AuthorRole::Agent,
            },
        }
    }
}

/// A thread snapshot to analyze and classify.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadInput {
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub app_id: String,
    pub messages: Vec<ThreadMessage>,
    /// The message that caused this classification run.
    #[serde(default)]
    pub trigger_message: Option<ThreadMessage>,
    #[serde(default)]
    pub instructor_teammate_id: Option<String>,
    #[serde(default)]
    pub instructor_names: Vec<String>,
    /// Platform tags on the conversation (e.g. "AD").
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ThreadInput {
    /// Creates an input without a trigger message.
    pub fn new(messages: Vec<ThreadMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Sets the trigger message.
    pub fn with_trigger(mut self, trigger: ThreadMessage) -> Self {
        self.trigger_message = Some(trigger);
        self
    }

    /// Uses the most recent message as the trigger.
    pub fn with_latest_as_trigger(mut self) -> Self {
        self.trigger_message = self.messages.iter().max_by_key(|m| m.timestamp).cloned();
        self
    }

    /// Sets the app and conversation ids.
    pub fn with_ids(mut self, app_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self.conversation_id = conversation_id.into();
        self
    }

    /// Sets the instructor's helpdesk teammate id.
    pub fn with_instructor_teammate_id(mut self, id: impl Into<String>) -> Self {
        self.instructor_teammate_id = Some(id.into());
        self
    }

    /// Sets platform tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the conversation carries the given platform tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.trim().eq_ignore_ascii_case(tag))
    }

    /// Messages ordered by timestamp, without touching the input.
    pub fn sorted_messages(&self) -> Vec<&ThreadMessage> {
        let mut sorted: Vec<&ThreadMessage> = self.messages.iter().collect();
        sorted.sort_by_key(|m| m.timestamp);
        sorted
    }

    /// Number of messages in the given direction.
    pub fn count_direction(&self, direction: Direction) -> usize {
        self.messages
            .iter()
            .filter(|m| m.direction == direction)
            .count()
    }
}

/// Thread-level facts layered on top of the merged message signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSignals {
    /// Text signals merged from the trigger and the whole thread.
    #[serde(flatten)]
    pub message: MessageSignals,
    pub thread_length: usize,
    pub thread_duration_hours: f64,
    pub customer_message_count: usize,
    /// Human teammate messages, the instructor included.
    pub teammate_message_count: usize,
    pub agent_message_count: usize,
    pub last_message_direction: Direction,
    /// Direction sequence such as "in-out-in".
    pub thread_pattern: String,
    pub has_thank_you: bool,
    pub has_resolution_phrase: bool,
    pub awaiting_customer_reply: bool,
    pub has_teammate_message: bool,
    pub has_recent_teammate_response: bool,
    pub has_instructor_message: bool,
    pub instructor_is_author: bool,
    pub is_internal_thread: bool,
    pub last_responder_type: AuthorRole,
}

/// Computes thread signals from a thread snapshot.
///
/// Fails when the thread is empty or no trigger message was supplied.
pub fn compute_thread_signals(input: &ThreadInput) -> Result<ThreadSignals> {
    if input.messages.is_empty() {
        return Err(TriageError::EmptyThread);
    }
    let trigger = input
        .trigger_message
        .as_ref()
        .ok_or(TriageError::MissingTrigger)?;

    let instructor_id = input.instructor_teammate_id.as_deref();
    let messages = input.sorted_messages();
    let roles: Vec<AuthorRole> = messages.iter().map(|m| m.role(instructor_id)).collect();

    let customer_message_count = roles.iter().filter(|r| **r == AuthorRole::Customer).count();
    let teammate_message_count = roles.iter().filter(|r| r.is_human_teammate()).count();
    let agent_message_count = roles.iter().filter(|r| **r == AuthorRole::Agent).count();

    // Non-empty was checked above.
    let first = messages[0];
    let last = messages[messages.len() - 1];
    let last_message_direction = last.direction;
    let last_responder_type = roles[roles.len() - 1];

    let thread_duration_hours =
        (last.timestamp - first.timestamp).num_seconds() as f64 / 3600.0;
    let thread_pattern = messages
        .iter()
        .map(|m| m.direction.as_str())
        .collect::<Vec<_>>()
        .join("-");

    let message = merge_text_signals(input, &messages, trigger);

    let last_customer_body = messages
        .iter()
        .zip(&roles)
        .rev()
        .find(|(_, role)| **role == AuthorRole::Customer)
        .map(|(m, _)| normalize(&m.body));
    let (has_thank_you, has_resolution_phrase) = match &last_customer_body {
        Some(body) => (
            patterns::THANK_YOU.is_match(body),
            patterns::RESOLUTION_PHRASE.is_match(body),
        ),
        None => (false, false),
    };

    let has_recent_teammate_response = messages
        .iter()
        .zip(&roles)
        .rev()
        .find(|(m, _)| m.direction == Direction::Out)
        .is_some_and(|(_, role)| role.is_human_teammate());

    // Automated-only replies do not count: a human must have engaged.
    let awaiting_customer_reply = last_message_direction == Direction::Out
        && teammate_message_count > 0
        && customer_message_count > 0;

    Ok(ThreadSignals {
        message,
        thread_length: messages.len(),
        thread_duration_hours,
        customer_message_count,
        teammate_message_count,
        agent_message_count,
        last_message_direction,
        thread_pattern,
        has_thank_you,
        has_resolution_phrase,
        awaiting_customer_reply,
        has_teammate_message: teammate_message_count > 0,
        has_recent_teammate_response,
        has_instructor_message: roles.contains(&AuthorRole::Instructor),
        instructor_is_author: roles[0] == AuthorRole::Instructor,
        is_internal_thread: customer_message_count == 0 && teammate_message_count > 0,
        last_responder_type,
    })
}

/// Merges trigger-only signals with signals over the customer side of the thread.
///
/// Only inbound text is scanned. When the trigger is one of our own replies,
/// the latest inbound message stands in for it.
fn merge_text_signals(
    input: &ThreadInput,
    messages: &[&ThreadMessage],
    trigger: &ThreadMessage,
) -> MessageSignals {
    let thread_subject = messages
        .iter()
        .find_map(|m| m.subject.clone())
        .unwrap_or_default();

    let inbound: Vec<&ThreadMessage> = messages
        .iter()
        .copied()
        .filter(|m| m.direction == Direction::In)
        .collect();

    let customer_trigger = if trigger.direction == Direction::In {
        Some(trigger)
    } else {
        inbound.last().copied()
    };
    let trigger_signals = customer_trigger
        .map(|m| {
            extract_signals(&MessageInput {
                subject: m.subject.clone().unwrap_or_else(|| thread_subject.clone()),
                body: m.body.clone(),
                from: m.from.clone(),
                instructor_names: input.instructor_names.clone(),
            })
        })
        .unwrap_or_default();

    let thread_body = inbound
        .iter()
        .map(|m| m.body.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let thread_signals = if thread_body.trim().is_empty() {
        MessageSignals::default()
    } else {
        extract_signals(&MessageInput {
            subject: thread_subject,
            body: thread_body,
            from: None,
            instructor_names: input.instructor_names.clone(),
        })
    };

    let mut merged = trigger_signals.union(&thread_signals);

    // Long, engaged threads are not vendor spam even if a pitch shows up.
    merged.is_vendor_outreach = messages.len() == 1 && merged.is_vendor_outreach;
    merged.is_reply = merged.is_reply || messages.len() > 1;
    merged
}

/// Returns true when the customer confirmed the fix after we responded.
pub fn is_thread_resolved(signals: &ThreadSignals) -> bool {
    let we_responded = signals.agent_message_count + signals.teammate_message_count > 0;

    we_responded
        && signals.thread_length >= 2
        && signals.last_message_direction == Direction::In
        && signals.has_resolution_phrase
}

/// Returns true when a teammate already owns the thread and it is our turn.
pub fn should_support_teammate(signals: &ThreadSignals) -> bool {
    signals.has_teammate_message
        && signals.last_responder_type == AuthorRole::Customer
        && !signals.awaiting_customer_reply
}
