//! App-level escalation rules.
//!
//! Each app can declare rules that run before the category mapping. A rule's
//! condition is a small expression of clauses joined by `&&`:
//!
//! ```text
//! category:support_refund && signal:hasAngrySentiment && !keyword:invoice
//! ```
//!
//! * `category:<name>` matches the classified category
//! * `signal:<name>` matches a message signal (camelCase or snake_case)
//! * `keyword:<text>` matches a word or phrase in the message text
//!
//! Any clause can be negated with a leading `!`. A condition that fails to
//! parse never matches.

use serde::{Deserialize, Serialize};

use crate::classifier::patterns::{contains_word, normalize};
use crate::classifier::{MessageCategory, MessageSignals};
use crate::error::{Result, TriageError};
use crate::rule_engine::RouteAction;

/// Per-app routing configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app_id: String,
    /// Helpdesk teammate id of the instructor, if one is set up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor_teammate_id: Option<String>,
    /// Set when an instructor takes escalations without a helpdesk id.
    pub instructor_configured: bool,
    /// Whether drafts may be sent without review once thresholds are met.
    pub auto_send_enabled: bool,
    /// Rules evaluated in order before the category mapping.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub escalation_rules: Vec<EscalationRule>,
}

impl AppConfig {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            ..Default::default()
        }
    }

    pub fn with_instructor(mut self, teammate_id: impl Into<String>) -> Self {
        self.instructor_teammate_id = Some(teammate_id.into());
        self
    }

    pub fn with_auto_send(mut self, enabled: bool) -> Self {
        self.auto_send_enabled = enabled;
        self
    }

    pub fn with_rule(mut self, rule: EscalationRule) -> Self {
        self.escalation_rules.push(rule);
        self
    }

    /// Returns true if an instructor is configured for this app.
    pub fn has_instructor(&self) -> bool {
        self.instructor_configured
            || self
                .instructor_teammate_id
                .as_deref()
                .is_some_and(|id| !id.trim().is_empty())
    }
}

/// A conditional override evaluated before the category mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRule {
    pub condition: String,
    pub action: RouteAction,
    pub reason: String,
}

impl EscalationRule {
    pub fn new(condition: impl Into<String>, action: RouteAction, reason: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            action,
            reason: reason.into(),
        }
    }

    /// Returns true if the condition holds. Unparseable conditions never match.
    pub fn matches(&self, ctx: &RuleContext<'_>) -> bool {
        match Condition::parse(&self.condition) {
            Ok(condition) => condition.evaluate(ctx),
            Err(e) => {
                tracing::warn!(condition = %self.condition, error = %e, "skipping escalation rule");
                false
            }
        }
    }
}

/// What a condition is evaluated against.
pub struct RuleContext<'a> {
    pub category: MessageCategory,
    pub signals: &'a MessageSignals,
    /// Raw message text; normalized on construction.
    text: String,
}

impl<'a> RuleContext<'a> {
    pub fn new(category: MessageCategory, signals: &'a MessageSignals, text: &str) -> Self {
        Self {
            category,
            signals,
            text: normalize(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Category(MessageCategory),
    Signal(String),
    Keyword(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Clause {
    negated: bool,
    predicate: Predicate,
}

/// A parsed rule condition: every clause must hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    clauses: Vec<Clause>,
}

impl Condition {
    /// Parses a condition expression.
    pub fn parse(expr: &str) -> Result<Self> {
        let clauses = expr
            .split("&&")
            .map(parse_clause)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { clauses })
    }

    /// Evaluates the condition against a context.
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> bool {
        self.clauses.iter().all(|clause| {
            let holds = match &clause.predicate {
                Predicate::Category(category) => ctx.category == *category,
                // Names are validated at parse time.
                Predicate::Signal(name) => ctx.signals.get(name).unwrap_or(false),
                Predicate::Keyword(keyword) => contains_word(&ctx.text, keyword),
            };
            holds != clause.negated
        })
    }
}

fn parse_clause(raw: &str) -> Result<Clause> {
    let raw = raw.trim();
    let (negated, body) = match raw.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, raw),
    };

    let (kind, value) = body
        .split_once(':')
        .ok_or_else(|| TriageError::Config(format!("clause '{}' is missing a ':'", raw)))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(TriageError::Config(format!("clause '{}' has no value", raw)));
    }

    let predicate = match kind.trim() {
        "category" => Predicate::Category(
            value
                .parse()
                .map_err(|_| TriageError::Config(format!("unknown category '{}'", value)))?,
        ),
        "signal" => {
            if MessageSignals::default().get(value).is_none() {
                return Err(TriageError::Config(format!("unknown signal '{}'", value)));
            }
            Predicate::Signal(value.to_string())
        }
        "keyword" => Predicate::Keyword(normalize(value)),
        other => {
            return Err(TriageError::Config(format!(
                "unknown clause kind '{}'",
                other
            )))
        }
    };

    Ok(Clause { negated, predicate })
}
