//! Routing policy: turns a classification into an action.
//!
//! ## Evaluation Order
//!
//! 1. Signal overrides (legal threats, out-of-policy requests)
//! 2. App escalation rules, first match wins
//! 3. Category threshold overrides (`escalate_always`, escalation keywords)
//! 4. Thread state (threads only)
//! 5. Category mapping, with auto-send gates for responses
//!
//! Routing is pure: the caller supplies the observed category volume.

use serde::{Deserialize, Serialize};

use crate::classifier::{MessageCategory, MessageSignals};
use crate::escalation_rules::{AppConfig, RuleContext};
use crate::thread::{should_support_teammate, ThreadSignals};
use crate::thresholds::ThresholdConfig;

/// What to do with a classified message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    /// Draft a reply.
    Respond,
    /// Take no action.
    Silence,
    /// Hand to a human on the support team.
    EscalateHuman,
    /// Hand to the instructor.
    EscalateInstructor,
    /// Hand to a human immediately.
    EscalateUrgent,
    /// Help the teammate who already owns the thread.
    SupportTeammate,
    /// File as voice-of-customer feedback.
    CatalogVoc,
}

impl RouteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteAction::Respond => "respond",
            RouteAction::Silence => "silence",
            RouteAction::EscalateHuman => "escalate_human",
            RouteAction::EscalateInstructor => "escalate_instructor",
            RouteAction::EscalateUrgent => "escalate_urgent",
            RouteAction::SupportTeammate => "support_teammate",
            RouteAction::CatalogVoc => "catalog_voc",
        }
    }

    /// Returns true for the escalate_* family.
    pub fn is_escalation(&self) -> bool {
        matches!(
            self,
            RouteAction::EscalateHuman | RouteAction::EscalateInstructor | RouteAction::EscalateUrgent
        )
    }
}

impl std::fmt::Display for RouteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A routing decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOutput {
    pub action: RouteAction,
    pub reason: String,
    /// Only ever true for [`RouteAction::Respond`].
    #[serde(default)]
    pub auto_send: bool,
}

impl RouteOutput {
    fn new(action: RouteAction, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
            auto_send: false,
        }
    }
}

/// Routing input for a single message.
#[derive(Debug, Clone)]
pub struct RouteInput<'a> {
    pub category: MessageCategory,
    pub confidence: f32,
    pub signals: &'a MessageSignals,
    /// Message text checked by keyword rules.
    pub text: &'a str,
    pub app: &'a AppConfig,
    /// Decisions already recorded for this category and app.
    pub category_volume: u64,
}

/// Routing input for a thread.
#[derive(Debug, Clone)]
pub struct ThreadRouteInput<'a> {
    pub category: MessageCategory,
    pub confidence: f32,
    pub signals: &'a ThreadSignals,
    /// Trigger message text checked by keyword rules.
    pub text: &'a str,
    pub app: &'a AppConfig,
    pub category_volume: u64,
}

/// Routes classifications using per-category thresholds.
#[derive(Debug, Clone, Default)]
pub struct Router {
    thresholds: ThresholdConfig,
}

impl Router {
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// Routes a single message.
    pub fn route(&self, input: &RouteInput<'_>) -> RouteOutput {
        let output = self
            .signal_override(input.signals)
            .or_else(|| app_rule(input.app, input.category, input.signals, input.text))
            .or_else(|| self.threshold_override(input.category, input.text))
            .unwrap_or_else(|| {
                self.route_category(
                    input.category,
                    input.confidence,
                    input.app,
                    input.category_volume,
                )
            });

        tracing::debug!(
            category = %input.category,
            action = %output.action,
            escalated = output.action.is_escalation(),
            auto_send = output.auto_send,
            reason = %output.reason,
            "routed message"
        );
        output
    }

    /// Routes a thread; thread state is consulted before the category mapping.
    pub fn route_thread(&self, input: &ThreadRouteInput<'_>) -> RouteOutput {
        let signals = &input.signals.message;
        let output = self
            .signal_override(signals)
            .or_else(|| app_rule(input.app, input.category, signals, input.text))
            .or_else(|| self.threshold_override(input.category, input.text))
            .or_else(|| thread_state(input.category, input.signals))
            .unwrap_or_else(|| {
                self.route_category(
                    input.category,
                    input.confidence,
                    input.app,
                    input.category_volume,
                )
            });

        tracing::debug!(
            category = %input.category,
            action = %output.action,
            escalated = output.action.is_escalation(),
            thread_length = input.signals.thread_length,
            reason = %output.reason,
            "routed thread"
        );
        output
    }

    fn signal_override(&self, signals: &MessageSignals) -> Option<RouteOutput> {
        if signals.has_legal_threat {
            return Some(RouteOutput::new(
                RouteAction::EscalateUrgent,
                "legal threat detected",
            ));
        }
        if signals.has_outside_policy_timeframe {
            return Some(RouteOutput::new(
                RouteAction::EscalateHuman,
                "request falls outside the policy timeframe",
            ));
        }
        None
    }

    /// Applies to every category, whatever its structural route.
    fn threshold_override(&self, category: MessageCategory, text: &str) -> Option<RouteOutput> {
        let threshold = self.thresholds.for_category(category);

        if threshold.escalate_always {
            return Some(RouteOutput::new(
                RouteAction::EscalateHuman,
                format!("{} is always escalated", category),
            ));
        }
        threshold.matching_keyword(text).map(|keyword| {
            RouteOutput::new(
                RouteAction::EscalateHuman,
                format!("{} mentions '{}'", category, keyword),
            )
        })
    }

    fn route_category(
        &self,
        category: MessageCategory,
        confidence: f32,
        app: &AppConfig,
        volume: u64,
    ) -> RouteOutput {
        match category {
            MessageCategory::System => RouteOutput::new(RouteAction::Silence, "automated message"),
            MessageCategory::Spam => RouteOutput::new(RouteAction::Silence, "unsolicited outreach"),
            MessageCategory::Resolved => {
                RouteOutput::new(RouteAction::Silence, "customer confirmed resolution")
            }
            MessageCategory::AwaitingCustomer => {
                RouteOutput::new(RouteAction::Silence, "waiting on the customer")
            }
            MessageCategory::VocResponse => {
                RouteOutput::new(RouteAction::CatalogVoc, "reply to our outreach")
            }
            MessageCategory::FanMail => instructor_or_human(app, "personal message for the instructor"),
            MessageCategory::PresalesConsult => {
                instructor_or_human(app, "presales question needs the instructor's judgement")
            }
            MessageCategory::InstructorStrategy => {
                RouteOutput::new(RouteAction::SupportTeammate, "internal instructor discussion")
            }
            MessageCategory::Unknown => {
                RouteOutput::new(RouteAction::EscalateHuman, "could not classify confidently")
            }
            MessageCategory::SupportAccess
            | MessageCategory::SupportRefund
            | MessageCategory::SupportTransfer
            | MessageCategory::SupportTechnical
            | MessageCategory::SupportBilling
            | MessageCategory::PresalesFaq
            | MessageCategory::PresalesTeam => self.gated_response(category, confidence, app, volume),
        }
    }

    fn gated_response(
        &self,
        category: MessageCategory,
        confidence: f32,
        app: &AppConfig,
        volume: u64,
    ) -> RouteOutput {
        if !(category.is_support() || category == MessageCategory::PresalesFaq) {
            return RouteOutput::new(
                RouteAction::EscalateHuman,
                format!("no direct response for {}", category),
            );
        }

        let threshold = self.thresholds.for_category(category);
        let auto_send = app.auto_send_enabled && threshold.allows_auto_send(confidence, volume);
        let reason = if auto_send {
            format!("{} cleared auto-send thresholds", category)
        } else if !app.auto_send_enabled {
            format!("{} draft for review, auto-send disabled", category)
        } else {
            format!(
                "{} draft for review (confidence {:.2} of {:.2}, volume {} of {})",
                category,
                confidence,
                threshold.auto_send_min_confidence,
                volume,
                threshold.auto_send_min_volume
            )
        };

        RouteOutput {
            action: RouteAction::Respond,
            reason,
            auto_send,
        }
    }
}

fn app_rule(
    app: &AppConfig,
    category: MessageCategory,
    signals: &MessageSignals,
    text: &str,
) -> Option<RouteOutput> {
    if app.escalation_rules.is_empty() {
        return None;
    }

    let ctx = RuleContext::new(category, signals, text);
    app.escalation_rules
        .iter()
        .find(|rule| rule.matches(&ctx))
        .map(|rule| RouteOutput::new(rule.action, rule.reason.clone()))
}

fn thread_state(category: MessageCategory, signals: &ThreadSignals) -> Option<RouteOutput> {
    match category {
        MessageCategory::Resolved => Some(RouteOutput::new(
            RouteAction::Silence,
            "thread resolved",
        )),
        MessageCategory::AwaitingCustomer => Some(RouteOutput::new(
            RouteAction::Silence,
            "thread awaiting customer reply",
        )),
        c if c.is_support() && should_support_teammate(signals) => Some(RouteOutput::new(
            RouteAction::SupportTeammate,
            "a teammate is already handling this thread",
        )),
        _ => None,
    }
}

fn instructor_or_human(app: &AppConfig, reason: &str) -> RouteOutput {
    if app.has_instructor() {
        RouteOutput::new(RouteAction::EscalateInstructor, reason)
    } else {
        RouteOutput::new(
            RouteAction::EscalateHuman,
            format!("{} (no instructor configured)", reason),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation_rules::EscalationRule;
    use crate::thread::compute_thread_signals;
    use crate::thread::tests::{customer, teammate, thread};
    use crate::thresholds::CategoryThreshold;

    fn route(
        router: &Router,
        category: MessageCategory,
        confidence: f32,
        signals: &MessageSignals,
        text: &str,
        app: &AppConfig,
        volume: u64,
    ) -> RouteOutput {
        router.route(&RouteInput {
            category,
            confidence,
            signals,
            text,
            app,
            category_volume: volume,
        })
    }

    fn simple(category: MessageCategory) -> RouteOutput {
        route(
            &Router::default(),
            category,
            0.9,
            &MessageSignals::default(),
            "",
            &AppConfig::new("app"),
            0,
        )
    }

    #[test]
    fn legal_threat_escalates_urgent_over_everything() {
        let signals = MessageSignals {
            has_legal_threat: true,
            is_automated: true,
            ..Default::default()
        };
        let app = AppConfig::new("app")
            .with_auto_send(true)
            .with_rule(EscalationRule::new("category:system", RouteAction::Silence, "quiet"));

        for category in [MessageCategory::System, MessageCategory::SupportRefund, MessageCategory::Spam] {
            let out = route(&Router::default(), category, 1.0, &signals, "", &app, 10_000);
            assert_eq!(out.action, RouteAction::EscalateUrgent, "{category}");
            assert!(!out.auto_send);
        }
    }

    #[test]
    fn outside_policy_timeframe_escalates_human() {
        let signals = MessageSignals {
            has_outside_policy_timeframe: true,
            ..Default::default()
        };
        let out = route(
            &Router::default(),
            MessageCategory::SupportRefund,
            0.99,
            &signals,
            "bought it two years ago",
            &AppConfig::new("app").with_auto_send(true),
            1000,
        );
        assert_eq!(out.action, RouteAction::EscalateHuman);
    }

    #[test]
    fn app_rules_first_match_wins() {
        let signals = MessageSignals {
            has_angry_sentiment: true,
            ..Default::default()
        };
        let app = AppConfig::new("app")
            .with_rule(EscalationRule::new("signal:isHappy", RouteAction::Silence, "broken"))
            .with_rule(EscalationRule::new(
                "category:support_refund && signal:hasAngrySentiment",
                RouteAction::EscalateUrgent,
                "angry refund",
            ))
            .with_rule(EscalationRule::new(
                "category:support_refund",
                RouteAction::EscalateHuman,
                "all refunds",
            ));

        let out = route(&Router::default(), MessageCategory::SupportRefund, 0.9, &signals, "", &app, 0);
        assert_eq!(out.action, RouteAction::EscalateUrgent);
        assert_eq!(out.reason, "angry refund");

        let calm = MessageSignals::default();
        let out = route(&Router::default(), MessageCategory::SupportRefund, 0.9, &calm, "", &app, 0);
        assert_eq!(out.reason, "all refunds");
    }

    #[test]
    fn structural_categories() {
        assert_eq!(simple(MessageCategory::System).action, RouteAction::Silence);
        assert_eq!(simple(MessageCategory::Spam).action, RouteAction::Silence);
        assert_eq!(simple(MessageCategory::Resolved).action, RouteAction::Silence);
        assert_eq!(simple(MessageCategory::AwaitingCustomer).action, RouteAction::Silence);
        assert_eq!(simple(MessageCategory::VocResponse).action, RouteAction::CatalogVoc);
        assert_eq!(
            simple(MessageCategory::InstructorStrategy).action,
            RouteAction::SupportTeammate
        );
        assert_eq!(simple(MessageCategory::Unknown).action, RouteAction::EscalateHuman);
    }

    #[test]
    fn fan_mail_needs_an_instructor() {
        assert_eq!(simple(MessageCategory::FanMail).action, RouteAction::EscalateHuman);

        let app = AppConfig::new("app").with_instructor("tea_42");
        let signals = MessageSignals::default();
        for category in [MessageCategory::FanMail, MessageCategory::PresalesConsult] {
            let out = route(&Router::default(), category, 0.9, &signals, "", &app, 0);
            assert_eq!(out.action, RouteAction::EscalateInstructor);
        }
    }

    #[test]
    fn presales_team_always_escalates() {
        let out = route(
            &Router::default(),
            MessageCategory::PresalesTeam,
            0.99,
            &MessageSignals::default(),
            "licenses for our team",
            &AppConfig::new("app").with_auto_send(true),
            1000,
        );
        assert_eq!(out.action, RouteAction::EscalateHuman);
        assert!(!out.auto_send);
    }

    #[test]
    fn presales_team_without_escalation_still_goes_to_a_human() {
        let router = Router::new(
            ThresholdConfig::default()
                .with_category(MessageCategory::PresalesTeam, CategoryThreshold::new(0.5, 0)),
        );
        let out = route(
            &router,
            MessageCategory::PresalesTeam,
            0.99,
            &MessageSignals::default(),
            "",
            &AppConfig::new("app").with_auto_send(true),
            1000,
        );
        assert_eq!(out.action, RouteAction::EscalateHuman);
    }

    #[test]
    fn technical_outage_keyword_escalates() {
        let out = route(
            &Router::default(),
            MessageCategory::SupportTechnical,
            0.99,
            &MessageSignals::default(),
            "Is there an outage? Videos won't load",
            &AppConfig::new("app").with_auto_send(true),
            1000,
        );
        assert_eq!(out.action, RouteAction::EscalateHuman);
        assert!(out.reason.contains("outage"));
    }

    #[test]
    fn refund_auto_send_requires_volume() {
        let app = AppConfig::new("app").with_auto_send(true);
        let signals = MessageSignals::default();

        let out = route(&Router::default(), MessageCategory::SupportRefund, 0.97, &signals, "", &app, 99);
        assert_eq!(out.action, RouteAction::Respond);
        assert!(!out.auto_send);

        let out = route(&Router::default(), MessageCategory::SupportRefund, 0.97, &signals, "", &app, 100);
        assert!(out.auto_send);
    }

    #[test]
    fn auto_send_requires_confidence() {
        let app = AppConfig::new("app").with_auto_send(true);
        let out = route(
            &Router::default(),
            MessageCategory::SupportAccess,
            0.9,
            &MessageSignals::default(),
            "",
            &app,
            10_000,
        );
        assert_eq!(out.action, RouteAction::Respond);
        assert!(!out.auto_send);
    }

    #[test]
    fn auto_send_requires_app_opt_in() {
        let out = route(
            &Router::default(),
            MessageCategory::PresalesFaq,
            0.99,
            &MessageSignals::default(),
            "",
            &AppConfig::new("app"),
            10_000,
        );
        assert_eq!(out.action, RouteAction::Respond);
        assert!(!out.auto_send);
        assert!(out.reason.contains("auto-send disabled"));
    }

    #[test]
    fn auto_send_only_with_respond() {
        let app = AppConfig::new("app").with_auto_send(true).with_instructor("tea_1");
        let signals = MessageSignals::default();
        for category in MessageCategory::all() {
            let out = route(&Router::default(), *category, 1.0, &signals, "", &app, u64::MAX);
            if out.auto_send {
                assert_eq!(out.action, RouteAction::Respond, "{category}");
            }
        }
    }

    fn route_thread(category: MessageCategory, input: &crate::thread::ThreadInput) -> RouteOutput {
        let signals = compute_thread_signals(input).unwrap();
        Router::default().route_thread(&ThreadRouteInput {
            category,
            confidence: 0.9,
            signals: &signals,
            text: "",
            app: &AppConfig::new("app"),
            category_volume: 0,
        })
    }

    #[test]
    fn thread_with_teammate_turn_supports_teammate() {
        let input = thread(vec![
            customer("The checkout page shows an error", 0),
            teammate("Can you send a screenshot?", 1),
            customer("Here it is", 2),
        ]);
        let out = route_thread(MessageCategory::SupportTechnical, &input);
        assert_eq!(out.action, RouteAction::SupportTeammate);
    }

    #[test]
    fn thread_without_teammate_responds() {
        let input = thread(vec![customer("I can't log in", 0)]);
        let out = route_thread(MessageCategory::SupportAccess, &input);
        assert_eq!(out.action, RouteAction::Respond);
    }

    #[test]
    fn resolved_thread_is_silent() {
        let input = thread(vec![
            customer("I lost access", 0),
            teammate("Fixed it", 1),
            customer("That worked, thanks!", 2),
        ]);
        let out = route_thread(MessageCategory::Resolved, &input);
        assert_eq!(out.action, RouteAction::Silence);
    }

    #[test]
    fn legal_threat_in_thread_overrides_state() {
        let input = thread(vec![
            customer("I want my money back", 0),
            teammate("Let me check", 1),
            customer("If not refunded today my lawyer will call you", 2),
        ]);
        let out = route_thread(MessageCategory::SupportRefund, &input);
        assert_eq!(out.action, RouteAction::EscalateUrgent);
    }

    #[test]
    fn escalate_always_applies_to_non_responding_categories() {
        for category in [
            MessageCategory::VocResponse,
            MessageCategory::InstructorStrategy,
            MessageCategory::Spam,
        ] {
            let router = Router::new(
                ThresholdConfig::default()
                    .with_category(category, CategoryThreshold::fallback().with_escalate_always()),
            );
            let out = route(
                &router,
                category,
                0.99,
                &MessageSignals::default(),
                "",
                &AppConfig::new("app"),
                0,
            );
            assert_eq!(out.action, RouteAction::EscalateHuman, "{category}");
            assert!(out.reason.contains("always escalated"));
        }
    }

    #[test]
    fn keywords_apply_to_non_responding_categories() {
        let router = Router::new(ThresholdConfig::default().with_category(
            MessageCategory::VocResponse,
            CategoryThreshold::fallback().with_keywords(["chargeback"]),
        ));
        let signals = MessageSignals::default();
        let app = AppConfig::new("app");

        let out = route(&router, MessageCategory::VocResponse, 0.9, &signals, "Filing a chargeback", &app, 0);
        assert!(out.action.is_escalation());

        let out = route(&router, MessageCategory::VocResponse, 0.9, &signals, "Loved the survey", &app, 0);
        assert_eq!(out.action, RouteAction::CatalogVoc);
    }

    #[test]
    fn app_rules_win_over_threshold_escalation() {
        let app = AppConfig::new("app").with_rule(EscalationRule::new(
            "category:presales_team",
            RouteAction::EscalateInstructor,
            "team deals go to the instructor",
        ));
        let out = route(
            &Router::default(),
            MessageCategory::PresalesTeam,
            0.9,
            &MessageSignals::default(),
            "",
            &app,
            0,
        );
        assert_eq!(out.action, RouteAction::EscalateInstructor);
    }

    fn route_thread_text(
        router: &Router,
        category: MessageCategory,
        input: &crate::thread::ThreadInput,
    ) -> RouteOutput {
        let signals = compute_thread_signals(input).unwrap();
        let text = input
            .trigger_message
            .as_ref()
            .map(|m| m.body.as_str())
            .unwrap_or_default();
        router.route_thread(&ThreadRouteInput {
            category,
            confidence: 0.99,
            signals: &signals,
            text,
            app: &AppConfig::new("app"),
            category_volume: 1000,
        })
    }

    #[test]
    fn keyword_escalation_beats_teammate_ownership() {
        let input = thread(vec![
            customer("The player is broken", 0),
            teammate("Which browser?", 1),
            customer("All of them. It's an outage, everyone on my team sees it", 2),
        ]);
        let out = route_thread_text(&Router::default(), MessageCategory::SupportTechnical, &input);
        assert_eq!(out.action, RouteAction::EscalateHuman);
        assert!(out.reason.contains("everyone"));
    }

    #[test]
    fn escalate_always_beats_thread_state() {
        let router = Router::new(ThresholdConfig::default().with_category(
            MessageCategory::SupportAccess,
            CategoryThreshold::fallback().with_escalate_always(),
        ));
        let input = thread(vec![
            customer("I lost access", 0),
            teammate("Can you confirm your email?", 1),
            customer("It's the one I'm writing from", 2),
        ]);
        let out = route_thread_text(&router, MessageCategory::SupportAccess, &input);
        assert_eq!(out.action, RouteAction::EscalateHuman);
    }

    #[test]
    fn our_reply_wording_does_not_escalate_awaiting_thread() {
        let input = thread(vec![
            customer("Is module 3 up to date?", 0),
            teammate("Yes, we re-recorded it last year. Anything else?", 1),
        ]);
        let out = route_thread_text(&Router::default(), MessageCategory::AwaitingCustomer, &input);
        assert_eq!(out.action, RouteAction::Silence);
    }

    #[test]
    fn action_wire_names() {
        assert_eq!(
            serde_json::to_string(&RouteAction::EscalateUrgent).unwrap(),
            "\"escalate_urgent\""
        );
        assert!(RouteAction::EscalateInstructor.is_escalation());
        assert!(!RouteAction::SupportTeammate.is_escalation());
    }
}
