//! Deterministic signal extraction from message text.
//!
//! Every signal is computed independently on every call; nothing
//! short-circuits, so the fast-path cascades can consult any combination.

use serde::{Deserialize, Serialize};

use super::patterns::{self, contains_word, normalize};

/// A single inbound message as seen by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInput {
    #[serde(default)]
    pub subject: String,
    pub body: String,
    /// Sender address, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Instructor names to look for when deciding whether the message is personal.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instructor_names: Vec<String>,
}

impl MessageInput {
    /// Creates an input from a subject and body.
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            from: None,
            instructor_names: Vec::new(),
        }
    }

    /// Sets the sender address.
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Sets the instructor names.
    pub fn with_instructor_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructor_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Subject and body joined the way the extractor and prompts read them.
    pub fn full_text(&self) -> String {
        if self.subject.is_empty() {
            self.body.clone()
        } else {
            format!("{}\n{}", self.subject, self.body)
        }
    }
}

/// Boolean facts derived from message text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSignals {
    pub has_email_in_body: bool,
    pub has_purchase_date: bool,
    pub has_error_message: bool,
    pub is_reply: bool,
    pub mentions_instructor: bool,
    pub has_angry_sentiment: bool,
    pub is_automated: bool,
    pub is_vendor_outreach: bool,
    pub has_legal_threat: bool,
    pub has_outside_policy_timeframe: bool,
    pub is_personal_to_instructor: bool,
    pub is_presales_faq: bool,
    pub is_presales_team: bool,
}

impl MessageSignals {
    /// Looks up a signal by name.
    ///
    /// Accepts both the camelCase wire name (`hasLegalThreat`) and the
    /// snake_case field name (`has_legal_threat`).
    pub fn get(&self, name: &str) -> Option<bool> {
        let key: String = name
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        let value = match key.as_str() {
            "hasemailinbody" => self.has_email_in_body,
            "haspurchasedate" => self.has_purchase_date,
            "haserrormessage" => self.has_error_message,
            "isreply" => self.is_reply,
            "mentionsinstructor" => self.mentions_instructor,
            "hasangrysentiment" => self.has_angry_sentiment,
            "isautomated" => self.is_automated,
            "isvendoroutreach" => self.is_vendor_outreach,
            "haslegalthreat" => self.has_legal_threat,
            "hasoutsidepolicytimeframe" => self.has_outside_policy_timeframe,
            "ispersonaltoinstructor" => self.is_personal_to_instructor,
            "ispresalesfaq" => self.is_presales_faq,
            "ispresalesteam" => self.is_presales_team,
            _ => return None,
        };
        Some(value)
    }

    /// Field-wise OR of two signal records.
    pub fn union(&self, other: &MessageSignals) -> MessageSignals {
        MessageSignals {
            has_email_in_body: self.has_email_in_body || other.has_email_in_body,
            has_purchase_date: self.has_purchase_date || other.has_purchase_date,
            has_error_message: self.has_error_message || other.has_error_message,
            is_reply: self.is_reply || other.is_reply,
            mentions_instructor: self.mentions_instructor || other.mentions_instructor,
            has_angry_sentiment: self.has_angry_sentiment || other.has_angry_sentiment,
            is_automated: self.is_automated || other.is_automated,
            is_vendor_outreach: self.is_vendor_outreach || other.is_vendor_outreach,
            has_legal_threat: self.has_legal_threat || other.has_legal_threat,
            has_outside_policy_timeframe: self.has_outside_policy_timeframe
                || other.has_outside_policy_timeframe,
            is_personal_to_instructor: self.is_personal_to_instructor
                || other.is_personal_to_instructor,
            is_presales_faq: self.is_presales_faq || other.is_presales_faq,
            is_presales_team: self.is_presales_team || other.is_presales_team,
        }
    }

    /// Names of the signals that are set, for logging and prompts.
    pub fn active(&self) -> Vec<&'static str> {
        [
            ("hasEmailInBody", self.has_email_in_body),
            ("hasPurchaseDate", self.has_purchase_date),
            ("hasErrorMessage", self.has_error_message),
            ("isReply", self.is_reply),
            ("mentionsInstructor", self.mentions_instructor),
            ("hasAngrySentiment", self.has_angry_sentiment),
            ("isAutomated", self.is_automated),
            ("isVendorOutreach", self.is_vendor_outreach),
            ("hasLegalThreat", self.has_legal_threat),
            ("hasOutsidePolicyTimeframe", self.has_outside_policy_timeframe),
            ("isPersonalToInstructor", self.is_personal_to_instructor),
            ("isPresalesFaq", self.is_presales_faq),
            ("isPresalesTeam", self.is_presales_team),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// Extracts all signals from a message.
pub fn extract_signals(input: &MessageInput) -> MessageSignals {
    let subject = normalize(&input.subject);
    let body = normalize(&input.body);
    let text = if subject.is_empty() {
        body.clone()
    } else {
        format!("{}\n{}", subject, body)
    };
    let sender = input.from.as_deref().map(normalize);

    let names_instructor = input
        .instructor_names
        .iter()
        .any(|name| contains_word(&text, &normalize(name)));
    let mentions_instructor = names_instructor || patterns::INSTRUCTOR_GENERIC.is_match(&text);

    let is_automated = patterns::AUTOMATED.is_match(&text)
        || sender
            .as_deref()
            .is_some_and(|from| patterns::AUTOMATED_SENDER.is_match(from));

    // A bare "thanks" sign-off is not appreciation; the pattern set requires a
    // genuine phrase such as "thank you so much" or "love your course".
    let is_personal_to_instructor = patterns::CASUAL_GREETING.is_match(&text)
        || (mentions_instructor && patterns::APPRECIATION.is_match(&text));

    MessageSignals {
        has_email_in_body: patterns::EMAIL_ADDRESS.is_match(&body),
        has_purchase_date: patterns::PURCHASE_DATE.is_match(&text),
        has_error_message: patterns::ERROR_MESSAGE.is_match(&text),
        is_reply: patterns::REPLY_SUBJECT.is_match(&subject) || patterns::REPLY_BODY.is_match(&body),
        mentions_instructor,
        has_angry_sentiment: patterns::ANGRY_SENTIMENT.is_match(&text),
        is_automated,
        is_vendor_outreach: patterns::VENDOR_OUTREACH.is_match(&text),
        has_legal_threat: patterns::LEGAL_THREAT.is_match(&text),
        has_outside_policy_timeframe: patterns::OUTSIDE_POLICY_TIMEFRAME.is_match(&text),
        is_personal_to_instructor,
        is_presales_faq: patterns::PRESALES_FAQ.is_match(&text),
        is_presales_team: patterns::PRESALES_TEAM.is_match(&text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(subject: &str, body: &str) -> MessageSignals {
        extract_signals(&MessageInput::new(subject, body))
    }

    #[test]
    fn out_of_office_is_automated() {
        let input = MessageInput::new("Out of office", "I am out until Monday").with_from("jane@co.com");
        assert!(extract_signals(&input).is_automated);
    }

    #[test]
    fn autoresponder_boilerplate_is_automated() {
        let s = signals(
            "Re: your question",
            "Hi, we work normal business hours. If you email outside of those times we reply later.",
        );
        assert!(s.is_automated);
    }

    #[test]
    fn noreply_sender_is_automated() {
        let input = MessageInput::new("Your receipt", "Payment processed").with_from("NoReply@stripe.com");
        assert!(extract_signals(&input).is_automated);
    }

    #[test]
    fn regular_sender_is_not_automated() {
        let input = MessageInput::new("Question", "How do I reset my password?").with_from("sam@example.com");
        assert!(!extract_signals(&input).is_automated);
    }

    #[test]
    fn email_detected_in_body_only() {
        assert!(signals("", "Please use my work address sam@work.io instead").has_email_in_body);
        assert!(!signals("sam@work.io", "no address here").has_email_in_body);
    }

    #[test]
    fn vendor_outreach_detected() {
        let s = signals(
            "Partnership opportunity",
            "I came across your website and we help course creators grow their audience.",
        );
        assert!(s.is_vendor_outreach);
    }

    #[test]
    fn legal_threat_detected() {
        assert!(signals("", "I will contact my lawyer if this is not fixed").has_legal_threat);
        assert!(signals("", "I'm going to file a chargeback").has_legal_threat);
        assert!(!signals("", "Let me pursue this course further").has_legal_threat);
    }

    #[test]
    fn outside_policy_timeframe_detected() {
        assert!(signals("", "I bought it two years ago and want a refund").has_outside_policy_timeframe);
        assert!(signals("", "Purchased last year").has_outside_policy_timeframe);
        assert!(!signals("", "I bought it yesterday").has_outside_policy_timeframe);
    }

    #[test]
    fn purchase_date_detected() {
        assert!(signals("", "I purchased the course on March 3rd").has_purchase_date);
        assert!(signals("", "Order date: 2024-01-15").has_purchase_date);
        assert!(!signals("", "I love the course").has_purchase_date);
    }

    #[test]
    fn error_message_detected() {
        assert!(signals("", "The video player shows Error 500").has_error_message);
        assert!(signals("", "The lesson page won't load").has_error_message);
    }

    #[test]
    fn reply_detected_from_subject_or_quote() {
        assert!(signals("Re: Access", "thanks").is_reply);
        assert!(signals("", "sure\n\nOn Mon, Jan 1, 2024 Support wrote:\n> hello").is_reply);
        assert!(!signals("Access", "hello").is_reply);
    }

    #[test]
    fn angry_sentiment_detected() {
        assert!(signals("", "This is ridiculous, worst support ever").has_angry_sentiment);
        assert!(!signals("", "Thanks for the quick help").has_angry_sentiment);
    }

    #[test]
    fn sign_off_with_instructor_name_is_not_personal() {
        let input = MessageInput::new("Invoice", "Can I get an invoice?\n\nThanks,\nJohn")
            .with_instructor_names(["John"]);
        let s = extract_signals(&input);
        assert!(s.mentions_instructor);
        assert!(!s.is_personal_to_instructor);
    }

    #[test]
    fn appreciation_for_instructor_is_personal() {
        let input = MessageInput::new(
            "Thank you",
            "Kent, thank you so much. Your course changed how I write tests.",
        )
        .with_instructor_names(["Kent"]);
        let s = extract_signals(&input);
        assert!(s.mentions_instructor);
        assert!(s.is_personal_to_instructor);
    }

    #[test]
    fn appreciation_without_instructor_mention_is_not_personal() {
        let s = signals("", "Really appreciate the fast shipping");
        assert!(!s.mentions_instructor);
        assert!(!s.is_personal_to_instructor);
    }

    #[test]
    fn casual_greeting_is_personal() {
        assert!(signals("", "yo! quick one for you").is_personal_to_instructor);
        assert!(signals("", "hey man, how's it going").is_personal_to_instructor);
        assert!(!signals("", "Support needed for my account").is_personal_to_instructor);
    }

    #[test]
    fn presales_signals_detected() {
        assert!(signals("", "Is there a student discount available?").is_presales_faq);
        assert!(signals("", "We need licenses for our team of engineers").is_presales_team);
        assert!(signals("", "Can we get a team license for 12 developers?").is_presales_team);
    }

    #[test]
    fn extraction_is_idempotent() {
        let input = MessageInput::new("Re: refund", "I bought it last year, my lawyer says refund me")
            .with_from("x@y.com")
            .with_instructor_names(["Matt"]);
        assert_eq!(extract_signals(&input), extract_signals(&input));
    }

    #[test]
    fn get_accepts_camel_and_snake_case() {
        let s = MessageSignals {
            has_legal_threat: true,
            ..Default::default()
        };
        assert_eq!(s.get("hasLegalThreat"), Some(true));
        assert_eq!(s.get("has_legal_threat"), Some(true));
        assert_eq!(s.get("isAutomated"), Some(false));
        assert_eq!(s.get("notASignal"), None);
    }

    #[test]
    fn union_is_fieldwise_or() {
        let a = MessageSignals {
            is_automated: true,
            ..Default::default()
        };
        let b = MessageSignals {
            has_legal_threat: true,
            ..Default::default()
        };
        let merged = a.union(&b);
        assert!(merged.is_automated);
        assert!(merged.has_legal_threat);
        assert!(!merged.is_reply);
    }

    #[test]
    fn active_lists_set_signals() {
        let s = MessageSignals {
            is_reply: true,
            is_presales_team: true,
            ..Default::default()
        };
        assert_eq!(s.active(), vec!["isReply", "isPresalesTeam"]);
    }

    #[test]
    fn signals_serialize_camel_case() {
        let json = serde_json::to_value(MessageSignals::default()).unwrap();
        assert!(json.get("hasLegalThreat").is_some());
        assert!(json.get("isPersonalToInstructor").is_some());
    }
}
