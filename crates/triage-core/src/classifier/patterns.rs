//! Pre-compiled regex tables used by signal extraction and the fast paths.
//!
//! Every pattern is written against normalized text (see [`normalize`]):
//! lowercase, with typographic apostrophes folded to `'`. Word boundaries are
//! used throughout to avoid substring hits ("support" must not match "sup").

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

/// A named group of patterns checked together.
pub(crate) struct PatternSet {
    name: &'static str,
    /// Regex set for fast multi-pattern matching.
    regex_set: RegexSet,
    /// Individual regexes for extracting matched text.
    regexes: Vec<Regex>,
}

impl PatternSet {
    fn new(name: &'static str, patterns: &[&str]) -> Self {
        let regex_set = RegexSet::new(patterns).expect("Invalid regex patterns");
        let regexes = patterns
            .iter()
            .map(|p| Regex::new(p).expect("Invalid regex pattern"))
            .collect();

        Self {
            name,
            regex_set,
            regexes,
        }
    }

    /// Name of this group, used in log events.
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if any pattern matches the normalized text.
    pub(crate) fn is_match(&self, text: &str) -> bool {
        self.regex_set.is_match(text)
    }

    /// Returns the text matched by the first matching pattern.
    pub(crate) fn first_match<'t>(&self, text: &'t str) -> Option<&'t str> {
        let index = self.regex_set.matches(text).iter().next()?;
        self.regexes[index].find(text).map(|m| m.as_str())
    }
}

/// Lowercases text and folds curly apostrophes so patterns can stay simple.
pub(crate) fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

/// Returns true if `needle` occurs in `haystack` on word boundaries.
///
/// Both sides are expected to be normalized already.
pub(crate) fn contains_word(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }

    haystack.match_indices(needle).any(|(start, matched)| {
        let end = start + matched.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

// === Message signals ===

pub(crate) static EMAIL_ADDRESS: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "email_address",
        &[r"\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b"],
    )
});

pub(crate) static PURCHASE_DATE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "purchase_date",
        &[
            r"\b(bought|purchased|ordered|paid)\b[^.!?\n]{0,40}\b(on|in|last|yesterday|today|ago)\b",
            r"\b(purchase|order) date\b",
            r"\b\d{1,2}[/.-]\d{1,2}[/.-]\d{2,4}\b",
            r"\b(19|20)\d{2}-\d{2}-\d{2}\b",
            r"\b(jan(uary)?|feb(ruary)?|mar(ch)?|apr(il)?|june?|july?|aug(ust)?|sept?(ember)?|oct(ober)?|nov(ember)?|dec(ember)?)\.? \d{1,2}(st|nd|rd|th)?\b",
        ],
    )
});

pub(crate) static ERROR_MESSAGE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "error_message",
        &[
            r"\berrors?\b",
            r"\bexceptions?\b",
            r"\bstack ?trace\b",
            r"\btraceback\b",
            r"\b(404|500|502|503)\b",
            r"\bcrash(es|ed|ing)?\b",
            r"\bfailed to\b",
            r"\bnot (working|loading|playing)\b",
            r"\b(doesn't|does not|won't|will not) (work|load|play|open)\b",
        ],
    )
});

pub(crate) static REPLY_SUBJECT: Lazy<PatternSet> =
    Lazy::new(|| PatternSet::new("reply_subject", &[r"^\s*(re|aw|sv)\s*:"]));

pub(crate) static REPLY_BODY: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "reply_body",
        &[
            r"(?m)^on .+ wrote:\s*$",
            r"(?m)^>",
            r"-----original message-----",
        ],
    )
});

pub(crate) static INSTRUCTOR_GENERIC: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "instructor_generic",
        &[
            r"\byour (course|courses|workshop|workshops|tutorials?|videos?|newsletter|teaching)\b",
            r"\b(instructor|teacher)\b",
        ],
    )
});

pub(crate) static ANGRY_SENTIMENT: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "angry_sentiment",
        &[
            r"\b(ridiculous|unacceptable|outrageous|furious|disgusted|scam|scammed|fraud|fraudulent)\b",
            r"\brip[- ]?off\b",
            r"\b(worst|terrible|horrible|awful|pathetic) (service|support|experience|course|company)\b",
            r"\bwtf\b",
            r"\bthis is (a )?joke\b",
            r"!{3,}",
        ],
    )
});

pub(crate) static AUTOMATED: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "automated",
        &[
            r"\bout of (the )?office\b",
            r"\bauto(matic)?[- ]?(reply|response|responder)\b",
            r"\bi(?: am|'m) (?:currently )?(?:out|away)(?: of (?:the )?office)? until\b",
            r"\bon (vacation|holiday|leave|parental leave) until\b",
            r"\bdo not reply to this (email|message)\b",
            r"\bthis is an automated (message|email|notification)\b",
            r"\bdelivery status notification\b",
            r"\bundeliverable\b",
            r"\bmail delivery (failed|subsystem)\b",
            r"\bwe work normal business hours\b",
            r"\bif you email outside of those times\b",
        ],
    )
});

pub(crate) static AUTOMATED_SENDER: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "automated_sender",
        &[r"^\s*(no-?reply|do-?not-?reply|mailer-daemon|postmaster|notifications?|bounces?)@"],
    )
});

pub(crate) static VENDOR_OUTREACH: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "vendor_outreach",
        &[
            r"\bpartnership (opportunit(y|ies)|proposal|inquiry)\b",
            r"\b(sponsored|sponsorship) (post|content|opportunit(y|ies)|deal)\b",
            r"\bguest (post|article)s?\b",
            r"\bbacklinks?\b",
            r"\bseo (services?|audit|agency|expert)\b",
            r"\b(affiliate|referral) (program|partnership|opportunity)\b",
            r"\b(collaboration|collab) (opportunit(y|ies)|proposal)\b",
            r"\bi came across your (website|site|course|channel|profile)\b",
            r"\bwe help (companies|businesses|brands|creators|course creators)\b",
            r"\b(increase|boost|grow) your (traffic|revenue|sales|conversions|audience)\b",
            r"\b(book|schedule) a (quick |short )?(call|demo|meeting)\b",
            r"\blead generation\b",
        ],
    )
});

pub(crate) static LEGAL_THREAT: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "legal_threat",
        &[
            r"\b(lawyer|attorney|solicitor)s?\b",
            r"\blegal action\b",
            r"\b(sue|suing)\b",
            r"\blawsuit\b",
            r"\bsmall claims\b",
            r"\bconsumer protection\b",
            r"\bbetter business bureau\b",
            r"\b(file|filing|open|opening) a (chargeback|dispute)\b",
            r"\breport(ing)? (you|this) to (the )?(ftc|bbb|authorities)\b",
        ],
    )
});

pub(crate) static OUTSIDE_POLICY_TIMEFRAME: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "outside_policy_timeframe",
        &[
            r"\b(\d+|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|several|many) (months|years) ago\b",
            r"\b(a|one|over a|more than a) year ago\b",
            r"\blast year\b",
            r"\b(bought|purchased) (it |this |the course )?(back )?in (19|20)\d{2}\b",
        ],
    )
});

pub(crate) static CASUAL_GREETING: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "casual_greeting",
        &[
            r"(?m)^\s*(yo|sup|wassup|howdy|what's up|whats up)\b",
            r"\b(hey|hi|yo) (man|dude|bro|buddy|mate)\b",
            r"\b(lol|lmao)\b",
        ],
    )
});

pub(crate) static APPRECIATION: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "appreciation",
        &[
            r"\bthank(s| you) (so|very) much\b",
            r"\bthank(s| you) for (everything|all (that )?you do|all your|making|creating|teaching|sharing|putting)\b",
            r"\b(love|loved|loving|enjoy|enjoyed|enjoying) (your|the|this) (course|courses|content|work|videos?|tutorials?|workshops?|newsletter|teaching)\b",
            r"\byou('ve| have)? (changed|helped|transformed) (my|me)\b",
            r"\b(huge|big|long[- ]time) fan\b",
            r"\breally appreciate\b",
            r"\b(so|very|truly|deeply) grateful\b",
            r"\bi('m| am) grateful\b",
        ],
    )
});

pub(crate) static PRESALES_FAQ: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "presales_faq",
        &[
            r"\b(student|regional|ppp|parity|military|educational) (discount|pricing)\b",
            r"\b(is there|do you (offer|have)|any) (a |an )?(discount|coupon|promo( code)?|sale)\b",
            r"\bbefore (i|we) (buy|purchase)\b",
            r"\b(does|will|is) (the|this) course (cover|include|suitable|good for|updated)\b",
            r"\bwhat('s| is) included\b",
            r"\blifetime access\b",
        ],
    )
});

pub(crate) static PRESALES_TEAM: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "presales_team",
        &[
            r"\bteam (license|licenses|plan|pricing|seats?|account|purchase)\b",
            r"\b(licenses|seats|copies) for (my|our) (team|company|employees|developers|engineers|staff)\b",
            r"\bbulk (purchase|pricing|licenses?|discount|order)\b",
            r"\benterprise (plan|license|licensing|pricing|deal)\b",
            r"\bpurchase order\b",
            r"\bfor (\d+|several|multiple) (developers|engineers|employees|people|team members|seats)\b",
        ],
    )
});

// === Thread resolution ===

pub(crate) static RESOLUTION_PHRASE: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "resolution_phrase",
        &[
            r"\bthat (worked|did it|fixed it|did the trick|solved it)\b",
            r"\b(it|this|everything)('s| is)? (working|works) (now|again)\b",
            r"\b(works|working) (perfectly|great|fine) now\b",
            r"\ball (set|sorted|good)\b",
            r"\bgot it,? thank(s| you)\b",
            r"\b(issue|problem) (is )?(solved|resolved|fixed)\b",
            r"\bproblem solved\b",
            r"\bno (further|more) (help|assistance) needed\b",
            r"\b(i'm|i am) (in|back in) now\b",
            r"\bperfect,? thank(s| you)\b",
        ],
    )
});

pub(crate) static THANK_YOU: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "thank_you",
        &[
            r"\bthank(s| you)\b",
            r"\bthx\b",
            r"\bcheers\b",
            r"\bappreciate it\b",
        ],
    )
});

// === Fast-path intents ===

pub(crate) static REFUND_REQUEST: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "refund_request",
        &[
            r"\brefund(s|ed|ing)?\b",
            r"\bmoney back\b",
            r"\bcancel(l?ed|l?ing)?\b[^.!?\n]{0,40}\bpurchase\b",
        ],
    )
});

pub(crate) static ACCESS_LOSS: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "access_loss",
        &[
            r"\b(can't|cant|cannot|can not|unable to|couldn't|could not)\s+(access|log ?in|login|sign ?in)\b",
            r"\b(lost|no) access\b",
            r"\brestore (my )?access\b",
        ],
    )
});

pub(crate) static TRANSFER_REQUEST: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "transfer_request",
        &[
            r"\btransfer (my |the |this |a )?(purchase|license|licence|account|course|access)\b",
            r"\b(change|update|switch) (my |the )?(account |login |purchase )?e-?mail( address)?\b",
            r"\b(move|switch|transfer) (my |the )?(purchase|license|account|course) to\b",
            r"\b(wrong|different|old|new) e-?mail (address )?(on|for) (my |the )?(purchase|account|order)\b",
        ],
    )
});

pub(crate) static BILLING_REQUEST: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "billing_request",
        &[
            r"\binvoices?\b",
            r"\breceipts?\b",
            r"\bbilling\b",
            r"\bbilled\b",
            r"\bvat\b",
            r"\b(tax|gst) (id|number|invoice)\b",
        ],
    )
});

/// Outreach pitches checked against the first inbound message of a thread.
pub(crate) static SPAM_PITCH: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::new(
        "spam_pitch",
        &[
            r"\bpartnership (opportunit(y|ies)|proposal|inquiry)\b",
            r"\b(sponsored|sponsorship|paid) (post|content|placement|review|opportunit(y|ies))\b",
            r"\b(affiliate|referral) (program|partnership|opportunity)\b",
            r"\bseo (services?|audit|agency|expert|ranking)\b",
            r"\bguest (post|article)s?\b",
            r"\bbacklinks?\b",
            r"\blink (insertion|placement|exchange)\b",
            r"\bdomain authority\b",
            r"\bpromote your (course|product|brand|business)\b",
            r"\bwhite[- ]label\b",
        ],
    )
});
