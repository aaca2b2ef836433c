// Noise vs signal classification for free-text lines
//
// Two pure predicates over a text string, backed by ordered rule tables.
// Each rule is a pattern plus a verdict; some carry an exclusion pattern
// (e.g. "passed" phrasing is a signal unless the line is an SSH
// authentication banner). The tables are data, not control flow, so new
// heuristics are added without touching the predicates.

use regex::Regex;
use std::sync::OnceLock;

/// One classification rule: match the pattern, unless the exclusion hits
struct Rule {
    name: &'static str,
    pattern: Regex,
    unless: Option<Regex>,
}

impl Rule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("rule pattern must compile"),
            unless: None,
        }
    }

    fn unless(mut self, pattern: &str) -> Self {
        self.unless = Some(Regex::new(pattern).expect("exclusion pattern must compile"));
        self
    }

    fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
            && !self.unless.as_ref().map(|re| re.is_match(text)).unwrap_or(false)
    }
}

/// Lines that carry no information for the operator
fn noise_rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            Rule::new(
                "serialized-envelope",
                r#"^\s*\{\s*"(type|event_type|event|data|job_id)""#,
            ),
            Rule::new("xml-markup", r"(?i)<\?xml|</?rpc|<rpc-reply|\]\]>\]\]>"),
            Rule::new(
                "ssh-banner",
                r"(?i)^ssh-\d|remote version|\bkex\b|key exchange|server host key|\bcipher\b|\bhmac\b|mac algorithm|compression algorithm|authenticated \(|authentication \(|authentication success",
            ),
            Rule::new(
                "library-trace",
                r#"(?i)^\s*\[?[a-z_][\w-]*(\.[\w-]+){2,}[\s\]:]|^\s*file ".+", line \d+|, line \d+, in "#,
            ),
            Rule::new("hex-dump", r"(?:\\x[0-9a-fA-F]{2}){8,}|^\s*(?:[0-9a-fA-F]{2}[ :]){24,}"),
            Rule::new("keepalive", r"(?i)\bkeep-?alive\b|\bheartbeat\b"),
        ]
    })
}

/// Lines the operator should always see
fn signal_rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            Rule::new("check-counter", r"(?i)\bcheck\s+\d+\s*/\s*\d+"),
            Rule::new("step-marker", r"(?i)^step\b|\bstep\s+\d+"),
            Rule::new("status-glyph", "[\u{2705}\u{274C}\u{26A0}\u{1F50D}\u{1F6AB}]"),
            Rule::new(
                "domain-keyword",
                r"(?i)\b(image|storage|disk|filesystem|snapshot|hardware|chassis|alarm|firmware|bgp|ospf|lacp|interface|protocol)\b",
            ),
            Rule::new("pass-fail", r"(?i)\b(pass|passed|passing|fail|failed|failure)\b")
                .unless(r"(?i)authentication"),
            Rule::new(
                "validation-verb",
                r"(?i)\b(checking|validating|verifying|retrieving)\b|\bstarting\b.*\bvalidation\b|\bcompleted\b.*\bcheck\b",
            ),
            Rule::new("version-compat", r"(?i)\bversion\b|compatib"),
            Rule::new(
                "reachability",
                r"(?i)reachab|unreachable|responding|connectivity",
            )
            .unless(r"(?i)openssh"),
        ]
    })
}

/// True when the text is operator-irrelevant noise
///
/// Deterministic function of the input only.
pub fn is_noise(text: &str) -> bool {
    if text.trim().is_empty() {
        return true;
    }
    noise_rules().iter().any(|rule| rule.matches(text))
}

/// True when the text is explicitly meaningful to the operator
///
/// Deterministic function of the input only. Note this does not imply
/// `!is_noise`: the normalizer checks noise first, then user-facing.
pub fn is_user_facing(text: &str) -> bool {
    signal_rules().iter().any(|rule| rule.matches(text))
}

/// Name of the first matching noise rule, for diagnostics
pub fn noise_rule_name(text: &str) -> Option<&'static str> {
    noise_rules().iter().find(|rule| rule.matches(text)).map(|rule| rule.name)
}
