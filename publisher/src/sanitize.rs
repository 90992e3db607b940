//! Secret redaction for rendered envelopes
//!
//! The publisher never decides what a secret looks like. It only guarantees
//! that the configured [`Sanitizer`] sees every rendered envelope and
//! dead-letter record before the bytes leave the process.

use regex::Regex;
use std::sync::LazyLock;

/// Replaces recognizable secrets in rendered text with redaction markers
///
/// Must be pure and cheap: it runs on every serialize.
/// Any `Fn(&str) -> String` closure is a sanitizer.
pub trait Sanitizer: Send + Sync {
    /// Return `text` with secrets replaced
    fn sanitize(&self, text: &str) -> String;
}

impl<F> Sanitizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn sanitize(&self, text: &str) -> String {
        self(text)
    }
}

/// Sanitizer that returns its input unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSanitizer;

impl Sanitizer for NoopSanitizer {
    fn sanitize(&self, text: &str) -> String {
        text.to_string()
    }
}

/// One pattern and what to replace its matches with
#[derive(Debug, Clone)]
struct Rule {
    regex: Regex,
    replacement: String,
}

// Literal patterns, exercised by the tests below.
#[allow(clippy::expect_used)]
static DEFAULT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    [
        (r"sk-[A-Za-z0-9_-]{20,}", "[REDACTED_API_KEY]"),
        (r"gh[pousr]_[A-Za-z0-9]{36,}", "[REDACTED_GITHUB_TOKEN]"),
        (r"AKIA[0-9A-Z]{16}", "[REDACTED_AWS_KEY]"),
        (r"xox[abprs]-[A-Za-z0-9-]{10,}", "[REDACTED_SLACK_TOKEN]"),
        (r"(?i)bearer\s+[A-Za-z0-9._~+/-]+=*", "Bearer [REDACTED]"),
        // JSON member whose key names a secret: the whole string value goes,
        // escapes included. Non-string values (false, 42, null) are kept.
        (
            concat!(
                r#"(?i)("[^"\\]*(?:api[_-]?key|access[_-]?token|auth[_-]?token|secret|password)"#,
                r#"[^"\\]*"\s*:\s*)"(?:[^"\\]|\\.)*""#,
            ),
            r#"${1}"[REDACTED]""#,
        ),
        // key=value / key: value inside free text
        (
            concat!(
                r#"(?i)((?:api[_-]?key|access[_-]?token|auth[_-]?token|secret|password)"#,
                r#"\s*[:=]\s*)[^"\s,;&}\\]+"#,
            ),
            "${1}[REDACTED]",
        ),
    ]
    .into_iter()
    .map(|(pattern, replacement)| Rule {
        regex: Regex::new(pattern).expect("default redaction pattern must compile"),
        replacement: replacement.to_string(),
    })
    .collect()
});

/// Regex-backed sanitizer with a default set of secret patterns
///
/// Covers OpenAI-style `sk-` keys, GitHub tokens, AWS access key ids, Slack
/// tokens, `Bearer` credentials and `api_key` / `secret` / `password`
/// key-value pairs. Extra patterns run after the defaults.
///
/// # Example
///
/// ```
/// use herald_publisher::{PatternSanitizer, Sanitizer};
///
/// let sanitizer = PatternSanitizer::new();
/// let clean = sanitizer.sanitize(r#"{"api_key":"hunter2"}"#);
/// assert_eq!(clean, r#"{"api_key":"[REDACTED]"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct PatternSanitizer {
    rules: Vec<Rule>,
}

impl PatternSanitizer {
    /// Sanitizer with the default patterns
    pub fn new() -> Self {
        Self {
            rules: DEFAULT_RULES.clone(),
        }
    }

    /// Sanitizer with no patterns; add some with [`with_pattern`](Self::with_pattern)
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a pattern. `replacement` may reference capture groups (`${1}`).
    pub fn with_pattern(
        mut self,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        self.rules.push(Rule {
            regex: Regex::new(pattern)?,
            replacement: replacement.into(),
        });
        Ok(self)
    }

    /// Number of active patterns
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no patterns are configured
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for PatternSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sanitizer for PatternSanitizer {
    fn sanitize(&self, text: &str) -> String {
        let mut out = text.to_string();
        for rule in &self.rules {
            if rule.regex.is_match(&out) {
                out = rule
                    .regex
                    .replace_all(&out, rule.replacement.as_str())
                    .into_owned();
            }
        }
        out
    }
}
