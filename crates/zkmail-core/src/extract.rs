//! # Username Extraction
//!
//! Derives the username a message was addressed to from its decoded text.
//! Message templates are fixed per sending service, so extraction is
//! pattern matching against known phrasing.
//!
//! ## Rule Order
//!
//! 1. **Greeting**: `<greeting-token> <username>,`. The username is the
//!    text between the token and the next comma on the same line, trimmed.
//! 2. **Footer**: a sentence naming the recipient address followed by a
//!    localized phrase. The username is the first whitespace-delimited token
//!    in the slot, with trailing punctuation removed.
//!
//! The first rule that yields a non-empty username wins. Footer rules are
//! strictly less specific than the greeting and are only consulted when no
//! greeting matches.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// Greeting tokens recognised by the standard extractor.
pub const DEFAULT_GREETINGS: &[&str] = &["Merhaba", "Hello", "Hi"];

/// Footer sentences recognised by the standard extractor, one per locale.
/// Each pattern has exactly one capture group: the username slot.
const FOOTER_PATTERNS: &[&str] = &[
    r"This\s+(?:message|email)\s+was\s+sent\s+to\s+\S+@\S+\s+and\s+intended\s+for\s+(\S+)",
    r"Bu\s+(?:mesaj|e-posta)\s+\S+@\S+\s+adresine\s+gönderildi\s+ve\s+(\S+)\s+için",
];

/// Which rule produced an extracted username.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionRule {
    /// Matched `<greeting-token> <username>,`.
    Greeting,
    /// Matched a localized footer sentence.
    Footer,
}

impl std::fmt::Display for ExtractionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Greeting => "greeting",
            Self::Footer => "footer",
        })
    }
}

/// An ordered set of username extraction rules.
#[derive(Debug, Clone)]
pub struct UsernameExtractor {
    greeting: Regex,
    footers: Vec<Regex>,
}

impl UsernameExtractor {
    /// Build an extractor recognising the given greeting tokens plus the
    /// standard footer sentences.
    ///
    /// Tokens are matched literally and case-sensitively at a word boundary.
    pub fn with_greetings<S: AsRef<str>>(tokens: &[S]) -> Result<Self, ExtractionError> {
        let alternatives: Vec<String> = tokens
            .iter()
            .map(|t| regex::escape(t.as_ref().trim()))
            .filter(|t| !t.is_empty())
            .collect();
        if alternatives.is_empty() {
            return Err(ExtractionError::InvalidRule {
                pattern: String::new(),
                reason: "at least one greeting token is required".to_string(),
            });
        }
        let pattern = format!(
            r"\b(?:{})[ \t]+([^,\r\n]+),",
            alternatives.join("|")
        );
        let greeting = compile(&pattern)?;
        let footers = FOOTER_PATTERNS
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { greeting, footers })
    }

    /// The extractor with [`DEFAULT_GREETINGS`], compiled once per process.
    pub fn standard() -> Result<&'static Self, ExtractionError> {
        static STANDARD: OnceLock<Result<UsernameExtractor, ExtractionError>> = OnceLock::new();
        STANDARD
            .get_or_init(|| Self::with_greetings(DEFAULT_GREETINGS))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Extract the username, reporting which rule matched.
    pub fn extract_with_rule(&self, text: &str) -> Result<(String, ExtractionRule), ExtractionError> {
        for caps in self.greeting.captures_iter(text) {
            let candidate = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            if !candidate.is_empty() {
                return Ok((candidate.to_string(), ExtractionRule::Greeting));
            }
        }

        for footer in &self.footers {
            if let Some(caps) = footer.captures(text) {
                let candidate = caps
                    .get(1)
                    .map(|m| m.as_str().trim_end_matches(|c: char| c.is_ascii_punctuation() && c != '_'))
                    .unwrap_or_default();
                if !candidate.is_empty() {
                    return Ok((candidate.to_string(), ExtractionRule::Footer));
                }
            }
        }

        Err(ExtractionError::NoPatternMatched {
            rules_tried: 1 + self.footers.len(),
        })
    }

    /// Extract the username.
    pub fn extract(&self, text: &str) -> Result<String, ExtractionError> {
        self.extract_with_rule(text).map(|(username, _)| username)
    }
}

fn compile(pattern: &str) -> Result<Regex, ExtractionError> {
    Regex::new(pattern).map_err(|e| ExtractionError::InvalidRule {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Extract the username from message text using the standard rules.
pub fn extract_username(text: &str) -> Result<String, ExtractionError> {
    UsernameExtractor::standard()?.extract(text)
}
