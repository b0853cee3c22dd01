//! Input validation for free-text questions before they reach the model.

use std::fmt;
use std::sync::LazyLock;

use regex::{RegexSet, RegexSetBuilder};

/// Longest question accepted, in characters after trimming.
pub const MAX_INPUT_CHARS: usize = 500;

/// Shortest question accepted after cleaning.
pub const MIN_INPUT_CHARS: usize = 3;

/// Shown when a question is rejected for anything other than length.
pub const GUIDANCE_MESSAGE: &str = "I only provide crowd level predictions for Jamaican locations. \
Ask me something like 'Will Ocho Rios be packed this weekend?'";

/// Phrases and pseudo-tags used to override the system instructions.
static DENYLIST: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSetBuilder::new([
        r"ignore\s+(all\s+|any\s+|the\s+|your\s+|my\s+)*(previous|prior|above|earlier|preceding|instructions|rules)",
        r"disregard\s+(all\s+|any\s+|the\s+|your\s+)*(previous|prior|above|earlier|instructions|rules)",
        r"forget\s+(all\s+|any\s+|the\s+|your\s+)*(previous|prior|above|instructions|rules)",
        r"you\s+are\s+now",
        r"from\s+now\s+on,?\s+you",
        r"pretend\s+(to\s+be|you\s+are|that\s+you)",
        r"system\s+prompt",
        r"(new|override|updated)\s+instructions",
        r"reveal\s+(your|the)\s+(prompt|instructions|rules)",
        r"developer\s+mode",
        r"jailbreak",
        r"</?\s*(system|assistant|user|instructions?)\s*>",
        r"\[/?\s*(system|inst)\s*\]",
        r"<\|\s*(im_start|im_end|system|assistant|user)\s*\|>",
    ])
    .case_insensitive(true)
    .build()
    .expect("denylist patterns are valid")
});

/// A question that passed validation.
///
/// Non-empty, no control characters, single spaces only, at most
/// [`MAX_INPUT_CHARS`] characters and no denylisted phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedMessage(String);

impl SanitizedMessage {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SanitizedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeError {
    /// Nothing left after trimming and cleaning.
    Empty,
    /// Trimmed input exceeds [`MAX_INPUT_CHARS`].
    TooLong { chars: usize },
    /// Cleaned input is shorter than [`MIN_INPUT_CHARS`].
    TooShort,
    /// Matches a prompt-injection pattern.
    Injection,
}

impl SanitizeError {
    /// Reply sent to the user when their question is rejected.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::TooLong { .. } => {
                "That message is a bit long. Please keep your question under 500 characters."
            }
            Self::Empty | Self::TooShort | Self::Injection => GUIDANCE_MESSAGE,
        }
    }
}

impl fmt::Display for SanitizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty input"),
            Self::TooLong { chars } => write!(f, "input too long ({chars} > {MAX_INPUT_CHARS} chars)"),
            Self::TooShort => write!(f, "input too short"),
            Self::Injection => write!(f, "input matches an instruction-override pattern"),
        }
    }
}

impl std::error::Error for SanitizeError {}

/// Validate and normalize a raw question.
pub fn sanitize(raw: &str) -> Result<SanitizedMessage, SanitizeError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SanitizeError::Empty);
    }

    let chars = trimmed.chars().count();
    if chars > MAX_INPUT_CHARS {
        return Err(SanitizeError::TooLong { chars });
    }

    // Every Cc char goes (C0, DEL and the C1 block U+0080..=U+009F), except
    // tab, LF and CR, which are folded into single spaces below.
    let stripped: String = trimmed
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect();
    let cleaned = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.is_empty() {
        return Err(SanitizeError::Empty);
    }
    if DENYLIST.is_match(&cleaned) {
        return Err(SanitizeError::Injection);
    }
    if cleaned.chars().count() < MIN_INPUT_CHARS {
        return Err(SanitizeError::TooShort);
    }

    Ok(SanitizedMessage(cleaned))
}
