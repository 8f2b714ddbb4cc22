//! Expected validation-message matching.

use modelprobe_model::TAKEN_MESSAGE;

/// How the expected validation error message is matched against the
/// messages a model reports for an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedMessage {
    /// Literal message, matched exactly.
    Exact(String),
    /// Pattern, matched as a substring.
    Pattern(String),
}

impl ExpectedMessage {
    /// Expect the literal message.
    pub fn exact(message: impl Into<String>) -> Self {
        ExpectedMessage::Exact(message.into())
    }

    /// Expect any message containing `pattern`.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        ExpectedMessage::Pattern(pattern.into())
    }

    /// Whether any of the reported messages matches.
    pub fn is_included_in(&self, messages: &[String]) -> bool {
        match self {
            ExpectedMessage::Exact(expected) => messages.iter().any(|m| m == expected),
            ExpectedMessage::Pattern(pattern) => {
                messages.iter().any(|m| m.contains(pattern.as_str()))
            }
        }
    }
}

impl Default for ExpectedMessage {
    fn default() -> Self {
        ExpectedMessage::Exact(TAKEN_MESSAGE.to_string())
    }
}
