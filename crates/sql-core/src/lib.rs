use std::fmt;
use thiserror::Error;

pub mod config;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuestionError {
    #[error("Query must be a non-empty string")]
    Empty,
}

/// A natural-language question to translate into SQL.
///
/// Construction rejects empty and whitespace-only input; the text is otherwise
/// kept exactly as the caller supplied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question(String);

impl Question {
    pub fn parse(raw: impl Into<String>) -> Result<Self, QuestionError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(QuestionError::Empty);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
