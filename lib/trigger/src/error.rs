//! Error types for the trigger crate.
//!
//! - `TriggerError`: invalid registry construction
//! - `JudgeError`: a relevance judge could not reach a verdict

use insight_relay_ai::LlmError;
use std::fmt;

/// Errors building a trigger registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    /// Two triggers share a name.
    DuplicateName { name: String },
    /// A trigger has no keywords and could never match.
    NoKeywords { name: String },
}

impl fmt::Display for TriggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { name } => {
                write!(f, "trigger '{name}' is registered more than once")
            }
            Self::NoKeywords { name } => {
                write!(f, "trigger '{name}' has no keywords")
            }
        }
    }
}

impl std::error::Error for TriggerError {}

/// Errors from a relevance judge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JudgeError {
    /// The LLM call failed.
    Llm(LlmError),
    /// The LLM answered but not with a usable verdict.
    UnreadableVerdict { reason: String },
}

impl fmt::Display for JudgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Llm(e) => write!(f, "relevance check failed: {e}"),
            Self::UnreadableVerdict { reason } => {
                write!(f, "relevance verdict unreadable: {reason}")
            }
        }
    }
}

impl std::error::Error for JudgeError {}

impl From<LlmError> for JudgeError {
    fn from(e: LlmError) -> Self {
        Self::Llm(e)
    }
}
