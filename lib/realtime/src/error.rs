//! Error types for the realtime crate.

use insight_relay_core::RealtimeSessionId;
use std::fmt;

/// Errors from session operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Session not found.
    NotFound { id: RealtimeSessionId },
    /// Session was idle past the timeout and has been dropped.
    Expired { id: RealtimeSessionId },
    /// Too many concurrent sessions.
    LimitReached { max: usize },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "session not found: {id}"),
            Self::Expired { id } => write!(f, "session expired: {id}"),
            Self::LimitReached { max } => {
                write!(f, "maximum number of realtime sessions reached ({max})")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Errors from tool dispatch that are not upstream failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool with this name is offered.
    UnknownTool { name: String },
    /// Arguments did not match the tool's schema.
    InvalidArguments { name: String, reason: String },
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool { name } => write!(f, "Unknown tool: {name}"),
            Self::InvalidArguments { name, reason } => {
                write!(f, "invalid arguments for tool '{name}': {reason}")
            }
        }
    }
}

impl std::error::Error for ToolError {}
