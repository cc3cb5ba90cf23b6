//! Core types shared across the insight-relay workspace.
//!
//! Provides the `Result` alias built on rootcause and the strongly-typed
//! identifiers used by sessions, tool calls and LLM invocations.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{InvocationId, ParseIdError, RealtimeSessionId, ToolCallId};
