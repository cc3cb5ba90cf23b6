//! Realtime voice sessions for insight-relay.
//!
//! A session carries the tool schemas offered to the voice model. When the
//! model decides to call a tool, the call arrives as a `tool_call` message and
//! is dispatched to the relay API; the result goes back as a `tool_response`.

pub mod dispatch;
pub mod error;
pub mod message;
pub mod session;
pub mod tool;

pub use dispatch::{ToolDispatcher, summarize};
pub use error::{SessionError, ToolError};
pub use message::{MessageReply, ToolCall};
pub use session::{Session, SessionLimits, SessionManager};
pub use tool::{AnalysisType, ToolDefinition, ToolResult, builtin_tools};
