//! LLM primitives for insight-relay.
//!
//! - **Backend**: the [`LlmBackend`] trait and its request/response types
//! - **LLM Call**: a builder for single-shot chat completions
//! - **Prompt**: `{{variable}}` templates for composing prompts
//! - **OpenAI**: the chat-completions backend used in production

pub mod backend;
pub mod error;
pub mod llm_call;
pub mod openai;
pub mod prompt;

pub use backend::{
    LlmBackend, LlmBackendConfig, LlmMessage, LlmProvider, LlmRequest, LlmResponse, MessageRole,
    TokenUsage,
};
pub use error::{LlmError, PromptError};
pub use llm_call::{LlmCall, LlmCallResult};
pub use openai::OpenAiBackend;
pub use prompt::{PromptTemplate, VariableDefinition};
