//! Proactive triggers for the insight-relay voice layer.
//!
//! A [`TriggerRegistry`] is built once at startup and shared read-only. For
//! each utterance it picks at most one enabled trigger whose keywords appear
//! in the text, highest priority first, optionally asking a
//! [`RelevanceJudge`] to confirm before the trigger's action runs.

pub mod builtin;
pub mod error;
pub mod formatter;
pub mod judge;
pub mod registry;
pub mod trigger;

pub use builtin::BuiltinOptions;
pub use error::{JudgeError, TriggerError};
pub use formatter::{TruncationPolicy, VoiceFormatter};
pub use judge::{LlmRelevanceJudge, RelevanceJudge, Verdict};
pub use registry::{DispatchOutcome, DispatchResult, TriggerRegistry, TriggerRegistryBuilder};
pub use trigger::{
    Trigger, TriggerAction, TriggerInfo, TriggerInvocation, TriggerResponse, VoiceSettings,
};
