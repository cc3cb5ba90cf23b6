//! Relevance judges.
//!
//! A keyword match only makes a trigger a candidate. A judge decides whether
//! firing it is appropriate for the utterance as a whole.

use crate::error::JudgeError;
use crate::trigger::TriggerInfo;
use async_trait::async_trait;
use insight_relay_ai::{LlmBackend, LlmCall};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A judge's decision about one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub fire: bool,
    #[serde(default)]
    pub reason: String,
}

impl Verdict {
    #[must_use]
    pub fn fire() -> Self {
        Self {
            fire: true,
            reason: String::new(),
        }
    }

    #[must_use]
    pub fn decline(reason: impl Into<String>) -> Self {
        Self {
            fire: false,
            reason: reason.into(),
        }
    }
}

/// Decides whether a keyword-matched trigger should fire.
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    async fn judge(&self, utterance: &str, candidate: &TriggerInfo)
    -> Result<Verdict, JudgeError>;
}

const JUDGE_SYSTEM_PROMPT: &str = "You decide whether a voice assistant should run an automated action \
for something a user just said. Keyword matches are often incidental. Fire only when the utterance \
clearly asks for, or would clearly benefit from, the described action.";

/// Asks an LLM for a structured `{fire, reason}` verdict.
#[derive(Clone)]
pub struct LlmRelevanceJudge {
    backend: Arc<dyn LlmBackend>,
}

impl LlmRelevanceJudge {
    #[must_use]
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    /// Builds the LLM call for one candidate.
    #[must_use]
    pub fn build_call(utterance: &str, candidate: &TriggerInfo) -> LlmCall {
        let bullet = |items: &[String]| {
            items
                .iter()
                .map(|e| format!("- {e}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let prompt = format!(
            "Action: {name}\nWhen to fire: {criteria}\n\nShould fire for:\n{positive}\n\n\
             Should not fire for:\n{negative}\n\nUtterance: \"{utterance}\"\n\n\
             Answer with JSON: {{\"fire\": true|false, \"reason\": \"...\"}}",
            name = candidate.name,
            criteria = candidate.activation_criteria,
            positive = bullet(&candidate.positive_examples),
            negative = bullet(&candidate.negative_examples),
        );

        LlmCall::new(prompt)
            .with_system_prompt(JUDGE_SYSTEM_PROMPT)
            .with_output_schema(serde_json::json!({
                "type": "object",
                "properties": {
                    "fire": {"type": "boolean"},
                    "reason": {"type": "string"}
                },
                "required": ["fire"]
            }))
            .with_temperature(0.0)
            .with_max_tokens(100)
    }
}

#[async_trait]
impl RelevanceJudge for LlmRelevanceJudge {
    async fn judge(
        &self,
        utterance: &str,
        candidate: &TriggerInfo,
    ) -> Result<Verdict, JudgeError> {
        let result = Self::build_call(utterance, candidate)
            .execute(self.backend.as_ref())
            .await?;

        let output = match result.structured_output {
            Some(output) => output,
            None => serde_json::from_str(&result.content).map_err(|e| {
                JudgeError::UnreadableVerdict {
                    reason: e.to_string(),
                }
            })?,
        };
        serde_json::from_value(output).map_err(|e| JudgeError::UnreadableVerdict {
            reason: e.to_string(),
        })
    }
}
