//! Trigger registry and dispatch.

use crate::error::TriggerError;
use crate::judge::RelevanceJudge;
use crate::trigger::{Trigger, TriggerInfo, TriggerInvocation, TriggerResponse};
use rootcause::prelude::Report;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// What happened to one utterance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// A trigger was selected and its action ran.
    Fired {
        trigger: String,
        priority: i32,
        response: TriggerResponse,
    },
    /// No enabled trigger matched, or the judge declined every candidate.
    NoMatch,
    /// The registry is switched off.
    Disabled,
}

/// A dispatch outcome with its wall-clock duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    #[serde(flatten)]
    pub outcome: DispatchOutcome,
    pub processing_ms: u64,
}

impl DispatchResult {
    /// The fired trigger's response, if any.
    #[must_use]
    pub fn response(&self) -> Option<&TriggerResponse> {
        match &self.outcome {
            DispatchOutcome::Fired { response, .. } => Some(response),
            DispatchOutcome::NoMatch | DispatchOutcome::Disabled => None,
        }
    }
}

/// Builds an immutable [`TriggerRegistry`].
pub struct TriggerRegistryBuilder {
    triggers: Vec<Trigger>,
    judge: Option<Arc<dyn RelevanceJudge>>,
    enabled: bool,
}

impl TriggerRegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            triggers: Vec::new(),
            judge: None,
            enabled: true,
        }
    }

    /// Adds a trigger. Registration order breaks priority ties.
    #[must_use]
    pub fn register(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Consults `judge` before firing any candidate.
    #[must_use]
    pub fn with_judge(mut self, judge: Arc<dyn RelevanceJudge>) -> Self {
        self.judge = Some(judge);
        self
    }

    /// Sets the registry-wide switch.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Validates and freezes the registry.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::DuplicateName`] or [`TriggerError::NoKeywords`].
    pub fn build(self) -> Result<TriggerRegistry, Report<TriggerError>> {
        let mut seen = HashSet::new();
        for trigger in &self.triggers {
            if !seen.insert(trigger.name()) {
                return Err(TriggerError::DuplicateName {
                    name: trigger.name().to_string(),
                }
                .into());
            }
            if trigger.keywords().is_empty() {
                return Err(TriggerError::NoKeywords {
                    name: trigger.name().to_string(),
                }
                .into());
            }
        }

        let mut triggers = self.triggers;
        // Stable: equal priorities keep registration order.
        triggers.sort_by(|a, b| b.priority().cmp(&a.priority()));

        Ok(TriggerRegistry {
            triggers,
            judge: self.judge,
            enabled: self.enabled,
        })
    }
}

impl Default for TriggerRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The startup-built, read-only set of triggers.
#[derive(Clone)]
pub struct TriggerRegistry {
    /// Sorted by priority, highest first.
    triggers: Vec<Trigger>,
    judge: Option<Arc<dyn RelevanceJudge>>,
    enabled: bool,
}

impl fmt::Debug for TriggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerRegistry")
            .field("triggers", &self.triggers)
            .field("judge", &self.judge.is_some())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl TriggerRegistry {
    #[must_use]
    pub fn builder() -> TriggerRegistryBuilder {
        TriggerRegistryBuilder::new()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn has_judge(&self) -> bool {
        self.judge.is_some()
    }

    /// Lists triggers in dispatch order.
    #[must_use]
    pub fn list(&self) -> Vec<TriggerInfo> {
        self.triggers.iter().map(Trigger::info).collect()
    }

    /// Looks up a trigger by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Trigger> {
        self.triggers.iter().find(|t| t.name() == name)
    }

    /// Returns the enabled triggers whose keywords appear in `text`, in
    /// dispatch order.
    #[must_use]
    pub fn candidates(&self, text: &str) -> Vec<&Trigger> {
        let lowered = text.to_lowercase();
        self.triggers
            .iter()
            .filter(|t| t.is_enabled())
            .filter(|t| !t.matched_keywords(&lowered).is_empty())
            .collect()
    }

    /// Runs at most one trigger for `text`.
    ///
    /// Candidates are tried highest priority first. With a judge configured,
    /// a declined candidate passes to the next one; a judge error is logged
    /// and the keyword match stands.
    pub async fn process_query(&self, text: &str) -> DispatchResult {
        let started = Instant::now();
        let outcome = self.dispatch(text).await;
        DispatchResult {
            outcome,
            processing_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    async fn dispatch(&self, text: &str) -> DispatchOutcome {
        if !self.enabled {
            return DispatchOutcome::Disabled;
        }

        let lowered = text.to_lowercase();
        for trigger in self.triggers.iter().filter(|t| t.is_enabled()) {
            let matched_keywords = trigger.matched_keywords(&lowered);
            if matched_keywords.is_empty() {
                continue;
            }

            if let Some(ref judge) = self.judge {
                match judge.judge(text, &trigger.info()).await {
                    Ok(verdict) if verdict.fire => {}
                    Ok(verdict) => {
                        tracing::debug!(
                            trigger = trigger.name(),
                            reason = %verdict.reason,
                            "Relevance judge declined candidate"
                        );
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            trigger = trigger.name(),
                            "Relevance judge failed, firing on keyword match"
                        );
                    }
                }
            }

            tracing::info!(
                trigger = trigger.name(),
                priority = trigger.priority(),
                keywords = ?matched_keywords,
                "Trigger fired"
            );
            let invocation = TriggerInvocation {
                query: text.to_string(),
                matched_keywords,
            };
            let response = trigger.action().run(&invocation).await;
            return DispatchOutcome::Fired {
                trigger: trigger.name().to_string(),
                priority: trigger.priority(),
                response,
            };
        }

        DispatchOutcome::NoMatch
    }
}
