//! Trigger definitions.
//!
//! A trigger is a keyword-gated rule: when any of its keywords appears in an
//! utterance (case-insensitively) it becomes a candidate, and if selected its
//! action produces the text the voice layer speaks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How the voice layer should speak a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub voice: String,
    pub speed: f32,
}

impl VoiceSettings {
    #[must_use]
    pub fn new(voice: impl Into<String>, speed: f32) -> Self {
        Self {
            voice: voice.into(),
            speed,
        }
    }

    /// Same voice at a different speed.
    #[must_use]
    pub fn with_speed(&self, speed: f32) -> Self {
        Self {
            voice: self.voice.clone(),
            speed,
        }
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self::new("alloy", 1.0)
    }
}

/// What a trigger action hands back to the voice layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub text: String,
    pub speak: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_settings: Option<VoiceSettings>,
}

impl TriggerResponse {
    /// A spoken response with the default voice.
    #[must_use]
    pub fn spoken(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speak: true,
            voice_settings: None,
        }
    }

    #[must_use]
    pub fn with_voice(mut self, settings: VoiceSettings) -> Self {
        self.voice_settings = Some(settings);
        self
    }
}

/// The input handed to a trigger action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerInvocation {
    /// The raw utterance.
    pub query: String,
    /// The trigger keywords found in the utterance, in declaration order.
    pub matched_keywords: Vec<String>,
}

/// The work a trigger performs once selected.
///
/// Actions never fail: network and timeout errors are turned into short
/// user-presentable text.
#[async_trait]
pub trait TriggerAction: Send + Sync {
    async fn run(&self, invocation: &TriggerInvocation) -> TriggerResponse;
}

/// A registered trigger.
#[derive(Clone)]
pub struct Trigger {
    name: String,
    keywords: Vec<String>,
    priority: i32,
    activation_criteria: String,
    positive_examples: Vec<String>,
    negative_examples: Vec<String>,
    enabled: bool,
    action: Arc<dyn TriggerAction>,
}

impl Trigger {
    /// Creates an enabled trigger with no keywords.
    #[must_use]
    pub fn new(name: impl Into<String>, priority: i32, action: Arc<dyn TriggerAction>) -> Self {
        Self {
            name: name.into(),
            keywords: Vec::new(),
            priority,
            activation_criteria: String::new(),
            positive_examples: Vec::new(),
            negative_examples: Vec::new(),
            enabled: true,
            action,
        }
    }

    /// Adds keyword phrases. They are stored lowercased.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keywords.extend(
            keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty()),
        );
        self
    }

    /// Describes when the trigger should fire, for the relevance judge.
    #[must_use]
    pub fn with_activation_criteria(mut self, criteria: impl Into<String>) -> Self {
        self.activation_criteria = criteria.into();
        self
    }

    /// Adds utterances that should and should not fire the trigger.
    #[must_use]
    pub fn with_examples<P, N>(mut self, positive: P, negative: N) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        self.positive_examples
            .extend(positive.into_iter().map(Into::into));
        self.negative_examples
            .extend(negative.into_iter().map(Into::into));
        self
    }

    /// Sets whether the trigger takes part in matching.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Returns the keywords contained in `lowered`, which must already be
    /// lowercased.
    #[must_use]
    pub fn matched_keywords(&self, lowered: &str) -> Vec<String> {
        self.keywords
            .iter()
            .filter(|k| lowered.contains(k.as_str()))
            .cloned()
            .collect()
    }

    /// Returns true if any keyword appears in `text`, ignoring case.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    pub(crate) fn action(&self) -> &Arc<dyn TriggerAction> {
        &self.action
    }

    /// Returns a serializable description of the trigger.
    #[must_use]
    pub fn info(&self) -> TriggerInfo {
        TriggerInfo {
            name: self.name.clone(),
            priority: self.priority,
            keywords: self.keywords.clone(),
            activation_criteria: self.activation_criteria.clone(),
            positive_examples: self.positive_examples.clone(),
            negative_examples: self.negative_examples.clone(),
            enabled: self.enabled,
        }
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("keywords", &self.keywords)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// A trigger as listed by the registry and shown to the relevance judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerInfo {
    pub name: String,
    pub priority: i32,
    pub keywords: Vec<String>,
    pub activation_criteria: String,
    pub positive_examples: Vec<String>,
    pub negative_examples: Vec<String>,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    #[async_trait]
    impl TriggerAction for Silent {
        async fn run(&self, _invocation: &TriggerInvocation) -> TriggerResponse {
            TriggerResponse::spoken("")
        }
    }

    fn trigger() -> Trigger {
        Trigger::new("verify_data", 75, Arc::new(Silent))
            .with_keywords(["Verificar Dados", "check sales", "  "])
    }

    #[test]
    fn keywords_are_lowercased_and_blank_ones_dropped() {
        assert_eq!(trigger().keywords(), ["verificar dados", "check sales"]);
    }

    #[test]
    fn matching_ignores_case() {
        let t = trigger();
        assert!(t.matches("Pode VERIFICAR DADOS do trimestre?"));
        assert!(t.matches("please check sales"));
        assert!(!t.matches("qual a previsão do tempo?"));
    }

    #[test]
    fn matched_keywords_in_declaration_order() {
        let t = trigger();
        assert_eq!(
            t.matched_keywords("check sales e verificar dados"),
            vec!["verificar dados".to_string(), "check sales".to_string()]
        );
    }

    #[test]
    fn info_reflects_configuration() {
        let info = trigger()
            .with_activation_criteria("User wants to verify sales data")
            .with_examples(["Verificar dados de vendas"], ["What's the weather?"])
            .with_enabled(false)
            .info();
        assert_eq!(info.name, "verify_data");
        assert_eq!(info.priority, 75);
        assert!(!info.enabled);
        assert_eq!(info.positive_examples, vec!["Verificar dados de vendas"]);
        assert_eq!(info.negative_examples, vec!["What's the weather?"]);
    }

    #[test]
    fn response_serializes_without_empty_voice() {
        let json = serde_json::to_value(TriggerResponse::spoken("ok")).expect("serialize");
        assert_eq!(json, serde_json::json!({"text": "ok", "speak": true}));

        let json = serde_json::to_value(
            TriggerResponse::spoken("ok").with_voice(VoiceSettings::default().with_speed(0.9)),
        )
        .expect("serialize");
        assert_eq!(json["voice_settings"]["voice"], "alloy");
    }
}
