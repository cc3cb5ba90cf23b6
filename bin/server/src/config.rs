//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables (after `dotenvy`
//! has read any `.env` file). Every field has a default, so a bare environment
//! starts a server that reports missing API keys per request.

use insight_relay_integration::hubspot::HUBSPOT_BASE_URL;
use insight_relay_integration::notion::NOTION_BASE_URL;
use insight_relay_integration::{ApiCredentials, RateLimitConfig};
use insight_relay_realtime::SessionLimits;
use insight_relay_trigger::{BuiltinOptions, TruncationPolicy, VoiceSettings};
use serde::Deserialize;

/// How verification replies are shortened before they are spoken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationMode {
    /// Cut at exactly 400 characters.
    #[default]
    Hard,
    /// Cut after the last full sentence within 400 characters.
    Sentence,
}

/// Server configuration.
///
/// Field names match the documented environment variables, e.g.
/// `HUBSPOT_API_KEY` fills `hubspot_api_key`.
#[derive(Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    pub hubspot_api_key: Option<String>,
    pub notion_api_key: Option<String>,
    pub openai_api_key: Option<String>,

    /// Base URL triggers use to reach `/verify-data`.
    #[serde(default = "default_relay_url")]
    pub verify_data_api_url: String,
    /// Base URL triggers use to reach `/dashboard/data`.
    #[serde(default = "default_relay_url")]
    pub product_market_fit_api_url: String,

    #[serde(default = "default_hubspot_base_url")]
    pub hubspot_base_url: String,
    #[serde(default = "default_notion_base_url")]
    pub notion_base_url: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Notion page holding the product description.
    #[serde(default = "default_notion_page_id")]
    pub notion_page_id: String,
    /// Timeout for HubSpot, Notion and OpenAI calls, in seconds.
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    #[serde(default = "default_voice")]
    pub default_voice: String,
    #[serde(default = "default_speed")]
    pub default_speed: f32,
    #[serde(default)]
    pub voice_truncation: TruncationMode,

    /// Reported by `/status`; responses are never cached.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,

    #[serde(default = "default_realtime_session_timeout")]
    pub realtime_session_timeout: u64,
    #[serde(default = "default_realtime_max_sessions")]
    pub realtime_max_sessions: usize,

    #[serde(default = "default_true")]
    pub rate_limiting_enabled: bool,
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,

    /// Ask the LLM to confirm a keyword match before a trigger fires.
    #[serde(default)]
    pub relevance_judge_enabled: bool,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_relay_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_hubspot_base_url() -> String {
    HUBSPOT_BASE_URL.to_string()
}

fn default_notion_base_url() -> String {
    NOTION_BASE_URL.to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_notion_page_id() -> String {
    "22f96f42586680eabeb1ddc80400c8a5".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    60
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_speed() -> f32 {
    1.0
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_realtime_session_timeout() -> u64 {
    3600
}

fn default_realtime_max_sessions() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_max_requests_per_minute() -> u32 {
    60
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    #[must_use]
    pub fn credentials(&self) -> ApiCredentials {
        ApiCredentials::new(
            self.hubspot_api_key.clone(),
            self.notion_api_key.clone(),
            self.openai_api_key.clone(),
        )
    }

    #[must_use]
    pub fn voice(&self) -> VoiceSettings {
        VoiceSettings::new(self.default_voice.clone(), self.default_speed)
    }

    /// The verification truncation policy: over 500 characters keeps 400.
    #[must_use]
    pub fn truncation_policy(&self) -> TruncationPolicy {
        match self.voice_truncation {
            TruncationMode::Hard => TruncationPolicy::default(),
            TruncationMode::Sentence => TruncationPolicy::default().sentence_aware(),
        }
    }

    #[must_use]
    pub fn builtin_options(&self) -> BuiltinOptions {
        BuiltinOptions {
            voice: self.voice(),
            truncation: self.truncation_policy(),
        }
    }

    #[must_use]
    pub fn session_limits(&self) -> SessionLimits {
        SessionLimits::new(self.realtime_session_timeout, self.realtime_max_sessions)
    }

    /// The rate limit, or `None` when rate limiting is switched off.
    #[must_use]
    pub fn rate_limit(&self) -> Option<RateLimitConfig> {
        self.rate_limiting_enabled
            .then(|| RateLimitConfig::per_minute(self.max_requests_per_minute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(overrides: &[(&str, &str)]) -> ServerConfig {
        let mut builder = config::Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).expect("valid override");
        }
        builder
            .build()
            .expect("config builds")
            .try_deserialize()
            .expect("config deserializes")
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = load(&[]);
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert_eq!(config.openai_model, "gpt-4.1-mini");
        assert_eq!(config.notion_page_id, "22f96f42586680eabeb1ddc80400c8a5");
        assert_eq!(config.realtime_session_timeout, 3600);
        assert_eq!(config.realtime_max_sessions, 10);
        assert_eq!(config.rate_limit(), Some(RateLimitConfig::per_minute(60)));
        assert_eq!(config.voice(), VoiceSettings::new("alloy", 1.0));
        assert!(!config.relevance_judge_enabled);
        assert_eq!(config.truncation_policy(), TruncationPolicy::default());

        let missing = config.credentials().missing();
        assert_eq!(missing.len(), 3);
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("openai_api_key", "sk-test"),
            ("default_voice", "nova"),
            ("rate_limiting_enabled", "false"),
            ("voice_truncation", "sentence"),
        ]);
        assert!(config.credentials().is_configured(insight_relay_integration::ApiService::OpenAi));
        assert_eq!(config.voice().voice, "nova");
        assert_eq!(config.rate_limit(), None);
        assert!(matches!(
            config.truncation_policy(),
            TruncationPolicy::SentenceAware {
                limit: 500,
                keep: 400,
                ..
            }
        ));
    }
}
