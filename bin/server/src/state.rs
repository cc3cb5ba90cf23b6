//! Shared application state.

use crate::config::ServerConfig;
use crate::error::ServerError;
use insight_relay_ai::{LlmBackend, LlmBackendConfig, OpenAiBackend};
use insight_relay_integration::relay::RELAY_TIMEOUT;
use insight_relay_integration::{
    ApiCredentials, CrmSource, DocumentSource, HubSpotClient, NotionClient, RateLimiter, RelayApi,
    RelayClient,
};
use insight_relay_realtime::{SessionManager, ToolDispatcher};
use insight_relay_trigger::builtin::builtin_registry;
use insight_relay_trigger::{LlmRelevanceJudge, RelevanceJudge, TriggerRegistry};
use std::sync::Arc;
use std::time::Duration;

/// The outbound dependencies of the server.
#[derive(Clone)]
pub struct Services {
    pub crm: Arc<dyn CrmSource>,
    pub documents: Arc<dyn DocumentSource>,
    pub llm: Arc<dyn LlmBackend>,
    /// How triggers and realtime tools reach `/verify-data` and `/dashboard/data`.
    pub relay: Arc<dyn RelayApi>,
}

impl Services {
    /// Builds the HTTP clients described by `config`.
    ///
    /// Missing API keys are not an error here; clients are created with
    /// empty tokens and handlers refuse to call them.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Client`] if an HTTP client cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let timeout = Duration::from_secs(config.upstream_timeout_secs);

        let crm = HubSpotClient::new(
            config.hubspot_base_url.clone(),
            config.hubspot_api_key.clone().unwrap_or_default(),
            timeout,
        )
        .map_err(|e| ServerError::Client {
            reason: e.to_string(),
        })?;
        let documents = NotionClient::new(
            config.notion_base_url.clone(),
            config.notion_api_key.clone().unwrap_or_default(),
            timeout,
        )
        .map_err(|e| ServerError::Client {
            reason: e.to_string(),
        })?;
        let mut llm_config =
            LlmBackendConfig::openai(config.openai_api_key.clone(), config.openai_model.clone())
                .with_timeout_secs(config.upstream_timeout_secs);
        if llm_config.base_url != config.openai_base_url {
            llm_config = llm_config.with_base_url(config.openai_base_url.clone());
        }
        let llm = OpenAiBackend::new(llm_config).map_err(|e| ServerError::Client {
            reason: e.to_string(),
        })?;
        let relay = RelayClient::new(
            config.verify_data_api_url.clone(),
            config.product_market_fit_api_url.clone(),
            RELAY_TIMEOUT,
        )
        .map_err(|e| ServerError::Client {
            reason: e.to_string(),
        })?;

        Ok(Self {
            crm: Arc::new(crm),
            documents: Arc::new(documents),
            llm: Arc::new(llm),
            relay: Arc::new(relay),
        })
    }
}

/// Values reported by `/status`.
#[derive(Debug, Clone)]
pub struct FeatureFlags {
    pub rate_limiting_enabled: bool,
    pub relevance_judge_enabled: bool,
    pub cache_ttl: u64,
}

/// State shared by every request handler.
pub struct AppState {
    pub credentials: ApiCredentials,
    pub crm: Arc<dyn CrmSource>,
    pub documents: Arc<dyn DocumentSource>,
    pub llm: Arc<dyn LlmBackend>,
    pub registry: TriggerRegistry,
    pub sessions: SessionManager,
    pub rate_limiter: Option<RateLimiter>,
    pub notion_page_id: String,
    pub features: FeatureFlags,
}

impl AppState {
    /// Wires the trigger registry, session manager and rate limiter around
    /// `services`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Registry`] if the built-in triggers are invalid.
    pub fn new(config: &ServerConfig, services: Services) -> Result<Self, ServerError> {
        let credentials = config.credentials();

        let judge = config
            .relevance_judge_enabled
            .then(|| -> Arc<dyn RelevanceJudge> {
                Arc::new(LlmRelevanceJudge::new(services.llm.clone()))
            });
        let registry = builtin_registry(
            services.relay.clone(),
            credentials.clone(),
            config.builtin_options(),
            judge,
        )
        .map_err(|e| ServerError::Registry {
            reason: e.current_context().to_string(),
        })?;

        let sessions = SessionManager::new(
            ToolDispatcher::new(services.relay, credentials.clone()),
            config.session_limits(),
        );

        Ok(Self {
            credentials,
            crm: services.crm,
            documents: services.documents,
            llm: services.llm,
            registry,
            sessions,
            rate_limiter: config.rate_limit().map(RateLimiter::new),
            notion_page_id: config.notion_page_id.clone(),
            features: FeatureFlags {
                rate_limiting_enabled: config.rate_limiting_enabled,
                relevance_judge_enabled: config.relevance_judge_enabled,
                cache_ttl: config.cache_ttl,
            },
        })
    }
}
