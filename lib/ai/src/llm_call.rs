//! LLM Call primitive.
//!
//! Single-shot inference: every prompt the relay sends (data verification,
//! dashboard insight, trigger relevance) goes through [`LlmCall`].

use crate::backend::{LlmBackend, LlmRequest, TokenUsage};
use crate::error::LlmError;
use chrono::{DateTime, Utc};
use insight_relay_core::InvocationId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Instant;

/// The result of an LLM Call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCallResult {
    /// Unique identifier for this invocation.
    pub id: InvocationId,
    /// The raw text output.
    pub content: String,
    /// Structured output (if schema was provided).
    pub structured_output: Option<JsonValue>,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Model that generated the response.
    pub model: String,
    /// When the call completed.
    pub timestamp: DateTime<Utc>,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// An LLM Call builder and executor.
#[derive(Debug, Clone)]
pub struct LlmCall {
    prompt: String,
    system_prompt: Option<String>,
    output_schema: Option<JsonValue>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    context: Option<JsonValue>,
}

impl LlmCall {
    /// Creates a new LLM Call with the given prompt.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            output_schema: None,
            temperature: None,
            max_tokens: None,
            context: None,
        }
    }

    /// Adds a system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    /// Requests structured output matching the given JSON schema.
    #[must_use]
    pub fn with_output_schema(mut self, schema: JsonValue) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Adds context data to be included ahead of the prompt.
    #[must_use]
    pub fn with_context(mut self, context: JsonValue) -> Self {
        self.context = Some(context);
        self
    }

    /// Builds an LLM request from this configuration.
    #[must_use]
    pub fn build_request(&self) -> LlmRequest {
        let prompt = match self.context {
            Some(ref context) => format!("Context:\n{context}\n\n{}", self.prompt),
            None => self.prompt.clone(),
        };

        let mut request = LlmRequest::new(prompt);

        if let Some(ref system) = self.system_prompt {
            request = request.with_system(system.clone());
        }

        if let Some(ref schema) = self.output_schema {
            request = request.with_output_schema(schema.clone());
        }

        if let Some(temp) = self.temperature {
            request = request.with_temperature(temp);
        }

        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        request
    }

    /// Sends the call to a backend and records latency.
    ///
    /// # Errors
    ///
    /// Returns the backend's error unchanged; nothing is retried.
    pub async fn execute(&self, backend: &dyn LlmBackend) -> Result<LlmCallResult, LlmError> {
        let id = InvocationId::new();
        let request = self.build_request();
        let started = Instant::now();

        tracing::debug!(
            invocation = %id,
            provider = backend.provider().as_str(),
            model = backend.model(),
            prompt_chars = request.prompt.len(),
            "Sending LLM call"
        );

        let response = backend.generate(&request).await.map_err(|e| {
            tracing::warn!(invocation = %id, error = %e, "LLM call failed");
            e
        })?;

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(
            invocation = %id,
            latency_ms,
            tokens = response.usage.total(),
            "LLM call completed"
        );

        Ok(LlmCallResult {
            id,
            content: response.content,
            structured_output: response.structured_output,
            usage: response.usage,
            model: response.model,
            timestamp: Utc::now(),
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LlmProvider, LlmResponse};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoBackend {
        seen: Mutex<Vec<LlmRequest>>,
    }

    #[async_trait]
    impl LlmBackend for EchoBackend {
        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(LlmResponse::text(format!("eco: {}", request.prompt), "echo"))
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::OpenAiCompatible
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    struct DownBackend;

    #[async_trait]
    impl LlmBackend for DownBackend {
        async fn generate(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            Err(LlmError::Timeout)
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::OpenAi
        }

        fn model(&self) -> &str {
            "down"
        }
    }

    #[test]
    fn build_request_prefixes_context() {
        let call = LlmCall::new("O candidato deve disparar?")
            .with_system_prompt("Responda em JSON.")
            .with_temperature(0.0)
            .with_context(serde_json::json!({"trigger": "verify_data"}));

        let request = call.build_request();
        assert!(request.prompt.starts_with("Context:\n"));
        assert!(request.prompt.contains("verify_data"));
        assert!(request.prompt.ends_with("O candidato deve disparar?"));
        assert_eq!(request.system.as_deref(), Some("Responda em JSON."));
        assert_eq!(request.temperature, Some(0.0));
    }

    #[test]
    fn build_request_without_context_is_verbatim() {
        let request = LlmCall::new("resumo").with_max_tokens(10).build_request();
        assert_eq!(request.prompt, "resumo");
        assert_eq!(request.max_tokens, Some(10));
        assert!(request.system.is_none());
    }

    #[tokio::test]
    async fn execute_returns_backend_content() {
        let backend = EchoBackend {
            seen: Mutex::new(Vec::new()),
        };
        let result = LlmCall::new("olá")
            .execute(&backend)
            .await
            .expect("echo never fails");

        assert_eq!(result.content, "eco: olá");
        assert_eq!(result.model, "echo");
        assert!(result.id.to_string().starts_with("llm_"));
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn execute_propagates_backend_error() {
        let err = LlmCall::new("olá").execute(&DownBackend).await.unwrap_err();
        assert!(err.is_timeout());
    }
}
