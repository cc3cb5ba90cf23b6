//! OpenAI chat-completions backend.

use crate::backend::{
    LlmBackend, LlmBackendConfig, LlmProvider, LlmRequest, LlmResponse, MessageRole, TokenUsage,
};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use std::time::Duration;
use tracing::instrument;

/// An [`LlmBackend`] speaking the `/v1/chat/completions` protocol.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: LlmBackendConfig,
}

#[derive(Debug, Deserialize)]
struct CompletionBody {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

fn role_name(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
    }
}

impl OpenAiBackend {
    /// Creates a backend from configuration.
    ///
    /// A missing API key is not an error here; it is reported on the first
    /// `generate` call so the process can start without every key set.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] if the HTTP client cannot be built.
    pub fn new(config: LlmBackendConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;
        Ok(Self { client, config })
    }

    /// Returns true if an API key is configured.
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|key| !key.is_empty())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Builds the JSON body for a chat-completions request.
    fn chat_body(&self, request: &LlmRequest) -> JsonValue {
        let mut messages = Vec::with_capacity(request.context.len() + 2);

        let system = match (&request.system, &request.output_schema) {
            (Some(system), Some(schema)) => Some(format!(
                "{system}\n\nRespond only with a JSON object matching this schema: {schema}"
            )),
            (None, Some(schema)) => Some(format!(
                "Respond only with a JSON object matching this schema: {schema}"
            )),
            (Some(system), None) => Some(system.clone()),
            (None, None) => None,
        };
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        for message in &request.context {
            messages.push(json!({"role": role_name(message.role), "content": message.content}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        let mut body = json!({
            "model": self.config.model,
            "messages": messages,
        });
        if let Some(temperature) = request.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if request.output_schema.is_some() {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }

    /// Parses a successful chat-completions body.
    fn parse_completion(
        &self,
        body: &str,
        wants_structured: bool,
    ) -> Result<LlmResponse, LlmError> {
        let parsed: CompletionBody =
            serde_json::from_str(body).map_err(|e| LlmError::ResponseParseFailed {
                reason: e.to_string(),
            })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::ResponseParseFailed {
                reason: "response contained no message content".to_string(),
            })?;

        let structured_output = if wants_structured {
            Some(
                serde_json::from_str::<JsonValue>(&content).map_err(|e| {
                    LlmError::ResponseParseFailed {
                        reason: format!("structured output is not JSON: {e}"),
                    }
                })?,
            )
        } else {
            None
        };

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            structured_output,
            usage,
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    #[instrument(skip(self, request), fields(model = %self.config.model))]
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LlmError::InvalidConfig {
                reason: "OPENAI_API_KEY is not set".to_string(),
            })?;

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&self.chat_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::ProviderUnavailable {
                        provider: self.config.provider.as_str().to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                }
            }
        })?;

        if !status.is_success() {
            tracing::warn!(status = %status, "Chat completion returned error status");
            return Err(LlmError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        self.parse_completion(&body, request.output_schema.is_some())
    }

    fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
