//! Error types for the HTTP API and process startup.
//!
//! Handlers return [`ApiError`]; it logs the detailed cause and answers with
//! a status code plus `{"error": "..."}`.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use insight_relay_ai::LlmError;
use insight_relay_integration::{ConnectorError, CredentialError};
use insight_relay_realtime::SessionError;
use serde_json::json;
use std::fmt;

/// Errors surfaced by request handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Required API keys are not configured. Raised before any network call.
    Configuration(CredentialError),
    /// A HubSpot or Notion call failed.
    Upstream {
        stage: &'static str,
        source: ConnectorError,
    },
    /// The LLM call failed.
    Llm(LlmError),
    /// A realtime session operation failed.
    Session(SessionError),
    /// The request could not be understood.
    BadRequest { reason: String },
    /// The client exceeded its request budget.
    RateLimited { retry_after_secs: u64 },
}

impl ApiError {
    /// Wraps a connector failure with the step that was running.
    #[must_use]
    pub fn upstream(stage: &'static str, source: ConnectorError) -> Self {
        Self::Upstream { stage, source }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream { source, .. } => match source {
                ConnectorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                ConnectorError::InvalidConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Llm(e) => match e {
                LlmError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                LlmError::InvalidConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Session(e) => match e {
                SessionError::NotFound { .. } | SessionError::Expired { .. } => {
                    StatusCode::NOT_FOUND
                }
                SessionError::LimitReached { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "{e}"),
            Self::Upstream { stage, source } => match source {
                ConnectorError::Timeout { service } => {
                    write!(f, "{stage}: {service} is unavailable (timed out)")
                }
                ConnectorError::UpstreamStatus { body, .. } => write!(f, "{stage}: {body}"),
                other => write!(f, "{stage}: {other}"),
            },
            Self::Llm(e) => match e {
                LlmError::Timeout => write!(f, "Erro ao chamar LLM: service unavailable (timed out)"),
                LlmError::RequestFailed { body, .. } => write!(f, "Erro ao chamar LLM: {body}"),
                other => write!(f, "Erro ao chamar LLM: {other}"),
            },
            Self::Session(e) => write!(f, "{e}"),
            Self::BadRequest { reason } => write!(f, "bad request: {reason}"),
            Self::RateLimited { retry_after_secs } => {
                write!(f, "rate limit exceeded, retry after {retry_after_secs}s")
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<CredentialError> for ApiError {
    fn from(e: CredentialError) -> Self {
        Self::Configuration(e)
    }
}

impl From<LlmError> for ApiError {
    fn from(e: LlmError) -> Self {
        Self::Llm(e)
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let mut response = (status, Json(json!({ "error": self.to_string() }))).into_response();
        if let Self::RateLimited { retry_after_secs } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs),
            );
        }
        response
    }
}

/// Errors that stop the process from starting or serving.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration could not be loaded.
    Config { reason: String },
    /// An outbound client could not be built.
    Client { reason: String },
    /// The trigger registry is invalid.
    Registry { reason: String },
    /// The listener could not be bound.
    Bind { addr: String, reason: String },
    /// The server stopped with an I/O error.
    Serve { reason: String },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "failed to load configuration: {reason}"),
            Self::Client { reason } => write!(f, "failed to build HTTP client: {reason}"),
            Self::Registry { reason } => write!(f, "invalid trigger registry: {reason}"),
            Self::Bind { addr, reason } => write!(f, "failed to bind {addr}: {reason}"),
            Self::Serve { reason } => write!(f, "server error: {reason}"),
        }
    }
}

impl std::error::Error for ServerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_taxonomy() {
        let missing = ApiError::Configuration(CredentialError::Missing {
            variables: vec!["OPENAI_API_KEY"],
        });
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(missing.to_string(), "missing API keys: OPENAI_API_KEY");

        let timeout = ApiError::upstream(
            "Erro ao buscar deals",
            ConnectorError::Timeout {
                service: "hubspot".into(),
            },
        );
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(timeout.to_string().contains("unavailable"));

        let upstream = ApiError::upstream(
            "Erro ao buscar deals",
            ConnectorError::UpstreamStatus {
                service: "hubspot".into(),
                status: 500,
                body: "internal".into(),
            },
        );
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.to_string(), "Erro ao buscar deals: internal");

        let malformed = ApiError::Llm(LlmError::ResponseParseFailed {
            reason: "no choices".into(),
        });
        assert_eq!(malformed.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            retry_after_secs: 12,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "12");
    }
}
