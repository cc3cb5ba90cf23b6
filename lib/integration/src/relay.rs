//! Client for the relay's own HTTP API.
//!
//! Triggers and realtime tools reach `/verify-data` and `/dashboard/data`
//! through [`RelayApi`], so the voice layer and the HTTP layer can run in
//! separate processes.

use crate::connector::HttpConnector;
use crate::error::ConnectorError;
use crate::hubspot::ContactSummary;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// Default timeout for relay API calls.
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Request body shared by both analysis endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub context: String,
    pub prompt: String,
}

impl PromptRequest {
    #[must_use]
    pub fn new(context: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            prompt: prompt.into(),
        }
    }
}

/// Successful `/verify-data` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyDataResponse {
    pub response: String,
}

/// Successful `/dashboard/data` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub llm_response: String,
    pub hubspot_contacts: Vec<ContactSummary>,
    pub notion_page_text: String,
}

/// The analysis endpoints.
#[async_trait]
pub trait RelayApi: Send + Sync {
    /// Asks for cited figures to be checked against CRM deals.
    async fn verify_data(&self, request: &PromptRequest)
    -> Result<VerifyDataResponse, ConnectorError>;

    /// Asks for market-fit insight over CRM contacts and product docs.
    async fn dashboard_data(
        &self,
        request: &PromptRequest,
    ) -> Result<DashboardResponse, ConnectorError>;
}

/// HTTP implementation of [`RelayApi`].
#[derive(Debug, Clone)]
pub struct RelayClient {
    verify: HttpConnector,
    dashboard: HttpConnector,
}

impl RelayClient {
    /// Creates a client. The two endpoints may live on different hosts.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidConfig`] if the HTTP client cannot be built.
    pub fn new(
        verify_base_url: impl Into<String>,
        dashboard_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        Ok(Self {
            verify: HttpConnector::new("verify-data", verify_base_url, timeout)?,
            dashboard: HttpConnector::new("dashboard", dashboard_base_url, timeout)?,
        })
    }
}

#[async_trait]
impl RelayApi for RelayClient {
    #[instrument(skip(self, request), fields(base_url = %self.verify.base_url()))]
    async fn verify_data(
        &self,
        request: &PromptRequest,
    ) -> Result<VerifyDataResponse, ConnectorError> {
        self.verify.post_json("/verify-data", None, request).await
    }

    #[instrument(skip(self, request), fields(base_url = %self.dashboard.base_url()))]
    async fn dashboard_data(
        &self,
        request: &PromptRequest,
    ) -> Result<DashboardResponse, ConnectorError> {
        self.dashboard.post_json("/dashboard/data", None, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_response_wire_shape() {
        let body = serde_json::json!({
            "llm_response": "Foque em tecnologia.",
            "hubspot_contacts": [
                {"id": "1", "nome": "Ana", "segmento_da_empresa": "Tecnologia", "numemployees": "50"}
            ],
            "notion_page_text": "Produto"
        });
        let parsed: DashboardResponse = serde_json::from_value(body).expect("valid body");
        assert_eq!(parsed.hubspot_contacts.len(), 1);
        assert_eq!(parsed.hubspot_contacts[0].nome.as_deref(), Some("Ana"));
    }

    #[test]
    fn error_body_is_not_a_verify_response() {
        let body = serde_json::json!({"error": "missing API keys"});
        assert!(serde_json::from_value::<VerifyDataResponse>(body).is_err());
    }

    #[tokio::test]
    async fn unreachable_relay_reports_connection_error() {
        let client = RelayClient::new(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9",
            Duration::from_secs(2),
        )
        .expect("client builds");
        let err = client
            .verify_data(&PromptRequest::new("ctx", "prompt"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::ConnectionFailed { .. } | ConnectorError::Timeout { .. }
        ));
    }
}
