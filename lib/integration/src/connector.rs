//! Shared HTTP plumbing for the service clients.
//!
//! Every client talks JSON over HTTPS with a bearer token and maps transport
//! failures and status codes onto [`ConnectorError`] the same way.

use crate::error::ConnectorError;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A JSON-over-HTTP connector for one external service.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    service: &'static str,
    client: reqwest::Client,
    base_url: String,
    headers: Vec<(&'static str, String)>,
}

impl HttpConnector {
    /// Creates a connector with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidConfig`] if the HTTP client cannot be built.
    pub fn new(
        service: &'static str,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectorError::InvalidConfig {
                reason: e.to_string(),
            })?;
        Ok(Self {
            service,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            headers: Vec::new(),
        })
    }

    /// Adds a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Returns the service name used in errors.
    #[must_use]
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn prepare(&self, mut request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        for (name, value) in &self.headers {
            request = request.header(*name, value);
        }
        request
    }

    /// Sends a GET with query parameters and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectorError`] for transport failures, non-success
    /// statuses and undecodable bodies.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        query: &[(&str, String)],
    ) -> Result<T, ConnectorError> {
        let request = self.prepare(self.client.get(self.url(path)).query(query), token);
        self.send(request).await
    }

    /// Sends a JSON POST and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`HttpConnector::get_json`].
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T, ConnectorError> {
        let request = self.prepare(self.client.post(self.url(path)).json(body), token);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ConnectorError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, service = self.service, "Request failed");
            self.transport_error(&e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                service = self.service,
                status = %status,
                body = %body,
                "Service returned error status"
            );
            return Err(self.status_error(status, body, retry_after_secs));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;
        serde_json::from_str(&body).map_err(|e| ConnectorError::MalformedResponse {
            service: self.service.to_string(),
            reason: e.to_string(),
        })
    }

    fn transport_error(&self, e: &reqwest::Error) -> ConnectorError {
        if e.is_timeout() {
            ConnectorError::Timeout {
                service: self.service.to_string(),
            }
        } else {
            ConnectorError::ConnectionFailed {
                service: self.service.to_string(),
                reason: e.to_string(),
            }
        }
    }

    fn status_error(
        &self,
        status: StatusCode,
        body: String,
        retry_after_secs: Option<u64>,
    ) -> ConnectorError {
        let service = self.service.to_string();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ConnectorError::AuthenticationFailed { service }
            }
            StatusCode::TOO_MANY_REQUESTS => ConnectorError::RateLimited {
                service,
                retry_after_secs,
            },
            _ => ConnectorError::UpstreamStatus {
                service,
                status: status.as_u16(),
                body,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector() -> HttpConnector {
        HttpConnector::new("hubspot", "https://api.hubapi.com/", Duration::from_secs(5))
            .expect("client builds")
    }

    #[test]
    fn url_joins_without_double_slashes() {
        let c = connector();
        assert_eq!(c.base_url(), "https://api.hubapi.com");
        assert_eq!(
            c.url("/crm/v3/objects/deals"),
            "https://api.hubapi.com/crm/v3/objects/deals"
        );
        assert_eq!(c.url("v1/pages/x"), "https://api.hubapi.com/v1/pages/x");
    }

    #[test]
    fn auth_statuses_map_to_authentication_failed() {
        let c = connector();
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            assert_eq!(
                c.status_error(status, String::new(), None),
                ConnectorError::AuthenticationFailed {
                    service: "hubspot".to_string()
                }
            );
        }
    }

    #[test]
    fn too_many_requests_keeps_retry_after() {
        let err = connector().status_error(StatusCode::TOO_MANY_REQUESTS, String::new(), Some(10));
        assert_eq!(
            err,
            ConnectorError::RateLimited {
                service: "hubspot".to_string(),
                retry_after_secs: Some(10),
            }
        );
    }

    #[test]
    fn other_statuses_pass_body_through() {
        let err = connector().status_error(
            StatusCode::BAD_GATEWAY,
            "upstream down".to_string(),
            None,
        );
        assert_eq!(
            err,
            ConnectorError::UpstreamStatus {
                service: "hubspot".to_string(),
                status: 502,
                body: "upstream down".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_connection_failure() {
        let c = HttpConnector::new("relay", "http://127.0.0.1:9", Duration::from_secs(2))
            .expect("client builds");
        let err = c
            .get_json::<serde_json::Value>("/health", None, &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::ConnectionFailed { .. } | ConnectorError::Timeout { .. }
        ));
    }
}
