//! Error types for the integration crate.
//!
//! - `ConnectorError`: failures talking to HubSpot, Notion or the relay API
//! - `CredentialError`: required API keys that are not configured

use std::fmt;

/// Errors from external service calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// Connection to the service failed.
    ConnectionFailed { service: String, reason: String },
    /// The service rejected the credentials (401/403).
    AuthenticationFailed { service: String },
    /// Rate limit exceeded upstream.
    RateLimited {
        service: String,
        retry_after_secs: Option<u64>,
    },
    /// Any other non-success status; the body is passed through.
    UpstreamStatus {
        service: String,
        status: u16,
        body: String,
    },
    /// The response body did not have the expected shape.
    MalformedResponse { service: String, reason: String },
    /// Timeout waiting for the response.
    Timeout { service: String },
    /// The HTTP client could not be built.
    InvalidConfig { reason: String },
}

impl ConnectorError {
    /// Returns true if the service did not answer in time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed { service, reason } => {
                write!(f, "connection to {service} failed: {reason}")
            }
            Self::AuthenticationFailed { service } => {
                write!(f, "{service} rejected the configured credentials")
            }
            Self::RateLimited {
                service,
                retry_after_secs,
            } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "{service} rate limited, retry after {secs}s")
                } else {
                    write!(f, "{service} rate limited")
                }
            }
            Self::UpstreamStatus {
                service,
                status,
                body,
            } => {
                write!(f, "{service} returned HTTP {status}: {body}")
            }
            Self::MalformedResponse { service, reason } => {
                write!(f, "malformed response from {service}: {reason}")
            }
            Self::Timeout { service } => write!(f, "{service} request timed out"),
            Self::InvalidConfig { reason } => {
                write!(f, "invalid HTTP client configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for ConnectorError {}

/// Errors from credential lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// One or more required keys are absent. Holds the environment variable names.
    Missing { variables: Vec<&'static str> },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { variables } => {
                write!(f, "missing API keys: {}", variables.join(", "))
            }
        }
    }
}

impl std::error::Error for CredentialError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connector_error_names_service() {
        let err = ConnectorError::ConnectionFailed {
            service: "hubspot".to_string(),
            reason: "dns error".to_string(),
        };
        assert!(err.to_string().contains("hubspot"));
        assert!(err.to_string().contains("dns error"));
    }

    #[test]
    fn upstream_status_passes_body_through() {
        let err = ConnectorError::UpstreamStatus {
            service: "notion".to_string(),
            status: 404,
            body: "object_not_found".to_string(),
        };
        assert_eq!(err.to_string(), "notion returned HTTP 404: object_not_found");
    }

    #[test]
    fn only_timeout_is_timeout() {
        assert!(
            ConnectorError::Timeout {
                service: "relay".to_string()
            }
            .is_timeout()
        );
        assert!(
            !ConnectorError::RateLimited {
                service: "hubspot".to_string(),
                retry_after_secs: Some(10),
            }
            .is_timeout()
        );
    }

    #[test]
    fn credential_error_lists_variables() {
        let err = CredentialError::Missing {
            variables: vec!["HUBSPOT_API_KEY", "OPENAI_API_KEY"],
        };
        assert_eq!(
            err.to_string(),
            "missing API keys: HUBSPOT_API_KEY, OPENAI_API_KEY"
        );
    }
}
