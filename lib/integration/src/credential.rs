//! API keys for the external services.
//!
//! Keys are never printed: the `Debug` impl only says whether each one is set.

use crate::error::CredentialError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An external service that needs an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiService {
    HubSpot,
    Notion,
    OpenAi,
}

impl ApiService {
    /// Returns the environment variable that holds this service's key.
    #[must_use]
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::HubSpot => "HUBSPOT_API_KEY",
            Self::Notion => "NOTION_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Returns the short service name used in logs and errors.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HubSpot => "hubspot",
            Self::Notion => "notion",
            Self::OpenAi => "openai",
        }
    }

    /// All services, in a stable order.
    pub const ALL: [Self; 3] = [Self::HubSpot, Self::Notion, Self::OpenAi];
}

/// The set of configured API keys.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiCredentials {
    hubspot: Option<String>,
    notion: Option<String>,
    openai: Option<String>,
}

fn non_empty(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())
}

impl ApiCredentials {
    /// Creates a credential set. Blank keys count as absent.
    #[must_use]
    pub fn new(hubspot: Option<String>, notion: Option<String>, openai: Option<String>) -> Self {
        Self {
            hubspot: non_empty(hubspot),
            notion: non_empty(notion),
            openai: non_empty(openai),
        }
    }

    /// Returns the key for a service, if configured.
    #[must_use]
    pub fn get(&self, service: ApiService) -> Option<&str> {
        match service {
            ApiService::HubSpot => self.hubspot.as_deref(),
            ApiService::Notion => self.notion.as_deref(),
            ApiService::OpenAi => self.openai.as_deref(),
        }
    }

    /// Returns true if the service has a key.
    #[must_use]
    pub fn is_configured(&self, service: ApiService) -> bool {
        self.get(service).is_some()
    }

    /// Returns every service without a key.
    #[must_use]
    pub fn missing(&self) -> Vec<ApiService> {
        ApiService::ALL
            .into_iter()
            .filter(|s| !self.is_configured(*s))
            .collect()
    }

    /// Checks that all of `services` have keys.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Missing`] naming every absent variable.
    pub fn require(&self, services: &[ApiService]) -> Result<(), CredentialError> {
        let variables: Vec<&'static str> = services
            .iter()
            .filter(|s| !self.is_configured(**s))
            .map(ApiService::env_var)
            .collect();

        if variables.is_empty() {
            Ok(())
        } else {
            Err(CredentialError::Missing { variables })
        }
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |key: &Option<String>| if key.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("ApiCredentials")
            .field("hubspot", &mark(&self.hubspot))
            .field("notion", &mark(&self.notion))
            .field("openai", &mark(&self.openai))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_are_absent() {
        let creds = ApiCredentials::new(Some("  ".to_string()), None, Some("sk-1".to_string()));
        assert!(!creds.is_configured(ApiService::HubSpot));
        assert!(!creds.is_configured(ApiService::Notion));
        assert_eq!(creds.get(ApiService::OpenAi), Some("sk-1"));
        assert_eq!(creds.missing(), vec![ApiService::HubSpot, ApiService::Notion]);
    }

    #[test]
    fn require_names_all_missing_variables() {
        let creds = ApiCredentials::new(Some("pat".to_string()), None, None);
        let err = creds
            .require(&[ApiService::HubSpot, ApiService::OpenAi, ApiService::Notion])
            .unwrap_err();
        assert_eq!(
            err,
            CredentialError::Missing {
                variables: vec!["OPENAI_API_KEY", "NOTION_API_KEY"],
            }
        );
        assert!(creds.require(&[ApiService::HubSpot]).is_ok());
    }

    #[test]
    fn debug_never_prints_keys() {
        let creds = ApiCredentials::new(Some("pat-secret".to_string()), None, None);
        let debug = format!("{creds:?}");
        assert!(!debug.contains("pat-secret"));
        assert!(debug.contains("<set>"));
        assert!(debug.contains("<unset>"));
    }
}
