//! HubSpot CRM client.

use crate::connector::HttpConnector;
use crate::error::ConnectorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// Default HubSpot API host.
pub const HUBSPOT_BASE_URL: &str = "https://api.hubapi.com";

const DEAL_PROPERTIES: &str = "dealname,amount,dealstage,closedate";
const CONTACT_PROPERTIES: &str = "firstname,lastname,segmento_da_empresa,numemployees";
const PAGE_LIMIT: &str = "100";
const PAGE_PAUSE: Duration = Duration::from_millis(200);

/// A CRM deal as HubSpot returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub id: String,
    #[serde(default)]
    pub properties: DealProperties,
}

/// The deal properties requested from HubSpot. HubSpot sends every value as a
/// string, including `amount`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealProperties {
    #[serde(default)]
    pub dealname: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub dealstage: Option<String>,
    #[serde(default)]
    pub closedate: Option<String>,
}

impl Deal {
    /// Formats the deal as a prompt line: `- name | stage | R$ amount | closedate`.
    #[must_use]
    pub fn prompt_line(&self) -> String {
        let p = &self.properties;
        format!(
            "- {} | {} | R$ {} | {}",
            p.dealname.as_deref().unwrap_or_default(),
            p.dealstage.as_deref().unwrap_or_default(),
            p.amount.as_deref().unwrap_or_default(),
            p.closedate.as_deref().unwrap_or_default(),
        )
    }
}

/// A contact reduced to the fields the dashboard prompt uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub id: String,
    pub nome: Option<String>,
    pub segmento_da_empresa: Option<String>,
    pub numemployees: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Contact {
    id: String,
    #[serde(default)]
    properties: ContactProperties,
}

#[derive(Debug, Default, Deserialize)]
struct ContactProperties {
    #[serde(default)]
    firstname: Option<String>,
    #[serde(default)]
    lastname: Option<String>,
    #[serde(default)]
    segmento_da_empresa: Option<String>,
    #[serde(default)]
    numemployees: Option<String>,
}

impl From<Contact> for ContactSummary {
    fn from(contact: Contact) -> Self {
        let p = contact.properties;
        let nome = [p.firstname.as_deref(), p.lastname.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();
        Self {
            id: contact.id,
            nome: (!nome.is_empty()).then_some(nome),
            segmento_da_empresa: p.segmento_da_empresa,
            numemployees: p.numemployees,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    #[serde(default)]
    next: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
struct NextPage {
    after: String,
}

impl<T> Page<T> {
    fn next_after(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.next.as_ref())
            .map(|n| n.after.as_str())
    }
}

/// A source of CRM records.
#[async_trait]
pub trait CrmSource: Send + Sync {
    /// Fetches the first page (up to 100) of non-archived deals.
    async fn fetch_deals(&self) -> Result<Vec<Deal>, ConnectorError>;

    /// Fetches every non-archived contact, following pagination.
    async fn fetch_contacts(&self) -> Result<Vec<ContactSummary>, ConnectorError>;
}

/// HubSpot CRM v3 client.
#[derive(Debug, Clone)]
pub struct HubSpotClient {
    connector: HttpConnector,
    token: String,
}

impl HubSpotClient {
    /// Creates a client for the given private-app token.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidConfig`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        Ok(Self {
            connector: HttpConnector::new("hubspot", base_url, timeout)?
                .with_header("Accept", "application/json"),
            token: token.into(),
        })
    }
}

#[async_trait]
impl CrmSource for HubSpotClient {
    #[instrument(skip(self))]
    async fn fetch_deals(&self) -> Result<Vec<Deal>, ConnectorError> {
        let query = [
            ("properties", DEAL_PROPERTIES.to_string()),
            ("limit", PAGE_LIMIT.to_string()),
            ("archived", "false".to_string()),
        ];
        let page: Page<Deal> = self
            .connector
            .get_json("/crm/v3/objects/deals", Some(&self.token), &query)
            .await?;
        tracing::debug!(count = page.results.len(), "Fetched deals");
        Ok(page.results)
    }

    #[instrument(skip(self))]
    async fn fetch_contacts(&self) -> Result<Vec<ContactSummary>, ConnectorError> {
        let mut contacts = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut query = vec![
                ("limit", PAGE_LIMIT.to_string()),
                ("properties", CONTACT_PROPERTIES.to_string()),
                ("archived", "false".to_string()),
            ];
            if let Some(ref cursor) = after {
                query.push(("after", cursor.clone()));
            }

            let page: Page<Contact> = self
                .connector
                .get_json("/crm/v3/objects/contacts", Some(&self.token), &query)
                .await?;
            after = page.next_after().map(str::to_string);
            contacts.extend(page.results.into_iter().map(ContactSummary::from));

            if after.is_none() {
                break;
            }
            tokio::time::sleep(PAGE_PAUSE).await;
        }

        tracing::debug!(count = contacts.len(), "Fetched contacts");
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deal_prompt_line_format() {
        let deal: Deal = serde_json::from_value(serde_json::json!({
            "id": "101",
            "properties": {
                "dealname": "Acme Tech",
                "amount": "33000",
                "dealstage": "closedwon",
                "closedate": "2025-06-30T00:00:00Z",
                "hs_object_id": "101"
            }
        }))
        .expect("valid deal");
        assert_eq!(
            deal.prompt_line(),
            "- Acme Tech | closedwon | R$ 33000 | 2025-06-30T00:00:00Z"
        );
    }

    #[test]
    fn deal_with_missing_properties_still_formats() {
        let deal: Deal =
            serde_json::from_value(serde_json::json!({"id": "7"})).expect("valid deal");
        assert_eq!(deal.prompt_line(), "-  |  | R$  | ");
    }

    #[test]
    fn contact_summary_joins_names() {
        let contact: Contact = serde_json::from_value(serde_json::json!({
            "id": "1",
            "properties": {
                "firstname": "Ana",
                "lastname": "Souza",
                "segmento_da_empresa": "Tecnologia",
                "numemployees": "50"
            }
        }))
        .expect("valid contact");
        let summary = ContactSummary::from(contact);
        assert_eq!(summary.nome.as_deref(), Some("Ana Souza"));
        assert_eq!(summary.segmento_da_empresa.as_deref(), Some("Tecnologia"));
        assert_eq!(summary.numemployees.as_deref(), Some("50"));
    }

    #[test]
    fn contact_without_names_has_no_nome() {
        let contact: Contact = serde_json::from_value(serde_json::json!({
            "id": "2",
            "properties": {"firstname": null, "lastname": ""}
        }))
        .expect("valid contact");
        assert_eq!(ContactSummary::from(contact).nome, None);
    }

    #[test]
    fn page_exposes_next_cursor() {
        let page: Page<Contact> = serde_json::from_value(serde_json::json!({
            "results": [],
            "paging": {"next": {"after": "200", "link": "..."}}
        }))
        .expect("valid page");
        assert_eq!(page.next_after(), Some("200"));

        let last: Page<Contact> =
            serde_json::from_value(serde_json::json!({"results": []})).expect("valid page");
        assert_eq!(last.next_after(), None);
    }
}
