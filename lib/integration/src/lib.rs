//! External data sources for the insight-relay service.
//!
//! This crate provides:
//!
//! - **Credentials**: API keys for HubSpot, Notion and OpenAI, with redacted debug output
//! - **HubSpot**: deal and contact fetches behind the [`CrmSource`] trait
//! - **Notion**: page text extraction behind the [`DocumentSource`] trait
//! - **Relay API**: the client triggers use to reach `/verify-data` and `/dashboard/data`
//! - **Rate limiter**: fixed-window request counting per key

pub mod connector;
pub mod credential;
pub mod error;
pub mod hubspot;
pub mod notion;
pub mod rate_limit;
pub mod relay;

pub use connector::HttpConnector;
pub use credential::{ApiCredentials, ApiService};
pub use error::{ConnectorError, CredentialError};
pub use hubspot::{ContactSummary, CrmSource, Deal, DealProperties, HubSpotClient};
pub use notion::{DocumentSource, NotionClient};
pub use rate_limit::{RateLimitConfig, RateLimitResult, RateLimiter};
pub use relay::{DashboardResponse, PromptRequest, RelayApi, RelayClient, VerifyDataResponse};
