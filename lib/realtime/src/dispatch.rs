//! Routes tool calls to the relay API.

use crate::error::ToolError;
use crate::message::ToolCall;
use crate::tool::{
    AnalysisType, CONTACT_SEGMENTS_TOOL, LEAD_QUALITY_TOOL, MARKET_FIT_TOOL,
    MARKETING_STRATEGY_TOOL, PRODUCT_MARKET_FIT_TOOL, ToolResult, VERIFY_DATA_TOOL,
};
use insight_relay_integration::{ApiCredentials, ApiService, ConnectorError, PromptRequest, RelayApi};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

const DEFAULT_ANALYSIS_CONTEXT: &str = "Análise de produto e mercado";
const SUMMARY_LINES: usize = 3;

#[derive(Debug, Default, Deserialize)]
struct AnalysisParameters {
    #[serde(default)]
    analysis_type: Option<AnalysisType>,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProductMarketFitArgs {
    #[serde(default)]
    query: String,
    #[serde(default)]
    parameters: Option<AnalysisParameters>,
}

#[derive(Debug, Deserialize)]
struct VerifyDataArgs {
    #[serde(default = "default_verify_context")]
    context: String,
    #[serde(default = "default_verify_prompt")]
    prompt: String,
}

fn default_verify_context() -> String {
    "General data verification".to_string()
}

fn default_verify_prompt() -> String {
    "Analyze the sales data".to_string()
}

/// Shortens an analysis to its first three non-empty lines, joined by
/// spaces, with markdown emphasis removed.
#[must_use]
pub fn summarize(llm_response: &str) -> String {
    llm_response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(SUMMARY_LINES)
        .collect::<Vec<_>>()
        .join(" ")
        .replace("**", "")
        .replace('*', "")
        .replace("Com base na análise", "Based on the analysis")
}

/// Executes tool calls against the relay API.
#[derive(Clone)]
pub struct ToolDispatcher {
    relay: Arc<dyn RelayApi>,
    credentials: ApiCredentials,
}

impl ToolDispatcher {
    #[must_use]
    pub fn new(relay: Arc<dyn RelayApi>, credentials: ApiCredentials) -> Self {
        Self { relay, credentials }
    }

    /// Runs a tool call.
    ///
    /// Upstream failures come back as a failed [`ToolResult`].
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] if the tool is unknown or its arguments do not
    /// fit the schema.
    #[instrument(skip(self, call), fields(tool = %call.name, call_id = %call.id))]
    pub async fn dispatch(&self, call: &ToolCall) -> Result<ToolResult, ToolError> {
        let result = match call.name.as_str() {
            PRODUCT_MARKET_FIT_TOOL => {
                let args: ProductMarketFitArgs = parse_arguments(call)?;
                let parameters = args.parameters.unwrap_or_default();
                let context = parameters
                    .context
                    .unwrap_or_else(|| DEFAULT_ANALYSIS_CONTEXT.to_string());
                self.analyze(
                    &args.query,
                    parameters.analysis_type.unwrap_or_default(),
                    &context,
                )
                .await
            }
            CONTACT_SEGMENTS_TOOL => {
                self.analyze(
                    "Analyze contact segments",
                    AnalysisType::Segments,
                    "Análise de segmentação de contatos",
                )
                .await
            }
            LEAD_QUALITY_TOOL => {
                self.analyze(
                    "Analyze lead quality",
                    AnalysisType::LeadQuality,
                    "Análise de qualidade de leads",
                )
                .await
            }
            MARKET_FIT_TOOL => {
                self.analyze(
                    "Analyze product market fit",
                    AnalysisType::MarketFit,
                    "Análise de product market fit",
                )
                .await
            }
            MARKETING_STRATEGY_TOOL => {
                self.analyze(
                    "Develop marketing strategy",
                    AnalysisType::Strategy,
                    "Estratégia de marketing e vendas",
                )
                .await
            }
            VERIFY_DATA_TOOL => {
                let args: VerifyDataArgs = parse_arguments(call)?;
                self.verify(&args.context, &args.prompt).await
            }
            other => {
                return Err(ToolError::UnknownTool {
                    name: other.to_string(),
                });
            }
        };

        if let Some(error) = &result.error {
            tracing::warn!(error = %error, "Tool call failed");
        }
        Ok(result)
    }

    async fn analyze(&self, query: &str, analysis: AnalysisType, context: &str) -> ToolResult {
        tracing::info!(query, analysis = analysis.as_str(), "Running market analysis");
        let request = PromptRequest::new(context, analysis.prompt(query));

        match self.relay.dashboard_data(&request).await {
            Ok(data) => {
                let count = data.hubspot_contacts.len();
                let payload = json!({
                    "contacts_analyzed": count,
                    "llm_response": data.llm_response,
                });
                if data.llm_response.trim().is_empty() {
                    return ToolResult::success(format!(
                        "Analyzed {count} contacts but couldn't generate specific insights."
                    ))
                    .with_details(
                        "The analysis completed but no detailed insights were generated. \
                         Please try rephrasing your request.",
                    )
                    .with_data(payload);
                }
                ToolResult::success(summarize(&data.llm_response))
                    .with_details(format!(
                        "Analysis based on {count} contacts from HubSpot and product \
                         information from Notion.\n\n{}",
                        data.llm_response
                    ))
                    .with_data(payload)
            }
            Err(ConnectorError::Timeout { .. }) => ToolResult::failure(
                "The analysis request timed out. The service may be processing a large dataset.",
            ),
            Err(ConnectorError::ConnectionFailed { .. }) => ToolResult::failure(
                "Could not connect to the Product Market Fit analysis service. \
                 Please ensure it's running on the configured URL.",
            ),
            Err(ConnectorError::UpstreamStatus { status, body, .. }) => {
                ToolResult::failure(format!("API returned status {status}: {body}"))
            }
            Err(e) => ToolResult::failure(format!("An unexpected error occurred: {e}")),
        }
    }

    async fn verify(&self, context: &str, prompt: &str) -> ToolResult {
        if self
            .credentials
            .require(&[ApiService::HubSpot, ApiService::OpenAi])
            .is_err()
        {
            return ToolResult::failure(
                "API keys not configured. Please set HUBSPOT_API_KEY and OPENAI_API_KEY in .env file",
            );
        }

        match self
            .relay
            .verify_data(&PromptRequest::new(context, prompt))
            .await
        {
            Ok(reply) => ToolResult::success(reply.response)
                .with_details("Analysis completed using HubSpot CRM data"),
            Err(ConnectorError::Timeout { .. }) => {
                ToolResult::failure("Request timed out. Please try again.")
            }
            Err(ConnectorError::UpstreamStatus { status, body, .. }) => {
                ToolResult::failure(format!("API returned status {status}: {body}"))
            }
            Err(e) => ToolResult::failure(format!("Tool execution failed: {e}")),
        }
    }
}

fn parse_arguments<T: DeserializeOwned>(call: &ToolCall) -> Result<T, ToolError> {
    serde_json::from_value(call.arguments.clone()).map_err(|e| ToolError::InvalidArguments {
        name: call.name.clone(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod fakes {
    use async_trait::async_trait;
    use insight_relay_integration::{
        ConnectorError, DashboardResponse, PromptRequest, RelayApi, VerifyDataResponse,
    };
    use std::sync::Mutex;

    /// A relay that records requests and replays canned results.
    pub(crate) struct FakeRelay {
        pub verify: Result<VerifyDataResponse, ConnectorError>,
        pub dashboard: Result<DashboardResponse, ConnectorError>,
        pub seen: Mutex<Vec<(&'static str, PromptRequest)>>,
    }

    impl FakeRelay {
        pub(crate) fn new(llm_response: &str, verify: &str) -> Self {
            Self {
                verify: Ok(VerifyDataResponse {
                    response: verify.to_string(),
                }),
                dashboard: Ok(DashboardResponse {
                    llm_response: llm_response.to_string(),
                    hubspot_contacts: Vec::new(),
                    notion_page_text: String::new(),
                }),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(err: ConnectorError) -> Self {
            Self {
                verify: Err(err.clone()),
                dashboard: Err(err),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn requests(&self) -> Vec<(&'static str, PromptRequest)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RelayApi for FakeRelay {
        async fn verify_data(
            &self,
            request: &PromptRequest,
        ) -> Result<VerifyDataResponse, ConnectorError> {
            self.seen.lock().unwrap().push(("verify", request.clone()));
            self.verify.clone()
        }

        async fn dashboard_data(
            &self,
            request: &PromptRequest,
        ) -> Result<DashboardResponse, ConnectorError> {
            self.seen.lock().unwrap().push(("dashboard", request.clone()));
            self.dashboard.clone()
        }
    }
}
