//! Tools offered to the realtime voice model.
//!
//! Schemas use the function-calling shape: `{type: "function", name,
//! description, parameters}` where `parameters` is a JSON schema.

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

pub const PRODUCT_MARKET_FIT_TOOL: &str = "product_market_fit_tool";
pub const CONTACT_SEGMENTS_TOOL: &str = "get_contact_segments";
pub const LEAD_QUALITY_TOOL: &str = "get_lead_quality_analysis";
pub const MARKET_FIT_TOOL: &str = "get_market_fit_analysis";
pub const MARKETING_STRATEGY_TOOL: &str = "get_marketing_strategy";
pub const VERIFY_DATA_TOOL: &str = "verify_data_tool";

/// Definition of a tool the voice model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Unique tool name.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON schema for the arguments.
    pub parameters: JsonValue,
}

impl ToolDefinition {
    /// Creates a function tool with an empty object schema.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: "function".to_string(),
            name: name.into(),
            description: description.into(),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    /// Sets the argument schema.
    #[must_use]
    pub fn with_parameters(mut self, schema: JsonValue) -> Self {
        self.parameters = schema;
        self
    }
}

/// Result of a tool invocation, returned to the voice model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the invocation succeeded.
    pub success: bool,
    /// Short text meant to be spoken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Longer text the model may draw on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Raw data behind the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    /// Error message, if the invocation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(result: impl Into<String>) -> Self {
        Self {
            success: true,
            result: Some(result.into()),
            details: None,
            data: None,
            error: None,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            details: None,
            data: None,
            error: Some(error.into()),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = Some(data);
        self
    }
}

/// The flavours of market analysis the dashboard can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Segments,
    LeadQuality,
    MarketFit,
    Strategy,
    #[default]
    Comprehensive,
}

impl AnalysisType {
    /// All analysis types, in schema order.
    pub const ALL: [Self; 5] = [
        Self::Segments,
        Self::LeadQuality,
        Self::MarketFit,
        Self::Strategy,
        Self::Comprehensive,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Segments => "segments",
            Self::LeadQuality => "lead_quality",
            Self::MarketFit => "market_fit",
            Self::Strategy => "strategy",
            Self::Comprehensive => "comprehensive",
        }
    }

    /// Builds the dashboard prompt. Comprehensive analysis narrows itself
    /// using topic words in `query`.
    #[must_use]
    pub fn prompt(&self, query: &str) -> &'static str {
        match self {
            Self::Segments => {
                "Identifique e analise os principais segmentos de empresa na nossa base de contatos. \
                 Para cada segmento, forneça: características principais, tamanho do mercado, \
                 potencial de conversão e estratégias recomendadas."
            }
            Self::LeadQuality => {
                "Avalie a qualidade dos leads em nossa base de contatos. Identifique os 5 mais \
                 promissores, explique os critérios de qualificação e sugira próximos passos para \
                 cada um."
            }
            Self::MarketFit => {
                "Analise o product market fit com base nos dados de contatos e informações do \
                 produto. Identifique padrões de ajuste produto-mercado, gaps e oportunidades de \
                 crescimento."
            }
            Self::Strategy => {
                "Com base na análise dos contatos e dados do produto, desenvolva uma estratégia de \
                 marketing e vendas. Inclua recomendações específicas para cada segmento principal."
            }
            Self::Comprehensive => {
                let lowered = query.to_lowercase();
                if lowered.contains("segment") {
                    "Faça uma análise detalhada dos segmentos de mercado presentes na nossa base de \
                     contatos."
                } else if lowered.contains("lead") && lowered.contains("quality") {
                    "Avalie a qualidade dos leads e identifique os mais promissores."
                } else if lowered.contains("strategy") {
                    "Sugira uma estratégia de marketing baseada nos dados disponíveis."
                } else if lowered.contains("fit") || lowered.contains("pmf") {
                    "Analise o product market fit com base nos dados de contatos."
                } else {
                    "Faça uma análise abrangente dos nossos contatos e identifique insights-chave \
                     sobre product market fit, segmentação e oportunidades de crescimento."
                }
            }
        }
    }
}

fn optional_parameters(description: &str) -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "parameters": {"type": "object", "description": description}
        }
    })
}

/// The tool schemas every realtime session is created with.
#[must_use]
pub fn builtin_tools() -> Vec<ToolDefinition> {
    let analysis_types: Vec<&str> = AnalysisType::ALL.iter().map(AnalysisType::as_str).collect();

    vec![
        ToolDefinition::new(
            PRODUCT_MARKET_FIT_TOOL,
            "Analyze product market fit, lead quality, market segments, and business intelligence \
             using HubSpot contacts and Notion product data",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The user's analysis request or question"
                },
                "parameters": {
                    "type": "object",
                    "description": "Optional parameters for the analysis",
                    "properties": {
                        "analysis_type": {
                            "type": "string",
                            "enum": analysis_types,
                            "description": "Type of analysis to perform"
                        },
                        "context": {
                            "type": "string",
                            "description": "Context for the analysis (e.g., 'Análise de segmentação de mercado')"
                        }
                    }
                }
            },
            "required": ["query"]
        })),
        ToolDefinition::new(
            CONTACT_SEGMENTS_TOOL,
            "Get detailed analysis of contact segments from HubSpot data",
        )
        .with_parameters(optional_parameters("Optional parameters for segment analysis")),
        ToolDefinition::new(
            LEAD_QUALITY_TOOL,
            "Analyze lead quality and identify most promising prospects",
        )
        .with_parameters(optional_parameters(
            "Optional parameters for lead quality analysis",
        )),
        ToolDefinition::new(
            MARKET_FIT_TOOL,
            "Analyze product market fit based on contact data and product information",
        )
        .with_parameters(optional_parameters(
            "Optional parameters for market fit analysis",
        )),
        ToolDefinition::new(
            MARKETING_STRATEGY_TOOL,
            "Get marketing strategy recommendations based on contact and product data",
        )
        .with_parameters(optional_parameters("Optional parameters for strategy analysis")),
        ToolDefinition::new(
            VERIFY_DATA_TOOL,
            "Verify and analyze sales data from HubSpot CRM using AI analysis",
        )
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "context": {
                    "type": "string",
                    "description": "Context for the data analysis (e.g., 'Sales data analysis', 'Revenue verification')"
                },
                "prompt": {
                    "type": "string",
                    "description": "Specific question or analysis request about the sales data"
                }
            },
            "required": ["context", "prompt"]
        })),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tool_names_in_order() {
        let names: Vec<_> = builtin_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            [
                "product_market_fit_tool",
                "get_contact_segments",
                "get_lead_quality_analysis",
                "get_market_fit_analysis",
                "get_marketing_strategy",
                "verify_data_tool",
            ]
        );
    }

    #[test]
    fn schemas_serialize_as_functions() {
        let tools = builtin_tools();
        let pmf = serde_json::to_value(&tools[0]).expect("serializes");
        assert_eq!(pmf["type"], "function");
        assert_eq!(pmf["parameters"]["required"], json!(["query"]));
        assert_eq!(
            pmf["parameters"]["properties"]["parameters"]["properties"]["analysis_type"]["enum"],
            json!(["segments", "lead_quality", "market_fit", "strategy", "comprehensive"])
        );

        let verify = serde_json::to_value(&tools[5]).expect("serializes");
        assert_eq!(verify["parameters"]["required"], json!(["context", "prompt"]));
    }

    #[test]
    fn comprehensive_prompt_follows_query() {
        assert!(
            AnalysisType::Comprehensive
                .prompt("which segment converts?")
                .contains("segmentos de mercado")
        );
        assert!(
            AnalysisType::Comprehensive
                .prompt("Lead quality please")
                .starts_with("Avalie a qualidade")
        );
        assert!(
            AnalysisType::Comprehensive
                .prompt("hello")
                .starts_with("Faça uma análise abrangente")
        );
        // Fixed types ignore the query.
        assert_eq!(
            AnalysisType::Strategy.prompt("segment"),
            AnalysisType::Strategy.prompt("")
        );
    }

    #[test]
    fn failed_result_omits_empty_fields() {
        let value = serde_json::to_value(ToolResult::failure("boom")).expect("serializes");
        assert_eq!(value, json!({"success": false, "error": "boom"}));
    }
}
