//! Product-market-fit analysis trigger.

use crate::builtin::upstream_message;
use crate::formatter::VoiceFormatter;
use crate::trigger::{Trigger, TriggerAction, TriggerInvocation, TriggerResponse, VoiceSettings};
use async_trait::async_trait;
use insight_relay_integration::{ConnectorError, DashboardResponse, PromptRequest, RelayApi};
use std::sync::Arc;

const NAME: &str = "product_market_fit";
const PRIORITY: i32 = 75;
const SPEED: f32 = 0.9;

const KEYWORDS: [&str; 15] = [
    "product market fit",
    "pmf analysis",
    "market analysis",
    "lead analysis",
    "segmento análise",
    "análise de mercado",
    "dashboard analysis",
    "hubspot analysis",
    "contact analysis",
    "business intelligence",
    "sales intelligence",
    "marketing insights",
    "análise de leads",
    "análise de contatos",
    "inteligência de vendas",
];

const TIMED_OUT: &str =
    "The market analysis is taking longer than expected. Please try again in a moment.";
const UNREACHABLE: &str = "I couldn't connect to the analysis service. \
Please check if the product market fit tool is running.";
const GENERIC_FAILURE: &str =
    "Sorry, there was an error performing the market analysis. Please try again.";

/// Context labels keyed by topic words, checked in order.
const CONTEXTS: [(&[&str], &str); 5] = [
    (
        &["lead", "leads", "prospects"],
        "Análise de leads e prospecção de clientes",
    ),
    (
        &["segment", "segmento", "market"],
        "Análise de segmentação de mercado",
    ),
    (
        &["contact", "contato", "cliente"],
        "Análise de base de contatos",
    ),
    (&["fit", "pmf", "product market"], "Análise de product market fit"),
    (&["sales", "vendas", "revenue"], "Análise de vendas e receita"),
];
const DEFAULT_CONTEXT: &str = "Análise geral de marketing e produto";

/// Refined analysis prompts, shared with the realtime analysis tools.
pub mod prompts {
    pub const SEGMENTS: &str = "Identifique e analise os principais segmentos de empresa na nossa base de contatos. \
Destaque características, potencial de conversão e estratégias recomendadas para cada segmento.";
    pub const LEAD_QUALITY: &str = "Avalie a qualidade dos leads em nossa base de contatos. \
Identifique os mais promissores e sugira critérios de qualificação.";
    pub const PROMISING: &str = "Identifique os 5 contatos mais promissores da nossa base \
e explique por que são considerados leads de alta qualidade.";
    pub const MARKET_FIT: &str = "Analise o product market fit com base nos dados de contatos. \
Identifique padrões de ajuste produto-mercado e oportunidades de crescimento.";
    pub const STRATEGY: &str = "Com base na análise dos contatos e dados do produto, \
sugira uma estratégia de marketing e vendas personalizada para cada segmento principal.";
    pub const COMPREHENSIVE: &str = "Faça uma análise abrangente dos nossos contatos e identifique \
insights-chave sobre product market fit, segmentação e oportunidades de crescimento.";
}

/// Calls `/dashboard/data` and speaks a summary of the insight.
pub struct ProductMarketFitAction {
    relay: Arc<dyn RelayApi>,
    voice: VoiceSettings,
    formatter: VoiceFormatter,
}

impl ProductMarketFitAction {
    #[must_use]
    pub fn new(relay: Arc<dyn RelayApi>, voice: VoiceSettings) -> Self {
        Self {
            relay,
            voice: voice.with_speed(SPEED),
            formatter: VoiceFormatter::market_analysis(),
        }
    }

    /// Picks a context label from the query's topic words.
    #[must_use]
    pub fn extract_context(query: &str) -> &'static str {
        let lowered = query.to_lowercase();
        CONTEXTS
            .iter()
            .find(|(words, _)| words.iter().any(|w| lowered.contains(w)))
            .map_or(DEFAULT_CONTEXT, |(_, context)| *context)
    }

    /// Maps the query onto one of the refined analysis prompts.
    #[must_use]
    pub fn refine_prompt(query: &str) -> &'static str {
        let lowered = query.to_lowercase();
        let has = |w: &str| lowered.contains(w);

        if has("segment") || has("segmento") {
            prompts::SEGMENTS
        } else if has("lead") && (has("quality") || has("qualidade")) {
            prompts::LEAD_QUALITY
        } else if has("promising") || has("promissor") {
            prompts::PROMISING
        } else if has("market") && has("fit") {
            prompts::MARKET_FIT
        } else if has("strategy") || has("estratégia") {
            prompts::STRATEGY
        } else {
            prompts::COMPREHENSIVE
        }
    }

    /// Introduces the insight with the number of contacts analysed.
    #[must_use]
    pub fn format_for_voice(&self, data: &DashboardResponse) -> String {
        let count = data.hubspot_contacts.len();
        if data.llm_response.trim().is_empty() {
            return format!(
                "I analyzed {count} contacts but couldn't generate specific insights. \
                 Please try rephrasing your question."
            );
        }
        format!(
            "Based on analysis of {count} contacts from HubSpot and our product information, \
             here's what I found:\n\n{}",
            self.formatter.format(&data.llm_response)
        )
    }
}

#[async_trait]
impl TriggerAction for ProductMarketFitAction {
    async fn run(&self, invocation: &TriggerInvocation) -> TriggerResponse {
        let request = PromptRequest::new(
            Self::extract_context(&invocation.query),
            Self::refine_prompt(&invocation.query),
        );

        match self.relay.dashboard_data(&request).await {
            Ok(data) => {
                TriggerResponse::spoken(self.format_for_voice(&data)).with_voice(self.voice.clone())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Market analysis failed");
                match e {
                    ConnectorError::Timeout { .. } => TriggerResponse::spoken(TIMED_OUT),
                    ConnectorError::ConnectionFailed { .. } => TriggerResponse::spoken(UNREACHABLE),
                    ConnectorError::UpstreamStatus { status, body, .. } => {
                        TriggerResponse::spoken(format!(
                            "I couldn't complete the product market fit analysis. \
                             API returned status {status}: {}",
                            upstream_message(&body)
                        ))
                    }
                    _ => TriggerResponse::spoken(GENERIC_FAILURE),
                }
            }
        }
    }
}

/// Builds the `product_market_fit` trigger.
#[must_use]
pub fn product_market_fit_trigger(relay: Arc<dyn RelayApi>, voice: VoiceSettings) -> Trigger {
    Trigger::new(
        NAME,
        PRIORITY,
        Arc::new(ProductMarketFitAction::new(relay, voice)),
    )
    .with_keywords(KEYWORDS)
    .with_activation_criteria(
        "User wants to analyze product market fit, leads, contacts, or business intelligence \
         using HubSpot and Notion data",
    )
    .with_examples(
        [
            "Analyze product market fit for our leads",
            "Give me insights about our HubSpot contacts",
            "What segments are most promising in our database?",
            "Analyze our lead quality",
            "Show me market analysis from our contacts",
            "Faça uma análise de product market fit",
            "Analise nossos leads do HubSpot",
            "Quais segmentos são mais promissores?",
        ],
        [
            "What's the weather?",
            "Search for something online",
            "Hey bot",
            "Set a reminder",
            "Play music",
        ],
    )
}
