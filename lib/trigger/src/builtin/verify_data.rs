//! Sales-data verification trigger.

use crate::builtin::upstream_message;
use crate::formatter::{TruncationPolicy, VoiceFormatter};
use crate::trigger::{Trigger, TriggerAction, TriggerInvocation, TriggerResponse, VoiceSettings};
use async_trait::async_trait;
use insight_relay_integration::{
    ApiCredentials, ApiService, ConnectorError, PromptRequest, RelayApi,
};
use std::sync::Arc;

const NAME: &str = "verify_data";
const PRIORITY: i32 = 75;

const KEYWORDS: [&str; 12] = [
    "verificar dados",
    "verify data",
    "check data",
    "dados hubspot",
    "conferir vendas",
    "analisar dados",
    "verificar vendas",
    "check sales",
    "dados do crm",
    "crm data",
    "hubspot data",
    "sales data",
];

const MISSING_KEYS: &str = "Desculpe, as chaves da API não estão configuradas. \
Por favor, configure HUBSPOT_API_KEY e OPENAI_API_KEY no arquivo .env";
const TIMED_OUT: &str = "A verificação de dados demorou muito para responder. Tente novamente.";
const GENERIC_FAILURE: &str = "Desculpe, houve um erro ao verificar os dados. Tente novamente.";

/// Context labels, checked in order.
const CONTEXTS: [(&str, &str); 6] = [
    ("vendas", "Análise de dados de vendas"),
    ("deals", "Análise de negócios"),
    ("pipeline", "Análise de pipeline de vendas"),
    ("receita", "Análise de receita"),
    ("revenue", "Revenue analysis"),
    ("sales", "Sales analysis"),
];
const DEFAULT_CONTEXT: &str = "Verificação geral de dados de vendas";

/// Calls `/verify-data` and speaks the correction.
pub struct VerifyDataAction {
    relay: Arc<dyn RelayApi>,
    credentials: ApiCredentials,
    voice: VoiceSettings,
    formatter: VoiceFormatter,
}

impl VerifyDataAction {
    #[must_use]
    pub fn new(
        relay: Arc<dyn RelayApi>,
        credentials: ApiCredentials,
        voice: VoiceSettings,
    ) -> Self {
        Self {
            relay,
            credentials,
            voice,
            formatter: VoiceFormatter::data_verification(),
        }
    }

    /// Replaces the default voice formatter.
    #[must_use]
    pub fn with_formatter(mut self, formatter: VoiceFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Picks a context label from the first topic word in the query.
    #[must_use]
    pub fn extract_context(query: &str) -> &'static str {
        let lowered = query.to_lowercase();
        CONTEXTS
            .iter()
            .find(|(word, _)| lowered.contains(word))
            .map_or(DEFAULT_CONTEXT, |(_, context)| *context)
    }

    /// Turns the query into the verification prompt.
    #[must_use]
    pub fn prepare_prompt(query: &str) -> String {
        let lowered = query.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

        if has(&["incorreto", "errado"]) {
            "Analise os dados e identifique possíveis inconsistências ou erros nos dados apresentados."
                .to_string()
        } else if has(&["resumo", "summary"]) {
            "Forneça um resumo dos dados de vendas atuais.".to_string()
        } else if has(&["performance", "desempenho"]) {
            "Analise a performance das vendas baseada nos dados do CRM.".to_string()
        } else {
            format!("Analise os dados de vendas e responda à seguinte pergunta: {query}")
        }
    }
}

#[async_trait]
impl TriggerAction for VerifyDataAction {
    async fn run(&self, invocation: &TriggerInvocation) -> TriggerResponse {
        if let Err(e) = self
            .credentials
            .require(&[ApiService::HubSpot, ApiService::OpenAi])
        {
            tracing::warn!(error = %e, "Data verification skipped");
            return TriggerResponse::spoken(MISSING_KEYS);
        }

        let request = PromptRequest::new(
            Self::extract_context(&invocation.query),
            Self::prepare_prompt(&invocation.query),
        );

        match self.relay.verify_data(&request).await {
            Ok(reply) => TriggerResponse::spoken(self.formatter.format(&reply.response))
                .with_voice(self.voice.clone()),
            Err(e) => {
                tracing::warn!(error = %e, "Data verification failed");
                match e {
                    ConnectorError::Timeout { .. } => TriggerResponse::spoken(TIMED_OUT),
                    ConnectorError::UpstreamStatus { body, .. } => TriggerResponse::spoken(
                        format!("Erro ao verificar dados: {}", upstream_message(&body)),
                    ),
                    _ => TriggerResponse::spoken(GENERIC_FAILURE),
                }
            }
        }
    }
}

/// Builds the `verify_data` trigger.
#[must_use]
pub fn verify_data_trigger(
    relay: Arc<dyn RelayApi>,
    credentials: ApiCredentials,
    voice: VoiceSettings,
    truncation: TruncationPolicy,
) -> Trigger {
    let action = VerifyDataAction::new(relay, credentials, voice)
        .with_formatter(VoiceFormatter::data_verification_with(truncation));
    Trigger::new(NAME, PRIORITY, Arc::new(action))
        .with_keywords(KEYWORDS)
        .with_activation_criteria("User wants to verify or analyze sales data from HubSpot CRM")
        .with_examples(
            [
                "Verificar dados de vendas",
                "Analisar os dados do HubSpot",
                "Conferir as vendas do CRM",
                "Check sales data accuracy",
                "Verify HubSpot data",
            ],
            [
                "What's the weather?",
                "Search for something",
                "Hey bot",
                "Calculate something",
            ],
        )
}
