//! Offline walk through the trigger pipeline.
//!
//! `insight-relay demo` wires the built-in triggers to [`DemoRelay`], which
//! answers from canned data, and feeds them a fixed set of utterances.

use crate::error::ServerError;
use async_trait::async_trait;
use insight_relay_integration::{
    ApiCredentials, ConnectorError, ContactSummary, DashboardResponse, PromptRequest, RelayApi,
    VerifyDataResponse,
};
use insight_relay_trigger::builtin::builtin_registry;
use insight_relay_trigger::{BuiltinOptions, DispatchOutcome, DispatchResult};
use std::sync::Arc;

/// Utterances run by the demo, in order.
pub const UTTERANCES: [&str; 5] = [
    "Pode verificar dados de vendas? Acho que fechamos 20 deals este mês",
    "Quero uma análise de mercado dos nossos segmentos",
    "Faça uma lead analysis para priorizar os contatos",
    "Preciso de marketing insights para a próxima campanha",
    "Qual é a previsão do tempo para amanhã?",
];

const VERIFY_ANSWER: &str = "Os dados do CRM mostram 12 deals fechados este mês, não 20. \
O total negociado é de R$ 48.000, concentrado no segmento de Tecnologia.";

const DASHBOARD_ANSWER: &str = "**Principais segmentos**\n\
1. Tecnologia concentra 33% dos contatos.\n\
2. Varejo aparece em seguida, com empresas de até 50 funcionários.\n\
\n\
Recomenda-se priorizar leads de Tecnologia com mais de 20 funcionários.";

/// A [`RelayApi`] that answers from canned data without any network access.
#[derive(Debug, Default, Clone)]
pub struct DemoRelay;

fn demo_contacts() -> Vec<ContactSummary> {
    [
        ("1", "Ana Souza", "Tecnologia", "50"),
        ("2", "Bruno Lima", "Varejo", "12"),
        ("3", "Carla Dias", "Saúde", "80"),
    ]
    .into_iter()
    .map(|(id, nome, segmento, employees)| ContactSummary {
        id: id.to_string(),
        nome: Some(nome.to_string()),
        segmento_da_empresa: Some(segmento.to_string()),
        numemployees: Some(employees.to_string()),
    })
    .collect()
}

#[async_trait]
impl RelayApi for DemoRelay {
    async fn verify_data(
        &self,
        request: &PromptRequest,
    ) -> Result<VerifyDataResponse, ConnectorError> {
        tracing::debug!(context = %request.context, "Demo relay: verify-data");
        Ok(VerifyDataResponse {
            response: VERIFY_ANSWER.to_string(),
        })
    }

    async fn dashboard_data(
        &self,
        request: &PromptRequest,
    ) -> Result<DashboardResponse, ConnectorError> {
        tracing::debug!(context = %request.context, "Demo relay: dashboard-data");
        Ok(DashboardResponse {
            llm_response: DASHBOARD_ANSWER.to_string(),
            hubspot_contacts: demo_contacts(),
            notion_page_text: "Produto de análise de vendas por voz".to_string(),
        })
    }
}

/// One demo utterance and what the registry did with it.
#[derive(Debug, Clone)]
pub struct DemoRun {
    pub query: &'static str,
    pub result: DispatchResult,
}

/// Runs every demo utterance through the built-in triggers.
///
/// Placeholder keys are supplied so the verification trigger does not stop
/// at its configuration check.
///
/// # Errors
///
/// Returns [`ServerError::Registry`] if the built-in triggers are invalid.
pub async fn run(options: BuiltinOptions) -> Result<Vec<DemoRun>, ServerError> {
    let credentials = ApiCredentials::new(
        Some("demo".to_string()),
        Some("demo".to_string()),
        Some("demo".to_string()),
    );
    let registry = builtin_registry(Arc::new(DemoRelay), credentials, options, None).map_err(
        |e| ServerError::Registry {
            reason: e.current_context().to_string(),
        },
    )?;

    let mut runs = Vec::with_capacity(UTTERANCES.len());
    for query in UTTERANCES {
        let result = registry.process_query(query).await;
        match &result.outcome {
            DispatchOutcome::Fired {
                trigger, response, ..
            } => tracing::info!(
                query,
                trigger = %trigger,
                processing_ms = result.processing_ms,
                "{}",
                response.text
            ),
            DispatchOutcome::NoMatch => tracing::info!(query, "No trigger matched"),
            DispatchOutcome::Disabled => tracing::info!(query, "Trigger registry disabled"),
        }
        runs.push(DemoRun { query, result });
    }
    Ok(runs)
}
