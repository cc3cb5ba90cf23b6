//! Prompt composition for the relay endpoints.

use insight_relay_ai::{LlmCall, PromptTemplate, VariableDefinition};
use insight_relay_integration::{ContactSummary, Deal, PromptRequest};
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::LazyLock;

const VERIFY_SYSTEM: &str = "Você é um assistente que ajuda a analisar dados de vendas. \
Se alguém citar um dado, você deve analisar os dados no Hubspot e corrigir imediatamente se estiver errado. \
Seja objetivo na correção e cite dados.";

static VERIFY: LazyLock<PromptTemplate> = LazyLock::new(|| {
    PromptTemplate::new(
        "verify_data",
        "[Dados do CRM]\n{{deals}}\n\n[Contexto]\n{{context}}\n\n[Prompt]\n{{prompt}}",
    )
    .with_system_prompt(VERIFY_SYSTEM)
    .with_variable("deals", VariableDefinition::required("One line per CRM deal"))
    .with_variable("context", VariableDefinition::required("Caller-supplied context"))
    .with_variable("prompt", VariableDefinition::required("The claim or question"))
});

static DASHBOARD: LazyLock<PromptTemplate> = LazyLock::new(|| {
    PromptTemplate::new("dashboard_data", "{{prompt}}")
        .with_system_prompt(
            "Seja um especialista em Marketing e Produto que está em uma reunião estratégica \
             e tem acesso aos seguintes dados:\n\n\
             CONTEXTO: {{context}}\n\n\
             DADOS DO HUBSPOT (Contatos):\n{{contacts}}\n\n\
             DADOS DOS PRODUTO (Página Notion):\n{{notion}}\n\n\
             Use essas informações para responder às solicitações do usuário de forma precisa \
             e contextual.",
        )
        .with_variable("prompt", VariableDefinition::required("The user's request"))
        .with_variable("context", VariableDefinition::required("Caller-supplied context"))
        .with_variable("contacts", VariableDefinition::required("Contact summaries as JSON"))
        .with_variable(
            "notion",
            VariableDefinition::optional("Product page text").with_default(json!("")),
        )
});

fn build(template: &PromptTemplate, variables: &HashMap<String, JsonValue>) -> LlmCall {
    let call = LlmCall::new(template.render(variables));
    match template.render_system_prompt(variables) {
        Some(system) => call.with_system_prompt(system),
        None => call,
    }
}

/// The `/verify-data` call: CRM deals, context and claim in one user
/// message, asking the model to correct any wrong figure.
#[must_use]
pub fn verify_call(deals: &[Deal], request: &PromptRequest) -> LlmCall {
    let deal_lines = deals
        .iter()
        .map(Deal::prompt_line)
        .collect::<Vec<_>>()
        .join("\n");
    let variables = HashMap::from([
        ("deals".to_string(), json!(deal_lines)),
        ("context".to_string(), json!(request.context)),
        ("prompt".to_string(), json!(request.prompt)),
    ]);
    build(&VERIFY, &variables).with_temperature(0.5)
}

/// The `/dashboard/data` call: contacts and product text in the system
/// prompt, the request prompt as the user message.
#[must_use]
pub fn dashboard_call(
    contacts: &[ContactSummary],
    notion_text: &str,
    request: &PromptRequest,
) -> LlmCall {
    let variables = HashMap::from([
        ("prompt".to_string(), json!(request.prompt)),
        ("context".to_string(), json!(request.context)),
        ("contacts".to_string(), json!(contacts)),
        ("notion".to_string(), json!(notion_text)),
    ]);
    build(&DASHBOARD, &variables)
        .with_temperature(0.7)
        .with_max_tokens(1500)
}
