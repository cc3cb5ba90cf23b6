//! The relay endpoints: CRM and Notion data fed through the LLM.

use crate::error::ApiError;
use crate::prompts;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use insight_relay_integration::{
    ApiService, DashboardResponse, Deal, PromptRequest, VerifyDataResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// `POST /verify-data`: checks the figures cited in `prompt` against CRM deals.
pub async fn verify_data(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<VerifyDataResponse>, ApiError> {
    state
        .credentials
        .require(&[ApiService::HubSpot, ApiService::OpenAi])?;

    let deals = state
        .crm
        .fetch_deals()
        .await
        .map_err(|e| ApiError::upstream("Erro ao buscar deals", e))?;
    tracing::debug!(deals = deals.len(), "Fetched CRM deals");

    let result = prompts::verify_call(&deals, &request)
        .execute(state.llm.as_ref())
        .await?;
    tracing::info!(
        latency_ms = result.latency_ms,
        tokens = result.usage.total(),
        "Data verification answered"
    );

    Ok(Json(VerifyDataResponse {
        response: result.content,
    }))
}

/// `POST /dashboard/data`: market insight from contacts and the product page.
pub async fn dashboard_data(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PromptRequest>,
) -> Result<Json<DashboardResponse>, ApiError> {
    state.credentials.require(&[
        ApiService::HubSpot,
        ApiService::Notion,
        ApiService::OpenAi,
    ])?;

    let (contacts, page_text) = tokio::join!(
        state.crm.fetch_contacts(),
        state.documents.page_text(&state.notion_page_id),
    );
    let contacts = contacts.map_err(|e| ApiError::upstream("Erro ao buscar contatos", e))?;
    let page_text =
        page_text.map_err(|e| ApiError::upstream("Erro ao buscar página do Notion", e))?;
    tracing::debug!(contacts = contacts.len(), "Fetched dashboard inputs");

    let result = prompts::dashboard_call(&contacts, &page_text, &request)
        .execute(state.llm.as_ref())
        .await?;

    Ok(Json(DashboardResponse {
        llm_response: result.content,
        hubspot_contacts: contacts,
        notion_page_text: page_text,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DealsRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct DealsResponse {
    pub prompt_received: String,
    pub all_deals: Vec<Deal>,
}

/// `POST /deals/all`: the raw deal listing, with the prompt echoed back.
pub async fn all_deals(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DealsRequest>,
) -> Result<Json<DealsResponse>, ApiError> {
    state.credentials.require(&[ApiService::HubSpot])?;

    let deals = state
        .crm
        .fetch_deals()
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch deals", e))?;

    Ok(Json(DealsResponse {
        prompt_received: request.prompt,
        all_deals: deals,
    }))
}
