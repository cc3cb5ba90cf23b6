//! Runs utterances through the trigger registry.

use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use insight_relay_trigger::DispatchResult;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct VoiceRequest {
    pub text: String,
}

/// `POST /voice/process`
pub async fn process(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VoiceRequest>,
) -> Result<Json<DispatchResult>, ApiError> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest {
            reason: "text must not be empty".to_string(),
        });
    }
    Ok(Json(state.registry.process_query(text).await))
}
