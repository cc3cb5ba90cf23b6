//! Realtime voice session endpoints.

use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use insight_relay_core::RealtimeSessionId;
use insight_relay_realtime::{MessageReply, Session};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

fn parse_id(raw: &str) -> Result<RealtimeSessionId, ApiError> {
    raw.parse().map_err(|e| ApiError::BadRequest {
        reason: format!("invalid session id {raw:?}: {e}"),
    })
}

#[derive(Debug, Serialize)]
pub struct SessionList {
    pub active: usize,
    pub sessions: Vec<Session>,
}

/// `POST /realtime/sessions`: the body, if any, is stored as the session config.
pub async fn create(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let config = if body.iter().all(u8::is_ascii_whitespace) {
        JsonValue::Object(serde_json::Map::new())
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest {
            reason: format!("session config is not valid JSON: {e}"),
        })?
    };
    let session = state.sessions.create(config).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// `GET /realtime/sessions`
pub async fn list(State(state): State<Arc<AppState>>) -> Json<SessionList> {
    let sessions = state.sessions.list().await;
    Json(SessionList {
        active: sessions.len(),
        sessions,
    })
}

/// `GET /realtime/sessions/{id}`
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.sessions.get(id).await?))
}

/// `DELETE /realtime/sessions/{id}`
pub async fn end(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.sessions.end(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /realtime/sessions/{id}/messages`
pub async fn message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(message): Json<JsonValue>,
) -> Result<Json<MessageReply>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.sessions.handle_message(id, message).await?))
}
