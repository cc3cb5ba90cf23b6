//! Per-client request budget.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;

/// Paths that never count against the budget.
const EXEMPT: &[&str] = &["/health"];

/// The key a request is counted under: the peer address when the server
/// was started with connect info, else the first `X-Forwarded-For` hop.
fn client_key(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

/// Rejects requests over the configured budget with 429.
pub async fn enforce(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(limiter) = &state.rate_limiter else {
        return Ok(next.run(request).await);
    };
    if EXEMPT.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let key = client_key(&request);
    let result = limiter.check_and_increment(&key);
    if let Some(retry_after_secs) = result.retry_after_secs() {
        tracing::debug!(client = %key, "Rate limit exceeded");
        return Err(ApiError::RateLimited { retry_after_secs });
    }
    Ok(next.run(request).await)
}
