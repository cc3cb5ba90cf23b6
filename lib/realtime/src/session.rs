//! Realtime session management.
//!
//! Sessions live in memory only. A session expires once it has been idle for
//! longer than the configured timeout; expired sessions are dropped lazily on
//! access and in bulk by [`SessionManager::cleanup_expired`].

use crate::dispatch::ToolDispatcher;
use crate::error::SessionError;
use crate::message::{MessageReply, ToolCall};
use crate::tool::{ToolDefinition, ToolResult, builtin_tools};
use chrono::{DateTime, Duration, Utc};
use insight_relay_core::RealtimeSessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A realtime voice session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: RealtimeSessionId,
    /// Tool schemas offered to the voice model.
    pub tools: Vec<ToolDefinition>,
    /// Client-supplied session configuration, kept as given.
    pub config: JsonValue,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    /// Messages handled so far.
    pub message_count: u64,
}

impl Session {
    fn new(tools: Vec<ToolDefinition>, config: JsonValue, now: DateTime<Utc>) -> Self {
        Self {
            id: RealtimeSessionId::new(),
            tools,
            config,
            created_at: now,
            last_active_at: now,
            message_count: 0,
        }
    }

    /// Returns true if the session has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_active_at > timeout
    }
}

/// Lifetime and capacity limits for sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// Idle time after which a session expires.
    pub timeout: Duration,
    /// Maximum number of live sessions.
    pub max_sessions: usize,
}

impl SessionLimits {
    #[must_use]
    pub fn new(timeout_secs: u64, max_sessions: usize) -> Self {
        Self {
            timeout: i64::try_from(timeout_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
            max_sessions,
        }
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::new(3600, 10)
    }
}

/// Owns the live sessions and routes their messages.
pub struct SessionManager {
    sessions: RwLock<HashMap<RealtimeSessionId, Session>>,
    limits: SessionLimits,
    tools: Vec<ToolDefinition>,
    dispatcher: ToolDispatcher,
}

impl SessionManager {
    /// Creates a manager that offers the built-in tools.
    #[must_use]
    pub fn new(dispatcher: ToolDispatcher, limits: SessionLimits) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            limits,
            tools: builtin_tools(),
            dispatcher,
        }
    }

    #[must_use]
    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Starts a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::LimitReached`] when the maximum number of live
    /// sessions is already open.
    pub async fn create(&self, config: JsonValue) -> Result<Session, SessionError> {
        self.create_at(config, Utc::now()).await
    }

    async fn create_at(
        &self,
        config: JsonValue,
        now: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        let timeout = self.limits.timeout;
        sessions.retain(|_, s| !s.is_expired(timeout, now));

        if sessions.len() >= self.limits.max_sessions {
            return Err(SessionError::LimitReached {
                max: self.limits.max_sessions,
            });
        }

        let session = Session::new(self.tools.clone(), config, now);
        sessions.insert(session.id, session.clone());
        tracing::info!(session_id = %session.id, active = sessions.len(), "Realtime session created");
        Ok(session)
    }

    /// Looks up a live session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] for unknown IDs and
    /// [`SessionError::Expired`] for sessions past their idle timeout, which
    /// are removed.
    pub async fn get(&self, id: RealtimeSessionId) -> Result<Session, SessionError> {
        self.get_at(id, Utc::now()).await
    }

    async fn get_at(
        &self,
        id: RealtimeSessionId,
        now: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&id) {
                None => return Err(SessionError::NotFound { id }),
                Some(s) if !s.is_expired(self.limits.timeout, now) => return Ok(s.clone()),
                Some(_) => {}
            }
        }
        self.remove_if_expired(id, now).await
    }

    /// Removes `id` only if it is still expired under the write lock; a
    /// concurrent touch may have revived it since the read.
    async fn remove_if_expired(
        &self,
        id: RealtimeSessionId,
        now: DateTime<Utc>,
    ) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(&id) {
            None => Err(SessionError::NotFound { id }),
            Some(s) if !s.is_expired(self.limits.timeout, now) => Ok(s.clone()),
            Some(_) => {
                sessions.remove(&id);
                Err(SessionError::Expired { id })
            }
        }
    }

    /// Ends a session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotFound`] if no such session is live.
    pub async fn end(&self, id: RealtimeSessionId) -> Result<(), SessionError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                tracing::info!(session_id = %id, "Realtime session ended");
                Ok(())
            }
            None => Err(SessionError::NotFound { id }),
        }
    }

    /// Lists live sessions, oldest first.
    pub async fn list(&self) -> Vec<Session> {
        let now = Utc::now();
        let mut sessions: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| !s.is_expired(self.limits.timeout, now))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }

    /// Number of sessions currently held, expired or not.
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every expired session and returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now()).await
    }

    async fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let timeout = self.limits.timeout;
        sessions.retain(|_, s| !s.is_expired(timeout, now));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "Expired realtime sessions dropped");
        }
        removed
    }

    /// Handles an inbound message for a session.
    ///
    /// `tool_call` messages run the named tool and reply with a
    /// `tool_response`; a failing tool only fails its own result. Every other
    /// message is acknowledged as `message_received`.
    ///
    /// # Errors
    ///
    /// Fails only if the session is unknown or expired.
    pub async fn handle_message(
        &self,
        id: RealtimeSessionId,
        message: JsonValue,
    ) -> Result<MessageReply, SessionError> {
        self.touch(id, Utc::now()).await?;

        let Some(call) = ToolCall::from_message(&message) else {
            return Ok(MessageReply::MessageReceived {
                session_id: id,
                message,
            });
        };

        let result = match self.dispatcher.dispatch(&call).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Tool call rejected");
                ToolResult::failure(e.to_string())
            }
        };
        Ok(MessageReply::ToolResponse {
            call_id: call.id,
            tool_name: call.name,
            result,
        })
    }

    async fn touch(&self, id: RealtimeSessionId, now: DateTime<Utc>) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(&id) else {
            return Err(SessionError::NotFound { id });
        };
        if session.is_expired(self.limits.timeout, now) {
            sessions.remove(&id);
            return Err(SessionError::Expired { id });
        }
        session.last_active_at = now;
        session.message_count += 1;
        Ok(())
    }
}
