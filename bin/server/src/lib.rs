//! The insight-relay HTTP service.
//!
//! Serves the relay endpoints (`/verify-data`, `/dashboard/data`), runs voice
//! utterances through the trigger registry and hosts realtime assistant
//! sessions.

pub mod api;
pub mod config;
pub mod demo;
pub mod error;
pub mod prompts;
pub mod state;

pub use api::router;
pub use config::ServerConfig;
pub use error::{ApiError, ServerError};
pub use state::{AppState, Services};
