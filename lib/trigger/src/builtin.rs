//! The triggers the voice layer ships with.

mod product_market_fit;
mod verify_data;

pub use product_market_fit::{ProductMarketFitAction, product_market_fit_trigger, prompts};
pub use verify_data::{VerifyDataAction, verify_data_trigger};

use crate::error::TriggerError;
use crate::formatter::TruncationPolicy;
use crate::judge::RelevanceJudge;
use crate::registry::{TriggerRegistry, TriggerRegistryBuilder};
use crate::trigger::VoiceSettings;
use insight_relay_integration::{ApiCredentials, RelayApi};
use rootcause::prelude::Report;
use std::sync::Arc;

/// Tunables shared by the built-in triggers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltinOptions {
    /// Voice for spoken replies. Market analysis slows it to 0.9.
    pub voice: VoiceSettings,
    /// How long verification replies are shortened.
    pub truncation: TruncationPolicy,
}

/// Registers the built-in triggers: data verification first, then
/// product-market-fit analysis. Both have priority 75, so verification wins
/// when an utterance matches both.
#[must_use]
pub fn register_builtin(
    builder: TriggerRegistryBuilder,
    relay: Arc<dyn RelayApi>,
    credentials: ApiCredentials,
    options: BuiltinOptions,
) -> TriggerRegistryBuilder {
    builder
        .register(verify_data_trigger(
            relay.clone(),
            credentials,
            options.voice.clone(),
            options.truncation,
        ))
        .register(product_market_fit_trigger(relay, options.voice))
}

/// Builds a registry holding only the built-in triggers.
///
/// # Errors
///
/// Fails only if the built-in definitions are invalid.
pub fn builtin_registry(
    relay: Arc<dyn RelayApi>,
    credentials: ApiCredentials,
    options: BuiltinOptions,
    judge: Option<Arc<dyn RelevanceJudge>>,
) -> Result<TriggerRegistry, Report<TriggerError>> {
    let mut builder = register_builtin(TriggerRegistry::builder(), relay, credentials, options);
    if let Some(judge) = judge {
        builder = builder.with_judge(judge);
    }
    builder.build()
}

/// Pulls a human-readable message out of an error body shaped like
/// `{"error": "..."}` or `{"detail": "..."}`, falling back to the raw body.
pub(crate) fn upstream_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("detail"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}


#[cfg(test)]
mod tests {
    use super::fakes::FakeRelay;
    use super::*;
    use crate::registry::DispatchOutcome;

    #[test]
    fn upstream_message_prefers_error_field() {
        assert_eq!(upstream_message(r#"{"error": "chave ausente"}"#), "chave ausente");
        assert_eq!(upstream_message(r#"{"detail": "boom"}"#), "boom");
        assert_eq!(upstream_message("Bad Gateway"), "Bad Gateway");
    }

    #[tokio::test]
    async fn verify_wins_over_market_fit_on_shared_priority() {
        let relay = Arc::new(FakeRelay::verify_ok("Tudo certo."));
        let creds = ApiCredentials::new(Some("pat".into()), None, Some("sk".into()));
        let registry = builtin_registry(relay.clone(), creds, BuiltinOptions::default(), None)
            .expect("builtin triggers are valid");

        let names: Vec<_> = registry.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["verify_data", "product_market_fit"]);

        // "sales data" belongs to verify_data, "market analysis" to product_market_fit.
        let result = registry
            .process_query("market analysis of our sales data please")
            .await;
        match result.outcome {
            DispatchOutcome::Fired { trigger, .. } => assert_eq!(trigger, "verify_data"),
            other => panic!("expected verify_data to fire, got {other:?}"),
        }
        assert_eq!(relay.requests().len(), 1);
        assert_eq!(relay.requests()[0].0, "verify");
    }
}
