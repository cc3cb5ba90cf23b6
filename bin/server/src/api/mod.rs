//! HTTP routes.

pub mod rate_limit;
pub mod realtime;
pub mod relay;
pub mod voice;

use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use chrono::Utc;
use insight_relay_integration::ApiService;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/verify-data", post(relay::verify_data))
        .route("/dashboard/data", post(relay::dashboard_data))
        .route("/deals/all", post(relay::all_deals))
        .route("/voice/process", post(voice::process))
        .route(
            "/realtime/sessions",
            post(realtime::create).get(realtime::list),
        )
        .route(
            "/realtime/sessions/{id}",
            get(realtime::get).delete(realtime::end),
        )
        .route("/realtime/sessions/{id}/messages", post(realtime::message))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /health`
async fn health() -> Json<JsonValue> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
    }))
}

/// `GET /status`: what is registered and what is missing.
async fn status(State(state): State<Arc<AppState>>) -> Json<JsonValue> {
    let triggers = state.registry.list();
    let sessions = state.sessions.list().await;
    let limits = state.sessions.limits();
    let missing: Vec<&str> = state
        .credentials
        .missing()
        .iter()
        .map(ApiService::env_var)
        .collect();

    Json(json!({
        "status": "running",
        "triggers": {
            "enabled": state.registry.is_enabled(),
            "relevance_judge": state.registry.has_judge(),
            "count": triggers.len(),
            "registered": triggers,
        },
        "realtime": {
            "active_sessions": sessions.len(),
            "max_sessions": limits.max_sessions,
            "session_timeout_secs": limits.timeout.num_seconds(),
            "session_ids": sessions.iter().map(|s| s.id.to_string()).collect::<Vec<_>>(),
        },
        "features": {
            "rate_limiting": state.features.rate_limiting_enabled,
            "relevance_judge": state.features.relevance_judge_enabled,
            "cache_ttl": state.features.cache_ttl,
        },
        "missing_api_keys": missing,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::demo::DemoRelay;
    use crate::state::Services;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use insight_relay_ai::{LlmBackend, LlmError, LlmProvider, LlmRequest, LlmResponse};
    use insight_relay_integration::{
        ConnectorError, ContactSummary, CrmSource, Deal, DealProperties, DocumentSource,
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[derive(Default)]
    struct FakeCrm {
        deals: Vec<Deal>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CrmSource for FakeCrm {
        async fn fetch_deals(&self) -> Result<Vec<Deal>, ConnectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.deals.clone())
        }

        async fn fetch_contacts(&self) -> Result<Vec<ContactSummary>, ConnectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![ContactSummary {
                id: "1".to_string(),
                nome: Some("Ana Souza".to_string()),
                segmento_da_empresa: Some("Tecnologia".to_string()),
                numemployees: Some("50".to_string()),
            }])
        }
    }

    struct FakeDocs;

    #[async_trait]
    impl DocumentSource for FakeDocs {
        async fn page_text(&self, _page_id: &str) -> Result<String, ConnectorError> {
            Ok("Produto X\n\nAnálise de vendas por voz".to_string())
        }
    }

    struct FakeLlm {
        reply: String,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl FakeLlm {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmBackend for FakeLlm {
        async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(LlmResponse::text(self.reply.clone(), "fake-model"))
        }

        fn provider(&self) -> LlmProvider {
            LlmProvider::OpenAiCompatible
        }

        fn model(&self) -> &str {
            "fake-model"
        }
    }

    fn deal(name: &str, stage: &str, amount: &str) -> Deal {
        Deal {
            id: name.to_string(),
            properties: DealProperties {
                dealname: Some(name.to_string()),
                amount: Some(amount.to_string()),
                dealstage: Some(stage.to_string()),
                closedate: None,
            },
        }
    }

    fn config(overrides: &[(&str, &str)]) -> ServerConfig {
        let mut builder = config::Config::builder();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap().try_deserialize().unwrap()
    }

    const ALL_KEYS: [(&str, &str); 3] = [
        ("hubspot_api_key", "pat-test"),
        ("notion_api_key", "secret-test"),
        ("openai_api_key", "sk-test"),
    ];

    struct Harness {
        router: Router,
        crm: Arc<FakeCrm>,
        llm: Arc<FakeLlm>,
    }

    fn harness(overrides: &[(&str, &str)], crm: FakeCrm, llm_reply: &str) -> Harness {
        let crm = Arc::new(crm);
        let llm = Arc::new(FakeLlm::new(llm_reply));
        let services = Services {
            crm: crm.clone(),
            documents: Arc::new(FakeDocs),
            llm: llm.clone(),
            relay: Arc::new(DemoRelay),
        };
        let state = AppState::new(&config(overrides), services).unwrap();
        Harness {
            router: router(Arc::new(state)),
            crm,
            llm,
        }
    }

    fn post_json(uri: &str, body: JsonValue) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, JsonValue) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let h = harness(&[], FakeCrm::default(), "");
        let (status, body) = send(&h.router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn verify_data_without_openai_key_fails_before_any_call() {
        let h = harness(
            &[("hubspot_api_key", "pat-test")],
            FakeCrm {
                deals: vec![deal("Acme", "closedwon", "1000")],
                ..FakeCrm::default()
            },
            "unused",
        );

        let (status, body) = send(
            &h.router,
            post_json(
                "/verify-data",
                json!({"context": "Vendas", "prompt": "Quantos deals fechamos?"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("OPENAI_API_KEY"));
        assert!(!error.contains("HUBSPOT_API_KEY"));
        assert_eq!(h.crm.calls.load(Ordering::SeqCst), 0);
        assert!(h.llm.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn verify_data_corrects_cited_figure_from_crm_deals() {
        let h = harness(
            &ALL_KEYS,
            FakeCrm {
                deals: vec![
                    deal("Acme", "closedwon", "1000"),
                    deal("Beta", "closedwon", "2000"),
                    deal("Gamma", "appointmentscheduled", "500"),
                ],
                ..FakeCrm::default()
            },
            "Na verdade, empresas de tecnologia representam 33% do faturamento.",
        );
        let utterance =
            "creio que empresas de tecnologia representam muito pouco do nosso faturamento";

        let (status, body) = send(
            &h.router,
            post_json(
                "/verify-data",
                json!({"context": "Análise de dados de vendas", "prompt": utterance}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["response"].as_str().unwrap().contains("33%"));

        let requests = h.llm.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let prompt = &requests[0].prompt;
        assert!(prompt.contains("- Acme | closedwon | R$ 1000"));
        assert!(prompt.contains("- Gamma | appointmentscheduled | R$ 500"));
        assert!(prompt.contains(utterance));
        assert!(requests[0].system.is_some());
    }

    #[tokio::test]
    async fn dashboard_returns_contacts_and_page_text() {
        let h = harness(&ALL_KEYS, FakeCrm::default(), "Foque em Tecnologia.");

        let (status, body) = send(
            &h.router,
            post_json(
                "/dashboard/data",
                json!({"context": "Análise de mercado", "prompt": "Quais segmentos?"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["llm_response"], "Foque em Tecnologia.");
        assert_eq!(body["hubspot_contacts"][0]["nome"], "Ana Souza");
        assert!(
            body["notion_page_text"]
                .as_str()
                .unwrap()
                .starts_with("Produto X")
        );
        let requests = h.llm.requests.lock().unwrap();
        assert_eq!(requests[0].prompt, "Quais segmentos?");
    }

    #[tokio::test]
    async fn deals_all_echoes_prompt() {
        let h = harness(
            &[("hubspot_api_key", "pat-test")],
            FakeCrm {
                deals: vec![deal("Acme", "closedwon", "1000")],
                ..FakeCrm::default()
            },
            "",
        );
        let (status, body) = send(
            &h.router,
            post_json("/deals/all", json!({"prompt": "todos"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prompt_received"], "todos");
        assert_eq!(body["all_deals"][0]["properties"]["dealname"], "Acme");
    }

    #[tokio::test]
    async fn voice_process_fires_matching_trigger() {
        let h = harness(&ALL_KEYS, FakeCrm::default(), "");

        let (status, body) = send(
            &h.router,
            post_json("/voice/process", json!({"text": "Quero uma análise de mercado"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "fired");
        assert_eq!(body["trigger"], "product_market_fit");

        let (_, body) = send(
            &h.router,
            post_json("/voice/process", json!({"text": "Bom dia"})),
        )
        .await;
        assert_eq!(body["outcome"], "no_match");

        let (status, _) = send(
            &h.router,
            post_json("/voice/process", json!({"text": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn realtime_session_lifecycle() {
        let h = harness(&ALL_KEYS, FakeCrm::default(), "");

        let response = h
            .router
            .clone()
            .oneshot(
                Request::post("/realtime/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let session: JsonValue = serde_json::from_slice(&bytes).unwrap();
        let id = session["id"].as_str().unwrap().to_string();
        assert_eq!(session["tools"].as_array().unwrap().len(), 6);

        let (status, body) = send(&h.router, get("/realtime/sessions")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"], 1);

        let (status, body) = send(
            &h.router,
            post_json(
                &format!("/realtime/sessions/{id}/messages"),
                json!({
                    "type": "tool_call",
                    "tool_name": "get_contact_segments",
                    "arguments": {},
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "tool_response");
        assert_eq!(body["result"]["success"], true);

        let (_, body) = send(
            &h.router,
            post_json(
                &format!("/realtime/sessions/{id}/messages"),
                json!({"type": "transcript", "text": "olá"}),
            ),
        )
        .await;
        assert_eq!(body["type"], "message_received");

        let response = h
            .router
            .clone()
            .oneshot(
                Request::delete(format!("/realtime/sessions/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let (status, _) = send(&h.router, get(&format!("/realtime/sessions/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&h.router, get("/realtime/sessions/not-an-id")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn session_limit_returns_service_unavailable() {
        let h = harness(&[("realtime_max_sessions", "1")], FakeCrm::default(), "");
        let create = || {
            Request::post("/realtime/sessions")
                .body(Body::empty())
                .unwrap()
        };

        let (status, _) = send(&h.router, create()).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = send(&h.router, create()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn status_lists_triggers_and_missing_keys() {
        let h = harness(&[("openai_api_key", "sk-test")], FakeCrm::default(), "");
        let (status, body) = send(&h.router, get("/status")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["triggers"]["count"], 2);
        assert_eq!(body["triggers"]["registered"][0]["name"], "verify_data");
        assert_eq!(body["realtime"]["active_sessions"], 0);
        assert_eq!(
            body["missing_api_keys"],
            json!(["HUBSPOT_API_KEY", "NOTION_API_KEY"])
        );
    }

    #[tokio::test]
    async fn rate_limit_is_per_client_and_skips_health() {
        let h = harness(&[("max_requests_per_minute", "2")], FakeCrm::default(), "");
        let from = |ip: &str| {
            Request::get("/status")
                .header("x-forwarded-for", ip)
                .body(Body::empty())
                .unwrap()
        };

        assert_eq!(send(&h.router, from("10.0.0.1")).await.0, StatusCode::OK);
        assert_eq!(send(&h.router, from("10.0.0.1")).await.0, StatusCode::OK);

        let response = h.router.clone().oneshot(from("10.0.0.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));

        assert_eq!(send(&h.router, from("10.0.0.2")).await.0, StatusCode::OK);
        for _ in 0..3 {
            assert_eq!(send(&h.router, get("/health")).await.0, StatusCode::OK);
        }
    }
}
