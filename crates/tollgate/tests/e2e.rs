// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: TOML config through provider construction, the SQLite
//! budget store, the router and the HTTP gateway.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request as HttpRequest, StatusCode, header};
use serde_json::{Value, json};
use tollgate::Services;
use tollgate_config::load_and_validate_str;
use tollgate_core::{BudgetStatus, HealthStatus, Request, TenantId};
use tollgate_gateway::{AuthConfig, GatewayState, HealthState, build_app};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GREETING: &str = "Hello! How can I help you today?";

fn stub_config(db_path: &str, extra: &str) -> String {
    format!(
        r#"
[[providers]]
name = "fast-stub"
kind = "stub"
tier = "fast"
canned_response = "{GREETING}"

[[providers]]
name = "deep-stub"
kind = "stub"
tier = "reasoning"
canned_response = "Therefore the claim holds for every n."

[budget]
store = "sqlite"
database_path = "{db_path}"
{extra}
"#
    )
}

fn remote_config(uri: &str) -> String {
    format!(
        r#"
[[providers]]
name = "fast-remote"
kind = "remote"
tier = "fast"
endpoint = "{uri}/v1"
model = "small"
api_key = "test-key"

[health]
cooldown_ms = 0
"#
    )
}

async fn chat(app: axum::Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            HttpRequest::builder()
                .method("POST")
                .uri("/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1_000_000)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn gateway(services: &Services) -> axum::Router {
    build_app(
        GatewayState {
            router: Arc::clone(&services.router),
            auth: AuthConfig::default(),
            health: HealthState::new(None),
        },
        &[],
    )
}

#[tokio::test]
async fn stub_providers_answer_and_budget_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("budget.db");
    let config = load_and_validate_str(&stub_config(db.to_str().unwrap(), "")).unwrap();

    let used = {
        let services = Services::build(&config).await.unwrap();
        assert_eq!(services.provider_names(), vec!["fast-stub", "deep-stub", "local"]);

        let outcome = services
            .router
            .handle(Request::new(TenantId::from("acme"), "Hello"))
            .await;
        assert_eq!(outcome.answer, GREETING);
        assert_eq!(outcome.decision.provider_name, "fast-stub");

        let state = services.budget.state(&TenantId::from("acme")).await.unwrap();
        assert!(state.tokens_used > 0);
        assert_eq!(state.tokens_used, outcome.usage.total());
        state.tokens_used
    };

    let restarted = Services::build(&config).await.unwrap();
    let state = restarted.budget.state(&TenantId::from("acme")).await.unwrap();
    assert_eq!(state.tokens_used, used);
}

#[tokio::test]
async fn proof_routes_to_reasoning_stub() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("budget.db");
    let config = load_and_validate_str(&stub_config(db.to_str().unwrap(), "")).unwrap();
    let services = Services::build(&config).await.unwrap();

    let (status, json) = chat(
        gateway(&services),
        json!({"query": "Prove that there are infinitely many primes"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["provider"], "deep-stub");
}

#[tokio::test]
async fn exhausted_tenant_is_served_locally() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("budget.db");
    let config = load_and_validate_str(&stub_config(
        db.to_str().unwrap(),
        "max_tokens_per_day = 5\nenforcement = \"hard\"",
    ))
    .unwrap();
    let services = Services::build(&config).await.unwrap();
    let tenant = TenantId::from("acme");

    let first = services.router.handle(Request::new(tenant.clone(), "Hello")).await;
    assert_eq!(first.decision.provider_name, "fast-stub");

    let second = services.router.handle(Request::new(tenant.clone(), "Hello")).await;
    assert_eq!(second.decision.provider_name, "local");
    assert_eq!(second.budget_status, BudgetStatus::HardExceeded);

    let other = services
        .router
        .handle(Request::new(TenantId::from("globex"), "Hello"))
        .await;
    assert_eq!(other.decision.provider_name, "fast-stub");
}

#[tokio::test]
async fn remote_backend_serves_chat_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": GREETING}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 9}
        })))
        .mount(&server)
        .await;

    let config = load_and_validate_str(&remote_config(&server.uri())).unwrap();
    let services = Services::build(&config).await.unwrap();

    let (status, json) = chat(gateway(&services), json!({"query": "Hello", "tenant": "acme"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["answer"], GREETING);
    assert_eq!(json["provider"], "fast-remote");
    let state = services.budget.state(&TenantId::from("acme")).await.unwrap();
    assert_eq!(state.tokens_used, 12);
}

#[tokio::test]
async fn failing_backend_falls_back_and_recovers_via_probe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let config = load_and_validate_str(&remote_config(&server.uri())).unwrap();
    let services = Services::build(&config).await.unwrap();

    let (status, json) = chat(gateway(&services), json!({"query": "Hello"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["provider"], "local");
    assert_eq!(json["attempt_chain"], json!(["fast-remote", "local"]));

    services.health.force_unhealthy("fast-remote");
    assert!(!services.router.router_active());

    let prober = services.prober();
    assert_eq!(prober.probe_once().await, vec!["fast-remote"]);
    assert_eq!(services.health.status("fast-remote"), HealthStatus::HalfOpen);
    prober.probe_once().await;
    assert_eq!(services.health.status("fast-remote"), HealthStatus::Healthy);
    assert!(services.router.router_active());
}
