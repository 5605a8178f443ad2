// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Handles POST /chat, GET /providers, the public /health and /metrics
//! endpoints, and the /admin operations.

use std::collections::BTreeMap;

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use tollgate_core::{GroundingContext, HealthStatus, Request, ResetScope, TenantId, TollgateError};
use tollgate_cost::BudgetSettings;
use tollgate_router::ThresholdUpdate;

use crate::error::ApiError;
use crate::server::GatewayState;

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// User query text.
    pub query: String,
    /// Tenant the request is billed to. Defaults to `default`.
    #[serde(default)]
    pub tenant: Option<String>,
    /// Grounding passages retrieved upstream.
    #[serde(default)]
    pub context: Option<Vec<String>>,
    /// Check factual claims in the answer against `context`.
    #[serde(default)]
    pub require_grounding: bool,
}

/// Response body for POST /chat.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub request_id: String,
    pub answer: String,
    pub provider: String,
    pub confidence: f32,
    pub escalated: bool,
    pub blocked: bool,
    pub attempt_chain: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Vec<String>>,
}

/// Per-provider entry in GET /providers.
#[derive(Debug, Serialize)]
pub struct ProviderStatus {
    pub status: HealthStatus,
    /// Rolling average latency of successful calls.
    pub latency_ms: Option<u64>,
}

/// Response body for GET /providers.
#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    pub providers: BTreeMap<String, ProviderStatus>,
    /// True when at least one remote provider is selectable.
    pub router_active: bool,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status string.
    pub status: String,
    /// Binary version.
    pub version: String,
    /// Seconds since the gateway started.
    pub uptime_secs: u64,
}

/// Request body for POST /admin/budget/reset.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetRequest {
    /// Tenant to reset. Omitted resets every tenant.
    #[serde(default)]
    pub tenant: Option<String>,
}

/// Response body for POST /admin/budget/reset.
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    /// Tenant that was reset, or `all`.
    pub reset: String,
    pub effective: BudgetSettings,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

fn rejected(reason: impl Into<String>) -> Response {
    ApiError::from(TollgateError::InputRejected {
        reason: reason.into(),
    })
    .into_response()
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// POST /chat
///
/// Routes one query through the router. Safety blocks, budget fallbacks and
/// apologies are all `200`; only malformed bodies are rejected.
pub async fn post_chat(
    State(state): State<GatewayState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "rejected chat body");
            return rejected(rejection.body_text());
        }
    };
    if body.query.trim().is_empty() {
        return rejected("query must not be empty");
    }

    let tenant = body
        .tenant
        .filter(|t| !t.trim().is_empty())
        .map(TenantId)
        .unwrap_or_default();
    let mut request = Request::new(tenant, body.query);
    if let Some(passages) = body.context.clone() {
        request = request.with_grounding(GroundingContext {
            passages,
            required: body.require_grounding,
        });
    }

    let outcome = state.router.handle(request).await;
    let response = ChatResponse {
        request_id: outcome.request_id,
        answer: outcome.answer,
        provider: outcome.decision.provider_name,
        confidence: outcome.confidence.value(),
        escalated: outcome.decision.escalated,
        blocked: outcome.blocked,
        attempt_chain: outcome.decision.attempt_chain,
        context: body.context,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// GET /providers
pub async fn get_providers(State(state): State<GatewayState>) -> Json<ProvidersResponse> {
    let health = state.router.health();
    let providers = state
        .router
        .providers()
        .iter()
        .map(|entry| {
            let name = entry.adapter.name().to_string();
            let status = ProviderStatus {
                status: health.status(&name),
                latency_ms: health.avg_latency_ms(&name).map(|ms| ms.round() as u64),
            };
            (name, status)
        })
        .collect();
    Json(ProvidersResponse {
        providers,
        router_active: state.router.router_active(),
    })
}

/// GET /health (unauthenticated)
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

/// GET /metrics (unauthenticated)
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "metrics exporter disabled"),
    }
}

/// POST /admin/budget/reset
///
/// An empty body resets every tenant.
pub async fn post_budget_reset(State(state): State<GatewayState>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ResetRequest::default()
    } else {
        match serde_json::from_slice::<ResetRequest>(&body) {
            Ok(request) => request,
            Err(e) => return rejected(format!("invalid body: {e}")),
        }
    };

    let (scope, label) = match request.tenant.filter(|t| !t.trim().is_empty()) {
        Some(tenant) => (ResetScope::Tenant(TenantId(tenant.clone())), tenant),
        None => (ResetScope::All, "all".to_string()),
    };

    let budget = state.router.budget();
    if let Err(e) = budget.reset(&scope).await {
        return ApiError::from(e).into_response();
    }

    (
        StatusCode::OK,
        Json(ResetResponse {
            reset: label,
            effective: budget.settings(),
        }),
    )
        .into_response()
}

/// POST /admin/router/set-thresholds
///
/// Invalid values leave the current thresholds in place.
pub async fn post_set_thresholds(
    State(state): State<GatewayState>,
    payload: Result<Json<ThresholdUpdate>, JsonRejection>,
) -> Response {
    let update = match payload {
        Ok(Json(update)) => update,
        Err(rejection) => return rejected(rejection.body_text()),
    };
    match state.router.thresholds().update(&update) {
        Ok(effective) => (StatusCode::OK, Json(effective)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
