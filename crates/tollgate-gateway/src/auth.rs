// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-token middleware for the `/admin` prefix.
//!
//! Applied once to the whole admin router. When no token is configured every
//! admin request is rejected (fail-closed).

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tollgate_core::TollgateError;

use crate::error::ApiError;

/// Authentication configuration for admin endpoints.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Expected bearer token. `None` disables every admin endpoint.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl AuthConfig {
    /// Whether the `Authorization` header value carries the expected token.
    fn accepts(&self, header_value: Option<&str>) -> bool {
        let Some(expected) = self.bearer_token.as_deref().filter(|t| !t.is_empty()) else {
            return false;
        };
        header_value
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Reject requests without a valid bearer token with `401 {"error":"unauthorized"}`.
pub async fn admin_auth(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Response {
    if auth.bearer_token.is_none() {
        tracing::warn!(path = %request.uri().path(), "admin token not configured -- rejecting request");
        return unauthorized();
    }

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if auth.accepts(header_value) {
        return next.run(request).await;
    }

    tracing::debug!(path = %request.uri().path(), "admin request rejected");
    unauthorized()
}

fn unauthorized() -> Response {
    ApiError::from(TollgateError::Unauthorized).into_response()
}
