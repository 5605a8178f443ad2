// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP mapping for [`TollgateError`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tollgate_core::TollgateError;

use crate::handlers::ErrorResponse;

/// A `TollgateError` on its way out of a handler or middleware.
#[derive(Debug)]
pub struct ApiError(pub TollgateError);

impl From<TollgateError> for ApiError {
    fn from(error: TollgateError) -> Self {
        Self(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TollgateError::Unauthorized => StatusCode::UNAUTHORIZED,
            TollgateError::InputRejected { .. } | TollgateError::Config(_) => {
                StatusCode::BAD_REQUEST
            }
            TollgateError::BudgetExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            TollgateError::SafetyBlocked { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            TollgateError::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            TollgateError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            TollgateError::Storage { .. } | TollgateError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
