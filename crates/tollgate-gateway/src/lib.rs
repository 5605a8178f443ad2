// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Tollgate router.
//!
//! `/chat` and `/providers` are open; everything under `/admin` sits behind a
//! single bearer-token middleware.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use server::{GatewayState, HealthState, MetricsRender, ServerConfig, build_app, start_server};
