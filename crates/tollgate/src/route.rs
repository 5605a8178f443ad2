// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tollgate route` command: route a single query and print the outcome.

use tollgate::Services;
use tollgate_config::TollgateConfig;
use tollgate_core::{Request, TenantId, TollgateError};

/// Route `query` once and print the full outcome as JSON on stdout.
pub async fn run_route(
    config: TollgateConfig,
    query: String,
    tenant: Option<String>,
) -> Result<(), TollgateError> {
    let services = Services::build(&config).await?;
    let tenant = tenant.map(TenantId).unwrap_or_default();

    let outcome = services.router.handle(Request::new(tenant, query)).await;
    let json = serde_json::to_string_pretty(&outcome)
        .map_err(|e| TollgateError::Internal(format!("failed to serialize outcome: {e}")))?;
    println!("{json}");
    Ok(())
}
