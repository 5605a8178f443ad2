// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tollgate serve` command implementation.
//!
//! Builds the router, starts the health prober and serves the HTTP gateway
//! until SIGINT or SIGTERM.

use std::sync::Arc;

use tollgate::Services;
use tollgate::shutdown;
use tollgate_config::TollgateConfig;
use tollgate_core::TollgateError;
use tollgate_gateway::{AuthConfig, GatewayState, HealthState, MetricsRender, ServerConfig, start_server};
use tracing::{info, warn};

/// Run the gateway until a shutdown signal arrives.
pub async fn run_serve(config: TollgateConfig) -> Result<(), TollgateError> {
    let metrics_render = install_metrics(&config);

    let services = Services::build(&config).await?;
    info!(providers = ?services.provider_names(), "providers registered");

    let cancel = shutdown::install_signal_handler();

    let prober = services.prober();
    let prober_cancel = cancel.clone();
    let prober_task = tokio::spawn(async move { prober.run(prober_cancel).await });

    if config.gateway.admin_token.is_none() {
        warn!("no admin token configured -- /admin endpoints will reject every request");
    }

    let state = GatewayState {
        router: Arc::clone(&services.router),
        auth: AuthConfig {
            bearer_token: config.gateway.admin_token.clone(),
        },
        health: HealthState::new(metrics_render),
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
        cors_origins: config.gateway.cors_origins.clone(),
    };

    let result = start_server(&server_config, state, cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = prober_task.await {
        warn!(error = %e, "health prober task ended abnormally");
    }

    info!("tollgate serve shutdown complete");
    result
}

#[cfg(feature = "prometheus")]
fn install_metrics(config: &TollgateConfig) -> Option<MetricsRender> {
    if !config.telemetry.prometheus {
        info!("prometheus exporter disabled");
        return None;
    }
    match tollgate_prometheus::PrometheusExporter::install() {
        Ok(exporter) => {
            info!("prometheus exporter installed");
            let handle = exporter.handle().clone();
            Some(Arc::new(move || handle.render()))
        }
        Err(e) => {
            warn!(error = %e, "prometheus exporter unavailable, /metrics disabled");
            None
        }
    }
}

#[cfg(not(feature = "prometheus"))]
fn install_metrics(_config: &TollgateConfig) -> Option<MetricsRender> {
    None
}
