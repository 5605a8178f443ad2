// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tollgate - a cost-aware, safety-gated LLM model router.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod route;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tollgate_config::TollgateConfig;

/// Tollgate - a cost-aware, safety-gated LLM model router.
#[derive(Parser, Debug)]
#[command(name = "tollgate", version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults to the standard search locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway.
    Serve,
    /// Route a single query and print the outcome as JSON.
    Route {
        /// Query text.
        query: String,
        /// Tenant to bill the request to.
        #[arg(long)]
        tenant: Option<String>,
    },
    /// Validate the configuration and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => tollgate_config::load_and_validate_path(path),
        None => tollgate_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            tollgate_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.telemetry.log_level);

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Route { query, tenant } => route::run_route(config, query, tenant).await,
        Commands::CheckConfig => {
            print_config_summary(&config);
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "tollgate exited with an error");
        eprintln!("tollgate: {e}");
        std::process::exit(1);
    }
}

fn print_config_summary(config: &TollgateConfig) {
    println!("tollgate: config OK");
    println!("  providers: {}", config.providers.len());
    for provider in &config.providers {
        println!(
            "    - {} ({}, {} tier, priority {})",
            provider.name, provider.kind, provider.tier, provider.priority
        );
    }
    println!(
        "  router: conf_threshold={} support_threshold={} max_cot_tokens={} retry_budget={}",
        config.router.conf_threshold,
        config.router.support_threshold,
        config.router.max_cot_tokens,
        config.router.retry_budget
    );
    println!(
        "  budget: enforcement={} tokens/day={} usd/day={}",
        config.budget.enforcement,
        config
            .budget
            .max_tokens_per_day
            .map_or_else(|| "unlimited".to_string(), |v| v.to_string()),
        config
            .budget
            .max_usd_per_day
            .map_or_else(|| "unlimited".to_string(), |v| format!("{v:.2}")),
    );
    println!("  gateway: {}:{}", config.gateway.host, config.gateway.port);
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so `tollgate route` keeps stdout for JSON.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tollgate={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
