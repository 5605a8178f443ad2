// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as threshold ranges, non-empty names and unique provider names.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{BudgetStoreKind, TollgateConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
///
/// Provider credentials and endpoints are not checked here: a provider that
/// fails to build is skipped at startup without taking the others down.
pub fn validate_config(config: &TollgateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let router = &config.router;
    check_unit_range(&mut errors, "router.conf_threshold", router.conf_threshold);
    check_unit_range(&mut errors, "router.support_threshold", router.support_threshold);
    if router.provider_timeout_ms == 0 {
        errors.push(invalid("router.provider_timeout_ms must be greater than 0"));
    }
    if router.max_cot_tokens == 0 {
        errors.push(invalid("router.max_cot_tokens must be greater than 0"));
    }
    if router.complexity_length_threshold == 0 {
        errors.push(invalid(
            "router.complexity_length_threshold must be greater than 0",
        ));
    }

    let budget = &config.budget;
    check_non_negative_usd(&mut errors, "budget.max_usd_per_day", budget.max_usd_per_day);
    for (tenant, limits) in &budget.tenants {
        if tenant.trim().is_empty() {
            errors.push(invalid("budget.tenants keys must not be empty"));
        }
        check_non_negative_usd(
            &mut errors,
            &format!("budget.tenants.{tenant}.max_usd_per_day"),
            limits.max_usd_per_day,
        );
    }
    if budget.store == BudgetStoreKind::Sqlite && budget.database_path.trim().is_empty() {
        errors.push(invalid(
            "budget.database_path must not be empty when budget.store = \"sqlite\"",
        ));
    }

    let health = &config.health;
    if health.window_size == 0 {
        errors.push(invalid("health.window_size must be greater than 0"));
    }
    if health.min_calls == 0 || health.min_calls > health.window_size {
        errors.push(invalid(format!(
            "health.min_calls must be between 1 and health.window_size ({}), got {}",
            health.window_size, health.min_calls
        )));
    }
    check_unit_range(
        &mut errors,
        "health.degraded_failure_rate",
        health.degraded_failure_rate,
    );
    check_unit_range(
        &mut errors,
        "health.unhealthy_failure_rate",
        health.unhealthy_failure_rate,
    );
    if health.degraded_failure_rate > health.unhealthy_failure_rate {
        errors.push(invalid(
            "health.degraded_failure_rate must not exceed health.unhealthy_failure_rate",
        ));
    }
    if health.consecutive_failure_cap == 0 {
        errors.push(invalid("health.consecutive_failure_cap must be greater than 0"));
    }
    if health.probe_interval_ms == 0 {
        errors.push(invalid("health.probe_interval_ms must be greater than 0"));
    }

    let guard = &config.guard;
    if guard.toxicity_soft_threshold.is_nan() || guard.toxicity_soft_threshold <= 0.0 {
        errors.push(invalid(format!(
            "guard.toxicity_soft_threshold must be positive, got {}",
            guard.toxicity_soft_threshold
        )));
    }
    if guard.toxicity_soft_threshold > guard.toxicity_hard_threshold {
        errors.push(invalid(
            "guard.toxicity_soft_threshold must not exceed guard.toxicity_hard_threshold",
        ));
    }

    if config.gateway.host.trim().is_empty() {
        errors.push(invalid("gateway.host must not be empty"));
    }
    if let Some(token) = &config.gateway.admin_token
        && token.trim().is_empty()
    {
        errors.push(invalid(
            "gateway.admin_token must not be empty; remove it to disable admin access",
        ));
    }

    let mut seen_names = HashSet::new();
    for (i, provider) in config.providers.iter().enumerate() {
        if provider.name.trim().is_empty() {
            errors.push(invalid(format!("providers[{i}].name must not be empty")));
            continue;
        }
        if !seen_names.insert(provider.name.as_str()) {
            errors.push(invalid(format!(
                "duplicate provider name `{}` in [[providers]] array",
                provider.name
            )));
        }
        if provider.usd_per_1k_prompt < 0.0 || provider.usd_per_1k_completion < 0.0 {
            errors.push(invalid(format!(
                "providers[{i}] `{}` prices must be non-negative",
                provider.name
            )));
        }
        if provider.max_tokens == 0 {
            errors.push(invalid(format!(
                "providers[{i}] `{}` max_tokens must be greater than 0",
                provider.name
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

fn check_unit_range(errors: &mut Vec<ConfigError>, key: &str, value: f32) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(invalid(format!("{key} must be within [0, 1], got {value}")));
    }
}

fn check_non_negative_usd(errors: &mut Vec<ConfigError>, key: &str, value: Option<f64>) {
    if let Some(usd) = value
        && (usd.is_nan() || usd < 0.0)
    {
        errors.push(invalid(format!("{key} must be non-negative, got {usd}")));
    }
}
