// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tollgate.toml` > `~/.config/tollgate/tollgate.toml` >
//! `/etc/tollgate/tollgate.toml` with environment variable overrides via the
//! `TOLLGATE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TollgateConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/tollgate/tollgate.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "tollgate.toml";

/// Sections that accept flat `TOLLGATE_<SECTION>_<KEY>` overrides.
const ENV_SECTIONS: &[&str] = &["router", "budget", "health", "guard", "gateway", "telemetry"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tollgate/tollgate.toml` (system-wide)
/// 3. `~/.config/tollgate/tollgate.toml` (user XDG config)
/// 4. `./tollgate.toml` (local directory)
/// 5. `TOLLGATE_*` environment variables
pub fn load_config() -> Result<TollgateConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
///
/// Used for testing and embedded configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TollgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TollgateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TollgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TollgateConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TollgateConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

pub(crate) fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("tollgate/tollgate.toml"))
}

/// Create the environment variable provider.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `TOLLGATE_ROUTER_CONF_THRESHOLD` must map to
/// `router.conf_threshold`, not `router.conf.threshold`.
fn env_provider() -> Env {
    Env::prefixed("TOLLGATE_").map(|key| env_key_to_path(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env key to a dotted config path.
///
/// Only the leading section name is split off. Keys outside the known
/// sections pass through unchanged and are rejected by `deny_unknown_fields`.
pub(crate) fn env_key_to_path(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_only_at_section() {
        assert_eq!(env_key_to_path("router_conf_threshold"), "router.conf_threshold");
        assert_eq!(
            env_key_to_path("budget_max_tokens_per_day"),
            "budget.max_tokens_per_day"
        );
        assert_eq!(env_key_to_path("gateway_admin_token"), "gateway.admin_token");
        assert_eq!(
            env_key_to_path("router_provider_timeout_ms"),
            "router.provider_timeout_ms"
        );
    }

    #[test]
    fn unknown_env_sections_pass_through() {
        assert_eq!(env_key_to_path("something_else"), "something_else");
        assert_eq!(env_key_to_path("routerx_y"), "routerx_y");
    }
}
