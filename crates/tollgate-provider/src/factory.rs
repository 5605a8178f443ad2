// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builds provider adapters from `[[providers]]` configuration.

use std::sync::Arc;

use tollgate_config::model::ProviderConfig;
use tollgate_core::{ProviderAdapter, ProviderKind, ProviderTier, TollgateError};
use tracing::{error, info, warn};

use crate::local::LocalProvider;
use crate::remote::RemoteProvider;
use crate::stub::StubProvider;

/// Completion cap for the automatically added local provider.
const DEFAULT_LOCAL_MAX_TOKENS: u32 = 1024;

/// A constructed provider plus the routing metadata the router needs.
#[derive(Clone)]
pub struct ProviderEntry {
    pub adapter: Arc<dyn ProviderAdapter>,
    /// Lower values are tried first within a tier.
    pub priority: u32,
    /// Completion token cap passed with every request.
    pub max_tokens: u32,
}

impl std::fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("name", &self.adapter.name())
            .field("tier", &self.adapter.tier())
            .field("kind", &self.adapter.kind())
            .field("priority", &self.priority)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Construct one adapter.
pub fn build_provider(config: &ProviderConfig) -> Result<ProviderEntry, TollgateError> {
    let adapter: Arc<dyn ProviderAdapter> = match config.kind {
        ProviderKind::Remote => {
            if config.tier == ProviderTier::Local {
                return Err(TollgateError::Config(format!(
                    "provider {}: remote providers must use the fast or reasoning tier",
                    config.name
                )));
            }
            Arc::new(RemoteProvider::new(config)?)
        }
        ProviderKind::Local => {
            if config.tier != ProviderTier::Local {
                warn!(provider = %config.name, tier = %config.tier, "local provider always serves the local tier");
            }
            Arc::new(LocalProvider::new(config.name.clone()))
        }
        ProviderKind::Stub => Arc::new(StubProvider::new(config)),
    };
    Ok(ProviderEntry {
        adapter,
        priority: config.priority,
        max_tokens: config.max_tokens,
    })
}

/// Construct every configured provider.
///
/// A provider that fails to build is logged and skipped; the rest still run.
/// If no local-tier provider results, a default [`LocalProvider`] is appended
/// so the fallback path always exists.
pub fn build_providers(configs: &[ProviderConfig]) -> Vec<ProviderEntry> {
    let mut entries = Vec::with_capacity(configs.len() + 1);
    for config in configs {
        match build_provider(config) {
            Ok(entry) => {
                info!(
                    provider = %config.name,
                    kind = %config.kind,
                    tier = %entry.adapter.tier(),
                    priority = entry.priority,
                    "provider initialized"
                );
                entries.push(entry);
            }
            Err(e) => {
                error!(provider = %config.name, error = %e, "failed to initialize provider, skipping");
            }
        }
    }

    if !entries
        .iter()
        .any(|e| e.adapter.tier() == ProviderTier::Local)
    {
        let name = unique_local_name(&entries);
        info!(provider = %name, "no local provider configured, adding default fallback");
        entries.push(ProviderEntry {
            adapter: Arc::new(LocalProvider::new(name)),
            priority: u32::MAX,
            max_tokens: DEFAULT_LOCAL_MAX_TOKENS,
        });
    }
    entries
}

fn unique_local_name(entries: &[ProviderEntry]) -> String {
    let taken = |name: &str| entries.iter().any(|e| e.adapter.name() == name);
    let mut name = crate::local::DEFAULT_LOCAL_NAME.to_string();
    let mut n = 2;
    while taken(&name) {
        name = format!("{}-{n}", crate::local::DEFAULT_LOCAL_NAME);
        n += 1;
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, kind: ProviderKind, tier: ProviderTier) -> ProviderConfig {
        ProviderConfig {
            name: name.into(),
            kind,
            tier,
            priority: 10,
            endpoint: Some("https://api.example.com/v1".into()),
            model: Some("m".into()),
            max_tokens: 512,
            api_key: Some("k".into()),
            api_key_env: None,
            usd_per_1k_prompt: 0.0,
            usd_per_1k_completion: 0.0,
            canned_response: None,
        }
    }

    #[test]
    fn builds_each_kind() {
        let entries = build_providers(&[
            config("fast-a", ProviderKind::Remote, ProviderTier::Fast),
            config("dev", ProviderKind::Stub, ProviderTier::Reasoning),
            config("offline", ProviderKind::Local, ProviderTier::Local),
        ]);
        let names: Vec<_> = entries.iter().map(|e| e.adapter.name()).collect();
        assert_eq!(names, vec!["fast-a", "dev", "offline"]);
        assert_eq!(entries[0].adapter.kind(), ProviderKind::Remote);
        assert_eq!(entries[1].adapter.tier(), ProviderTier::Reasoning);
        assert_eq!(entries[0].priority, 10);
        assert_eq!(entries[0].max_tokens, 512);
    }

    #[test]
    fn broken_provider_is_skipped_and_local_added() {
        let mut broken = config("broken", ProviderKind::Remote, ProviderTier::Fast);
        broken.api_key = None;
        let entries = build_providers(&[
            broken,
            config("fast-a", ProviderKind::Remote, ProviderTier::Fast),
        ]);
        let names: Vec<_> = entries.iter().map(|e| e.adapter.name()).collect();
        assert_eq!(names, vec!["fast-a", "local"]);
        assert_eq!(entries[1].adapter.tier(), ProviderTier::Local);
    }

    #[test]
    fn empty_config_still_has_a_fallback() {
        let entries = build_providers(&[]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].adapter.kind(), ProviderKind::Local);
    }

    #[test]
    fn default_local_name_avoids_collisions() {
        let entries = build_providers(&[config("local", ProviderKind::Stub, ProviderTier::Fast)]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].adapter.name(), "local-2");
    }

    #[test]
    fn remote_on_local_tier_is_rejected() {
        let err = build_provider(&config("r", ProviderKind::Remote, ProviderTier::Local)).unwrap_err();
        assert!(matches!(err, TollgateError::Config(_)));
    }
}
