// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime-adjustable routing thresholds.
//!
//! Requests read a snapshot at the start of the pipeline; the admin surface
//! replaces the whole value atomically, so a request never sees a mix of old
//! and new values.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tollgate_config::model::RouterConfig;
use tollgate_core::TollgateError;
use tracing::info;

/// Thresholds that can change while the router runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouterThresholds {
    /// Confidence below this triggers one escalation hop.
    pub conf_threshold: f32,
    /// Minimum token overlap for a claim to count as supported.
    pub support_threshold: f32,
    /// Chain-of-thought budget passed to reasoning-tier providers.
    pub max_cot_tokens: u32,
}

impl RouterThresholds {
    /// Reject values outside their valid ranges.
    pub fn validate(&self) -> Result<(), TollgateError> {
        for (key, value) in [
            ("conf_threshold", self.conf_threshold),
            ("support_threshold", self.support_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(TollgateError::Config(format!(
                    "{key} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }
        if self.max_cot_tokens == 0 {
            return Err(TollgateError::Config(
                "max_cot_tokens must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl From<&RouterConfig> for RouterThresholds {
    fn from(config: &RouterConfig) -> Self {
        Self {
            conf_threshold: config.conf_threshold,
            support_threshold: config.support_threshold,
            max_cot_tokens: config.max_cot_tokens,
        }
    }
}

/// Partial update accepted by the admin surface. Unset fields keep their value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdUpdate {
    #[serde(default)]
    pub conf_threshold: Option<f32>,
    #[serde(default)]
    pub support_threshold: Option<f32>,
    #[serde(default)]
    pub max_cot_tokens: Option<u32>,
}

impl ThresholdUpdate {
    /// The thresholds that result from applying this update to `current`.
    pub fn apply(&self, current: &RouterThresholds) -> Result<RouterThresholds, TollgateError> {
        let next = RouterThresholds {
            conf_threshold: self.conf_threshold.unwrap_or(current.conf_threshold),
            support_threshold: self.support_threshold.unwrap_or(current.support_threshold),
            max_cot_tokens: self.max_cot_tokens.unwrap_or(current.max_cot_tokens),
        };
        next.validate()?;
        Ok(next)
    }
}

/// Atomically swappable [`RouterThresholds`].
#[derive(Debug)]
pub struct SharedThresholds {
    inner: ArcSwap<RouterThresholds>,
}

impl SharedThresholds {
    pub fn new(initial: RouterThresholds) -> Result<Self, TollgateError> {
        initial.validate()?;
        Ok(Self {
            inner: ArcSwap::from_pointee(initial),
        })
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<RouterThresholds> {
        self.inner.load_full()
    }

    /// Apply `update` atomically. On error the current value is unchanged.
    pub fn update(&self, update: &ThresholdUpdate) -> Result<RouterThresholds, TollgateError> {
        let mut outcome = Err(String::new());
        self.inner.rcu(|current| match update.apply(current) {
            Ok(next) => {
                outcome = Ok(next);
                Arc::new(next)
            }
            Err(e) => {
                outcome = Err(e.to_string());
                Arc::clone(current)
            }
        });
        match outcome {
            Ok(next) => {
                info!(
                    conf_threshold = next.conf_threshold,
                    support_threshold = next.support_threshold,
                    max_cot_tokens = next.max_cot_tokens,
                    "router thresholds updated"
                );
                Ok(next)
            }
            Err(message) => Err(TollgateError::Config(message)),
        }
    }
}
