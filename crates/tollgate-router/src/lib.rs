// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query classification, confidence scoring and request routing for Tollgate.
//!
//! This crate provides:
//! - [`ComplexityClassifier`]: heuristic Simple/Complex classification
//! - [`ConfidenceEstimator`]: deterministic post-hoc confidence scores
//! - [`SharedThresholds`]: runtime thresholds swapped atomically by the admin surface
//! - [`Router`]: the guarded pipeline from request to [`ChatOutcome`]

pub mod classifier;
pub mod confidence;
pub mod router;
pub mod thresholds;

pub use classifier::{Classification, ComplexityClassifier};
pub use confidence::{ConfidenceEstimator, tier_prior};
pub use router::{
    APOLOGY_MESSAGE, ChatOutcome, NO_PROVIDER, POLICY_BLOCK_MESSAGE, Router, strip_reasoning,
};
pub use thresholds::{RouterThresholds, SharedThresholds, ThresholdUpdate};
