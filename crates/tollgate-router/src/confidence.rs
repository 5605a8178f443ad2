// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-hoc confidence estimation for generated responses.
//!
//! A deterministic weighted sum of four signals, each in `[0, 1]`:
//!
//! | Signal    | Weight | Meaning                                              |
//! |-----------|--------|------------------------------------------------------|
//! | length    | 0.35   | saturating word count, penalized for repetition      |
//! | hedging   | 0.25   | 1.0 minus 0.25 per hedge marker                      |
//! | tier      | 0.20   | prior for the provider tier                          |
//! | structure | 0.20   | terminal punctuation, conclusions, closed fences     |
//!
//! A backend-reported confidence is blended in at 30%.

use std::collections::HashSet;

use tollgate_core::{ComplexityClass, ConfidenceScore, GenerationResult, ProviderTier};

const WEIGHT_LENGTH: f32 = 0.35;
const WEIGHT_HEDGING: f32 = 0.25;
const WEIGHT_TIER: f32 = 0.20;
const WEIGHT_STRUCTURE: f32 = 0.20;

/// Share of a backend-reported confidence in the final score.
const RAW_BLEND: f32 = 0.30;

/// Penalty per hedge marker found.
const HEDGE_PENALTY: f32 = 0.25;

/// Phrases that signal an uncertain answer.
const HEDGE_MARKERS: &[&str] = &[
    "i'm not sure", "i am not sure", "not certain", "i think", "i believe",
    "maybe", "perhaps", "possibly", "might be", "it seems", "probably",
    "i don't know", "i do not know", "hard to say", "unclear", "as far as i know",
];

/// Phrases that close an argument.
const CONCLUSION_MARKERS: &[&str] = &[
    "therefore", "thus", "in summary", "in conclusion", "hence", "so the answer",
    "to summarize", "overall", "q.e.d", "qed", "∎",
];

/// Words needed for a full length signal.
fn length_baseline(class: ComplexityClass) -> f32 {
    match class {
        ComplexityClass::Simple => 12.0,
        ComplexityClass::Complex => 80.0,
    }
}

/// Prior confidence for a provider tier.
pub fn tier_prior(tier: ProviderTier) -> f32 {
    match tier {
        ProviderTier::Fast => 0.60,
        ProviderTier::Reasoning => 0.85,
        ProviderTier::Local => 0.40,
    }
}

/// Stateless confidence scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceEstimator;

impl ConfidenceEstimator {
    /// Score `result`, produced by a provider of `tier`, for a request of `class`.
    pub fn score(
        &self,
        class: ComplexityClass,
        tier: ProviderTier,
        result: &GenerationResult,
    ) -> ConfidenceScore {
        let text = result.text.as_str();
        let lower = text.to_lowercase();

        let heuristic = WEIGHT_LENGTH * length_signal(text, class)
            + WEIGHT_HEDGING * hedging_signal(&lower)
            + WEIGHT_TIER * tier_prior(tier)
            + WEIGHT_STRUCTURE * structure_signal(text, &lower);

        let blended = match result.raw_confidence.filter(|c| c.is_finite()) {
            Some(raw) => (1.0 - RAW_BLEND) * heuristic + RAW_BLEND * raw.clamp(0.0, 1.0),
            None => heuristic,
        };
        ConfidenceScore::new(blended)
    }
}

/// Saturating square-root curve against the class baseline, scaled down when
/// fewer than half of the words are distinct.
fn length_signal(text: &str, class: ComplexityClass) -> f32 {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return 0.0;
    }
    let base = (words.len() as f32 / length_baseline(class)).min(1.0).sqrt();

    let distinct = words.iter().collect::<HashSet<_>>().len() as f32;
    let distinct_ratio = distinct / words.len() as f32;
    if words.len() >= 8 && distinct_ratio < 0.5 {
        base * distinct_ratio * 2.0
    } else {
        base
    }
}

fn hedging_signal(lower: &str) -> f32 {
    let hedges: usize = HEDGE_MARKERS
        .iter()
        .map(|m| lower.matches(m).count())
        .sum();
    (1.0 - HEDGE_PENALTY * hedges as f32).max(0.0)
}

/// 0.6 for terminal punctuation, 0.2 for a conclusion marker, 0.2 for a
/// closed code fence or multi-paragraph layout. An unclosed fence zeroes it.
fn structure_signal(text: &str, lower: &str) -> f32 {
    let fences = text.matches("```").count();
    if fences % 2 == 1 {
        return 0.0;
    }
    let trimmed = text.trim_end();
    let mut signal = 0.0;
    if trimmed.ends_with(['.', '!', '?', '`', ')', '"', '∎']) {
        signal += 0.6;
    }
    if CONCLUSION_MARKERS.iter().any(|m| lower.contains(m)) {
        signal += 0.2;
    }
    if fences >= 2 || text.trim().contains("\n\n") {
        signal += 0.2;
    }
    f32::min(signal, 1.0)
}
