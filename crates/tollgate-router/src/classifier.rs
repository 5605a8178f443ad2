// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic query complexity classification.
//!
//! Classifies sanitized queries as Simple or Complex using zero-cost
//! heuristic rules. No model call, no network, no latency. The result only
//! picks the initial tier; it never blocks or rejects anything.

use tollgate_core::ComplexityClass;

/// Result of classifying a query's complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// The classified complexity class.
    pub class: ComplexityClass,
    /// Human-readable reason for the classification.
    pub reason: &'static str,
}

/// Formal-reasoning and multi-step markers (whole-word, case-insensitive).
const REASONING_MARKERS: &[&str] = &[
    "prove", "proof", "derive", "derivation", "theorem", "lemma", "debug",
    "debugging", "regex", "regular expression", "step by step", "step-by-step",
    "analyze", "analyse", "compare", "evaluate", "implement", "design",
    "architecture", "trade-off", "tradeoff", "pros and cons", "refactor",
    "optimize", "algorithm", "explain in detail", "in depth", "write a function",
    "write code", "write a program", "solve", "calculate", "integral",
    "complexity of", "walk me through",
];

/// Lines that look like enumerated sub-questions.
fn is_enumerated_line(line: &str) -> bool {
    let line = line.trim_start();
    if line.starts_with("- ") || line.starts_with("* ") {
        return true;
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0
        && matches!(line[digits..].chars().next(), Some('.') | Some(')'))
        && line[digits + 1..].starts_with(' ')
}

/// Whether `phrase` occurs in `haystack` bounded by non-alphanumeric characters.
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.match_indices(phrase).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + phrase.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Deterministic complexity classifier.
#[derive(Debug, Clone)]
pub struct ComplexityClassifier {
    /// Queries longer than this many characters are complex.
    length_threshold: usize,
}

impl ComplexityClassifier {
    pub fn new(length_threshold: usize) -> Self {
        Self { length_threshold }
    }

    /// Classify a query.
    pub fn classify(&self, text: &str) -> Classification {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Classification {
                class: ComplexityClass::Simple,
                reason: "empty query",
            };
        }

        if trimmed.contains("```") {
            return complex("code block");
        }

        if trimmed.chars().count() > self.length_threshold {
            return complex("long query");
        }

        let lower = trimmed.to_lowercase();
        if REASONING_MARKERS.iter().any(|m| contains_phrase(&lower, m)) {
            return complex("reasoning marker");
        }

        let questions = trimmed.matches('?').count();
        let enumerated = trimmed.lines().filter(|l| is_enumerated_line(l)).count();
        if questions >= 2 || enumerated >= 2 {
            return complex("multiple sub-questions");
        }

        Classification {
            class: ComplexityClass::Simple,
            reason: "no complexity indicators",
        }
    }
}

fn complex(reason: &'static str) -> Classification {
    Classification {
        class: ComplexityClass::Complex,
        reason,
    }
}

impl Default for ComplexityClassifier {
    fn default() -> Self {
        Self::new(400)
    }
}
