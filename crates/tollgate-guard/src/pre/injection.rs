// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt-injection detection over normalized text.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Imperative-override phrases, matched as substrings of normalized text.
const INJECTION_PHRASES: &[&str] = &[
    "ignore previous instructions",
    "ignore all previous instructions",
    "ignore your instructions",
    "forget all previous instructions",
    "forget your instructions",
    "override your instructions",
    "bypass your safety",
    "disable your safety",
    "developer mode enabled",
    "do anything now",
    "new instructions:",
];

/// Override and system-role leakage patterns.
static INJECTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(?:ignore|disregard|forget|skip) (?:all |any )?(?:of )?(?:the |your )?(?:previous|prior|above|earlier|preceding) (?:instructions|prompts|rules|messages|directions)",
        r"\b(?:reveal|show|print|repeat|output|leak|dump) (?:me )?(?:your|the) (?:system prompt|hidden instructions|initial instructions|original prompt)",
        r"\byou are now (?:in )?(?:developer|dan|jailbreak|unrestricted) mode\b",
        r"\bact as (?:an? )?(?:unrestricted|unfiltered|jailbroken) (?:ai|model|assistant)\b",
        r"(?:^|\s)(?:system|assistant)\s*:\s*you (?:are|must|will)\b",
        r"<\|?(?:im_start|system)\|?>",
        r"\[/?(?:system|inst)\]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("injection pattern"))
    .collect()
});

/// Zero-width characters that survive NFKC and are used to split keywords.
const ZERO_WIDTH: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// NFKC-normalize, lowercase, drop zero-width characters and collapse whitespace.
pub(crate) fn normalize(text: &str) -> String {
    let folded: String = text
        .nfkc()
        .filter(|c| !ZERO_WIDTH.contains(c))
        .collect::<String>()
        .to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Injection matcher with the built-in lists plus configured extras.
#[derive(Debug, Clone)]
pub(crate) struct InjectionDetector {
    extra_phrases: Vec<String>,
}

impl InjectionDetector {
    pub(crate) fn new(extra_phrases: &[String]) -> Self {
        Self {
            extra_phrases: extra_phrases
                .iter()
                .map(|p| normalize(p))
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Returns the first matching rule, if any. `normalized` must come from [`normalize`].
    pub(crate) fn detect(&self, normalized: &str) -> Option<String> {
        if let Some(phrase) = INJECTION_PHRASES.iter().find(|p| normalized.contains(*p)) {
            return Some((*phrase).to_string());
        }
        if let Some(phrase) = self.extra_phrases.iter().find(|p| normalized.contains(p.as_str())) {
            return Some(phrase.clone());
        }
        INJECTION_PATTERNS
            .iter()
            .find(|re| re.is_match(normalized))
            .map(|re| re.as_str().to_string())
    }
}
