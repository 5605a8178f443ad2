// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token-overlap check of factual claims against grounding passages.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

const CLAIM_MARKERS: &[&str] = &[
    "according to",
    "studies show",
    "research shows",
    "research suggests",
    "statistics show",
    "it is estimated",
    "percent",
    "was founded",
    "was born",
];

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "that", "this", "with", "are", "was", "were", "has", "have", "had",
    "from", "but", "not", "its", "their", "they", "which", "about", "into", "than", "then",
    "also", "been", "more", "most", "such", "there", "these", "those", "will", "would",
];

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:1[5-9]|20)\d{2}\b").expect("year pattern"));

/// Split text into sentences on terminal punctuation followed by whitespace.
pub(crate) fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    for (i, (idx, c)) in chars.iter().enumerate() {
        let at_boundary = matches!(c, '.' | '!' | '?')
            && chars.get(i + 1).is_none_or(|(_, next)| next.is_whitespace());
        if at_boundary {
            let end = idx + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                out.push(sentence);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// A sentence that asserts something checkable: numbers, years, attributions.
pub(crate) fn is_claim(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    sentence.chars().any(|c| c.is_ascii_digit())
        || sentence.contains('%')
        || YEAR.is_match(sentence)
        || CLAIM_MARKERS.iter().any(|m| lower.contains(m))
}

fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| {
            (t.len() >= 3 || t.chars().all(|c| c.is_ascii_digit())) && !t.is_empty()
        })
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Best fraction of the sentence's tokens found in any single passage.
pub(crate) fn support(sentence: &str, passages: &[String]) -> f32 {
    let claim = tokens(sentence);
    if claim.is_empty() {
        return 1.0;
    }
    passages
        .iter()
        .map(|passage| {
            let passage = tokens(passage);
            claim.intersection(&passage).count() as f32 / claim.len() as f32
        })
        .fold(0.0, f32::max)
}

/// Claim sentences whose support falls below `threshold`.
pub(crate) fn unsupported_claims<'a>(
    text: &'a str,
    passages: &[String],
    threshold: f32,
) -> Vec<&'a str> {
    sentences(text)
        .into_iter()
        .filter(|s| is_claim(s))
        .filter(|s| support(s, passages) < threshold)
        .collect()
}
