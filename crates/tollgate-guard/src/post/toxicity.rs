// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Severity-weighted toxic phrase scoring.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Phrase and severity weight. Scores add up per occurrence.
const TOXIC_PHRASES: &[(&str, f32)] = &[
    ("kill yourself", 1.0),
    ("i hate you", 0.5),
    ("go to hell", 0.5),
    ("piece of garbage", 0.4),
    ("idiot", 0.3),
    ("moron", 0.3),
    ("worthless", 0.3),
    ("pathetic", 0.25),
    ("stupid", 0.2),
    ("loser", 0.2),
    ("shut up", 0.2),
    ("dumb", 0.15),
];

static TOXIC_PATTERNS: LazyLock<Vec<(Regex, f32)>> = LazyLock::new(|| {
    TOXIC_PHRASES
        .iter()
        .map(|(phrase, weight)| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(phrase));
            (Regex::new(&pattern).expect("toxicity pattern"), *weight)
        })
        .collect()
});

/// Total score and the byte spans that contributed to it.
pub(crate) struct ToxicityScan {
    pub score: f32,
    pub spans: Vec<Range<usize>>,
}

pub(crate) fn scan(text: &str) -> ToxicityScan {
    let mut score = 0.0;
    let mut spans = Vec::new();
    for (pattern, weight) in TOXIC_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            score += weight;
            spans.push(m.range());
        }
    }
    spans.sort_by_key(|r| r.start);
    ToxicityScan { score, spans }
}

/// Replace each span with `[removed]`. Overlapping spans are merged.
pub(crate) fn strip_spans(text: &str, spans: &[Range<usize>]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        if span.end <= cursor {
            continue;
        }
        let start = span.start.max(cursor);
        out.push_str(&text[cursor..start]);
        if start == span.start {
            out.push_str("[removed]");
        }
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}
