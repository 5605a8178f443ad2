// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PII detection and placeholder substitution.
//!
//! Every digit-based pattern is anchored on word boundaries, and the
//! substitution loop runs until the text stops changing, so a sanitized text
//! never yields new matches when screened again.

use std::sync::LazyLock;

use regex::Regex;
use secrecy::SecretString;
use tollgate_core::{PiiKind, Redaction};

/// Upper bound on substitution passes. Two are enough in practice.
const MAX_PASSES: usize = 4;

/// Detection patterns in priority order. Earlier kinds claim overlapping spans.
static PII_PATTERNS: LazyLock<Vec<(PiiKind, Regex)>> = LazyLock::new(|| {
    vec![
        (
            PiiKind::Email,
            Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}\b")
                .expect("email pattern"),
        ),
        (
            PiiKind::Ssn,
            Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("ssn pattern"),
        ),
        (
            PiiKind::Card,
            Regex::new(r"\b(?:\d[ \-]?){12,18}\d\b").expect("card pattern"),
        ),
        (
            PiiKind::Phone,
            Regex::new(
                r"(?:\+\d{1,3}[ .\-]?)?(?:\(\d{3}\)[ .\-]?|\b\d{3}[ .\-]?)\d{3}[ .\-]?\d{4}\b",
            )
            .expect("phone pattern"),
        ),
    ]
});

/// Output of PII redaction.
pub(crate) struct PiiScan {
    pub text: String,
    pub redactions: Vec<Redaction>,
    pub originals: Vec<(PiiKind, SecretString)>,
}

/// Replace every PII match with its `<REDACTED:KIND>` placeholder.
pub(crate) fn redact_pii(input: &str) -> PiiScan {
    let mut text = input.to_string();
    let mut redactions: Vec<Redaction> = Vec::new();
    let mut originals = Vec::new();

    for _ in 0..MAX_PASSES {
        let matches = find_matches(&text);
        if matches.is_empty() {
            break;
        }

        let mut out = String::with_capacity(text.len());
        let mut new_redactions = Vec::with_capacity(matches.len());
        let mut cursor = 0;
        for (kind, start, end) in &matches {
            out.push_str(&text[cursor..*start]);
            let placeholder = kind.placeholder();
            let placed_at = out.len();
            out.push_str(&placeholder);
            new_redactions.push(Redaction {
                kind: *kind,
                start: placed_at,
                end: placed_at + placeholder.len(),
            });
            originals.push((*kind, SecretString::from(text[*start..*end].to_string())));
            cursor = *end;
        }
        out.push_str(&text[cursor..]);

        // Earlier placeholders never overlap a new match; shift them past it.
        for existing in &mut redactions {
            let shift: isize = matches
                .iter()
                .filter(|(_, _, end)| *end <= existing.start)
                .map(|(kind, start, end)| {
                    kind.placeholder().len() as isize - (*end - *start) as isize
                })
                .sum();
            existing.start = (existing.start as isize + shift) as usize;
            existing.end = (existing.end as isize + shift) as usize;
        }

        redactions.extend(new_redactions);
        text = out;
    }

    redactions.sort_by_key(|r| r.start);
    PiiScan {
        text,
        redactions,
        originals,
    }
}

/// Non-overlapping matches, sorted by start offset.
fn find_matches(text: &str) -> Vec<(PiiKind, usize, usize)> {
    let mut claimed: Vec<(PiiKind, usize, usize)> = Vec::new();
    for (kind, pattern) in PII_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            if *kind == PiiKind::Card && !luhn_valid(m.as_str()) {
                continue;
            }
            let overlaps = claimed
                .iter()
                .any(|(_, start, end)| m.start() < *end && *start < m.end());
            if !overlaps {
                claimed.push((*kind, m.start(), m.end()));
            }
        }
    }
    claimed.sort_by_key(|(_, start, _)| *start);
    claimed
}

/// Luhn checksum over the digits of a card candidate (separators ignored).
pub(crate) fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}
