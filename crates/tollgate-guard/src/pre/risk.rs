// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyword tagging of inbound text into risk categories.

use std::collections::BTreeSet;

use tollgate_core::RiskCategory;

const ILLEGAL: &[&str] = &[
    "launder money",
    "money laundering",
    "counterfeit",
    "hack into",
    "steal credit card",
    "buy drugs",
    "sell drugs",
    "evade taxes",
    "tax evasion",
    "shoplift",
];

const SELF_HARM: &[&str] = &[
    "kill myself",
    "suicide",
    "self-harm",
    "self harm",
    "hurt myself",
    "end my life",
    "cut myself",
];

const WEAPONS: &[&str] = &[
    "build a bomb",
    "make a bomb",
    "pipe bomb",
    "explosive device",
    "untraceable gun",
    "ghost gun",
    "nerve agent",
    "bioweapon",
    "chemical weapon",
];

const EXTREMISM: &[&str] = &[
    "join isis",
    "terrorist recruitment",
    "recruit terrorists",
    "white supremacy",
    "ethnic cleansing",
    "mass shooting manifesto",
];

const CATEGORIES: &[(RiskCategory, &[&str])] = &[
    (RiskCategory::Illegal, ILLEGAL),
    (RiskCategory::SelfHarm, SELF_HARM),
    (RiskCategory::Weapons, WEAPONS),
    (RiskCategory::Extremism, EXTREMISM),
];

/// Tag every category with at least one keyword present in `normalized`.
pub(crate) fn classify_risk(normalized: &str) -> BTreeSet<RiskCategory> {
    CATEGORIES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| normalized.contains(k)))
        .map(|(category, _)| *category)
        .collect()
}
