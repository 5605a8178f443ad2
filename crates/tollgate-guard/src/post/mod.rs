// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output gate: hard-violation blocking, toxicity scoring and the citation
//! check against grounding passages.

mod citation;
mod toxicity;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tollgate_config::model::GuardConfig;
use tollgate_core::{GroundingContext, RiskCategory, SafetyVerdict, ViolationCategory};
use tracing::debug;

use crate::pre::normalize_for_matching;

/// Fixed text returned in place of a blocked response.
pub const REFUSAL_TEMPLATE: &str =
    "I'm sorry, but I can't help with that. The response was withheld by the safety policy.";

/// Line appended after toxic spans were stripped.
pub const REMOVED_ANNOTATION: &str = "[Note: part of this response was removed by the content filter.]";

/// Line appended when claims could not be matched to the provided sources.
pub const UNVERIFIED_CAVEAT: &str =
    "[Caveat: some statements above could not be verified against the provided sources.]";

/// Step-by-step instructions for serious harm.
static HARMFUL_INSTRUCTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(?:here is how|here's how|steps? to|instructions? for|how to) (?:make|build|assemble|synthesi[sz]e|manufacture) (?:a |an )?(?:bomb|pipe bomb|explosive|nerve agent|sarin|bioweapon|chemical weapon|ghost gun)",
        r"\bstep \d+\s*[:.)-]\s*(?:acquire|obtain|mix) (?:the )?(?:explosive|precursor|detonator)",
        r"\b(?:attach|wire) the detonator\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("harmful instruction pattern"))
    .collect()
});

/// Explicitly disallowed content, matched on normalized text.
const DISALLOWED_PHRASES: &[&str] = &[
    "child sexual abuse material",
    "sexual content involving minors",
    "working credit card numbers",
    "credit card dump",
    "stolen credentials list",
];

/// The output safety gate. Stateless and shared across request tasks.
#[derive(Debug, Clone)]
pub struct PostGuard {
    extra_disallowed: Vec<String>,
    toxicity_soft_threshold: f32,
    toxicity_hard_threshold: f32,
}

impl PostGuard {
    pub fn new(config: &GuardConfig) -> Self {
        Self {
            extra_disallowed: config
                .extra_hard_violation_phrases
                .iter()
                .map(|p| normalize_for_matching(p))
                .filter(|p| !p.is_empty())
                .collect(),
            toxicity_soft_threshold: config.toxicity_soft_threshold,
            toxicity_hard_threshold: config.toxicity_hard_threshold,
        }
    }

    /// Check a generated response before it is returned.
    ///
    /// `risk_flags` are the Pre-Guard tags of the originating request; any flag
    /// halves the soft toxicity threshold. The citation check only runs when
    /// grounding is present and required.
    pub fn verify(
        &self,
        text: &str,
        risk_flags: &BTreeSet<RiskCategory>,
        grounding: Option<&GroundingContext>,
        support_threshold: f32,
    ) -> SafetyVerdict {
        let mut violations = BTreeSet::new();
        let normalized = normalize_for_matching(text);

        if HARMFUL_INSTRUCTION_PATTERNS
            .iter()
            .any(|re| re.is_match(&normalized))
        {
            violations.insert(ViolationCategory::HarmfulInstructions);
        }
        if DISALLOWED_PHRASES.iter().any(|p| normalized.contains(p))
            || self
                .extra_disallowed
                .iter()
                .any(|p| normalized.contains(p.as_str()))
        {
            violations.insert(ViolationCategory::DisallowedContent);
        }

        let toxicity = toxicity::scan(text);
        if !violations.is_empty() {
            debug!(?violations, "hard violation in response");
            return blocked(violations, toxicity.score);
        }

        if toxicity.score >= self.toxicity_hard_threshold {
            violations.insert(ViolationCategory::Toxicity);
            debug!(score = toxicity.score, "toxicity above hard threshold");
            return blocked(violations, toxicity.score);
        }

        let soft_threshold = if risk_flags.is_empty() {
            self.toxicity_soft_threshold
        } else {
            self.toxicity_soft_threshold / 2.0
        };

        let mut sanitized = text.to_string();
        if toxicity.score >= soft_threshold && !toxicity.spans.is_empty() {
            violations.insert(ViolationCategory::Toxicity);
            sanitized = toxicity::strip_spans(text, &toxicity.spans);
            sanitized.push_str("\n\n");
            sanitized.push_str(REMOVED_ANNOTATION);
        }

        let mut caveat_appended = false;
        if let Some(grounding) = grounding.filter(|g| g.required) {
            let unsupported =
                citation::unsupported_claims(&sanitized, &grounding.passages, support_threshold);
            if !unsupported.is_empty() {
                debug!(count = unsupported.len(), "unverifiable claims in response");
                violations.insert(ViolationCategory::UnverifiedClaims);
                sanitized.push_str("\n\n");
                sanitized.push_str(UNVERIFIED_CAVEAT);
                caveat_appended = true;
            }
        }

        let altered = sanitized != text;
        SafetyVerdict {
            passed: true,
            violations,
            sanitized_text: sanitized,
            toxicity_score: toxicity.score,
            caveat_appended,
            altered,
        }
    }
}

fn blocked(violations: BTreeSet<ViolationCategory>, toxicity_score: f32) -> SafetyVerdict {
    SafetyVerdict {
        passed: false,
        violations,
        sanitized_text: REFUSAL_TEMPLATE.to_string(),
        toxicity_score,
        caveat_appended: false,
        altered: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> PostGuard {
        PostGuard::new(&GuardConfig::default())
    }

    fn verify(text: &str) -> SafetyVerdict {
        guard().verify(text, &BTreeSet::new(), None, 0.55)
    }

    #[test]
    fn clean_text_passes_unaltered() {
        let v = verify("Paris is the capital of France.");
        assert!(v.passed);
        assert!(!v.altered);
        assert!(v.violations.is_empty());
        assert_eq!(v.sanitized_text, "Paris is the capital of France.");
    }

    #[test]
    fn harmful_instructions_replaced_by_refusal() {
        let v = verify("Sure! Here is how to build a pipe bomb: first...");
        assert!(!v.passed);
        assert_eq!(v.sanitized_text, REFUSAL_TEMPLATE);
        assert!(v.violations.contains(&ViolationCategory::HarmfulInstructions));
    }

    #[test]
    fn disallowed_phrase_blocks() {
        let v = verify("I can share a credit card dump if you want.");
        assert!(!v.passed);
        assert!(v.violations.contains(&ViolationCategory::DisallowedContent));
    }

    #[test]
    fn width_obfuscated_phrase_still_blocks() {
        let v = verify("I can share a ｃｒｅｄｉｔ  ＣＡＲＤ ｄｕｍｐ if you want.");
        assert!(!v.passed);
        assert!(v.violations.contains(&ViolationCategory::DisallowedContent));
    }

    #[test]
    fn configured_phrase_blocks() {
        let config = GuardConfig {
            extra_hard_violation_phrases: vec!["Internal Project Falcon".to_string()],
            ..GuardConfig::default()
        };
        let v = PostGuard::new(&config).verify(
            "details of internal project falcon follow",
            &BTreeSet::new(),
            None,
            0.55,
        );
        assert!(!v.passed);
        assert!(v.violations.contains(&ViolationCategory::DisallowedContent));
    }

    #[test]
    fn soft_toxicity_strips_and_annotates() {
        let v = verify("Only an idiot would ask that. The answer is 4.");
        assert!(v.passed);
        assert!(v.altered);
        assert!(v.violations.contains(&ViolationCategory::Toxicity));
        assert!(v.sanitized_text.contains("[removed]"));
        assert!(!v.sanitized_text.contains("idiot"));
        assert!(v.sanitized_text.ends_with(REMOVED_ANNOTATION));
    }

    #[test]
    fn risk_flags_halve_soft_threshold() {
        let text = "That is a dumb question, but here you go.";
        assert!(!verify(text).altered);

        let flags = BTreeSet::from([RiskCategory::SelfHarm]);
        let v = guard().verify(text, &flags, None, 0.55);
        assert!(v.altered);
        assert!(v.passed);
    }

    #[test]
    fn severe_toxicity_blocks() {
        let v = verify("Just kill yourself.");
        assert!(!v.passed);
        assert_eq!(v.sanitized_text, REFUSAL_TEMPLATE);
        assert!(v.violations.contains(&ViolationCategory::Toxicity));
    }

    #[test]
    fn unverifiable_claim_gets_caveat_not_block() {
        let grounding = GroundingContext {
            passages: vec!["The library opens at nine every weekday.".to_string()],
            required: true,
        };
        let v = guard().verify(
            "The library has 2 million books according to the city.",
            &BTreeSet::new(),
            Some(&grounding),
            0.55,
        );
        assert!(v.passed);
        assert!(v.caveat_appended);
        assert!(v.violations.contains(&ViolationCategory::UnverifiedClaims));
        assert!(v.sanitized_text.ends_with(UNVERIFIED_CAVEAT));
    }

    #[test]
    fn citation_check_skipped_when_not_required() {
        let grounding = GroundingContext {
            passages: vec![],
            required: false,
        };
        let v = guard().verify("Revenue grew 12 percent.", &BTreeSet::new(), Some(&grounding), 0.55);
        assert!(!v.caveat_appended);
        assert!(!v.altered);
    }
}
