// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input gate: malformed-input rejection, PII redaction, prompt-injection
//! detection and risk tagging.
//!
//! [`PreGuard::screen`] is a pure function of the request text and the guard
//! policy. It holds no mutable state and is shared across request tasks.

mod injection;
mod pii;
mod risk;

use std::collections::BTreeSet;

use secrecy::SecretString;
use tollgate_config::model::GuardConfig;
use tollgate_core::{BlockReason, PiiKind, Request, RiskCategory, SanitizedRequest};
use tracing::debug;

pub(crate) use injection::normalize as normalize_for_matching;

use injection::InjectionDetector;

/// Original values behind each placeholder of one request.
///
/// This is the only place redacted values live. `Debug` never prints them
/// and the memory is zeroized on drop.
pub struct RedactionAudit {
    pub request_id: String,
    pub entries: Vec<(PiiKind, SecretString)>,
}

impl std::fmt::Debug for RedactionAudit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<PiiKind> = self.entries.iter().map(|(kind, _)| *kind).collect();
        f.debug_struct("RedactionAudit")
            .field("request_id", &self.request_id)
            .field("entries", &kinds)
            .finish()
    }
}

/// The input safety gate.
#[derive(Debug, Clone)]
pub struct PreGuard {
    injection: InjectionDetector,
    hard_deny: BTreeSet<RiskCategory>,
}

impl PreGuard {
    pub fn new(config: &GuardConfig) -> Self {
        Self {
            injection: InjectionDetector::new(&config.extra_injection_phrases),
            hard_deny: config.hard_deny.iter().copied().collect(),
        }
    }

    /// Screen a request, discarding the original PII values.
    pub fn screen(&self, request: Request) -> SanitizedRequest {
        self.screen_with_audit(request).0
    }

    /// Screen a request and return the originals behind each redaction.
    pub fn screen_with_audit(&self, request: Request) -> (SanitizedRequest, RedactionAudit) {
        let mut audit = RedactionAudit {
            request_id: request.id().to_string(),
            entries: Vec::new(),
        };

        if is_malformed(request.raw_text()) {
            debug!(request_id = %request.id(), "malformed input rejected");
            let sanitized = SanitizedRequest::new(
                request,
                String::new(),
                Vec::new(),
                BTreeSet::new(),
                Some(BlockReason::MalformedInput),
            );
            return (sanitized, audit);
        }

        let scan = pii::redact_pii(request.raw_text());
        audit.entries = scan.originals;

        let normalized = injection::normalize(&scan.text);
        let risk_flags = risk::classify_risk(&normalized);

        let block_reason = if let Some(rule) = self.injection.detect(&normalized) {
            debug!(request_id = %request.id(), rule = %rule, "prompt injection detected");
            Some(BlockReason::PromptInjection)
        } else {
            risk_flags
                .iter()
                .find(|category| self.hard_deny.contains(category))
                .map(|category| BlockReason::HardDeny(*category))
        };

        let sanitized =
            SanitizedRequest::new(request, scan.text, scan.redactions, risk_flags, block_reason);
        (sanitized, audit)
    }
}

/// Undecodable bytes (U+FFFD), C0 controls other than tab/newline/carriage
/// return, and bidi override controls.
fn is_malformed(text: &str) -> bool {
    text.chars().any(|c| {
        c == '\u{FFFD}'
            || (c.is_ascii_control() && c != '\t' && c != '\n' && c != '\r' && c != '\u{7F}')
            || ('\u{202A}'..='\u{202E}').contains(&c)
            || ('\u{2066}'..='\u{2069}').contains(&c)
    })
}
