// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token counting for in-process providers.
//!
//! Uses the `cl100k_base` encoding. The encoder is built once on first use;
//! if it cannot be built, counts fall back to a characters-per-token estimate.

use std::sync::LazyLock;

use tiktoken_rs::{CoreBPE, cl100k_base};
use tracing::warn;

static CL100K: LazyLock<Option<CoreBPE>> = LazyLock::new(|| match cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        warn!(error = %e, "cl100k_base unavailable, estimating token counts");
        None
    }
});

/// Average characters per token used when the encoder is unavailable.
const CHARS_PER_TOKEN: usize = 4;

/// Count tokens in `text`.
pub fn count_tokens(text: &str) -> u32 {
    let count = match CL100K.as_ref() {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => text.chars().count().div_ceil(CHARS_PER_TOKEN),
    };
    u32::try_from(count).unwrap_or(u32::MAX)
}
