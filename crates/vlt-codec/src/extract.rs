//! Brute-force payload recovery.
//!
//! # Invariants
//!
//! - Scan order is outer start ascending, inner end ascending; among every
//!   successful digit-only decode, the LAST one in scan order wins (highest
//!   start, then highest end).
//! - Shorter decodes at the same start, and decodes nested inside an
//!   already adopted chain on a 4-char boundary, are fragments of the same
//!   base64 group chain — never separate candidates.
//! - A digit chain too long for `u64` is a failed decode, but it still
//!   claims its span: none of its fragments may be adopted as a truncated
//!   value.
//! - Failed decodes are skipped silently. No substring decoding at all
//!   yields `None`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Shortest substring worth trying (base64 of one byte group).
const MIN_SPAN: usize = 4;
/// Longest substring tried; bounds the scan to O(n * 60) decode attempts.
const MAX_SPAN: usize = 60;

/// Recover the encoded balance from `blob` without knowing noise boundaries.
///
/// Returns `None` when no substring within the scan window strictly decodes
/// to a digit-only string that fits in `u64`.
pub fn extract(blob: &str) -> Option<u64> {
    let bytes = blob.as_bytes();
    let n = bytes.len();
    let mut best: Option<u64> = None;
    // Span of the last adopted digit chain. Tracked separately from `best`
    // so fragments stay suppressed even when the chain itself overflows
    // u64 and yields no candidate.
    let mut chain_span: Option<(usize, usize)> = None;

    for i in 0..n {
        if i + MIN_SPAN > n {
            break;
        }

        // Longest all-digit decode starting at i. Shorter decodes at the
        // same start are prefixes of the same base64 group chain.
        let mut chain: Option<(usize, String)> = None;
        for j in (i + MIN_SPAN)..=n.min(i + MAX_SPAN) {
            if let Some(digits) = decode_digits(&bytes[i..j]) {
                chain = Some((j, digits));
            }
        }
        let Some((end, digits)) = chain else { continue };

        if let Some((start, prev_end)) = chain_span {
            // Aligned sub-range of an already adopted chain: a fragment of
            // the same payload, not a new candidate. (Scan order means
            // i >= start whenever this can trigger.)
            if end <= prev_end && (i - start) % 4 == 0 {
                continue;
            }
        }
        chain_span = Some((i, end));

        // A chain too long for u64 claims the span but produces no value.
        if let Ok(value) = digits.parse::<u64>() {
            best = Some(value);
        }
    }

    best
}

/// Strict base64 decode; accept only non-empty all-ASCII-digit plaintext.
fn decode_digits(chunk: &[u8]) -> Option<String> {
    let raw = STANDARD.decode(chunk).ok()?;
    if raw.is_empty() || !raw.iter().all(|b| b.is_ascii_digit()) {
        return None;
    }
    String::from_utf8(raw).ok()
}
