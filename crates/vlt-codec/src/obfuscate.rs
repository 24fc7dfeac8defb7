//! Blob construction.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::extract::extract;
use crate::noise::{CodecConfig, NoiseSource};

/// Upper bound on re-draws when noise shadows the payload.
const MAX_BUILD_ATTEMPTS: usize = 32;

/// Encode `amount` into an obfuscated blob: `noise ++ base64(decimal) ++ noise`.
///
/// The returned blob always satisfies `extract(&blob) == Some(amount)`.
/// Random noise occasionally contains digit-only decodes that would shadow
/// the payload under last-match scanning (roughly 1% of draws), so the blob
/// is re-drawn with fresh noise until it self-extracts to the written value.
pub fn build_blob(cfg: &CodecConfig, noise: &mut dyn NoiseSource, amount: u64) -> String {
    let payload = STANDARD.encode(amount.to_string());

    for _ in 0..MAX_BUILD_ATTEMPTS {
        let blob = format!(
            "{}{}{}",
            noise_segment(cfg, noise),
            payload,
            noise_segment(cfg, noise)
        );
        if extract(&blob) == Some(amount) {
            return blob;
        }
    }

    // 32 consecutive shadowed draws has probability ~1e-64; a bare payload
    // still extracts correctly and keeps the function total.
    payload
}

fn noise_segment(cfg: &CodecConfig, noise: &mut dyn NoiseSource) -> String {
    let mut raw = vec![0u8; cfg.noise_len];
    noise.fill(&mut raw);
    STANDARD.encode(raw)
}
