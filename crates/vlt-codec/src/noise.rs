use rand::rngs::OsRng;
use rand::RngCore;

/// Raw bytes of random noise per segment (before text encoding).
pub const DEFAULT_NOISE_LEN: usize = 128;

/// Tuning knobs for blob construction.
#[derive(Clone, Copy, Debug)]
pub struct CodecConfig {
    /// Raw length of each of the two noise segments, in bytes.
    pub noise_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            noise_len: DEFAULT_NOISE_LEN,
        }
    }
}

/// Randomness seam for blob noise.
///
/// Injected so embedders/tests can supply deterministic bytes; production
/// code uses [`OsNoise`].
pub trait NoiseSource: Send {
    fn fill(&mut self, buf: &mut [u8]);
}

/// OS-backed CSPRNG noise source.
pub struct OsNoise;

impl NoiseSource for OsNoise {
    fn fill(&mut self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}
