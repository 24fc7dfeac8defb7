//! vlt-codec
//!
//! Obfuscated balance blobs: build + extract.
//!
//! Architectural decisions:
//! - A blob is `noise ++ base64(decimal) ++ noise`; noise is fresh per build
//!   so the digest over the blob never marks where the payload sits.
//! - Extraction is a bounded brute-force scan, not an offset lookup. The
//!   format never records noise lengths, so a reader recovers the payload by
//!   trying substrings.
//! - Pure logic. Randomness comes in through [`NoiseSource`]; the production
//!   impl is [`OsNoise`].

mod extract;
mod noise;
mod obfuscate;

pub use extract::extract;
pub use noise::{CodecConfig, NoiseSource, OsNoise, DEFAULT_NOISE_LEN};
pub use obfuscate::build_blob;
