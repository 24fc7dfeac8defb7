//! Controller configuration.
//!
//! All fields default; embedders ship tuning as JSON rather than code.
//! Unknown keys are rejected so a typo cannot silently fall back to a
//! default.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use vlt_codec::DEFAULT_NOISE_LEN;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Balance adopted when a valid record exists but the payload cannot be
    /// extracted from it.
    pub default_balance: u64,
    /// Start both background tasks during `init`.
    pub auto_regen: bool,
    /// Raw bytes of random noise per blob segment.
    pub noise_len: usize,
    pub regen: RegenConfig,
    pub roller: RollerConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_balance: 100,
            auto_regen: true,
            noise_len: DEFAULT_NOISE_LEN,
            regen: RegenConfig::default(),
            roller: RollerConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parse controller config")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())
            .with_context(|| format!("read controller config {:?}", path.as_ref()))?;
        Self::from_json_str(&raw)
    }
}

/// Regenerator tuning: +1 per tick while below `threshold`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegenConfig {
    pub threshold: u64,
    pub interval_ms: u64,
}

impl Default for RegenConfig {
    fn default() -> Self {
        Self {
            threshold: 100,
            interval_ms: 10_000,
        }
    }
}

/// Hash roller tuning: rewrite blob+digest every `interval_ms`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RollerConfig {
    pub interval_ms: u64,
}

impl Default for RollerConfig {
    fn default() -> Self {
        Self { interval_ms: 5 }
    }
}
