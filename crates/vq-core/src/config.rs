//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Integer columns shorter than this are never run-length coded on save.
    pub elias_min_rows: usize,

    /// Output offset after which large blocks get 16-byte alignment.
    pub align_threshold: u64,

    /// Blocks smaller than this are never aligned.
    pub align_min_block: usize,

    /// Print and compare content digests in the command-line tool.
    pub verify_digest: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            elias_min_rows: 128,
            align_threshold: 1 << 20, // 1 MiB
            align_min_block: 128,
            verify_digest: false,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `VQ_ELIAS_MIN_ROWS`: minimum column length for run-length coding
    /// - `VQ_ALIGN_THRESHOLD`: output offset after which blocks are aligned
    /// - `VQ_ALIGN_MIN_BLOCK`: minimum block size for alignment
    /// - `VQ_VERIFY_DIGEST`: `1`/`true` to enable digest checks
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("VQ_ELIAS_MIN_ROWS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.elias_min_rows = v;
            }
        }

        if let Ok(s) = std::env::var("VQ_ALIGN_THRESHOLD") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.align_threshold = v;
            }
        }

        if let Ok(s) = std::env::var("VQ_ALIGN_MIN_BLOCK") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.align_min_block = v;
            }
        }

        if let Ok(s) = std::env::var("VQ_VERIFY_DIGEST") {
            cfg.verify_digest = matches!(s.as_str(), "1" | "true" | "yes");
        }

        cfg
    }

    /// Parse a JSON config document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
