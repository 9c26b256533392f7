//! Cache signatures - stable keys for processed sprite sheets.
//!
//! A signature combines a content hash of the raw source bytes with a
//! canonical serialization of the config fields that affect output pixels.
//! Cosmetic fields (idle moods, breathing, smoothing hints) are excluded so
//! toggling them never invalidates the cache. Signatures are reproducible
//! across sessions and do not depend on file paths.

use serde::Serialize;

use crate::models::{ChromaKeyAlgorithm, ChromaKeyOptions, SpriteSheetConfig};

/// A processed-sheet cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(u64);

impl Signature {
    /// The raw hash value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The config fields that change processed pixels, in canonical order.
#[derive(Serialize)]
struct PixelFields<'a> {
    columns: u32,
    rows: u32,
    chroma_key_enabled: bool,
    chroma_key_algorithm: ChromaKeyAlgorithm,
    chroma_key_options: &'a ChromaKeyOptions,
    remove_grid_lines: bool,
}

/// Compute the signature for a `(source bytes, config)` pair.
pub fn sheet_signature(source_bytes: &[u8], config: &SpriteSheetConfig) -> Signature {
    let fields = PixelFields {
        columns: config.columns,
        rows: config.rows,
        chroma_key_enabled: config.chroma_key_enabled,
        chroma_key_algorithm: config.chroma_key_algorithm,
        chroma_key_options: &config.chroma_key_options,
        remove_grid_lines: config.remove_grid_lines,
    };
    // Struct fields serialize in declaration order, so the JSON is canonical
    let canonical = serde_json::to_string(&fields).unwrap_or_default();

    let mut hash = fnv1a(FNV_OFFSET, source_bytes);
    hash = fnv1a(hash, &[0xff]);
    hash = fnv1a(hash, canonical.as_bytes());
    Signature(hash)
}

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// FNV-1a hash algorithm.
fn fnv1a(seed: u64, data: &[u8]) -> u64 {
    let mut hash = seed;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
