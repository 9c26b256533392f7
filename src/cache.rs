//! Processed-asset cache - signature-keyed memoization with best-effort
//! persistence.
//!
//! Reprocessing only ever happens on a signature miss: repeated requests for
//! the same `(source, config)` pair must not re-run the pixel pass. The
//! persisted variant writes processed sheets to a cache directory so future
//! sessions skip processing entirely; persistence failures are logged and
//! swallowed because correctness never depends on them.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::downscale::BudgetOptions;
use crate::models::SpriteSheetConfig;
use crate::pipeline::{self, ProcessError, ProcessedSpriteSheet};
use crate::signature::{sheet_signature, Signature};

/// Error type for cache persistence failures. Non-fatal by contract.
#[derive(Debug, Error)]
pub enum CachePersistError {
    /// Cache directory or file could not be written
    #[error("failed to write cached sheet: {0}")]
    Io(#[from] std::io::Error),
    /// Processed sheet could not be encoded as PNG
    #[error("failed to encode cached sheet: {0}")]
    Encode(#[from] image::ImageError),
    /// Geometry sidecar could not be serialized
    #[error("failed to serialize cache sidecar: {0}")]
    Json(#[from] serde_json::Error),
}

/// Geometry sidecar stored next to each persisted sheet.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheSidecar {
    columns: u32,
    rows: u32,
    frame_width: u32,
    frame_height: u32,
}

/// Signature-keyed store of processed sheets.
///
/// Entries are created whole and replaced whole; there is no partial update.
pub struct ProcessedAssetCache {
    entries: HashMap<Signature, Arc<ProcessedSpriteSheet>>,
    persist_dir: Option<PathBuf>,
}

impl ProcessedAssetCache {
    /// In-memory cache only.
    pub fn new() -> Self {
        Self { entries: HashMap::new(), persist_dir: None }
    }

    /// Cache that also persists processed sheets under `dir`.
    pub fn with_persist_dir(dir: impl Into<PathBuf>) -> Self {
        Self { entries: HashMap::new(), persist_dir: Some(dir.into()) }
    }

    /// Look up a processed sheet, falling back to the persisted copy.
    ///
    /// A disk hit is promoted into memory so later lookups stay cheap. A
    /// corrupt or unreadable persisted entry is treated as a miss.
    pub fn get(&mut self, signature: &Signature) -> Option<Arc<ProcessedSpriteSheet>> {
        if let Some(sheet) = self.entries.get(signature) {
            return Some(Arc::clone(sheet));
        }
        let sheet = self.load_persisted(signature)?;
        let sheet = Arc::new(sheet);
        self.entries.insert(*signature, Arc::clone(&sheet));
        Some(sheet)
    }

    /// Store a processed sheet, replacing any existing entry for the
    /// signature. Persistence is best-effort: a failure is logged and the
    /// in-memory entry stays authoritative.
    pub fn put(
        &mut self,
        signature: Signature,
        sheet: ProcessedSpriteSheet,
    ) -> Arc<ProcessedSpriteSheet> {
        let sheet = Arc::new(sheet);
        if let Some(dir) = self.persist_dir.clone() {
            if let Err(error) = persist_sheet(&dir, &signature, &sheet) {
                warn!(%signature, %error, "failed to persist processed sheet, keeping in-memory copy");
            }
        }
        self.entries.insert(signature, Arc::clone(&sheet));
        sheet
    }

    /// Number of in-memory entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn load_persisted(&self, signature: &Signature) -> Option<ProcessedSpriteSheet> {
        let dir = self.persist_dir.as_deref()?;
        let sheet_path = sheet_path(dir, signature);
        let sidecar_path = sidecar_path(dir, signature);
        let sidecar: CacheSidecar =
            serde_json::from_slice(&fs::read(sidecar_path).ok()?).ok()?;
        let image: RgbaImage = image::open(&sheet_path).ok()?.to_rgba8();
        let expected = (
            u64::from(sidecar.frame_width) * u64::from(sidecar.columns),
            u64::from(sidecar.frame_height) * u64::from(sidecar.rows),
        );
        let (width, height) = image.dimensions();
        if (u64::from(width), u64::from(height)) != expected {
            debug!(%signature, "persisted sheet geometry mismatch, treating as miss");
            return None;
        }
        Some(ProcessedSpriteSheet {
            image,
            frame_width: sidecar.frame_width,
            frame_height: sidecar.frame_height,
            columns: sidecar.columns,
            rows: sidecar.rows,
        })
    }
}

impl Default for ProcessedAssetCache {
    fn default() -> Self {
        Self::new()
    }
}

fn sheet_path(dir: &Path, signature: &Signature) -> PathBuf {
    dir.join(format!("{signature}.png"))
}

fn sidecar_path(dir: &Path, signature: &Signature) -> PathBuf {
    dir.join(format!("{signature}.json"))
}

fn persist_sheet(
    dir: &Path,
    signature: &Signature,
    sheet: &ProcessedSpriteSheet,
) -> Result<(), CachePersistError> {
    fs::create_dir_all(dir)?;
    let sidecar = CacheSidecar {
        columns: sheet.columns,
        rows: sheet.rows,
        frame_width: sheet.frame_width,
        frame_height: sheet.frame_height,
    };
    sheet.image.save(sheet_path(dir, signature))?;
    fs::write(sidecar_path(dir, signature), serde_json::to_vec(&sidecar)?)?;
    Ok(())
}

/// The pipeline behind the cache: processing requests only reach the pixel
/// pass on a signature miss.
pub struct CachedProcessor {
    cache: ProcessedAssetCache,
    budget: BudgetOptions,
    passes: AtomicU64,
}

impl CachedProcessor {
    pub fn new(cache: ProcessedAssetCache, budget: BudgetOptions) -> Self {
        Self { cache, budget, passes: AtomicU64::new(0) }
    }

    /// Process a sheet, or return the cached asset for an identical request.
    pub fn process(
        &mut self,
        source_bytes: &[u8],
        config: &SpriteSheetConfig,
    ) -> Result<Arc<ProcessedSpriteSheet>, ProcessError> {
        let signature = sheet_signature(source_bytes, config);
        if let Some(sheet) = self.cache.get(&signature) {
            debug!(%signature, "cache hit");
            return Ok(sheet);
        }
        self.passes.fetch_add(1, Ordering::Relaxed);
        let sheet = pipeline::process_sheet(source_bytes, config, &self.budget)?;
        Ok(self.cache.put(signature, sheet))
    }

    /// How many times the pixel pass actually ran.
    pub fn passes_run(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub fn cache(&self) -> &ProcessedAssetCache {
        &self.cache
    }

    /// Directory used for persisted entries, when configured.
    pub fn persist_dir(&self) -> Option<&Path> {
        self.cache.persist_dir.as_deref()
    }
}
