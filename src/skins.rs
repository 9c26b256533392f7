//! Custom skin library - import, list, and delete author-supplied sheets.
//!
//! A skin lives in its own directory under the library root: the raw sheet
//! PNG, its `SpriteSheetConfig` as JSON, and a small manifest. Imports are
//! written to a temp directory and renamed into place so a crash never
//! leaves a half-imported skin. Skin ids derive from the content signature,
//! which makes re-importing the same sheet idempotent.
//!
//! Zip packaging of skins lives with the host application; this module only
//! deals in the unpacked `(source bytes, config)` pair, with a base64
//! variant for transport across a process boundary.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::geometry::{self, GeometryError};
use crate::models::SpriteSheetConfig;
use crate::signature::sheet_signature;

/// Upper bound on an imported sheet's size.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const MANIFEST_FILE_NAME: &str = "manifest.json";
const SHEET_FILE_NAME: &str = "sheet.png";
const CONFIG_FILE_NAME: &str = "config.json";
const CACHE_DIR_NAME: &str = ".processed";
const DEFAULT_SKIN_NAME: &str = "Custom skin";
const SETTINGS_ID_PREFIX: &str = "custom:";
const MANIFEST_SCHEMA_VERSION: u32 = 1;

/// Error type for skin library operations.
#[derive(Debug, Error)]
pub enum SkinError {
    /// Import payload was empty
    #[error("sheet image is empty")]
    EmptyImage,
    /// Import payload exceeds [`MAX_IMAGE_BYTES`]
    #[error("sheet image is too large (max {max_mb}MB)")]
    ImageTooLarge { max_mb: usize },
    /// Base64 transport payload did not decode
    #[error("failed to decode base64 sheet: {0}")]
    Base64(#[from] base64::DecodeError),
    /// Payload is not a PNG
    #[error("sheet is not a valid PNG: {0}")]
    InvalidPng(&'static str),
    /// Sheet dimensions do not divide the declared grid
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// No skin with this id in the library
    #[error("unknown skin id '{0}'")]
    UnknownId(String),
    /// Id fails the safe-id rules (lowercase alnum, `_`, `-`, max 64 chars)
    #[error("invalid skin id '{0}'")]
    InvalidId(String),
    #[error("skin library I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("skin metadata is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-skin manifest stored as `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkinManifest {
    schema_version: u32,
    id: String,
    name: String,
    created_at_ms: u64,
}

/// A skin as listed to collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinEntry {
    /// Settings id, `custom:` prefixed.
    pub id: String,
    pub name: String,
    pub sheet_path: PathBuf,
    pub config: SpriteSheetConfig,
    pub created_at_ms: u64,
}

/// Format a raw skin id as a settings id.
pub fn settings_id(raw_id: &str) -> String {
    format!("{SETTINGS_ID_PREFIX}{raw_id}")
}

/// Extract the raw skin id from a settings id, if it is a custom one.
pub fn parse_settings_id(id: &str) -> Option<&str> {
    id.strip_prefix(SETTINGS_ID_PREFIX)
}

/// Whether an id is safe to use as a directory name.
pub fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 64
        && id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Read PNG dimensions from the header without decoding the image.
pub fn png_dimensions(bytes: &[u8]) -> Result<(u32, u32), SkinError> {
    const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
    if bytes.len() < 24 {
        return Err(SkinError::InvalidPng("file too short"));
    }
    if bytes[..8] != SIGNATURE {
        return Err(SkinError::InvalidPng("signature mismatch"));
    }
    // IHDR is the first chunk; width and height lead its data
    if &bytes[12..16] != b"IHDR" {
        return Err(SkinError::InvalidPng("missing IHDR"));
    }
    let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
    let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    if width == 0 || height == 0 {
        return Err(SkinError::InvalidPng("zero dimension"));
    }
    Ok((width, height))
}

fn normalize_name(name: Option<String>) -> String {
    let Some(name) = name else { return DEFAULT_SKIN_NAME.to_string() };
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return DEFAULT_SKIN_NAME.to_string();
    }
    let stripped = trimmed
        .strip_suffix(".png")
        .or_else(|| trimmed.strip_suffix(".PNG"))
        .unwrap_or(trimmed);
    stripped.chars().take(32).collect()
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// On-disk library of custom skins.
pub struct SkinLibrary {
    root: PathBuf,
}

impl SkinLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory processed-sheet caches should persist into.
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(CACHE_DIR_NAME)
    }

    /// Import a sheet from raw PNG bytes.
    ///
    /// Validates size, PNG header, and grid geometry before anything is
    /// written. Re-importing identical content with an identical config
    /// returns the already-stored entry.
    pub fn import_bytes(
        &self,
        png_bytes: &[u8],
        config: &SpriteSheetConfig,
        name: Option<String>,
    ) -> Result<SkinEntry, SkinError> {
        if png_bytes.is_empty() {
            return Err(SkinError::EmptyImage);
        }
        if png_bytes.len() > MAX_IMAGE_BYTES {
            return Err(SkinError::ImageTooLarge { max_mb: MAX_IMAGE_BYTES / 1024 / 1024 });
        }
        let (width, height) = png_dimensions(png_bytes)?;
        geometry::validate_grid(width, height, config.columns, config.rows)?;

        let raw_id = format!("skin_{}", sheet_signature(png_bytes, config));
        let skin_dir = self.root.join(&raw_id);
        if skin_dir.is_dir() {
            if let Some(entry) = self.read_entry(&skin_dir, &raw_id) {
                debug!(id = %raw_id, "skin already imported");
                return Ok(entry);
            }
        }

        fs::create_dir_all(&self.root)?;
        let tmp_dir = self.root.join(format!("_tmp_{raw_id}"));
        if tmp_dir.exists() {
            fs::remove_dir_all(&tmp_dir)?;
        }
        fs::create_dir_all(&tmp_dir)?;

        let name = normalize_name(name);
        let created_at_ms = now_ms();
        let manifest = SkinManifest {
            schema_version: MANIFEST_SCHEMA_VERSION,
            id: raw_id.clone(),
            name: name.clone(),
            created_at_ms,
        };
        fs::write(tmp_dir.join(SHEET_FILE_NAME), png_bytes)?;
        fs::write(tmp_dir.join(CONFIG_FILE_NAME), serde_json::to_vec_pretty(config)?)?;
        fs::write(tmp_dir.join(MANIFEST_FILE_NAME), serde_json::to_vec_pretty(&manifest)?)?;

        if skin_dir.exists() {
            // A concurrent import of the same content won the rename
            fs::remove_dir_all(&tmp_dir)?;
        } else {
            fs::rename(&tmp_dir, &skin_dir)?;
        }

        Ok(SkinEntry {
            id: settings_id(&raw_id),
            name,
            sheet_path: skin_dir.join(SHEET_FILE_NAME),
            config: config.clone(),
            created_at_ms,
        })
    }

    /// Import a sheet arriving base64-encoded across a process boundary.
    pub fn import_base64(
        &self,
        png_base64: &str,
        config: &SpriteSheetConfig,
        name: Option<String>,
    ) -> Result<SkinEntry, SkinError> {
        let trimmed = png_base64.trim();
        if trimmed.is_empty() {
            return Err(SkinError::EmptyImage);
        }
        let bytes = BASE64_STANDARD.decode(trimmed.as_bytes())?;
        self.import_bytes(&bytes, config, name)
    }

    /// List stored skins, newest first. Malformed entries are skipped.
    pub fn list(&self) -> Result<Vec<SkinEntry>, SkinError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.root)? {
            let Ok(dir_entry) = dir_entry else { continue };
            let path = dir_entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(raw_id) = path.file_name().and_then(|v| v.to_str()).map(str::to_string)
            else {
                continue;
            };
            if !is_safe_id(&raw_id) {
                continue;
            }
            if let Some(entry) = self.read_entry(&path, &raw_id) {
                entries.push(entry);
            }
        }
        entries.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        Ok(entries)
    }

    /// Look up one skin by settings id.
    pub fn get(&self, id: &str) -> Result<SkinEntry, SkinError> {
        let raw_id = self.checked_raw_id(id)?;
        self.read_entry(&self.root.join(&raw_id), &raw_id)
            .ok_or_else(|| SkinError::UnknownId(id.to_string()))
    }

    /// Load the unpacked `(source bytes, config)` pair for a skin.
    pub fn load_source(&self, id: &str) -> Result<(Vec<u8>, SpriteSheetConfig), SkinError> {
        let entry = self.get(id)?;
        let bytes = fs::read(&entry.sheet_path)?;
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(SkinError::ImageTooLarge { max_mb: MAX_IMAGE_BYTES / 1024 / 1024 });
        }
        Ok((bytes, entry.config))
    }

    /// Delete a skin. Deleting an absent skin is not an error.
    pub fn delete(&self, id: &str) -> Result<(), SkinError> {
        let raw_id = self.checked_raw_id(id)?;
        let dir = self.root.join(&raw_id);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Whether a settings id refers to a stored, complete skin.
    pub fn exists(&self, id: &str) -> bool {
        let Ok(raw_id) = self.checked_raw_id(id) else { return false };
        let dir = self.root.join(raw_id);
        dir.join(SHEET_FILE_NAME).is_file() && dir.join(MANIFEST_FILE_NAME).is_file()
    }

    fn checked_raw_id(&self, id: &str) -> Result<String, SkinError> {
        let raw_id =
            parse_settings_id(id).ok_or_else(|| SkinError::InvalidId(id.to_string()))?;
        if !is_safe_id(raw_id) {
            return Err(SkinError::InvalidId(id.to_string()));
        }
        Ok(raw_id.to_string())
    }

    fn read_entry(&self, dir: &Path, raw_id: &str) -> Option<SkinEntry> {
        let manifest: SkinManifest =
            serde_json::from_slice(&fs::read(dir.join(MANIFEST_FILE_NAME)).ok()?).ok()?;
        if manifest.schema_version != MANIFEST_SCHEMA_VERSION || manifest.id != raw_id {
            return None;
        }
        let config: SpriteSheetConfig =
            serde_json::from_slice(&fs::read(dir.join(CONFIG_FILE_NAME)).ok()?).ok()?;
        let sheet_path = dir.join(SHEET_FILE_NAME);
        if !sheet_path.is_file() {
            return None;
        }
        Some(SkinEntry {
            id: settings_id(raw_id),
            name: manifest.name,
            sheet_path,
            config,
            created_at_ms: manifest.created_at_ms,
        })
    }
}
