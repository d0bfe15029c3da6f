//! # File I/O Module
//!
//! Reading model sources and persisting artifact sets:
//! - **Atomic saves**: Write to .tmp, sync, rename to prevent corruption
//! - **Version validation**: Artifact files must share the current schema major version
//!
//! ## File Format
//!
//! Artifact sets are saved as pretty-printed JSON. The schema is additive, so
//! files written by an older minor version load with defaults for new fields.
//!
//! ## Example
//!
//! ```rust,no_run
//! use frame_core::file_io::{load_artifacts, load_source, save_artifacts};
//! use frame_core::{translate, BuildConfig};
//! use std::path::Path;
//!
//! let text = load_source(Path::new("tower.e2k"))?;
//! let artifacts = translate(&text, BuildConfig::default())?;
//!
//! save_artifacts(&artifacts, Path::new("tower.frame.json"))?;
//! let reloaded = load_artifacts(Path::new("tower.frame.json"))?;
//! assert_eq!(reloaded, artifacts);
//! # Ok::<(), frame_core::errors::ModelError>(())
//! ```

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::artifacts::{ArtifactSet, SCHEMA_VERSION};
use crate::errors::{ModelError, ModelResult};

/// Just enough of an artifact file to check its version before a full parse
#[derive(Deserialize)]
struct SchemaHeader {
    schema_version: String,
}

/// Read a model source file into memory.
pub fn load_source(path: &Path) -> ModelResult<String> {
    let mut file = File::open(path).map_err(|e| ModelError::file_error("open", path.display().to_string(), e.to_string()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| ModelError::file_error("read", path.display().to_string(), e.to_string()))?;

    debug!(path = path.display().to_string().as_str(), bytes = contents.len(); "Loaded model source");
    Ok(contents)
}

/// Save an artifact set with atomic write semantics.
///
/// The save process:
/// 1. Serialize to JSON
/// 2. Write to a temporary file next to the target
/// 3. Sync to disk (fsync)
/// 4. Rename over the target
///
/// # Example
///
/// ```rust,no_run
/// use frame_core::file_io::save_artifacts;
/// use frame_core::{translate, BuildConfig};
/// use std::path::Path;
///
/// let artifacts = translate("$ STORIES\n  STORY \"Base\" ELEV 0\n", BuildConfig::default())?;
/// save_artifacts(&artifacts, Path::new("model.frame.json"))?;
/// # Ok::<(), frame_core::errors::ModelError>(())
/// ```
pub fn save_artifacts(artifacts: &ArtifactSet, path: &Path) -> ModelResult<()> {
    let json = artifacts.to_json()?;

    let tmp_path = tmp_path_for(path);

    if let Err(e) = write_and_rename(&tmp_path, path, json.as_bytes()) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    debug!(path = path.display().to_string().as_str(), bytes = json.len(); "Saved artifact set");
    Ok(())
}

/// Load an artifact set from a file.
///
/// # Returns
///
/// * `Ok(ArtifactSet)` - Successfully loaded
/// * `Err(ModelError::VersionMismatch)` - Written under another schema major version
/// * `Err(ModelError::SerializationError)` - Invalid JSON
/// * `Err(ModelError::FileError)` - I/O error
pub fn load_artifacts(path: &Path) -> ModelResult<ArtifactSet> {
    let contents = load_source(path)?;

    let header: SchemaHeader = serde_json::from_str(&contents).map_err(|e| ModelError::SerializationError {
        reason: format!("Invalid artifact file {}: {}", path.display(), e),
    })?;
    validate_version(&header.schema_version)?;

    serde_json::from_str(&contents).map_err(|e| ModelError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })
}

/// Write `bytes` to `tmp_path`, sync, then move it over `path`
fn write_and_rename(tmp_path: &Path, path: &Path, bytes: &[u8]) -> ModelResult<()> {
    let mut tmp_file = File::create(tmp_path)
        .map_err(|e| ModelError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .write_all(bytes)
        .map_err(|e| ModelError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;

    tmp_file
        .sync_all()
        .map_err(|e| ModelError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string()))?;

    fs::rename(tmp_path, path)
        .map_err(|e| ModelError::file_error("rename to final", path.display().to_string(), e.to_string()))
}

/// `model.frame.json` becomes `model.frame.json.tmp`
fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> ModelResult<()> {
    let major = |version: &str| version.split('.').next().and_then(|p| p.parse::<u32>().ok());

    match (major(file_version), major(SCHEMA_VERSION)) {
        (Some(file), Some(current)) if file == current => Ok(()),
        _ => Err(ModelError::VersionMismatch {
            file_version: file_version.to_string(),
            expected_version: SCHEMA_VERSION.to_string(),
        }),
    }
}
