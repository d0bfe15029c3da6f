//! Build configuration loading.
//!
//! The file format follows the extension: `.json` is read as JSON, anything
//! else as TOML. Missing keys fall back to the defaults of [`BuildConfig`].

use std::path::Path;

use log::debug;

use frame_core::file_io::load_source;
use frame_core::{BuildConfig, ModelError, ModelResult};

pub fn load_config(path: Option<&str>) -> ModelResult<BuildConfig> {
    let Some(path) = path else {
        debug!("No configuration file, using defaults");
        return Ok(BuildConfig::default());
    };

    let path = Path::new(path);
    let text = load_source(path)?;
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let config = if is_json {
        serde_json::from_str(&text).map_err(|e| ModelError::SerializationError {
            reason: format!("Invalid configuration {}: {}", path.display(), e),
        })?
    } else {
        toml::from_str(&text).map_err(|e| ModelError::SerializationError {
            reason: format!("Invalid configuration {}: {}", path.display(), e),
        })?
    };

    debug!(path = path.display().to_string().as_str(); "Loaded configuration");
    Ok(config)
}
