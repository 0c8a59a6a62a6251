// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawConfigFile, Settings};
use crate::errors::Result;

/// Load a configuration file from a given path.
///
/// This only performs TOML deserialization; values are validated when the
/// layers are resolved into [`Settings`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Resolve settings from the config file layer plus `overrides`.
///
/// - `explicit = Some(path)`: the file must exist and parse.
/// - `explicit = None`: [`default_config_path`] is used when it exists and
///   silently skipped otherwise.
pub fn load_layered(explicit: Option<&Path>, overrides: RawConfigFile) -> Result<Settings> {
    let file_layer = match explicit {
        Some(path) => load_from_path(path)?,
        None => {
            let path = default_config_path();
            if path.is_file() {
                load_from_path(&path)?
            } else {
                debug!(?path, "no config file; using flags and defaults");
                RawConfigFile::default()
            }
        }
    };

    Settings::try_from(file_layer.layered_under(overrides))
}

/// `watchrun.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("watchrun.toml")
}
