// src/config/model.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::env::{DotenvFile, EnvSource, NoEnv};
use crate::exec::KillStrategy;
use crate::watch::WatchOptions;

/// One configuration layer, as read from a TOML file or built from CLI flags.
///
/// ```toml
/// match = '\.(go|tmpl)$'
/// exclude = '^vendor/'
/// paths = [".", "../shared"]
/// env_file = ".env"
/// debounce = "500ms"
/// kill_strategy = "group"
/// command = ["go", "run", "./cmd/app"]
/// ```
///
/// Every field is optional; unset fields fall through to the next layer and
/// finally to the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Include regex (`match` in TOML).
    #[serde(default, rename = "match")]
    pub include: Option<String>,

    /// Exclude regex; an empty string disables exclusion.
    #[serde(default)]
    pub exclude: Option<String>,

    /// Roots to watch.
    #[serde(default)]
    pub paths: Option<Vec<String>>,

    /// Env-overlay file; an empty string disables the overlay.
    #[serde(default)]
    pub env_file: Option<String>,

    /// Quiet period, e.g. `"500ms"` or `"2s"`.
    #[serde(default)]
    pub debounce: Option<String>,

    #[serde(default)]
    pub kill_strategy: Option<KillStrategy>,

    /// Program followed by its arguments.
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

impl RawConfigFile {
    /// Combine two layers; values set in `over` win.
    pub fn layered_under(self, over: RawConfigFile) -> RawConfigFile {
        RawConfigFile {
            include: over.include.or(self.include),
            exclude: over.exclude.or(self.exclude),
            paths: over.paths.or(self.paths),
            env_file: over.env_file.or(self.env_file),
            debounce: over.debounce.or(self.debounce),
            kill_strategy: over.kill_strategy.or(self.kill_strategy),
            command: over.command.or(self.command),
        }
    }
}

/// Fully resolved settings; construct with `Settings::try_from(raw)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub include: String,
    pub exclude: String,
    pub paths: Vec<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub debounce: Duration,
    pub kill_strategy: KillStrategy,
    /// Empty when no command was configured.
    pub command: Vec<String>,
}

impl Settings {
    /// Options for a watch session (without a readiness signal).
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            paths: self.paths.clone(),
            working_dir: None,
            env_file_name: self
                .env_file
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|name| name.to_string_lossy().into_owned()),
            debounce: self.debounce,
            ready: None,
        }
    }

    pub fn env_source(&self) -> Arc<dyn EnvSource> {
        match &self.env_file {
            Some(path) => Arc::new(DotenvFile::new(path.clone())),
            None => Arc::new(NoEnv),
        }
    }
}
