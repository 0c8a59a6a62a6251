// src/env.rs

//! Environment overlay applied to every launch of the supervised command.
//!
//! Nothing here runs implicitly: the supervisor calls [`EnvSource::load`]
//! right before each spawn, so edits to the env file take effect on the
//! next restart.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::errors::{Result, WatchError};

/// Key/value pairs merged on top of the inherited environment.
pub type EnvOverlay = HashMap<String, String>;

pub trait EnvSource: Send + Sync + Debug {
    fn load(&self) -> Result<EnvOverlay>;
}

/// A dotenv-formatted file, re-read on every call to `load`.
#[derive(Debug, Clone)]
pub struct DotenvFile {
    path: PathBuf,
}

impl DotenvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EnvSource for DotenvFile {
    fn load(&self) -> Result<EnvOverlay> {
        let env_err = |source| WatchError::Env {
            path: self.path.clone(),
            source,
        };

        let mut overlay = EnvOverlay::new();
        for item in dotenvy::from_path_iter(&self.path).map_err(env_err)? {
            let (key, value) = item.map_err(env_err)?;
            overlay.insert(key, value);
        }
        Ok(overlay)
    }
}

/// No overlay; children get the inherited environment only.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEnv;

impl EnvSource for NoEnv {
    fn load(&self) -> Result<EnvOverlay> {
        Ok(EnvOverlay::new())
    }
}
