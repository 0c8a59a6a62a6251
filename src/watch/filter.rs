// src/watch/filter.rs

//! Include/exclude relevance rules for changed paths.
//!
//! Patterns are regular expressions evaluated against a normalized relative
//! path (see [`normalize_path`](crate::watch::path_utils::normalize_path)),
//! e.g. `"src/main.go"`. A change is relevant when the include pattern
//! matches and the exclude pattern does not. The env-overlay file is the
//! single exception: it is always relevant, so that editing it restarts the
//! command with the new environment.

use regex::Regex;

use crate::errors::{PatternKind, Result, WatchError};

/// Env-overlay file loaded by default before every launch.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Version-control metadata directory that is never subscribed.
pub const VCS_DIR: &str = ".git";

#[derive(Debug, Clone)]
pub struct ChangeFilter {
    include: Regex,
    /// `None` when the exclude pattern is empty.
    exclude: Option<Regex>,
    env_file_name: Option<String>,
}

impl ChangeFilter {
    /// Compile both patterns.
    ///
    /// `env_file_name` is the bare file name (not a path) of the env-overlay
    /// file whose changes are always relevant.
    pub fn new(include: &str, exclude: &str, env_file_name: Option<&str>) -> Result<Self> {
        let include = Regex::new(include).map_err(|source| WatchError::InvalidPattern {
            kind: PatternKind::Include,
            pattern: include.to_string(),
            source,
        })?;

        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(
                Regex::new(exclude).map_err(|source| WatchError::InvalidPattern {
                    kind: PatternKind::Exclude,
                    pattern: exclude.to_string(),
                    source,
                })?,
            )
        };

        Ok(Self {
            include,
            exclude,
            env_file_name: env_file_name.map(str::to_string),
        })
    }

    /// Whether a change to `rel_path` should be reported.
    pub fn relevant(&self, rel_path: &str) -> bool {
        if self.is_env_file(rel_path) {
            return true;
        }
        self.include.is_match(rel_path) && !self.is_excluded(rel_path)
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|re| re.is_match(rel_path))
    }

    /// True when the last component of `rel_path` is the env-overlay file.
    pub fn is_env_file(&self, rel_path: &str) -> bool {
        match &self.env_file_name {
            Some(name) => rel_path.rsplit('/').next() == Some(name.as_str()),
            None => false,
        }
    }

    /// Whether a directory must stay out of the subscription set.
    ///
    /// The directory is tested both bare and with a trailing slash, so a
    /// pattern like `^vendor/` keeps `vendor` itself unsubscribed.
    pub fn skips_dir(&self, rel_dir: &str) -> bool {
        if rel_dir.rsplit('/').next() == Some(VCS_DIR) {
            return true;
        }
        self.is_excluded(rel_dir) || self.is_excluded(&format!("{rel_dir}/"))
    }
}
