// src/errors.rs

//! Crate-wide error type.
//!
//! Only a few variants end a watch session: `InvalidPattern`, `Notify`,
//! `Walk`, and `Io` when the working directory cannot be resolved. The rest
//! are produced by per-launch or per-kill operations and are logged by their
//! callers instead of being propagated.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::exec::kill::KillError;

/// Which of the two filter patterns failed to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Include,
    Exclude,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::Include => f.write_str("include"),
            PatternKind::Exclude => f.write_str("exclude"),
        }
    }
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("invalid {kind} pattern '{pattern}': {source}")]
    InvalidPattern {
        kind: PatternKind,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("file watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("walking watch root failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("command must contain at least the program name")]
    EmptyCommand,

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to kill process tree: {0}")]
    Kill(#[from] KillError),

    #[error("failed to load env file {path:?}: {source}")]
    Env {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, WatchError>;
