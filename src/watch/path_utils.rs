// src/watch/path_utils.rs

//! Path forms used by the watcher.
//!
//! Directories are registered with the notification source in absolute form,
//! so removal events can be matched against the subscription set. Patterns
//! and change sets use the form the user wrote the root in (`"."` gives
//! `src/x.go`), produced by [`normalize_path`].

use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `base`, folding `.` and `..` lexically.
///
/// Symlinks are not resolved. An absolute `path` ignores `base`.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in base.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `/..` is `/`
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Normalize a path into the relative form patterns are matched against.
///
/// Backslashes become forward slashes, leading separators are stripped and
/// `.` / `..` segments are resolved lexically. An empty result is `"."`.
pub fn normalize_path(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");

    let mut parts: Vec<&str> = Vec::new();
    for segment in raw.trim_start_matches('/').split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}
