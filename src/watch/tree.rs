// src/watch/tree.rs

//! Directory subscription bookkeeping.
//!
//! Every non-excluded directory under a root is registered individually with
//! the notification source (non-recursive), and the set is kept in sync as
//! directories appear and disappear during the session.
//!
//! Subscriptions are keyed by absolute path, the form the OS reports events
//! in. Patterns see each path relative to the root it lives under, spelled
//! the way that root was given (`"."` yields `src/x.go`).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::Result;
use crate::watch::filter::ChangeFilter;
use crate::watch::path_utils::{absolutize, normalize_path};

/// Something directories can be registered with.
///
/// Production uses the platform `notify` watcher; tests can record calls
/// instead of touching the OS.
pub trait Subscriber: Send {
    fn subscribe(&mut self, dir: &Path) -> Result<()>;
    fn unsubscribe(&mut self, dir: &Path) -> Result<()>;
}

impl Subscriber for RecommendedWatcher {
    fn subscribe(&mut self, dir: &Path) -> Result<()> {
        self.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    fn unsubscribe(&mut self, dir: &Path) -> Result<()> {
        self.unwatch(dir)?;
        Ok(())
    }
}

/// What an event means for one of its paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathChange {
    Created,
    Removed,
    Other,
}

fn classify(kind: &EventKind, index: usize) -> PathChange {
    match kind {
        EventKind::Create(_) => PathChange::Created,
        EventKind::Remove(_) => PathChange::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => PathChange::Removed,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => PathChange::Created,
        // `Both` carries [from, to].
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if index == 0 {
                PathChange::Removed
            } else {
                PathChange::Created
            }
        }
        _ => PathChange::Other,
    }
}

/// A watched root: absolute for matching event paths, as written for naming.
#[derive(Debug, Clone)]
struct Root {
    absolute: PathBuf,
    written: PathBuf,
}

pub struct TreeWatcher<S> {
    source: S,
    filter: ChangeFilter,
    /// Relative roots and event paths are resolved against this directory.
    base: PathBuf,
    roots: Vec<Root>,
    subscriptions: HashSet<PathBuf>,
}

impl<S> std::fmt::Debug for TreeWatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeWatcher")
            .field("filter", &self.filter)
            .field("base", &self.base)
            .field("subscriptions", &self.subscriptions.len())
            .finish_non_exhaustive()
    }
}

impl<S: Subscriber> TreeWatcher<S> {
    /// `base` is normally the current directory of the process.
    pub fn new(source: S, filter: ChangeFilter, base: impl Into<PathBuf>) -> Self {
        Self {
            source,
            filter,
            base: base.into(),
            roots: Vec::new(),
            subscriptions: HashSet::new(),
        }
    }

    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn is_subscribed(&self, dir: &Path) -> bool {
        self.subscriptions.contains(&absolutize(&self.base, dir))
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Subscribe `root` and every non-excluded directory below it.
    ///
    /// Any walk or registration error is returned; during initialization the
    /// caller treats it as fatal.
    pub fn subscribe_root(&mut self, root: &Path) -> Result<()> {
        let absolute = absolutize(&self.base, root);
        if !self.roots.iter().any(|r| r.absolute == absolute) {
            self.roots.push(Root {
                absolute: absolute.clone(),
                written: root.to_path_buf(),
            });
        }

        for dir in self.directories_under(&absolute)? {
            self.register(&dir)?;
        }
        debug!(?root, total = self.subscriptions.len(), "root subscribed");
        Ok(())
    }

    /// The normalized name `path` is filtered and reported under.
    ///
    /// The innermost root containing `path` supplies the prefix; a path
    /// outside every root keeps its absolute form.
    pub fn relative_name(&self, path: &Path) -> String {
        let absolute = absolutize(&self.base, path);
        let under_root = self
            .roots
            .iter()
            .filter(|r| absolute.starts_with(&r.absolute))
            .max_by_key(|r| r.absolute.components().count())
            .and_then(|r| {
                absolute
                    .strip_prefix(&r.absolute)
                    .ok()
                    .map(|rest| r.written.join(rest))
            });

        normalize_path(under_root.as_deref().unwrap_or(absolute.as_path()))
    }

    /// `root` must be absolute; so is every returned directory.
    fn directories_under(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();

        let walker = WalkDir::new(root).into_iter().filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !self.filter.skips_dir(&self.relative_name(entry.path()))
        });

        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_dir() {
                dirs.push(entry.into_path());
            }
        }
        Ok(dirs)
    }

    fn register(&mut self, dir: &Path) -> Result<()> {
        if self.subscriptions.contains(dir) {
            return Ok(());
        }
        self.source.subscribe(dir)?;
        self.subscriptions.insert(dir.to_path_buf());
        Ok(())
    }

    /// Drop `dir` (and anything registered below it) from the set.
    ///
    /// A path that was never registered is ignored.
    fn forget(&mut self, dir: &Path) {
        if !self.subscriptions.remove(dir) {
            return;
        }
        if let Err(err) = self.source.unsubscribe(dir) {
            debug!(?dir, error = %err, "unsubscribe failed; directory already gone");
        }
        self.subscriptions.retain(|p| !p.starts_with(dir));
        debug!(?dir, total = self.subscriptions.len(), "directory unsubscribed");
    }

    /// Apply one raw event to the subscription set and return the normalized
    /// paths it contributes to the current change set.
    ///
    /// Per-path failures (a directory vanishing before it can be walked, a
    /// registration refused by the OS) are logged and skipped.
    pub fn handle_event(&mut self, event: &Event) -> Vec<String> {
        if matches!(
            event.kind,
            EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_))
        ) {
            return Vec::new();
        }

        let mut relevant = Vec::new();

        for (index, path) in event.paths.iter().enumerate() {
            if path.as_os_str().is_empty() {
                continue;
            }

            let path = absolutize(&self.base, path);
            let rel = self.relative_name(&path);
            if self.filter.is_excluded(&rel) && !self.filter.is_env_file(&rel) {
                debug!(path = %rel, "excluded");
                continue;
            }

            match classify(&event.kind, index) {
                PathChange::Removed => self.forget(&path),
                PathChange::Created => {
                    if path.is_dir() && !self.filter.skips_dir(&rel) {
                        self.extend_with(&path);
                    }
                }
                PathChange::Other => {}
            }

            if self.filter.relevant(&rel) {
                relevant.push(rel);
            }
        }

        relevant
    }

    fn extend_with(&mut self, dir: &Path) {
        let dirs = match self.directories_under(dir) {
            Ok(dirs) => dirs,
            Err(err) => {
                warn!(?dir, error = %err, "failed to walk new directory");
                return;
            }
        };
        for dir in dirs {
            if let Err(err) = self.register(&dir) {
                warn!(?dir, error = %err, "failed to subscribe new directory");
            }
        }
        debug!(?dir, total = self.subscriptions.len(), "new directory subscribed");
    }
}
