// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Deciding which changed paths matter ([`filter`]).
//! - Keeping one non-recursive `notify` subscription per watched directory
//!   ([`tree`]).
//! - Folding relevant paths into per-window counts ([`accumulator`]) and
//!   delivering them once a burst goes quiet ([`debounce`]).
//!
//! It does **not** know about the supervised command; the caller decides
//! what a delivered [`ChangeSet`] means.

pub mod accumulator;
pub mod debounce;
pub mod filter;
pub mod path_utils;
pub mod tree;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, Watcher};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::errors::Result;

pub use accumulator::{ChangeAccumulator, ChangeSet};
pub use debounce::Debouncer;
pub use filter::{ChangeFilter, DEFAULT_ENV_FILE};
pub use path_utils::{absolutize, normalize_path};
pub use tree::{Subscriber, TreeWatcher};

/// Files that usually mean "rebuild": Go sources, templates and `go.mod`.
pub const DEFAULT_INCLUDE: &str = r"(?:go\.mod|\.(?:go|tmpl))$";
/// Vendored dependencies are ignored by default.
pub const DEFAULT_EXCLUDE: &str = r"^vendor/";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Everything a watch session needs besides the update callback.
#[derive(Debug)]
pub struct WatchOptions {
    /// Regex a changed path must match.
    pub include: String,
    /// Regex that discards a changed path; empty disables exclusion.
    pub exclude: String,
    /// Roots to watch, in order.
    pub paths: Vec<PathBuf>,
    /// Directory relative roots are resolved against; the current directory
    /// when `None`.
    pub working_dir: Option<PathBuf>,
    /// File name of the env overlay, exempt from `exclude`.
    pub env_file_name: Option<String>,
    /// Quiet period after the last relevant change.
    pub debounce: Duration,
    /// Fired once every root is subscribed.
    pub ready: Option<oneshot::Sender<()>>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            include: DEFAULT_INCLUDE.to_string(),
            exclude: DEFAULT_EXCLUDE.to_string(),
            paths: vec![PathBuf::from(".")],
            working_dir: None,
            env_file_name: Some(DEFAULT_ENV_FILE.to_string()),
            debounce: DEFAULT_DEBOUNCE,
            ready: None,
        }
    }
}

/// Watch `options.paths` until the notification source fails.
///
/// `on_update` receives each non-empty [`ChangeSet`] after its burst has been
/// quiet for `options.debounce`. Every delivery runs in its own Tokio task;
/// deliveries may overlap.
///
/// Returns early with an error if a pattern does not compile, the platform
/// watcher cannot be created, or the initial walk of a root fails. Once
/// watching, only an error reported by the notification source ends the
/// session.
pub async fn watch<F, Fut>(options: WatchOptions, on_update: F) -> Result<()>
where
    F: Fn(ChangeSet) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let WatchOptions {
        include,
        exclude,
        paths,
        working_dir,
        env_file_name,
        debounce,
        ready,
    } = options;

    let filter = ChangeFilter::new(&include, &exclude, env_file_name.as_deref())?;

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let source = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Err(err) = event_tx.send(res) {
                // We can't log via tracing here easily, so fallback to stderr.
                eprintln!("watchrun: failed to forward notify event: {err}");
            }
        },
        Config::default(),
    )?;

    let base = match working_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    // Canonical, since some platforms report events under resolved paths.
    let base = base.canonicalize()?;

    let mut tree = TreeWatcher::new(source, filter, base);
    for root in &paths {
        tree.subscribe_root(root)?;
    }
    info!(
        roots = ?paths,
        directories = tree.subscription_count(),
        "file watcher started"
    );

    let accumulator = Arc::new(ChangeAccumulator::new());
    let debouncer = {
        let accumulator = Arc::clone(&accumulator);
        let on_update = Arc::new(on_update);
        Debouncer::new(debounce, move || {
            let changes = accumulator.drain_and_reset();
            let on_update = Arc::clone(&on_update);
            async move {
                if changes.is_empty() {
                    debug!("window already drained by a concurrent firing");
                    return;
                }
                on_update(changes).await;
            }
        })
    };

    if let Some(ready) = ready {
        let _ = ready.send(());
    }

    while let Some(res) = event_rx.recv().await {
        let event = res?;
        debug!(?event, "received notify event");

        for rel in tree.handle_event(&event) {
            accumulator.record(&rel);
            debouncer.trigger();
        }
    }

    debug!("notify channel closed; watch session finished");
    Ok(())
}
