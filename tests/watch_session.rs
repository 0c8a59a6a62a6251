// tests/watch_session.rs
//
// End-to-end watch sessions against the platform notification source.

use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use watchrun::errors::{PatternKind, WatchError};
use watchrun::watch::{ChangeSet, WatchOptions, watch};
use watchrun_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

struct Session {
    root: PathBuf,
    deliveries: mpsc::UnboundedReceiver<ChangeSet>,
    task: JoinHandle<watchrun::errors::Result<()>>,
    _dir: tempfile::TempDir,
}

impl Session {
    /// Wait for a delivery containing `key`, returning everything delivered
    /// up to and including it.
    async fn until_delivered(&mut self, key: &str) -> Result<Vec<ChangeSet>, Box<dyn Error>> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let changes = tokio::time::timeout(remaining, self.deliveries.recv())
                .await
                .map_err(|_| format!("no delivery containing {key}"))?
                .ok_or("session ended")?;
            let found = changes.contains_key(key);
            seen.push(changes);
            if found {
                return Ok(seen);
            }
        }
    }

    /// Everything delivered within `quiet`.
    async fn drain_for(&mut self, quiet: Duration) -> Vec<ChangeSet> {
        sleep(quiet).await;
        let mut seen = Vec::new();
        while let Ok(changes) = self.deliveries.try_recv() {
            seen.push(changes);
        }
        seen
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Watch `"."` inside a fresh tree that already holds `src/x.go`.
async fn start_session(include: &str, exclude: &str) -> Result<Session, Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    // Canonical so that reported paths match on platforms that resolve symlinks.
    let root = dir.path().canonicalize()?;
    fs::create_dir_all(root.join("src"))?;
    fs::write(root.join("src/x.go"), b"package x\n")?;

    let (ready_tx, ready_rx) = oneshot::channel();
    let (tx, deliveries) = mpsc::unbounded_channel();

    let options = WatchOptions {
        include: include.to_string(),
        exclude: exclude.to_string(),
        paths: vec![PathBuf::from(".")],
        working_dir: Some(root.clone()),
        debounce: Duration::from_millis(100),
        ready: Some(ready_tx),
        ..WatchOptions::default()
    };

    let task = tokio::spawn(watch(options, move |changes| {
        let _ = tx.send(changes);
        async {}
    }));

    with_timeout(ready_rx).await?;

    Ok(Session {
        root,
        deliveries,
        task,
        _dir: dir,
    })
}

fn append(path: &std::path::Path, line: &str) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new().append(true).open(path)?;
    file.write_all(line.as_bytes())
}

#[tokio::test]
async fn write_to_included_file_is_delivered_with_relative_name() -> TestResult {
    init_tracing();
    let mut session = start_session(r"\.go$", "^vendor/").await?;

    fs::write(session.root.join("src/y.go"), b"package x")?;

    let seen = session.until_delivered("src/y.go").await?;
    let last = seen.last().ok_or("no deliveries")?;
    assert!(last["src/y.go"] >= 1);
    assert!(
        seen.iter().flat_map(|c| c.keys()).all(|k| k.starts_with("src/")),
        "keys must be relative to the root: {seen:?}"
    );
    Ok(())
}

/// Default patterns, root `.`: a vendor directory made at runtime stays
/// silent and a single append to `src/x.go` is delivered once.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn default_patterns_deliver_only_the_source_write() -> TestResult {
    init_tracing();
    let defaults = WatchOptions::default();
    let mut session = start_session(&defaults.include, &defaults.exclude).await?;

    fs::create_dir(session.root.join("vendor"))?;
    sleep(Duration::from_millis(200)).await;
    fs::write(session.root.join("vendor/x.go"), b"package vendored\n")?;
    append(&session.root.join("src/x.go"), "// edit\n")?;

    let mut seen = session.until_delivered("src/x.go").await?;
    seen.extend(session.drain_for(Duration::from_millis(400)).await);

    let expected: ChangeSet = BTreeMap::from([("src/x.go".to_string(), 1)]);
    assert_eq!(seen, vec![expected]);
    Ok(())
}

#[tokio::test]
async fn excluded_paths_never_appear() -> TestResult {
    init_tracing();
    let mut session = start_session(r"\.go$", "^vendor/").await?;
    fs::create_dir(session.root.join("vendor"))?;
    sleep(Duration::from_millis(200)).await;

    fs::write(session.root.join("vendor/x.go"), b"package vendored")?;
    append(&session.root.join("src/x.go"), "// edit\n")?;

    let mut seen = session.until_delivered("src/x.go").await?;
    seen.extend(session.drain_for(Duration::from_millis(300)).await);

    assert!(seen.iter().all(|c| !c.contains_key("vendor/x.go")), "got {seen:?}");
    Ok(())
}

#[tokio::test]
async fn files_in_new_subdirectories_are_observed() -> TestResult {
    init_tracing();
    let mut session = start_session(r"\.go$", "^vendor/").await?;

    let fresh = session.root.join("src/fresh");
    fs::create_dir(&fresh)?;
    // Let the creation event be processed so the directory gets subscribed.
    sleep(Duration::from_millis(300)).await;

    fs::write(fresh.join("y.go"), b"package fresh")?;

    session.until_delivered("src/fresh/y.go").await?;
    Ok(())
}

#[tokio::test]
async fn env_file_changes_are_delivered_despite_exclusion() -> TestResult {
    init_tracing();
    let mut session = start_session(r"\.go$", r"^vendor/|\.env$").await?;

    fs::write(session.root.join(".env"), b"PORT=8080\n")?;

    session.until_delivered(".env").await?;
    Ok(())
}

#[tokio::test]
async fn invalid_pattern_fails_before_watching() -> TestResult {
    init_tracing();

    let options = WatchOptions {
        include: "(".to_string(),
        ..WatchOptions::default()
    };
    let res = with_timeout(watch(options, |_changes| async {})).await;

    match res {
        Err(WatchError::InvalidPattern { kind, .. }) => assert_eq!(kind, PatternKind::Include),
        other => panic!("expected invalid pattern, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn missing_root_fails_before_ready() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let (ready_tx, mut ready_rx) = oneshot::channel();
    let options = WatchOptions {
        paths: vec![PathBuf::from("missing")],
        working_dir: Some(dir.path().to_path_buf()),
        ready: Some(ready_tx),
        ..WatchOptions::default()
    };
    let res = with_timeout(watch(options, |_changes| async {})).await;

    assert!(matches!(res, Err(WatchError::Walk(_))), "got {res:?}");
    assert!(ready_rx.try_recv().is_err(), "ready must not fire on a failed start");
    Ok(())
}
