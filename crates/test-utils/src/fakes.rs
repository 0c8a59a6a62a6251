use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use watchrun::env::{EnvOverlay, EnvSource};
use watchrun::errors::Result;
use watchrun::exec::{KillError, ProcessTreeKiller};
use watchrun::watch::Subscriber;

/// One call made against a [`RecordingSubscriber`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionCall {
    Subscribe(PathBuf),
    Unsubscribe(PathBuf),
}

/// A `Subscriber` that only records which directories were (un)registered.
#[derive(Debug, Default)]
pub struct RecordingSubscriber {
    calls: Vec<SubscriptionCall>,
}

impl RecordingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[SubscriptionCall] {
        &self.calls
    }

    pub fn subscribed(&self) -> Vec<PathBuf> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SubscriptionCall::Subscribe(p) => Some(p.clone()),
                SubscriptionCall::Unsubscribe(_) => None,
            })
            .collect()
    }
}

impl Subscriber for RecordingSubscriber {
    fn subscribe(&mut self, dir: &Path) -> Result<()> {
        self.calls.push(SubscriptionCall::Subscribe(dir.to_path_buf()));
        Ok(())
    }

    fn unsubscribe(&mut self, dir: &Path) -> Result<()> {
        self.calls
            .push(SubscriptionCall::Unsubscribe(dir.to_path_buf()));
        Ok(())
    }
}

/// Wraps a real killer and records every pid it was asked to kill.
#[derive(Debug)]
pub struct RecordingKiller {
    inner: Arc<dyn ProcessTreeKiller>,
    killed: Arc<Mutex<Vec<Option<u32>>>>,
}

impl RecordingKiller {
    pub fn new(inner: Arc<dyn ProcessTreeKiller>) -> Self {
        Self {
            inner,
            killed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn killed(&self) -> Vec<Option<u32>> {
        self.killed.lock().unwrap().clone()
    }
}

impl ProcessTreeKiller for RecordingKiller {
    fn prepare(&self, cmd: &mut tokio::process::Command) {
        self.inner.prepare(cmd);
    }

    fn kills_after_reap(&self) -> bool {
        self.inner.kills_after_reap()
    }

    fn kill_tree(&self, pid: Option<u32>) -> std::result::Result<(), KillError> {
        self.killed.lock().unwrap().push(pid);
        self.inner.kill_tree(pid)
    }
}

/// Fixed env overlay.
#[derive(Debug, Default, Clone)]
pub struct StaticEnv {
    vars: EnvOverlay,
}

impl StaticEnv {
    pub fn new<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvSource for StaticEnv {
    fn load(&self) -> Result<EnvOverlay> {
        Ok(self.vars.clone())
    }
}
