// src/exec/kill.rs

//! Terminating a supervised process together with everything it spawned.
//!
//! Two strategies exist:
//! - [`KillStrategy::Group`] starts the child as the leader of a new process
//!   group and kills the whole group with one `SIGKILL` (unix).
//! - [`KillStrategy::Descendants`] walks the live process table depth-first
//!   and kills children before their parent (procfs on Linux, `taskkill /T`
//!   on Windows).
//!
//! Both treat "no such process" as success so killing an already-finished
//! tree is harmless.

use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

use crate::errors::WatchError;

#[derive(Debug, Error)]
pub enum KillError {
    #[error("no process to kill")]
    NoProcess,

    #[error("listing children of pid {pid}: {source}")]
    Enumerate {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("signalling pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("running taskkill for pid {pid}: {source}")]
    Command {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// Capability the supervisor uses to terminate a process tree.
pub trait ProcessTreeKiller: Send + Sync + fmt::Debug {
    /// Adjust the command before it is spawned. The default does nothing.
    fn prepare(&self, _cmd: &mut Command) {}

    /// Whether `kill_tree` may still be called once the root process has
    /// been reaped.
    ///
    /// A reaped pid can be reused by an unrelated process, so strategies
    /// that address the tree through the root's pid return `false` (the
    /// default). A process group id stays reserved while any member lives.
    fn kills_after_reap(&self) -> bool {
        false
    }

    /// Forcefully terminate `pid` and all of its descendants.
    ///
    /// `None` yields [`KillError::NoProcess`].
    fn kill_tree(&self, pid: Option<u32>) -> Result<(), KillError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KillStrategy {
    /// Signal the child's process group.
    Group,
    /// Enumerate and kill descendants individually.
    Descendants,
}

impl KillStrategy {
    pub fn platform_default() -> Self {
        if cfg!(unix) {
            KillStrategy::Group
        } else {
            KillStrategy::Descendants
        }
    }

    /// Build the killer for this strategy, if the target supports it.
    pub fn killer(self) -> Result<Arc<dyn ProcessTreeKiller>, WatchError> {
        match self {
            #[cfg(unix)]
            KillStrategy::Group => Ok(Arc::new(ProcessGroupKiller)),
            #[cfg(target_os = "linux")]
            KillStrategy::Descendants => Ok(Arc::new(DescendantKiller)),
            #[cfg(windows)]
            KillStrategy::Descendants => Ok(Arc::new(TaskkillKiller)),
            #[allow(unreachable_patterns)]
            other => Err(WatchError::Config(format!(
                "kill strategy '{other}' is not supported on this platform"
            ))),
        }
    }
}

impl Default for KillStrategy {
    fn default() -> Self {
        Self::platform_default()
    }
}

impl fmt::Display for KillStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KillStrategy::Group => f.write_str("group"),
            KillStrategy::Descendants => f.write_str("descendants"),
        }
    }
}

impl FromStr for KillStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "group" => Ok(KillStrategy::Group),
            "descendants" => Ok(KillStrategy::Descendants),
            other => Err(format!(
                "invalid kill_strategy: {other} (expected \"group\" or \"descendants\")"
            )),
        }
    }
}

/// Send `SIGKILL` to `target` (a pid, or a negated process-group id).
///
/// `ESRCH` means the target is already gone and counts as success.
#[cfg(unix)]
fn send_sigkill(target: libc::pid_t) -> io::Result<()> {
    // SAFETY: kill(2) takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::kill(target, libc::SIGKILL) };
    if rc == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(())
    } else {
        Err(err)
    }
}

#[cfg(unix)]
fn to_pid_t(pid: u32) -> Result<libc::pid_t, KillError> {
    match libc::pid_t::try_from(pid) {
        Ok(p) if p > 0 => Ok(p),
        _ => Err(KillError::Signal {
            pid,
            source: io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"),
        }),
    }
}

/// Kills the process group led by the supervised child.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessGroupKiller;

#[cfg(unix)]
impl ProcessTreeKiller for ProcessGroupKiller {
    fn prepare(&self, cmd: &mut Command) {
        // pgid == child's pid
        cmd.process_group(0);
    }

    fn kills_after_reap(&self) -> bool {
        true
    }

    fn kill_tree(&self, pid: Option<u32>) -> Result<(), KillError> {
        let pid = pid.ok_or(KillError::NoProcess)?;
        let pgid = to_pid_t(pid)?;
        send_sigkill(-pgid).map_err(|source| KillError::Signal { pid, source })
    }
}

/// Kills descendants found through `/proc`, leaves first.
#[cfg(target_os = "linux")]
#[derive(Debug, Clone, Copy, Default)]
pub struct DescendantKiller;

#[cfg(target_os = "linux")]
impl ProcessTreeKiller for DescendantKiller {
    fn kill_tree(&self, pid: Option<u32>) -> Result<(), KillError> {
        let pid = pid.ok_or(KillError::NoProcess)?;
        kill_subtree(pid)
    }
}

/// Children are enumerated before `pid` is killed: once a parent dies its
/// children are reparented and can no longer be found through it.
#[cfg(target_os = "linux")]
fn kill_subtree(pid: u32) -> Result<(), KillError> {
    let children = procfs::child_pids(pid).map_err(|source| KillError::Enumerate { pid, source })?;
    for child in children {
        kill_subtree(child)?;
    }
    send_sigkill(to_pid_t(pid)?).map_err(|source| KillError::Signal { pid, source })
}

#[cfg(target_os = "linux")]
pub mod procfs {
    use std::fs;
    use std::io;

    /// Direct children of `parent` according to `/proc/<pid>/stat`.
    ///
    /// Processes that exit while the table is being read are skipped.
    pub fn child_pids(parent: u32) -> io::Result<Vec<u32>> {
        let mut children = Vec::new();
        for entry in fs::read_dir("/proc")? {
            let entry = entry?;
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            else {
                continue;
            };
            let Ok(stat) = fs::read_to_string(entry.path().join("stat")) else {
                continue;
            };
            if parse_ppid(&stat) == Some(parent) {
                children.push(pid);
            }
        }
        Ok(children)
    }

    /// Extract the parent pid from a `stat` line: `pid (comm) state ppid ...`.
    ///
    /// `comm` may itself contain spaces and parentheses, so fields are read
    /// after the last `)`.
    pub fn parse_ppid(stat: &str) -> Option<u32> {
        let rest = &stat[stat.rfind(')')? + 1..];
        let mut fields = rest.split_whitespace();
        fields.next()?;
        fields.next()?.parse().ok()
    }
}

/// Delegates tree enumeration to `taskkill /T /F`.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskkillKiller;

#[cfg(windows)]
impl ProcessTreeKiller for TaskkillKiller {
    fn kill_tree(&self, pid: Option<u32>) -> Result<(), KillError> {
        // taskkill exits with 128 when the process does not exist.
        const NOT_FOUND: i32 = 128;

        let pid = pid.ok_or(KillError::NoProcess)?;
        let status = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map_err(|source| KillError::Command { pid, source })?;

        match status.code() {
            Some(0) | Some(NOT_FOUND) => Ok(()),
            code => Err(KillError::Command {
                pid,
                source: io::Error::other(format!("taskkill exited with {code:?}")),
            }),
        }
    }
}
