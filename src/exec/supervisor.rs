// src/exec/supervisor.rs

//! Owner of the one live supervised process.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::process::{Child, Command};
use tokio::sync::{Mutex, oneshot, watch};
use tracing::{debug, info, warn};

use crate::env::EnvSource;
use crate::errors::{Result, WatchError};
use crate::exec::kill::{KillError, ProcessTreeKiller};

/// Read-only view of a launched process.
///
/// The handle can wait for the process to exit but cannot signal it; only
/// the supervisor may terminate the process.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: u32,
    exit: watch::Receiver<Option<ExitStatus>>,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Wait until the process has exited and been reaped.
    ///
    /// Returns `None` if the exit status could not be collected.
    pub async fn wait(&mut self) -> Option<ExitStatus> {
        match self.exit.wait_for(Option::is_some).await {
            Ok(status) => *status,
            Err(_) => None,
        }
    }
}

/// Internal record of the currently running process.
///
/// - `cancel` asks the reaper task to kill the direct child (fallback if the
///   tree kill missed it) and reap it.
/// - `exit` is published by the reaper once the child is gone.
struct SupervisedProcess {
    pid: u32,
    cancel: Option<oneshot::Sender<()>>,
    exit: watch::Receiver<Option<ExitStatus>>,
}

/// Kills and restarts one command, never letting two of its process trees
/// be alive at once.
///
/// `kill_and_maybe_restart` holds the supervisor lock for the whole
/// kill-then-start sequence, so overlapping restart requests queue up
/// instead of interleaving.
pub struct ProcessSupervisor {
    args: Vec<String>,
    env: Arc<dyn EnvSource>,
    killer: Arc<dyn ProcessTreeKiller>,
    current: Mutex<Option<SupervisedProcess>>,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("args", &self.args)
            .field("killer", &self.killer)
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    /// `args[0]` is the program, the rest its arguments.
    pub fn new(
        args: Vec<String>,
        env: Arc<dyn EnvSource>,
        killer: Arc<dyn ProcessTreeKiller>,
    ) -> Result<Self> {
        if args.is_empty() {
            return Err(WatchError::EmptyCommand);
        }
        Ok(Self {
            args,
            env,
            killer,
            current: Mutex::new(None),
        })
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Kill the current process tree (if any), then start a fresh process
    /// when `start` is true.
    ///
    /// The kill step waits until the old child has been reaped. A launch
    /// failure is returned, leaves no process recorded, and does not affect
    /// later calls.
    pub async fn kill_and_maybe_restart(&self, start: bool) -> Result<Option<ProcessHandle>> {
        let mut current = self.current.lock().await;

        if let Some(process) = current.take() {
            self.terminate(process).await;
        }

        if !start {
            return Ok(None);
        }

        let (process, handle) = self.launch()?;
        *current = Some(process);
        Ok(Some(handle))
    }

    async fn terminate(&self, mut process: SupervisedProcess) {
        let pid = process.pid;
        let already_exited = process.exit.borrow().is_some();

        if already_exited && !self.killer.kills_after_reap() {
            debug!(pid, "process already reaped; not signalling a possibly reused pid");
        } else {
            let killer = Arc::clone(&self.killer);
            let killed = tokio::task::spawn_blocking(move || killer.kill_tree(Some(pid))).await;
            match killed {
                Ok(Ok(())) => debug!(pid, already_exited, "process tree killed"),
                Ok(Err(KillError::NoProcess)) => {}
                Ok(Err(err)) => warn!(pid, error = %err, "failed to kill process tree"),
                Err(err) => warn!(pid, error = %err, "kill task panicked"),
            }
        }

        if let Some(cancel) = process.cancel.take() {
            if cancel.send(()).is_err() {
                debug!(pid, "reaper already finished");
            }
        }

        match process.exit.wait_for(Option::is_some).await {
            Ok(status) => info!(pid, status = ?*status, "process terminated"),
            Err(_) => debug!(pid, "reaper dropped without an exit status"),
        }
    }

    fn launch(&self) -> Result<(SupervisedProcess, ProcessHandle)> {
        let program = &self.args[0];

        let mut cmd = Command::new(program);
        cmd.args(&self.args[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        match self.env.load() {
            Ok(overlay) => {
                debug!(vars = overlay.len(), "applying env overlay");
                cmd.envs(overlay);
            }
            Err(err) => debug!(error = %err, "env overlay unavailable; using inherited environment"),
        }

        self.killer.prepare(&mut cmd);

        let child = cmd.spawn().map_err(|source| WatchError::Spawn {
            program: program.clone(),
            source,
        })?;
        let pid = child.id().unwrap_or_default();
        info!(pid, args = ?self.args, "process started");

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let (exit_tx, exit_rx) = watch::channel::<Option<ExitStatus>>(None);
        tokio::spawn(reap(child, pid, cancel_rx, exit_tx));

        let process = SupervisedProcess {
            pid,
            cancel: Some(cancel_tx),
            exit: exit_rx.clone(),
        };
        let handle = ProcessHandle { pid, exit: exit_rx };
        Ok((process, handle))
    }
}

/// Wait for `child` to exit on its own, or kill it when cancellation is
/// requested; publish the exit status either way.
async fn reap(
    mut child: Child,
    pid: u32,
    mut cancel_rx: oneshot::Receiver<()>,
    exit_tx: watch::Sender<Option<ExitStatus>>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        // An explicit cancel and a dropped supervisor both end the child.
        _ = &mut cancel_rx => {
            if let Err(e) = child.start_kill() {
                debug!(pid, error = %e, "child already exited");
            }
            child.wait().await
        }
    };

    match status {
        Ok(status) => {
            debug!(pid, ?status, "process exited");
            exit_tx.send_replace(Some(status));
        }
        Err(e) => warn!(pid, error = %e, "failed to wait for process"),
    }
}
