// src/lib.rs

pub mod cli;
pub mod config;
pub mod env;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::CliArgs;
use crate::config::load_layered;
use crate::exec::ProcessSupervisor;
use crate::watch::{ChangeSet, watch};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config layering (flags > config file > defaults)
/// - the process supervisor and its kill strategy
/// - the initial launch of the command
/// - the watch session, whose deliveries restart the command
/// - Ctrl-C handling, which kills the process tree on the way out
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = load_layered(args.config.as_deref(), args.overrides())?;

    if settings.command.is_empty() {
        cli::print_usage();
        return Ok(());
    }

    let supervisor = Arc::new(ProcessSupervisor::new(
        settings.command.clone(),
        settings.env_source(),
        settings.kill_strategy.killer()?,
    )?);

    // Start the command before any change arrives.
    tokio::spawn(restart(Arc::clone(&supervisor), ChangeSet::new()));

    let on_update = {
        let supervisor = Arc::clone(&supervisor);
        move |changes: ChangeSet| restart(Arc::clone(&supervisor), changes)
    };

    let outcome = tokio::select! {
        res = watch(settings.watch_options(), on_update) => res.map_err(anyhow::Error::from),
        res = tokio::signal::ctrl_c() => {
            info!("interrupted; shutting down");
            res.map_err(anyhow::Error::from)
        }
    };

    if let Err(err) = supervisor.kill_and_maybe_restart(false).await {
        warn!(error = %err, "failed to stop command during shutdown");
    }

    outcome
}

/// Update callback: log what changed, restart the command and wait for the
/// new process to exit (normally because the next restart killed it).
async fn restart(supervisor: Arc<ProcessSupervisor>, changes: ChangeSet) {
    for (path, count) in &changes {
        info!("updates: {path} ({count})");
    }
    info!("run triggered...");

    match supervisor.kill_and_maybe_restart(true).await {
        Ok(Some(mut handle)) => {
            let status = handle.wait().await;
            info!(pid = handle.pid(), ?status, "process exited");
        }
        Ok(None) => {}
        Err(err) => warn!(error = %err, "failed to start command"),
    }
}
