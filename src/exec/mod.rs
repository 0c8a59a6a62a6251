// src/exec/mod.rs

//! Process execution layer.
//!
//! This module runs the supervised command with `tokio::process::Command`
//! and makes sure a restart never leaves the previous process tree behind.
//!
//! - [`supervisor`] owns the single live process and serializes
//!   kill-then-start.
//! - [`kill`] provides the platform strategies for terminating a process
//!   together with its descendants.

pub mod kill;
pub mod supervisor;

pub use kill::{KillError, KillStrategy, ProcessTreeKiller};
pub use supervisor::{ProcessHandle, ProcessSupervisor};
