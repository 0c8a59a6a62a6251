// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, ValueEnum};

use crate::config::RawConfigFile;
use crate::exec::KillStrategy;

const EXAMPLES: &str = "\
Examples:

  watchrun go run ./cmd/app
        listen for changes in the current path and execute go run
  watchrun -p . -p /tmp/somedir go run ./cmd/app
        listen for changes in the current path and in a specific path
  watchrun -m '(\\.go|\\.txt)$' go run ./cmd/app
        listen for changes on .go and .txt files only
  watchrun -e 'specific.go$' go run ./cmd/app
        listen for changes except for the specified match";

/// Command-line arguments for `watchrun`.
///
/// Flags left unset fall back to the config file, then to built-in defaults.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchrun",
    version,
    about = "Restart a command whenever matching files change.",
    long_about = None,
    after_help = EXAMPLES
)]
pub struct CliArgs {
    /// Regex a changed path must match to trigger a restart
    /// [default: (?:go\.mod|\.(?:go|tmpl))$].
    #[arg(short = 'm', long = "match", value_name = "REGEX")]
    pub include: Option<String>,

    /// Regex of paths to ignore [default: ^vendor/].
    #[arg(short = 'e', long, value_name = "REGEX")]
    pub exclude: Option<String>,

    /// Path to watch; repeat for several roots [default: .].
    #[arg(short = 'p', long = "path", value_name = "PATH")]
    pub paths: Vec<String>,

    /// Env file loaded into the command's environment on every start
    /// [default: .env]. Pass an empty string to disable.
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<String>,

    /// Quiet period after the last change before restarting
    /// (e.g. 500ms, 2s) [default: 500ms].
    #[arg(long, value_name = "DURATION")]
    pub debounce: Option<String>,

    /// How the previous process tree is terminated.
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub kill_strategy: Option<KillStrategy>,

    /// Path to a TOML config file [default: watchrun.toml if present].
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Command to run, followed by its arguments.
    #[arg(
        value_name = "CMD",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

impl CliArgs {
    /// The CLI as the highest-priority config layer.
    pub fn overrides(&self) -> RawConfigFile {
        RawConfigFile {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            paths: (!self.paths.is_empty()).then(|| self.paths.clone()),
            env_file: self.env_file.clone(),
            debounce: self.debounce.clone(),
            kill_strategy: self.kill_strategy,
            command: (!self.command.is_empty()).then(|| self.command.clone()),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Print the usage text to stderr.
pub fn print_usage() {
    let help = CliArgs::command().render_help();
    eprintln!("{help}");
}
