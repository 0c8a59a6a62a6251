// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{RawConfigFile, Settings};
use crate::errors::{Result, WatchError};
use crate::watch::{DEFAULT_DEBOUNCE, DEFAULT_ENV_FILE, DEFAULT_EXCLUDE, DEFAULT_INCLUDE};

impl TryFrom<RawConfigFile> for Settings {
    type Error = WatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let paths = resolve_paths(raw.paths)?;

        let debounce = match raw.debounce {
            Some(s) => parse_duration(&s).map_err(WatchError::Config)?,
            None => DEFAULT_DEBOUNCE,
        };

        let env_file = match raw.env_file {
            Some(s) if s.trim().is_empty() => None,
            Some(s) => Some(PathBuf::from(s)),
            None => Some(PathBuf::from(DEFAULT_ENV_FILE)),
        };

        let kill_strategy = raw.kill_strategy.unwrap_or_default();
        // Fail on startup rather than on the first restart.
        kill_strategy.killer()?;

        Ok(Settings {
            include: raw.include.unwrap_or_else(|| DEFAULT_INCLUDE.to_string()),
            exclude: raw.exclude.unwrap_or_else(|| DEFAULT_EXCLUDE.to_string()),
            paths,
            env_file,
            debounce,
            kill_strategy,
            command: raw.command.unwrap_or_default(),
        })
    }
}

fn resolve_paths(paths: Option<Vec<String>>) -> Result<Vec<PathBuf>> {
    let paths = match paths {
        Some(list) if !list.is_empty() => list,
        _ => return Ok(vec![PathBuf::from(".")]),
    };

    if paths.iter().any(|p| p.trim().is_empty()) {
        return Err(WatchError::Config(
            "watch paths must not contain empty entries".to_string(),
        ));
    }
    Ok(paths.into_iter().map(PathBuf::from).collect())
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
///
/// A bare `"0"` is accepted and disables debouncing.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
