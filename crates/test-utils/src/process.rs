//! Helpers to observe processes from tests.

use std::path::Path;
use std::time::{Duration, Instant};

/// Whether `pid` is a live (non-zombie) process.
///
/// Zombies count as dead: an orphan may stay unreaped for a while when the
/// test runs as a child of a PID 1 that does not reap.
#[cfg(unix)]
pub fn is_alive(pid: u32) -> bool {
    if Path::new("/proc/self").exists() {
        return match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(contents) => proc_state(&contents).is_some_and(|s| s != 'Z' && s != 'X'),
            Err(_) => false,
        };
    }

    // SAFETY: signal 0 only checks for existence.
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(unix)]
fn proc_state(stat: &str) -> Option<char> {
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().next()?.chars().next()
}

/// Poll until `pid` is dead; `false` if it is still alive after `timeout`.
#[cfg(unix)]
pub async fn wait_until_dead(pid: u32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while is_alive(pid) {
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    true
}

/// Poll until `path` exists and holds a pid.
pub async fn read_pid_file(path: &Path, timeout: Duration) -> Option<u32> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(contents) = std::fs::read_to_string(path) {
            if let Ok(pid) = contents.trim().parse() {
                return Some(pid);
            }
        }
        if Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
