// src/watch/debounce.rs

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Coalesces bursts of [`trigger`](Debouncer::trigger) calls into a single
/// callback invocation, `quiet` after the last trigger of the burst.
///
/// Every invocation is spawned as its own Tokio task. Invocations are not
/// serialized: if triggers keep arriving slower than `quiet` but faster than
/// the callback completes, several callbacks run concurrently. A zero quiet
/// period spawns the callback once per trigger.
///
/// Must be created inside a Tokio runtime. The timer task lives until every
/// clone of the debouncer is dropped; a window that is still pending at that
/// point is fired once more before the task exits.
#[derive(Debug, Clone)]
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
}

impl Debouncer {
    pub fn new<F, Fut>(quiet: Duration, callback: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<()>();

        if quiet.is_zero() {
            tokio::spawn(passthrough_loop(rx, callback));
        } else {
            tokio::spawn(debounce_loop(quiet, rx, callback));
        }

        Self { tx }
    }

    /// Signal activity; restarts the quiet period.
    pub fn trigger(&self) {
        if self.tx.send(()).is_err() {
            debug!("debounce loop has stopped; dropping trigger");
        }
    }
}

async fn passthrough_loop<F, Fut>(mut rx: mpsc::UnboundedReceiver<()>, callback: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    while rx.recv().await.is_some() {
        tokio::spawn(callback());
    }
}

async fn debounce_loop<F, Fut>(quiet: Duration, mut rx: mpsc::UnboundedReceiver<()>, callback: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let timer = sleep(quiet);
    tokio::pin!(timer);
    let mut armed = false;

    loop {
        tokio::select! {
            ping = rx.recv() => match ping {
                Some(()) => {
                    timer.as_mut().reset(Instant::now() + quiet);
                    armed = true;
                }
                None => {
                    if armed {
                        timer.as_mut().await;
                        tokio::spawn(callback());
                    }
                    break;
                }
            },
            () = timer.as_mut(), if armed => {
                armed = false;
                debug!(?quiet, "quiet period elapsed; firing callback");
                tokio::spawn(callback());
            }
        }
    }

    debug!("debounce loop finished");
}
