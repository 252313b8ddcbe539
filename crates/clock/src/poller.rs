//! Cancellable repeating task.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};

/// A task that calls a closure on a fixed period until cancelled.
///
/// The first call happens immediately. Dropping the `PollTask` cancels
/// it, so the owner cannot leak a running timer by forgetting to stop it.
pub struct PollTask {
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl PollTask {
    /// Spawn the task on the current Tokio runtime.
    ///
    /// Ticks that fall behind (runtime busy) are skipped rather than
    /// replayed in a burst.
    pub fn spawn<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => tick(),
                }
            }
            tracing::trace!("Poll task stopped");
        });

        Self {
            _guard: cancel.clone().drop_guard(),
            cancel,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
