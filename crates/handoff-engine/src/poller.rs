// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cancellable refresh loop.
//!
//! Runs a caller-supplied refresh closure on a fixed cadence and,
//! additionally, whenever the store reports a change on a subscribed
//! collection. Refresh passes never overlap: both wake sources funnel into
//! the same task, so a slow pass delays the next one instead of racing it.

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use handoff_core::types::ChangeEvent;

/// Handle to a running poller. Dropping it cancels the loop; [`stop`] also
/// waits for the task to finish.
///
/// [`stop`]: PollerHandle::stop
pub struct PollerHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Cancels the loop and waits for it to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "poller task did not shut down cleanly");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Spawns a refresh loop. The first pass runs immediately; afterwards the
/// loop wakes on every tick of `interval` and on every change event from
/// `changes` (when provided). A lagged subscription still wakes the loop,
/// since a refresh is a full re-read and skipped events carry no payload
/// the loop needs.
pub fn spawn<F, Fut>(
    interval: Duration,
    changes: Option<broadcast::Receiver<ChangeEvent>>,
    mut refresh: F,
) -> PollerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let mut changes = changes;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("poller cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    refresh().await;
                }
                Some(()) = recv_change(&mut changes) => {
                    refresh().await;
                }
            }
        }
    });

    PollerHandle {
        cancel,
        task: Some(task),
    }
}

/// Waits for the next change event. Resolves to `None` once the channel is
/// closed, after which the select arm is disabled for good; a receiver that
/// was never provided pends forever.
async fn recv_change(
    changes: &mut Option<broadcast::Receiver<ChangeEvent>>,
) -> Option<()> {
    let Some(rx) = changes.as_mut() else {
        return std::future::pending().await;
    };
    match rx.recv().await {
        Ok(_) => Some(()),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            warn!(skipped, "change subscription lagged, refreshing anyway");
            Some(())
        }
        Err(broadcast::error::RecvError::Closed) => {
            *changes = None;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use serde_json::json;

    #[tokio::test]
    async fn ticks_drive_refresh() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let handle = spawn(Duration::from_millis(10), None, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.stop().await;

        // First pass is immediate, then roughly every 10ms.
        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn change_events_wake_the_loop_early() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let (tx, rx) = broadcast::channel(8);
        // Interval long enough that only the initial tick fires on its own.
        let handle = spawn(Duration::from_secs(60), Some(rx), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        let baseline = count.load(Ordering::SeqCst);

        tx.send(ChangeEvent {
            collection: "escalations".to_string(),
            doc_id: "u-1".to_string(),
            document: json!({}),
        })
        .ok();

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.stop().await;

        assert!(count.load(Ordering::SeqCst) > baseline);
    }

    #[tokio::test]
    async fn stop_terminates_the_task() {
        let handle = spawn(Duration::from_millis(5), None, || async {});
        handle.stop().await;
    }
}
