//! Shutdown bookkeeping: the stop flag the listener checks before every
//! receive, and the counter of sessions whose reply has not left the socket
//! yet.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use tokio::sync::{Notify, watch};

/// One-way stop signal. Once set it stays set.
#[derive(Clone, Debug)]
pub struct StopFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl StopFlag {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Returns `true` only for the call that flipped the flag.
    pub fn stop(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the flag is set, immediately if it already is.
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts sessions between acceptance and send completion.
///
/// Every increment hands out a [`PendingGuard`]; the count drops when the
/// guard does, so it can never go negative and a panicking task still
/// releases its slot.
#[derive(Clone, Debug, Default)]
pub struct PendingTracker {
    inner: Arc<PendingInner>,
}

#[derive(Debug, Default)]
struct PendingInner {
    count: AtomicUsize,
    drained: Notify,
}

impl PendingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self) -> PendingGuard {
        self.inner.count.fetch_add(1, Ordering::AcqRel);
        PendingGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn count(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    /// Waits until no guard is outstanding.
    pub async fn wait_drained(&self) {
        loop {
            // Register before checking so a release between the check and the
            // await still wakes us.
            let notified = self.inner.drained.notified();
            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Debug)]
pub struct PendingGuard {
    inner: Arc<PendingInner>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.inner.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}
