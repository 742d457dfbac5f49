//! Bookkeeping of in-flight async deliveries.
//!
//! A [`PendingSet`] is a counted wait-group. Each async delivery holds a
//! [`PendingGuard`] for as long as it is outstanding; dropping the guard
//! removes the entry no matter how the delivery settled (success, error,
//! timeout, panic or task cancellation), so the count is always the number of
//! deliveries still in flight.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct PendingInner {
    count: AtomicUsize,
    idle: Notify,
}

/// Counted set of outstanding async deliveries.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    inner: Arc<PendingInner>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding deliveries.
    pub fn len(&self) -> usize {
        self.inner.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add an entry. The entry is removed when the returned guard is dropped.
    pub fn enter(&self) -> PendingGuard {
        self.inner.count.fetch_add(1, Ordering::AcqRel);
        PendingGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Wait until the set is empty.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before checking the count so a concurrent release
            // between the check and the await is not missed.
            notified.as_mut().enable();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Wait for every outstanding delivery to settle, bounded by `timeout`.
    ///
    /// Returns `true` once the set is empty, `false` if the timeout elapsed
    /// first. A timed-out drain leaves the remaining entries in place.
    pub async fn drain(&self, timeout: Duration) -> bool {
        if self.is_empty() {
            return true;
        }
        tokio::time::timeout(timeout, self.wait_idle()).await.is_ok()
    }
}

/// Membership token for one outstanding delivery.
#[derive(Debug)]
pub struct PendingGuard {
    inner: Arc<PendingInner>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.inner.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}
