//! Fan-out of a finalized record to registered transports.
//!
//! Transports are invoked in registration order. A failing or panicking
//! transport is reported to the error hook and never stops the transports
//! after it. Pending deliveries are spawned on the current Tokio runtime and
//! raced against the channel timeout; whichever settles first wins and a late
//! completion is discarded by aborting its task.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::warn;

use crate::{Delivery, PendingDelivery, PendingSet, Transport, TransportError, TransportId, TransportRegistry};

/// Callback receiving transport failures with the record and transport index.
pub type ErrorHook<R> = Arc<dyn Fn(&TransportError, &R, usize) + Send + Sync>;

/// Error hook used when none is configured.
pub fn warn_transport_error<R>(err: &TransportError, _record: &R, index: usize) {
    warn!(transport_index = index, error = %err, "transport delivery failed");
}

/// Deliver `record` to every transport in order.
pub fn dispatch<R>(
    record: Arc<R>,
    transports: &[Arc<dyn Transport<R>>],
    timeout: Duration,
    on_error: &ErrorHook<R>,
    pending: &PendingSet,
) where
    R: Send + Sync + 'static,
{
    for (index, transport) in transports.iter().enumerate() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| transport.deliver(&record)));
        match outcome {
            Ok(Delivery::Done) => {}
            Ok(Delivery::Failed(source)) => {
                let err = TransportError::Failed {
                    index,
                    message: source.to_string(),
                };
                report(on_error, &err, &record, index);
            }
            Ok(Delivery::Pending(future)) => {
                spawn_pending(future, index, timeout, &record, on_error, pending);
            }
            Err(payload) => {
                let err = TransportError::Panicked {
                    index,
                    message: panic_message(payload.as_ref()),
                };
                report(on_error, &err, &record, index);
            }
        }
    }
}

fn spawn_pending<R>(
    future: PendingDelivery,
    index: usize,
    timeout: Duration,
    record: &Arc<R>,
    on_error: &ErrorHook<R>,
    pending: &PendingSet,
) where
    R: Send + Sync + 'static,
{
    let handle = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            report(on_error, &TransportError::NoRuntime { index }, record, index);
            return;
        }
    };

    let guard = pending.enter();
    let record = Arc::clone(record);
    let on_error = Arc::clone(on_error);
    handle.spawn(async move {
        let _guard = guard;
        let delivery = tokio::spawn(future);
        let abort = delivery.abort_handle();
        let err = match tokio::time::timeout(timeout, delivery).await {
            Ok(Ok(Ok(()))) => None,
            Ok(Ok(Err(source))) => Some(TransportError::Failed {
                index,
                message: source.to_string(),
            }),
            Ok(Err(join_err)) => Some(TransportError::Panicked {
                index,
                message: join_err.to_string(),
            }),
            Err(_) => {
                abort.abort();
                Some(TransportError::Timeout {
                    index,
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        };
        if let Some(err) = err {
            report(&on_error, &err, &record, index);
        }
    });
}

fn report<R>(on_error: &ErrorHook<R>, err: &TransportError, record: &R, index: usize) {
    // A panicking hook must not escape into the caller of emit/log.
    if panic::catch_unwind(AssertUnwindSafe(|| on_error(err, record, index))).is_err() {
        warn!(transport_index = index, error = %err, "transport error hook panicked");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A transport registry and its pending set, i.e. one delivery channel.
///
/// The event bus and the logger each own one.
pub struct DispatchChannel<R> {
    transports: Mutex<TransportRegistry<R>>,
    pending: PendingSet,
}

impl<R> DispatchChannel<R>
where
    R: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            transports: Mutex::new(TransportRegistry::new()),
            pending: PendingSet::new(),
        }
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, TransportRegistry<R>> {
        self.transports.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add<T: Transport<R> + 'static>(&self, transport: T) -> TransportId {
        self.registry().add(transport)
    }

    pub fn add_shared<T: Transport<R> + 'static>(&self, transport: Arc<T>) -> TransportId {
        self.registry().add_shared(transport)
    }

    pub fn remove(&self, id: TransportId) -> bool {
        self.registry().remove(id)
    }

    pub fn clear(&self) {
        self.registry().clear();
    }

    pub fn transport_count(&self) -> usize {
        self.registry().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry().is_empty()
    }

    /// Number of async deliveries still in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    /// Deliver `record` to the current transports.
    ///
    /// The registry lock is released before any transport runs, so transports
    /// may register or remove transports themselves.
    pub fn dispatch(&self, record: R, timeout: Duration, on_error: Option<ErrorHook<R>>) {
        let transports = self.registry().snapshot();
        if transports.is_empty() {
            return;
        }
        let on_error = match on_error {
            Some(hook) => hook,
            None => Arc::new(warn_transport_error::<R>) as ErrorHook<R>,
        };
        dispatch(Arc::new(record), &transports, timeout, &on_error, &self.pending);
    }

    /// Wait for in-flight deliveries, bounded by `timeout`.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.pending.drain(timeout).await
    }
}

impl<R> Default for DispatchChannel<R>
where
    R: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
