//! Transport sinks and the registry that orders them.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Error reported by a transport.
pub type DeliveryError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Future for a delivery that completes asynchronously.
pub type PendingDelivery = Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'static>>;

/// Outcome of handing a record to a transport.
pub enum Delivery {
    /// The record was consumed synchronously.
    Done,
    /// The transport failed synchronously.
    Failed(DeliveryError),
    /// The record is being delivered in the background.
    Pending(PendingDelivery),
}

impl Delivery {
    /// Wrap a future as a pending delivery.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), DeliveryError>> + Send + 'static,
    {
        Delivery::Pending(Box::pin(future))
    }

    /// Build a synchronous failure.
    pub fn failed(err: impl Into<DeliveryError>) -> Self {
        Delivery::Failed(err.into())
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delivery::Done => write!(f, "Done"),
            Delivery::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            Delivery::Pending(_) => write!(f, "Pending(..)"),
        }
    }
}

impl<E> From<Result<(), E>> for Delivery
where
    E: Into<DeliveryError>,
{
    fn from(result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Delivery::Done,
            Err(err) => Delivery::Failed(err.into()),
        }
    }
}

/// A sink receiving finalized records.
///
/// Implemented for any `Fn(&R) -> Delivery`, so closures can be registered
/// directly.
pub trait Transport<R>: Send + Sync {
    /// Deliver one record.
    fn deliver(&self, record: &R) -> Delivery;
}

impl<R, F> Transport<R> for F
where
    F: Fn(&R) -> Delivery + Send + Sync,
{
    fn deliver(&self, record: &R) -> Delivery {
        self(record)
    }
}

/// Handle returned when a transport is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransportId(u64);

impl TransportId {
    /// Raw numeric value of the id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport-{}", self.0)
    }
}

/// Ordered set of transports keyed by [`TransportId`].
pub struct TransportRegistry<R> {
    next_id: u64,
    entries: Vec<(TransportId, Arc<dyn Transport<R>>)>,
}

impl<R: 'static> TransportRegistry<R> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: Vec::new(),
        }
    }

    /// Register a transport, returning its id.
    pub fn add<T: Transport<R> + 'static>(&mut self, transport: T) -> TransportId {
        self.insert(Arc::new(transport))
    }

    /// Register a shared transport.
    ///
    /// Registering the same `Arc` twice is a no-op that returns the id of the
    /// existing registration.
    pub fn add_shared<T: Transport<R> + 'static>(&mut self, transport: Arc<T>) -> TransportId {
        let transport: Arc<dyn Transport<R>> = transport;
        if let Some((id, _)) = self
            .entries
            .iter()
            .find(|(_, existing)| std::ptr::addr_eq(Arc::as_ptr(existing), Arc::as_ptr(&transport)))
        {
            return *id;
        }
        self.insert(transport)
    }

    fn insert(&mut self, transport: Arc<dyn Transport<R>>) -> TransportId {
        let id = TransportId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, transport));
        id
    }

    /// Remove a transport. Returns `false` if the id is unknown.
    pub fn remove(&mut self, id: TransportId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, id: TransportId) -> bool {
        self.entries.iter().any(|(existing, _)| *existing == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<TransportId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    /// Clone the transport list so dispatch can run without holding a lock.
    pub fn snapshot(&self) -> Vec<Arc<dyn Transport<R>>> {
        self.entries.iter().map(|(_, t)| Arc::clone(t)).collect()
    }
}

impl<R: 'static> Default for TransportRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &u32) -> Delivery {
        Delivery::Done
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut registry = TransportRegistry::<u32>::new();
        let a = registry.add(noop);
        let b = registry.add(noop);
        assert_ne!(a, b);
        assert_eq!(registry.ids(), vec![a, b]);
    }

    #[test]
    fn test_add_shared_dedups_same_arc() {
        let mut registry = TransportRegistry::<u32>::new();
        let shared = Arc::new(|_: &u32| Delivery::Done);
        let first = registry.add_shared(Arc::clone(&shared));
        let second = registry.add_shared(Arc::clone(&shared));
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut registry = TransportRegistry::<u32>::new();
        let id = registry.add(noop);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_delivery_from_result() {
        let ok: Result<(), std::io::Error> = Ok(());
        assert!(matches!(Delivery::from(ok), Delivery::Done));

        let err: Result<(), std::io::Error> = Err(std::io::Error::other("boom"));
        match Delivery::from(err) {
            Delivery::Failed(e) => assert_eq!(e.to_string(), "boom"),
            other => panic!("unexpected delivery: {:?}", other),
        }
    }
}
