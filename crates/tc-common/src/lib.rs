//! Shared plumbing for the telemetry core.
//!
//! Both the event bus and the logger deliver finalized records the same way,
//! so the pieces they have in common live here:
//!
//! - **Transports**: sink callbacks registered by id, invoked in registration order.
//! - **Dispatch**: per-transport error isolation and timeout-raced async delivery.
//! - **Pending set**: a counted wait-group over in-flight async deliveries, with
//!   a bounded drain barrier.
//! - **Sampling**: probabilistic admission with an injectable random source.
//! - **Correlation**: explicit ids, provider lookup, and id generation.
//! - **Levels**: the severity scale shared by events and log entries.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tc_common::{Delivery, DispatchChannel};
//!
//! # async fn run() {
//! let channel: DispatchChannel<String> = DispatchChannel::new();
//! channel.add(|record: &String| {
//!     println!("{record}");
//!     Delivery::Done
//! });
//! channel.dispatch("hello".to_string(), Duration::from_secs(5), None);
//! assert!(channel.drain(Duration::from_secs(1)).await);
//! # }
//! ```

pub mod correlation;
pub mod dispatch;
pub mod error;
pub mod level;
pub mod patch;
pub mod pending;
pub mod sampling;
pub mod transport;

pub use correlation::{generate_correlation_id, resolve_correlation_id, CorrelationProvider};
pub use dispatch::{dispatch, warn_transport_error, DispatchChannel, ErrorHook};
pub use error::TransportError;
pub use level::Level;
pub use pending::{PendingGuard, PendingSet};
pub use sampling::{admits, default_random, RandomSource, SharedRandom, ThreadRandom};
pub use transport::{Delivery, DeliveryError, PendingDelivery, Transport, TransportId, TransportRegistry};

/// Default per-transport timeout for async deliveries.
pub const DEFAULT_TRANSPORT_TIMEOUT_MS: u64 = 5_000;

/// Default timeout for a drain barrier.
pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 2_000;
