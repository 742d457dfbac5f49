//! Structured event bus.
//!
//! An [`EventBus`] turns `emit(name, payload, opts)` calls into sanitized
//! [`Event`] records and fans them out to registered transports:
//!
//! 1. **Validation**: an optional per-event [`Validator`]; failures are
//!    counted and handled per [`ValidationMode`].
//! 2. **Sampling**: per-event or default probability with an injectable
//!    random source. Sampled-out events are still built and returned.
//! 3. **Correlation**: explicit id, then the configured provider.
//! 4. **Redaction**: the bus policy, merged with the event's
//!    [`EventDefinition`] extras, through a fingerprint-keyed redactor cache.
//! 5. **Size bounding**: oversized payloads are truncated to a marker or
//!    dropped, per [`OversizeStrategy`].
//! 6. **Dispatch**: transports run in registration order; async deliveries
//!    are raced against the transport timeout and tracked until drained.
//!
//! Counters are exported through a per-bus Prometheus registry
//! ([`EventMetrics`]).
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tc_common::Delivery;
//! use tc_events::{EmitOptions, Event, EventBus};
//!
//! let bus = EventBus::new().unwrap();
//! bus.add_transport(|event: &Event| {
//!     println!("{}", event.to_json_line().unwrap_or_default());
//!     Delivery::Done
//! });
//! let event = bus
//!     .emit("user.login", json!({"user": "ada", "password": "hunter2"}), EmitOptions::new())
//!     .unwrap();
//! assert_eq!(event.payload["password"], "[REDACTED]");
//! ```

pub mod bus;
pub mod config;
pub mod definition;
pub mod error;
pub mod event;
pub mod metrics;
pub mod size;
pub mod validate;

pub use bus::EventBus;
pub use config::{EventsConfig, EventsConfigPatch, OversizeStrategy, ValidationMode};
pub use definition::EventDefinition;
pub use error::{EmitError, EventsError, ValidationError};
pub use event::{EmitOptions, Event};
pub use metrics::{DropReason, EventMetrics};
pub use validate::{RequiredFields, Validator};
