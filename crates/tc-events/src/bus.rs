//! The event bus.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use tc_common::{
    admits, resolve_correlation_id, CorrelationProvider, DispatchChannel, ErrorHook,
    SharedRandom, Transport, TransportId,
};
use tc_redact::{Payload, RedactionConfig, Redactor, RedactorCache};

use crate::size::{canonical_json, truncated_payload};
use crate::{
    DropReason, EmitError, EmitOptions, Event, EventDefinition, EventMetrics, EventsConfig,
    EventsConfigPatch, EventsError, OversizeStrategy, ValidationMode, Validator,
};

struct State {
    config: EventsConfig,
    /// Base redaction policy derived from `config`.
    redaction: RedactionConfig,
}

/// Per-call copy of the policy, so no lock is held while user callbacks run.
struct EmitPolicy {
    sampling: f64,
    validation_mode: ValidationMode,
    max_payload_bytes: Option<usize>,
    oversize_strategy: OversizeStrategy,
    timeout: Duration,
    on_transport_error: Option<ErrorHook<Event>>,
    correlation_provider: Option<Arc<dyn CorrelationProvider>>,
    random: SharedRandom,
}

/// Structured event bus.
///
/// Each bus owns its policy, definitions, validators, transports, counters
/// and pending set. A fresh bus is a clean slate.
pub struct EventBus {
    state: RwLock<State>,
    definitions: RwLock<BTreeMap<String, EventDefinition>>,
    validators: RwLock<HashMap<String, Arc<dyn Validator>>>,
    redactors: Mutex<RedactorCache>,
    channel: DispatchChannel<Event>,
    metrics: EventMetrics,
}

impl EventBus {
    /// Bus with default policy and its own metrics registry.
    pub fn new() -> Result<Self, EventsError> {
        Self::with_config(EventsConfig::default())
    }

    pub fn with_config(config: EventsConfig) -> Result<Self, EventsError> {
        Ok(Self::with_metrics(config, EventMetrics::new()?))
    }

    /// Bus reporting into existing counters.
    pub fn with_metrics(config: EventsConfig, metrics: EventMetrics) -> Self {
        let redaction = config.redaction_config();
        Self {
            state: RwLock::new(State { config, redaction }),
            definitions: RwLock::new(BTreeMap::new()),
            validators: RwLock::new(HashMap::new()),
            redactors: Mutex::new(RedactorCache::new()),
            channel: DispatchChannel::new(),
            metrics,
        }
    }

    // ------------------------------------------------------------------
    // Definitions and validators
    // ------------------------------------------------------------------

    /// Register a definition, replacing any previous one with the same name.
    pub fn register_event_definition(&self, definition: EventDefinition) {
        write(&self.definitions).insert(definition.name.clone(), definition);
    }

    pub fn get_event_definition(&self, name: &str) -> Option<EventDefinition> {
        read(&self.definitions).get(name).cloned()
    }

    /// All definitions, ordered by name.
    pub fn list_event_definitions(&self) -> Vec<EventDefinition> {
        read(&self.definitions).values().cloned().collect()
    }

    /// Install the validator for `event`, replacing any previous one.
    pub fn register_validator<V: Validator + 'static>(&self, event: impl Into<String>, validator: V) {
        write(&self.validators).insert(event.into(), Arc::new(validator));
    }

    pub fn remove_validator(&self, event: &str) -> bool {
        write(&self.validators).remove(event).is_some()
    }

    // ------------------------------------------------------------------
    // Transports
    // ------------------------------------------------------------------

    pub fn add_transport<T: Transport<Event> + 'static>(&self, transport: T) -> TransportId {
        self.channel.add(transport)
    }

    /// Register a shared transport. Re-adding the same `Arc` returns its
    /// existing id.
    pub fn add_transport_shared<T: Transport<Event> + 'static>(&self, transport: Arc<T>) -> TransportId {
        self.channel.add_shared(transport)
    }

    pub fn remove_transport(&self, id: TransportId) -> bool {
        self.channel.remove(id)
    }

    pub fn clear_transports(&self) {
        self.channel.clear();
    }

    pub fn transport_count(&self) -> usize {
        self.channel.transport_count()
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Merge `patch` into the bus policy.
    ///
    /// Changing keys, patterns, depth or the redaction error hook drops every
    /// cached redactor.
    pub fn configure_events(&self, patch: EventsConfigPatch) -> Result<(), EventsError> {
        let mut state = write(&self.state);
        let redaction_changed = state.config.apply(patch)?;
        if redaction_changed {
            state.redaction = state.config.redaction_config();
            lock(&self.redactors).invalidate();
        }
        Ok(())
    }

    /// Replace the whole policy.
    pub fn replace_config(&self, config: EventsConfig) {
        let mut state = write(&self.state);
        state.redaction = config.redaction_config();
        state.config = config;
        lock(&self.redactors).invalidate();
    }

    pub fn set_event_sampling(&self, event: impl Into<String>, probability: f64) {
        write(&self.state)
            .config
            .sampling_per_event
            .insert(event.into(), probability);
    }

    /// Snapshot of the current policy.
    pub fn config(&self) -> EventsConfig {
        read(&self.state).config.clone()
    }

    // ------------------------------------------------------------------
    // Emit
    // ------------------------------------------------------------------

    /// Validate, sample, redact and size-bound `payload`, then hand the event
    /// to every transport.
    ///
    /// The event is built and returned even when sampling or the size limit
    /// keeps it from being dispatched. Errors only in
    /// [`ValidationMode::Throw`].
    pub fn emit(
        &self,
        name: &str,
        payload: impl Into<Payload>,
        opts: EmitOptions,
    ) -> Result<Event, EmitError> {
        let mut payload = payload.into();
        let policy = self.policy(name);

        let validator = read(&self.validators).get(name).cloned();
        if let Some(validator) = validator {
            match validator.validate(&payload) {
                Ok(validated) => payload = validated,
                Err(err) => {
                    self.metrics.record_dropped(name, DropReason::Invalid);
                    match policy.validation_mode {
                        ValidationMode::Throw => {
                            return Err(EmitError::Invalid {
                                event: name.to_string(),
                                source: err,
                            })
                        }
                        ValidationMode::Warn => {
                            warn!(event = name, error = %err, "event payload failed validation")
                        }
                        ValidationMode::Silent => {}
                    }
                }
            }
        }

        let admitted = admits(policy.sampling, &*policy.random);
        if !admitted {
            self.metrics.record_dropped(name, DropReason::Sampled);
        }

        let correlation_id = resolve_correlation_id(
            opts.correlation_id.as_deref(),
            policy.correlation_provider.as_deref(),
        );

        let redactor = self.redactor_for(name);
        let mut event = Event {
            event: name.to_string(),
            timestamp: Utc::now(),
            payload: redactor.redact(&payload),
            correlation_id,
            level: opts.level.unwrap_or_default(),
        };

        let mut oversize_dropped = false;
        if let Some(limit) = policy.max_payload_bytes {
            let serialized = canonical_json(&event.payload);
            if serialized.len() > limit {
                match policy.oversize_strategy {
                    OversizeStrategy::Drop => {
                        self.metrics.record_dropped(name, DropReason::Oversize);
                        oversize_dropped = true;
                        debug!(event = name, bytes = serialized.len(), limit, "dropping oversized event");
                    }
                    OversizeStrategy::Truncate => {
                        event.payload = truncated_payload(&serialized, limit);
                    }
                }
            }
        }

        if admitted && !oversize_dropped {
            self.channel
                .dispatch(event.clone(), policy.timeout, policy.on_transport_error);
            self.metrics.record_emitted(name);
        }

        Ok(event)
    }

    // ------------------------------------------------------------------
    // Drain and introspection
    // ------------------------------------------------------------------

    /// Wait for in-flight async deliveries, bounded by `timeout`.
    ///
    /// Returns `false` if deliveries were still pending when the timeout
    /// elapsed.
    pub async fn drain_events(&self, timeout: Duration) -> bool {
        let drained = self.channel.drain(timeout).await;
        debug!(
            drained,
            pending = self.channel.pending_count(),
            "event drain finished"
        );
        drained
    }

    pub fn pending_event_transports_count(&self) -> usize {
        self.channel.pending_count()
    }

    pub fn metrics(&self) -> &EventMetrics {
        &self.metrics
    }

    /// Prometheus text exposition of this bus's counters.
    pub fn render_metrics(&self) -> Result<String, EventsError> {
        Ok(self.metrics.render()?)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn policy(&self, name: &str) -> EmitPolicy {
        let state = read(&self.state);
        let config = &state.config;
        EmitPolicy {
            sampling: config.sampling_for(name),
            validation_mode: config.validation_mode,
            max_payload_bytes: config.max_payload_bytes,
            oversize_strategy: config.oversize_strategy,
            timeout: Duration::from_millis(config.transport_timeout_ms),
            on_transport_error: config.on_transport_error.clone(),
            correlation_provider: config.correlation_provider.clone(),
            random: Arc::clone(&config.random),
        }
    }

    fn redactor_for(&self, name: &str) -> Arc<Redactor> {
        let extras = read(&self.definitions)
            .get(name)
            .map(|d| (d.redact_keys.clone(), d.redact_patterns.clone()));
        let state = read(&self.state);
        let mut cache = lock(&self.redactors);
        match extras {
            Some((keys, patterns)) => cache.derived(&state.redaction, &keys, &patterns),
            None => cache.base(&state.redaction),
        }
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
