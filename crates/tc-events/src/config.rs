//! Event bus policy and partial updates.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use tc_common::patch::deserialize_some;
use tc_common::{default_random, CorrelationProvider, ErrorHook, SharedRandom};
use tc_redact::{RedactionConfig, RedactionError, RedactionErrorHook};

use crate::Event;

/// What `emit` does when a validator rejects a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Count the drop and continue with the raw payload.
    Silent,
    /// Like `Silent`, plus a warning.
    #[default]
    Warn,
    /// Return the validation error to the caller.
    Throw,
}

/// What `emit` does with a payload larger than `max_payload_bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OversizeStrategy {
    /// Replace the payload with a truncation marker.
    #[default]
    Truncate,
    /// Skip dispatch.
    Drop,
}

/// Policy owned by one [`crate::EventBus`].
#[derive(Clone)]
pub struct EventsConfig {
    /// Probability used when no per-event override exists.
    pub sampling_default: f64,
    pub sampling_per_event: HashMap<String, f64>,
    /// Extra sensitive keys on top of the built-in set.
    pub redact_keys: Vec<String>,
    /// Extra patterns on top of the built-in secret patterns.
    pub redact_patterns: Vec<Regex>,
    pub max_depth: Option<usize>,
    pub max_payload_bytes: Option<usize>,
    pub oversize_strategy: OversizeStrategy,
    pub transport_timeout_ms: u64,
    pub validation_mode: ValidationMode,
    pub on_transport_error: Option<ErrorHook<Event>>,
    pub on_redaction_error: Option<RedactionErrorHook>,
    pub correlation_provider: Option<Arc<dyn CorrelationProvider>>,
    pub random: SharedRandom,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            sampling_default: 1.0,
            sampling_per_event: HashMap::new(),
            redact_keys: Vec::new(),
            redact_patterns: Vec::new(),
            max_depth: None,
            max_payload_bytes: None,
            oversize_strategy: OversizeStrategy::default(),
            transport_timeout_ms: tc_common::DEFAULT_TRANSPORT_TIMEOUT_MS,
            validation_mode: ValidationMode::default(),
            on_transport_error: None,
            on_redaction_error: None,
            correlation_provider: None,
            random: default_random(),
        }
    }
}

impl EventsConfig {
    /// Sampling probability for `event`.
    pub fn sampling_for(&self, event: &str) -> f64 {
        self.sampling_per_event
            .get(event)
            .copied()
            .unwrap_or(self.sampling_default)
    }

    /// Redaction policy: built-in keys and patterns plus the configured extras.
    pub fn redaction_config(&self) -> RedactionConfig {
        let mut config = RedactionConfig::default()
            .with_keys(&self.redact_keys)
            .with_patterns(self.redact_patterns.iter().cloned())
            .with_max_depth(self.max_depth);
        config.on_redaction_error = self.on_redaction_error.clone();
        config
    }

    /// Merge `patch` into this config.
    ///
    /// Patterns are compiled before anything is changed, so a bad pattern
    /// leaves the config untouched. Returns whether the redaction policy
    /// (keys, patterns, depth or error hook) was touched.
    pub fn apply(&mut self, patch: EventsConfigPatch) -> Result<bool, RedactionError> {
        let new_patterns = patch
            .add_redact_patterns
            .iter()
            .flatten()
            .map(|s| Regex::new(s).map_err(|e| RedactionError::invalid_pattern(s, &e)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut redaction_changed = false;

        if let Some(p) = patch.sampling_default {
            self.sampling_default = p;
        }
        if let Some(overrides) = patch.sampling_per_event {
            self.sampling_per_event.extend(overrides);
        }
        if let Some(keys) = patch.add_redact_keys {
            redaction_changed |= !keys.is_empty();
            self.redact_keys.extend(keys);
        }
        if !new_patterns.is_empty() {
            redaction_changed = true;
            self.redact_patterns.extend(new_patterns);
        }
        if let Some(depth) = patch.max_depth {
            redaction_changed = true;
            self.max_depth = depth;
        }
        if let Some(limit) = patch.max_payload_bytes {
            self.max_payload_bytes = limit;
        }
        if let Some(strategy) = patch.oversize_strategy {
            self.oversize_strategy = strategy;
        }
        if let Some(ms) = patch.transport_timeout_ms {
            self.transport_timeout_ms = ms;
        }
        if let Some(mode) = patch.validation_mode {
            self.validation_mode = mode;
        }
        if let Some(hook) = patch.on_transport_error {
            self.on_transport_error = Some(hook);
        }
        if let Some(hook) = patch.on_redaction_error {
            redaction_changed = true;
            self.on_redaction_error = Some(hook);
        }
        if let Some(provider) = patch.correlation_provider {
            self.correlation_provider = Some(provider);
        }
        if let Some(random) = patch.random {
            self.random = random;
        }
        Ok(redaction_changed)
    }
}

impl fmt::Debug for EventsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventsConfig")
            .field("sampling_default", &self.sampling_default)
            .field("sampling_per_event", &self.sampling_per_event)
            .field("redact_keys", &self.redact_keys)
            .field("redact_patterns", &self.redact_patterns)
            .field("max_depth", &self.max_depth)
            .field("max_payload_bytes", &self.max_payload_bytes)
            .field("oversize_strategy", &self.oversize_strategy)
            .field("transport_timeout_ms", &self.transport_timeout_ms)
            .field("validation_mode", &self.validation_mode)
            .field("on_transport_error", &self.on_transport_error.is_some())
            .field("on_redaction_error", &self.on_redaction_error.is_some())
            .field("correlation_provider", &self.correlation_provider.is_some())
            .finish_non_exhaustive()
    }
}

/// Partial update for [`EventsConfig`]. Absent fields are left unchanged.
///
/// Deserializes from camelCase JSON; callbacks are set in code.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventsConfigPatch {
    pub sampling_default: Option<f64>,
    /// Merged into the existing overrides.
    pub sampling_per_event: Option<HashMap<String, f64>>,
    pub add_redact_keys: Option<Vec<String>>,
    pub add_redact_patterns: Option<Vec<String>>,
    /// `Some(None)` (JSON `null`) resets to unlimited.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub max_depth: Option<Option<usize>>,
    /// `Some(None)` (JSON `null`) removes the limit.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub max_payload_bytes: Option<Option<usize>>,
    pub oversize_strategy: Option<OversizeStrategy>,
    pub transport_timeout_ms: Option<u64>,
    pub validation_mode: Option<ValidationMode>,
    #[serde(skip)]
    pub on_transport_error: Option<ErrorHook<Event>>,
    #[serde(skip)]
    pub on_redaction_error: Option<RedactionErrorHook>,
    #[serde(skip)]
    pub correlation_provider: Option<Arc<dyn CorrelationProvider>>,
    #[serde(skip)]
    pub random: Option<SharedRandom>,
}

impl EventsConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sampling_default(mut self, probability: f64) -> Self {
        self.sampling_default = Some(probability);
        self
    }

    pub fn sampling(mut self, event: impl Into<String>, probability: f64) -> Self {
        self.sampling_per_event
            .get_or_insert_with(HashMap::new)
            .insert(event.into(), probability);
        self
    }

    pub fn add_redact_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_redact_keys
            .get_or_insert_with(Vec::new)
            .extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn add_redact_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_redact_patterns
            .get_or_insert_with(Vec::new)
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn max_payload_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_payload_bytes = Some(limit);
        self
    }

    pub fn oversize_strategy(mut self, strategy: OversizeStrategy) -> Self {
        self.oversize_strategy = Some(strategy);
        self
    }

    pub fn transport_timeout_ms(mut self, ms: u64) -> Self {
        self.transport_timeout_ms = Some(ms);
        self
    }

    pub fn validation_mode(mut self, mode: ValidationMode) -> Self {
        self.validation_mode = Some(mode);
        self
    }

    pub fn on_transport_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&tc_common::TransportError, &Event, usize) + Send + Sync + 'static,
    {
        self.on_transport_error = Some(Arc::new(hook));
        self
    }

    pub fn on_redaction_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RedactionError) + Send + Sync + 'static,
    {
        self.on_redaction_error = Some(Arc::new(hook));
        self
    }

    pub fn correlation_provider<P: CorrelationProvider + 'static>(mut self, provider: P) -> Self {
        self.correlation_provider = Some(Arc::new(provider));
        self
    }

    pub fn random<R: tc_common::RandomSource + 'static>(mut self, random: R) -> Self {
        self.random = Some(Arc::new(random));
        self
    }
}

impl fmt::Debug for EventsConfigPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventsConfigPatch")
            .field("sampling_default", &self.sampling_default)
            .field("sampling_per_event", &self.sampling_per_event)
            .field("add_redact_keys", &self.add_redact_keys)
            .field("add_redact_patterns", &self.add_redact_patterns)
            .field("max_depth", &self.max_depth)
            .field("max_payload_bytes", &self.max_payload_bytes)
            .field("oversize_strategy", &self.oversize_strategy)
            .field("transport_timeout_ms", &self.transport_timeout_ms)
            .field("validation_mode", &self.validation_mode)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EventsConfig::default();
        assert_eq!(config.sampling_default, 1.0);
        assert_eq!(config.validation_mode, ValidationMode::Warn);
        assert_eq!(config.oversize_strategy, OversizeStrategy::Truncate);
        assert_eq!(config.transport_timeout_ms, 5_000);
        assert!(config.max_payload_bytes.is_none());
    }

    #[test]
    fn test_sampling_override() {
        let mut config = EventsConfig::default();
        config.apply(EventsConfigPatch::new().sampling("noisy", 0.1)).unwrap();
        assert_eq!(config.sampling_for("noisy"), 0.1);
        assert_eq!(config.sampling_for("other"), 1.0);
    }

    #[test]
    fn test_apply_reports_redaction_change() {
        let mut config = EventsConfig::default();
        assert!(!config
            .apply(EventsConfigPatch::new().transport_timeout_ms(10))
            .unwrap());
        assert!(config
            .apply(EventsConfigPatch::new().add_redact_keys(["pin"]))
            .unwrap());
        assert!(config
            .apply(EventsConfigPatch::new().max_depth(Some(2)))
            .unwrap());
        assert_eq!(config.max_depth, Some(2));
        assert!(config.redaction_config().is_sensitive_key("PIN"));
    }

    #[test]
    fn test_bad_pattern_leaves_config_untouched() {
        let mut config = EventsConfig::default();
        let patch = EventsConfigPatch::new()
            .sampling_default(0.5)
            .add_redact_patterns(["("]);
        assert!(config.apply(patch).is_err());
        assert_eq!(config.sampling_default, 1.0);
        assert!(config.redact_patterns.is_empty());
    }

    #[test]
    fn test_patch_from_json() {
        let patch: EventsConfigPatch = serde_json::from_str(
            r#"{
                "samplingDefault": 0.25,
                "samplingPerEvent": {"page.view": 0.01},
                "addRedactKeys": ["ssn"],
                "maxDepth": null,
                "maxPayloadBytes": 4096,
                "oversizeStrategy": "drop",
                "validationMode": "throw"
            }"#,
        )
        .unwrap();
        assert_eq!(patch.sampling_default, Some(0.25));
        assert_eq!(patch.max_depth, Some(None));
        assert_eq!(patch.max_payload_bytes, Some(Some(4096)));
        assert_eq!(patch.oversize_strategy, Some(OversizeStrategy::Drop));
        assert_eq!(patch.validation_mode, Some(ValidationMode::Throw));
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        let result: Result<EventsConfigPatch, _> = serde_json::from_str(r#"{"samplingRate": 1}"#);
        assert!(result.is_err());
    }
}
