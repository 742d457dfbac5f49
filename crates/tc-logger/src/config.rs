//! Logger policy and partial updates.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use tc_common::patch::deserialize_some;
use tc_common::{default_random, CorrelationProvider, ErrorHook, Level, SharedRandom};
use tc_redact::{RedactionConfig, RedactionError, RedactionErrorHook};

use crate::LogEntry;

/// Per-level sampling probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelSampling {
    pub debug: f64,
    pub info: f64,
    pub warn: f64,
    pub error: f64,
}

impl Default for LevelSampling {
    fn default() -> Self {
        Self {
            debug: 1.0,
            info: 1.0,
            warn: 1.0,
            error: 1.0,
        }
    }
}

impl LevelSampling {
    pub fn for_level(&self, level: Level) -> f64 {
        match level {
            Level::Debug => self.debug,
            Level::Info => self.info,
            Level::Warn => self.warn,
            Level::Error => self.error,
        }
    }

    fn apply(&mut self, patch: LevelSamplingPatch) {
        if let Some(p) = patch.debug {
            self.debug = p;
        }
        if let Some(p) = patch.info {
            self.info = p;
        }
        if let Some(p) = patch.warn {
            self.warn = p;
        }
        if let Some(p) = patch.error {
            self.error = p;
        }
    }
}

/// Partial update for [`LevelSampling`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelSamplingPatch {
    pub debug: Option<f64>,
    pub info: Option<f64>,
    pub warn: Option<f64>,
    pub error: Option<f64>,
}

/// Policy shared by a root logger and all of its children.
#[derive(Clone)]
pub struct LoggerConfig {
    /// Minimum level emitted.
    pub level: Level,
    pub sampling: LevelSampling,
    /// Mirror warn/error entries into the event bus.
    pub escalate: bool,
    /// Extra sensitive keys on top of the built-in set.
    pub redact_keys: Vec<String>,
    pub redact_patterns: Vec<Regex>,
    pub max_depth: Option<usize>,
    pub transport_timeout_ms: u64,
    pub on_transport_error: Option<ErrorHook<LogEntry>>,
    pub on_redaction_error: Option<RedactionErrorHook>,
    pub correlation_provider: Option<Arc<dyn CorrelationProvider>>,
    pub random: SharedRandom,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            sampling: LevelSampling::default(),
            escalate: true,
            redact_keys: Vec::new(),
            redact_patterns: Vec::new(),
            max_depth: None,
            transport_timeout_ms: tc_common::DEFAULT_TRANSPORT_TIMEOUT_MS,
            on_transport_error: None,
            on_redaction_error: None,
            correlation_provider: None,
            random: default_random(),
        }
    }
}

impl LoggerConfig {
    /// Whether `level` passes the minimum-level gate.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    pub fn redaction_config(&self) -> RedactionConfig {
        let mut config = RedactionConfig::default()
            .with_keys(&self.redact_keys)
            .with_patterns(self.redact_patterns.iter().cloned())
            .with_max_depth(self.max_depth);
        config.on_redaction_error = self.on_redaction_error.clone();
        config
    }

    /// Merge `patch` into this config; returns whether the redaction policy
    /// was touched. A bad pattern leaves the config untouched.
    pub fn apply(&mut self, patch: LoggerConfigPatch) -> Result<bool, RedactionError> {
        let new_patterns = patch
            .add_redact_patterns
            .iter()
            .flatten()
            .map(|s| Regex::new(s).map_err(|e| RedactionError::invalid_pattern(s, &e)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut redaction_changed = false;

        if let Some(level) = patch.level {
            self.level = level;
        }
        if let Some(sampling) = patch.sampling {
            self.sampling.apply(sampling);
        }
        if let Some(escalate) = patch.escalate {
            self.escalate = escalate;
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
        if let Some(ms) = patch.transport_timeout_ms {
            self.transport_timeout_ms = ms;
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

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfig")
            .field("level", &self.level)
            .field("sampling", &self.sampling)
            .field("escalate", &self.escalate)
            .field("redact_keys", &self.redact_keys)
            .field("redact_patterns", &self.redact_patterns)
            .field("max_depth", &self.max_depth)
            .field("transport_timeout_ms", &self.transport_timeout_ms)
            .finish_non_exhaustive()
    }
}

/// Partial update for [`LoggerConfig`]. Absent fields are left unchanged.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoggerConfigPatch {
    pub level: Option<Level>,
    pub sampling: Option<LevelSamplingPatch>,
    pub escalate: Option<bool>,
    pub add_redact_keys: Option<Vec<String>>,
    pub add_redact_patterns: Option<Vec<String>>,
    /// `Some(None)` (JSON `null`) resets to unlimited.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub max_depth: Option<Option<usize>>,
    pub transport_timeout_ms: Option<u64>,
    #[serde(skip)]
    pub on_transport_error: Option<ErrorHook<LogEntry>>,
    #[serde(skip)]
    pub on_redaction_error: Option<RedactionErrorHook>,
    #[serde(skip)]
    pub correlation_provider: Option<Arc<dyn CorrelationProvider>>,
    #[serde(skip)]
    pub random: Option<SharedRandom>,
}

impl LoggerConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Set the sampling probability for one level.
    pub fn sampling(mut self, level: Level, probability: f64) -> Self {
        let sampling = self.sampling.get_or_insert_with(LevelSamplingPatch::default);
        match level {
            Level::Debug => sampling.debug = Some(probability),
            Level::Info => sampling.info = Some(probability),
            Level::Warn => sampling.warn = Some(probability),
            Level::Error => sampling.error = Some(probability),
        }
        self
    }

    pub fn escalate(mut self, escalate: bool) -> Self {
        self.escalate = Some(escalate);
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

    pub fn transport_timeout_ms(mut self, ms: u64) -> Self {
        self.transport_timeout_ms = Some(ms);
        self
    }

    pub fn on_transport_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&tc_common::TransportError, &LogEntry, usize) + Send + Sync + 'static,
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

impl fmt::Debug for LoggerConfigPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfigPatch")
            .field("level", &self.level)
            .field("sampling", &self.sampling)
            .field("escalate", &self.escalate)
            .field("add_redact_keys", &self.add_redact_keys)
            .field("add_redact_patterns", &self.add_redact_patterns)
            .field("max_depth", &self.max_depth)
            .field("transport_timeout_ms", &self.transport_timeout_ms)
            .finish_non_exhaustive()
    }
}
