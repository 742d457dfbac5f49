//! Redaction policy snapshot.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::patterns::{default_secret_patterns, DEFAULT_REDACT_KEYS};
use crate::{
    Fingerprint, RedactionError, Result, DEFAULT_CENSOR, DEFAULT_CIRCULAR_MARKER,
    DEFAULT_TRUNCATED_MARKER,
};

/// Callback receiving traversal errors.
pub type RedactionErrorHook = Arc<dyn Fn(&RedactionError) + Send + Sync>;

/// Immutable input to [`crate::Redactor::new`].
#[derive(Clone)]
pub struct RedactionConfig {
    /// Sensitive keys, stored lowercase.
    keys: BTreeSet<String>,

    /// Patterns applied to string leaves, in declaration order.
    patterns: Vec<Regex>,

    /// Depth at which containers collapse to the truncated marker.
    /// `None` means unlimited.
    pub max_depth: Option<usize>,

    /// Replacement text for redacted values.
    pub censor: String,

    /// Replacement for back-references to an ancestor.
    pub circular_marker: String,

    /// Replacement for subtrees beyond `max_depth`.
    pub truncated_marker: String,

    /// Receives traversal errors. Errors are logged when unset.
    pub on_redaction_error: Option<RedactionErrorHook>,
}

impl RedactionConfig {
    /// Policy with no keys and no patterns.
    pub fn empty() -> Self {
        Self {
            keys: BTreeSet::new(),
            patterns: Vec::new(),
            max_depth: None,
            censor: DEFAULT_CENSOR.to_string(),
            circular_marker: DEFAULT_CIRCULAR_MARKER.to_string(),
            truncated_marker: DEFAULT_TRUNCATED_MARKER.to_string(),
            on_redaction_error: None,
        }
    }

    /// Add sensitive keys (case-insensitive).
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keys
            .extend(keys.into_iter().map(|k| k.as_ref().to_lowercase()));
        self
    }

    /// Append compiled patterns.
    pub fn with_patterns<I>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = Regex>,
    {
        self.patterns.extend(patterns);
        self
    }

    /// Append patterns from source strings.
    pub fn with_pattern_sources<I, S>(self, sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = sources
            .into_iter()
            .map(|s| {
                Regex::new(s.as_ref()).map_err(|e| RedactionError::invalid_pattern(s.as_ref(), &e))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.with_patterns(patterns))
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_censor(mut self, censor: impl Into<String>) -> Self {
        self.censor = censor.into();
        self
    }

    pub fn with_error_hook(mut self, hook: RedactionErrorHook) -> Self {
        self.on_redaction_error = Some(hook);
        self
    }

    /// This policy plus extra keys and patterns.
    pub fn merged(&self, extra_keys: &[String], extra_patterns: &[Regex]) -> Self {
        self.clone()
            .with_keys(extra_keys)
            .with_patterns(extra_patterns.iter().cloned())
    }

    /// Whether `key` is sensitive under this policy.
    pub fn is_sensitive_key(&self, key: &str) -> bool {
        self.keys.contains(&key.to_lowercase())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    /// Structural identity of the policy (keys, patterns, depth).
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.keys.iter(), &self.patterns, self.max_depth)
    }
}

impl Default for RedactionConfig {
    /// Built-in sensitive keys and secret patterns, unlimited depth.
    fn default() -> Self {
        Self::empty()
            .with_keys(DEFAULT_REDACT_KEYS)
            .with_patterns(default_secret_patterns())
    }
}

impl fmt::Debug for RedactionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactionConfig")
            .field("keys", &self.keys)
            .field(
                "patterns",
                &self.patterns.iter().map(Regex::as_str).collect::<Vec<_>>(),
            )
            .field("max_depth", &self.max_depth)
            .field("censor", &self.censor)
            .field("circular_marker", &self.circular_marker)
            .field("truncated_marker", &self.truncated_marker)
            .field("on_redaction_error", &self.on_redaction_error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_case_insensitive() {
        let config = RedactionConfig::empty().with_keys(["ApiKey", "X-Session"]);
        assert!(config.is_sensitive_key("apikey"));
        assert!(config.is_sensitive_key("APIKEY"));
        assert!(config.is_sensitive_key("x-session"));
        assert!(!config.is_sensitive_key("user"));
    }

    #[test]
    fn test_default_policy() {
        let config = RedactionConfig::default();
        assert!(config.is_sensitive_key("Password"));
        assert!(!config.patterns().is_empty());
        assert_eq!(config.max_depth, None);
        assert_eq!(config.censor, "[REDACTED]");
    }

    #[test]
    fn test_invalid_pattern_source() {
        let err = RedactionConfig::empty()
            .with_pattern_sources(["(unclosed"])
            .unwrap_err();
        assert!(matches!(err, RedactionError::InvalidPattern { .. }));
    }

    #[test]
    fn test_merged_does_not_touch_original() {
        let base = RedactionConfig::empty().with_keys(["a"]);
        let merged = base.merged(&["b".to_string()], &[Regex::new("x+").unwrap()]);
        assert!(merged.is_sensitive_key("b"));
        assert!(!base.is_sensitive_key("b"));
        assert_eq!(merged.patterns().len(), 1);
        assert!(base.patterns().is_empty());
    }

    #[test]
    fn test_fingerprint_ignores_declaration_order() {
        let a = RedactionConfig::empty().with_keys(["x", "y"]);
        let b = RedactionConfig::empty().with_keys(["Y", "x"]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), a.clone().with_max_depth(Some(2)).fingerprint());
    }
}
