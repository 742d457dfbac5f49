//! Fingerprint-keyed redactor cache.
//!
//! The base redactor is rebuilt only when the policy fingerprint changes.
//! Derived redactors (base policy plus per-event extras) are memoized under
//! `(base fingerprint, extras fingerprint)` and dropped whenever the base
//! changes.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::{RedactionConfig, Redactor};

/// Structural identity of a redaction policy.
///
/// Keys are lowercased and sorted, pattern sources are sorted, so two policies
/// declared in a different order share a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Fingerprint {
    keys: Vec<String>,
    patterns: Vec<String>,
    max_depth: Option<usize>,
}

impl Fingerprint {
    pub fn new<'a, I>(keys: I, patterns: &[Regex], max_depth: Option<usize>) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(|k| k.to_lowercase()).collect();
        keys.sort();
        keys.dedup();
        // Regex::as_str carries inline flags, so it covers both source and flags.
        let mut patterns: Vec<String> = patterns.iter().map(|p| p.as_str().to_string()).collect();
        patterns.sort();
        Self {
            keys,
            patterns,
            max_depth,
        }
    }

    /// True when no keys or patterns are present.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.patterns.is_empty()
    }
}

/// Cache of the base redactor and its derived variants.
#[derive(Default)]
pub struct RedactorCache {
    base: Option<(Fingerprint, Arc<Redactor>)>,
    derived: HashMap<(Fingerprint, Fingerprint), Arc<Redactor>>,
    builds: u64,
}

impl RedactorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Redactor for `config`, rebuilt only if its fingerprint changed.
    pub fn base(&mut self, config: &RedactionConfig) -> Arc<Redactor> {
        let fingerprint = config.fingerprint();
        if let Some((current, redactor)) = &self.base {
            if *current == fingerprint {
                return Arc::clone(redactor);
            }
        }
        let redactor = Arc::new(Redactor::new(config.clone()));
        self.builds += 1;
        self.derived.clear();
        self.base = Some((fingerprint, Arc::clone(&redactor)));
        redactor
    }

    /// Redactor for `config` merged with extra keys and patterns.
    ///
    /// With no extras this is the base redactor.
    pub fn derived(
        &mut self,
        config: &RedactionConfig,
        extra_keys: &[String],
        extra_patterns: &[Regex],
    ) -> Arc<Redactor> {
        let base = self.base(config);
        let extras = Fingerprint::new(extra_keys, extra_patterns, None);
        if extras.is_empty() {
            return base;
        }
        let key = (base.fingerprint(), extras);
        if let Some(redactor) = self.derived.get(&key) {
            return Arc::clone(redactor);
        }
        let redactor = Arc::new(Redactor::new(
            base.config().merged(extra_keys, extra_patterns),
        ));
        self.builds += 1;
        self.derived.insert(key, Arc::clone(&redactor));
        redactor
    }

    /// Drop every cached redactor.
    pub fn invalidate(&mut self) {
        self.base = None;
        self.derived.clear();
    }

    /// Number of memoized derived redactors.
    pub fn derived_len(&self) -> usize {
        self.derived.len()
    }

    /// Total redactors built by this cache.
    pub fn builds(&self) -> u64 {
        self.builds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_reused_while_fingerprint_stable() {
        let mut cache = RedactorCache::new();
        let config = RedactionConfig::empty().with_keys(["secret"]);
        let a = cache.base(&config);
        let b = cache.base(&config.clone());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.builds(), 1);
    }

    #[test]
    fn test_base_rebuilt_on_change() {
        let mut cache = RedactorCache::new();
        let config = RedactionConfig::empty().with_keys(["secret"]);
        let a = cache.base(&config);
        let b = cache.base(&config.clone().with_max_depth(Some(3)));
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.builds(), 2);
    }

    #[test]
    fn test_derived_memoized_and_cleared_on_base_change() {
        let mut cache = RedactorCache::new();
        let config = RedactionConfig::empty();
        let extra = vec!["pin".to_string()];

        let a = cache.derived(&config, &extra, &[]);
        let b = cache.derived(&config, &extra, &[]);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.derived_len(), 1);
        assert!(a.config().is_sensitive_key("pin"));

        cache.base(&config.clone().with_keys(["other"]));
        assert_eq!(cache.derived_len(), 0);
    }

    #[test]
    fn test_derived_without_extras_is_base() {
        let mut cache = RedactorCache::new();
        let config = RedactionConfig::empty();
        let base = cache.base(&config);
        let derived = cache.derived(&config, &[], &[]);
        assert!(Arc::ptr_eq(&base, &derived));
        assert_eq!(cache.derived_len(), 0);
    }

    #[test]
    fn test_invalidate() {
        let mut cache = RedactorCache::new();
        let config = RedactionConfig::empty();
        let a = cache.base(&config);
        cache.invalidate();
        let b = cache.base(&config);
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
