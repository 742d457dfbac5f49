//! Configuration for the core's own diagnostics.
//!
//! Supports configuration via environment variables (`TC_LOG`, `RUST_LOG`,
//! `TC_LOG_FORMAT`) and builder overrides.

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

/// Diagnostics output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingFormat {
    /// Human-readable console format (default).
    #[default]
    Human,
    /// Machine-parseable JSON lines.
    Jsonl,
}

impl std::str::FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "console" | "pretty" => Ok(TracingFormat::Human),
            "jsonl" | "json" | "structured" => Ok(TracingFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

impl std::fmt::Display for TracingFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TracingFormat::Human => write!(f, "human"),
            TracingFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Subscriber settings for [`super::init_tracing`].
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub format: TracingFormat,
    /// Level used when no filter directive is given.
    pub level: LevelFilter,
    /// `EnvFilter` directive, e.g. `tc_events=debug,info`.
    pub directive: Option<String>,
    /// Include timestamps in human output.
    pub timestamps: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::Human,
            level: LevelFilter::INFO,
            directive: None,
            timestamps: true,
        }
    }
}

impl TracingConfig {
    /// Build from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from `lookup`, which maps a variable name to its value.
    ///
    /// `TC_LOG` takes precedence over `RUST_LOG`. A bare level (`debug`) sets
    /// the level; anything else is used as a filter directive.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = TracingConfig::default();

        if let Some(val) = lookup("TC_LOG").or_else(|| lookup("RUST_LOG")) {
            match val.parse::<LevelFilter>() {
                Ok(level) => config.level = level,
                Err(_) => config.directive = Some(val),
            }
        }

        if let Some(val) = lookup("TC_LOG_FORMAT") {
            if let Ok(format) = val.parse::<TracingFormat>() {
                config.format = format;
            }
        }

        config
    }

    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("json".parse::<TracingFormat>().unwrap(), TracingFormat::Jsonl);
        assert_eq!("HUMAN".parse::<TracingFormat>().unwrap(), TracingFormat::Human);
        assert!("xml".parse::<TracingFormat>().is_err());
        assert_eq!(TracingFormat::Jsonl.to_string(), "jsonl");
    }

    #[test]
    fn test_tc_log_wins_over_rust_log() {
        let config = TracingConfig::from_lookup(lookup(&[("TC_LOG", "debug"), ("RUST_LOG", "error")]));
        assert_eq!(config.level, LevelFilter::DEBUG);
        assert!(config.directive.is_none());
    }

    #[test]
    fn test_directive_from_rust_log() {
        let config = TracingConfig::from_lookup(lookup(&[
            ("RUST_LOG", "tc_events=debug,warn"),
            ("TC_LOG_FORMAT", "jsonl"),
        ]));
        assert_eq!(config.directive.as_deref(), Some("tc_events=debug,warn"));
        assert_eq!(config.format, TracingFormat::Jsonl);
    }

    #[test]
    fn test_defaults() {
        let config = TracingConfig::from_lookup(lookup(&[]));
        assert_eq!(config.level, LevelFilter::INFO);
        assert_eq!(config.format, TracingFormat::Human);
        assert!(config.timestamps);
    }
}
