//! Named event definitions with per-event redaction extras.

use regex::Regex;
use serde::Deserialize;

use tc_redact::RedactionError;

/// A named event type.
///
/// Extra keys and patterns are merged with the bus policy when an event of
/// this name is redacted.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "DefinitionFile")]
pub struct EventDefinition {
    pub name: String,
    pub redact_keys: Vec<String>,
    pub redact_patterns: Vec<Regex>,
    pub description: Option<String>,
}

impl EventDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            redact_keys: Vec::new(),
            redact_patterns: Vec::new(),
            description: None,
        }
    }

    pub fn with_redact_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redact_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_redact_patterns<I>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = Regex>,
    {
        self.redact_patterns.extend(patterns);
        self
    }

    /// Compile and append pattern sources.
    pub fn with_pattern_sources<I, S>(mut self, sources: I) -> Result<Self, RedactionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for source in sources {
            let source = source.as_ref();
            let regex =
                Regex::new(source).map_err(|e| RedactionError::invalid_pattern(source, &e))?;
            self.redact_patterns.push(regex);
        }
        Ok(self)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// On-disk form of a definition, with patterns as source strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DefinitionFile {
    name: String,
    #[serde(default)]
    redact_keys: Vec<String>,
    #[serde(default)]
    redact_patterns: Vec<String>,
    #[serde(default)]
    description: Option<String>,
}

impl TryFrom<DefinitionFile> for EventDefinition {
    type Error = RedactionError;

    fn try_from(file: DefinitionFile) -> Result<Self, Self::Error> {
        let mut definition = EventDefinition::new(file.name)
            .with_redact_keys(file.redact_keys)
            .with_pattern_sources(&file.redact_patterns)?;
        definition.description = file.description;
        Ok(definition)
    }
}
