//! Main redaction engine.
//!
//! Redaction runs in three passes over a fresh clone:
//!
//! 1. **Clone and collect**: walk the payload graph, copying every value,
//!    substituting the circular and truncated markers, and recording the path
//!    of every sensitive key. Sensitive values are still copied here.
//! 2. **Key pass**: replace the value at every recorded path with the censor.
//! 3. **Pattern pass**: apply each pattern, in order, to every string leaf.
//!
//! The input is only ever read, so the output is structurally independent of
//! it.

use std::panic::{self, AssertUnwindSafe};

use regex::Regex;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::{Fingerprint, Payload, RedactionConfig, RedactionError};

/// One step of a path from the root of the clone.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

fn render_path(path: &[Segment]) -> String {
    let mut out = String::from("$");
    for segment in path {
        match segment {
            Segment::Key(key) => {
                out.push('.');
                out.push_str(key);
            }
            Segment::Index(i) => out.push_str(&format!("[{}]", i)),
        }
    }
    out
}

/// Compiled redaction policy.
#[derive(Debug)]
pub struct Redactor {
    config: RedactionConfig,
}

impl Redactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RedactionConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.config.fingerprint()
    }

    /// Produce a sanitized clone of `value`.
    ///
    /// Never fails: traversal errors are reported to the error hook and the
    /// offending node becomes `null`.
    pub fn redact(&self, value: &Payload) -> Value {
        if !value.is_container() {
            return self.redact_scalar(value);
        }

        let mut walk = Walk::new(self);
        let mut clone = walk.clone_node(value, 0);
        for path in &walk.key_paths {
            replace_at(&mut clone, path, &self.config.censor);
        }
        if !self.config.patterns().is_empty() {
            self.scrub_strings(&mut clone);
        }
        clone
    }

    /// Convenience wrapper for plain JSON input.
    pub fn redact_json(&self, value: &Value) -> Value {
        self.redact(&Payload::from(value))
    }

    /// Apply the patterns to one string.
    pub fn redact_str(&self, text: &str) -> String {
        apply_patterns(self.config.patterns(), text, &self.config.censor)
    }

    fn redact_scalar(&self, value: &Payload) -> Value {
        match value {
            Payload::String(s) => Value::String(self.redact_str(s)),
            other => match scalar_to_json(other) {
                Ok(v) => v,
                Err(err) => {
                    self.report(&err);
                    Value::Null
                }
            },
        }
    }

    fn scrub_strings(&self, value: &mut Value) {
        match value {
            Value::String(s) => {
                let scrubbed = self.redact_str(s);
                if scrubbed != *s {
                    *s = scrubbed;
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|v| self.scrub_strings(v)),
            Value::Object(map) => map.values_mut().for_each(|v| self.scrub_strings(v)),
            _ => {}
        }
    }

    fn report(&self, err: &RedactionError) {
        match &self.config.on_redaction_error {
            Some(hook) => {
                // A panicking hook must not escape into the caller of emit/log.
                if panic::catch_unwind(AssertUnwindSafe(|| hook(err))).is_err() {
                    warn!(error = %err, "redaction error hook panicked");
                }
            }
            None => warn!(error = %err, "redaction error"),
        }
    }
}

/// Replace every match of every pattern, in declaration order.
fn apply_patterns(patterns: &[Regex], text: &str, censor: &str) -> String {
    let mut out = text.to_string();
    for pattern in patterns {
        if pattern.is_match(&out) {
            out = pattern.replace_all(&out, regex::NoExpand(censor)).into_owned();
        }
    }
    out
}

fn scalar_to_json(value: &Payload) -> Result<Value, RedactionError> {
    Ok(match value {
        Payload::Null => Value::Null,
        Payload::Bool(b) => Value::Bool(*b),
        Payload::Int(i) => Value::Number((*i).into()),
        Payload::UInt(u) => Value::Number((*u).into()),
        Payload::Float(x) => match Number::from_f64(*x) {
            Some(n) => Value::Number(n),
            None => {
                return Err(RedactionError::NonFiniteNumber {
                    path: "$".to_string(),
                })
            }
        },
        Payload::String(s) => Value::String(s.clone()),
        Payload::List(_) | Payload::Map(_) => Value::Null,
    })
}

/// Walk `path` into `root` and overwrite the target with `censor`.
/// A path that no longer resolves (an ancestor was already censored) is skipped.
fn replace_at(root: &mut Value, path: &[Segment], censor: &str) {
    let mut node = root;
    for segment in path {
        let next = match (segment, node) {
            (Segment::Key(key), Value::Object(map)) => map.get_mut(key),
            (Segment::Index(i), Value::Array(items)) => items.get_mut(*i),
            _ => None,
        };
        match next {
            Some(child) => node = child,
            None => return,
        }
    }
    *node = Value::String(censor.to_string());
}

/// State of the clone-and-collect pass.
struct Walk<'a> {
    redactor: &'a Redactor,
    /// Identities of the containers on the current path.
    ancestors: Vec<usize>,
    path: Vec<Segment>,
    key_paths: Vec<Vec<Segment>>,
}

impl<'a> Walk<'a> {
    fn new(redactor: &'a Redactor) -> Self {
        Self {
            redactor,
            ancestors: Vec::new(),
            path: Vec::new(),
            key_paths: Vec::new(),
        }
    }

    fn config(&self) -> &RedactionConfig {
        &self.redactor.config
    }

    /// With `max_depth == 0` the root is kept and every child is truncated.
    fn truncates_children_of_root(&self, depth: usize) -> bool {
        depth == 0 && self.config().max_depth == Some(0)
    }

    fn container_marker(&self, node: &Payload, depth: usize) -> Option<Value> {
        let id = node.container_id()?;
        if self.ancestors.contains(&id) {
            return Some(Value::String(self.config().circular_marker.clone()));
        }
        match self.config().max_depth {
            Some(0) if depth == 0 => None,
            Some(max) if depth >= max => {
                Some(Value::String(self.config().truncated_marker.clone()))
            }
            _ => None,
        }
    }

    fn clone_node(&mut self, node: &Payload, depth: usize) -> Value {
        if let Some(marker) = self.container_marker(node, depth) {
            return marker;
        }

        match node {
            Payload::Map(map) => {
                let guard = map.read().unwrap_or_else(|poisoned| {
                    self.fail(RedactionError::PoisonedContainer {
                        path: render_path(&self.path),
                    });
                    poisoned.into_inner()
                });
                let id = node.container_id().unwrap_or_default();
                self.ancestors.push(id);
                let mut out = Map::new();
                for (key, child) in guard.iter() {
                    self.path.push(Segment::Key(key.clone()));
                    if self.config().is_sensitive_key(key) {
                        self.key_paths.push(self.path.clone());
                    }
                    let value = self.clone_child(child, depth);
                    self.path.pop();
                    out.insert(key.clone(), value);
                }
                self.ancestors.pop();
                Value::Object(out)
            }
            Payload::List(list) => {
                let guard = list.read().unwrap_or_else(|poisoned| {
                    self.fail(RedactionError::PoisonedContainer {
                        path: render_path(&self.path),
                    });
                    poisoned.into_inner()
                });
                let id = node.container_id().unwrap_or_default();
                self.ancestors.push(id);
                let mut out = Vec::with_capacity(guard.len());
                for (index, child) in guard.iter().enumerate() {
                    self.path.push(Segment::Index(index));
                    let value = self.clone_child(child, depth);
                    self.path.pop();
                    out.push(value);
                }
                self.ancestors.pop();
                Value::Array(out)
            }
            scalar => match scalar_to_json(scalar) {
                Ok(value) => value,
                Err(_) => {
                    self.fail(RedactionError::NonFiniteNumber {
                        path: render_path(&self.path),
                    });
                    Value::Null
                }
            },
        }
    }

    fn clone_child(&mut self, child: &Payload, parent_depth: usize) -> Value {
        if self.truncates_children_of_root(parent_depth) {
            return Value::String(self.config().truncated_marker.clone());
        }
        self.clone_node(child, parent_depth + 1)
    }

    fn fail(&self, err: RedactionError) {
        self.redactor.report(&err);
    }
}
