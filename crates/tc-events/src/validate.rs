//! Payload validators, keyed by event name.

use tc_redact::Payload;

use crate::ValidationError;

/// Checks (and may normalize) an event payload before it is redacted.
///
/// Implemented for any `Fn(&Payload) -> Result<Payload, ValidationError>`.
pub trait Validator: Send + Sync {
    fn validate(&self, payload: &Payload) -> Result<Payload, ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&Payload) -> Result<Payload, ValidationError> + Send + Sync,
{
    fn validate(&self, payload: &Payload) -> Result<Payload, ValidationError> {
        self(payload)
    }
}

/// Validator requiring the payload to be a map containing every listed field.
#[derive(Debug, Clone)]
pub struct RequiredFields {
    fields: Vec<String>,
}

impl RequiredFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for RequiredFields {
    fn validate(&self, payload: &Payload) -> Result<Payload, ValidationError> {
        if !matches!(payload, Payload::Map(_)) {
            return Err(ValidationError::new("payload must be an object"));
        }
        let missing: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| payload.get(f).map_or(true, |v| v.is_null()))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(payload.clone())
        } else {
            Err(ValidationError::new(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closure_validator() {
        let v = |p: &Payload| -> Result<Payload, ValidationError> {
            if p.get("id").is_some() {
                Ok(p.clone())
            } else {
                Err(ValidationError::new("id required"))
            }
        };
        assert!(v.validate(&Payload::from(json!({"id": 1}))).is_ok());
        assert!(v.validate(&Payload::from(json!({}))).is_err());
    }

    #[test]
    fn test_required_fields() {
        let v = RequiredFields::new(["email", "plan"]);
        assert!(v
            .validate(&Payload::from(json!({"email": "a@b.c", "plan": "pro"})))
            .is_ok());

        let err = v
            .validate(&Payload::from(json!({"email": "a@b.c", "plan": null})))
            .unwrap_err();
        assert_eq!(err.message, "missing required fields: plan");

        assert!(v.validate(&Payload::from(json!([1, 2]))).is_err());
    }
}
