//! Correlation id resolution.

/// Supplies the ambient correlation id, polled once per emit or log call.
///
/// Implemented for any `Fn() -> Option<String>`.
pub trait CorrelationProvider: Send + Sync {
    fn current(&self) -> Option<String>;
}

impl<F> CorrelationProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn current(&self) -> Option<String> {
        self()
    }
}

/// Resolve a correlation id: the explicit id wins, then the provider's current
/// id, otherwise none.
pub fn resolve_correlation_id(
    explicit: Option<&str>,
    provider: Option<&dyn CorrelationProvider>,
) -> Option<String> {
    if let Some(id) = explicit {
        return Some(id.to_string());
    }
    provider.and_then(|p| p.current())
}

/// Generate a fresh correlation id.
pub fn generate_correlation_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    // Shorten to the first 16 hex chars for readability
    format!("corr-{}", &uuid[..16])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_wins() {
        let provider = || Some("from-provider".to_string());
        let id = resolve_correlation_id(Some("explicit"), Some(&provider));
        assert_eq!(id.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_provider_fallback() {
        let provider = || Some("from-provider".to_string());
        let id = resolve_correlation_id(None, Some(&provider));
        assert_eq!(id.as_deref(), Some("from-provider"));
    }

    #[test]
    fn test_absent_without_provider() {
        assert_eq!(resolve_correlation_id(None, None), None);
        let empty = || -> Option<String> { None };
        assert_eq!(resolve_correlation_id(None, Some(&empty)), None);
    }

    #[test]
    fn test_generate_correlation_id() {
        let a = generate_correlation_id();
        let b = generate_correlation_id();
        assert!(a.starts_with("corr-"));
        assert_eq!(a.len(), 21);
        assert_ne!(a, b);
    }
}
