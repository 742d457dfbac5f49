//! Serde helpers for partial configuration patches.

use serde::{Deserialize, Deserializer};

/// Deserialize a present field into `Some(value)`, including an explicit
/// `null` into `Some(None)`.
///
/// Paired with `#[serde(default)]`, an absent field stays `None`, so a patch
/// can tell "leave unchanged" apart from "reset to unlimited".
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "deserialize_some")]
        limit: Option<Option<usize>>,
    }

    #[test]
    fn test_absent_null_and_value() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.limit, None);

        let null: Patch = serde_json::from_str(r#"{"limit": null}"#).unwrap();
        assert_eq!(null.limit, Some(None));

        let set: Patch = serde_json::from_str(r#"{"limit": 3}"#).unwrap();
        assert_eq!(set.limit, Some(Some(3)));
    }
}
