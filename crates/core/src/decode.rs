//! Field-level decoding helpers for response models.

use serde::{Deserialize, Deserializer};

/// Decode an optional field, treating an explicit JSON `null` like a missing
/// key.
///
/// Pair with `#[serde(default)]` so the field also tolerates absence:
///
/// ```
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Tagged {
///     #[serde(default, deserialize_with = "scc_core::decode::null_as_default")]
///     labels: Vec<String>,
/// }
///
/// let tagged: Tagged = serde_json::from_str(r#"{"labels": null}"#).unwrap();
/// assert!(tagged.labels.is_empty());
/// ```
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "super::null_as_default")]
        items: Vec<u32>,
    }

    #[test]
    fn null_missing_and_present_values() {
        let null: Sample = serde_json::from_value(json!({"items": null})).unwrap();
        assert!(null.items.is_empty());
        let missing: Sample = serde_json::from_value(json!({})).unwrap();
        assert!(missing.items.is_empty());
        let present: Sample = serde_json::from_value(json!({"items": [1, 2]})).unwrap();
        assert_eq!(present.items, [1, 2]);
    }

    #[test]
    fn wrong_type_still_fails() {
        assert!(serde_json::from_value::<Sample>(json!({"items": "x"})).is_err());
    }
}
