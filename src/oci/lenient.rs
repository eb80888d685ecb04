//! Field deserializers that read a malformed value as absent instead of
//! failing the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub fn optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A list of `T`, dropping the elements that do not deserialize. A value that
/// is not a list reads as `None`.
pub fn list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };

    Ok(Some(
        items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default, deserialize_with = "optional")]
        name: Option<String>,
        #[serde(default, deserialize_with = "list")]
        sizes: Option<Vec<u64>>,
    }

    #[test]
    fn test_malformed_fields_read_as_absent() {
        let sample: Sample = serde_json::from_str(r#"{"name": 12, "sizes": "many"}"#).unwrap();
        assert_eq!(
            sample,
            Sample {
                name: None,
                sizes: None
            }
        );

        let sample: Sample = serde_json::from_str(r#"{"name": null}"#).unwrap();
        assert_eq!(sample.name, None);
        assert_eq!(sample.sizes, None);
    }

    #[test]
    fn test_list_keeps_valid_elements() {
        let sample: Sample =
            serde_json::from_str(r#"{"name": "app", "sizes": [1, null, "x", 3]}"#).unwrap();
        assert_eq!(sample.name.as_deref(), Some("app"));
        assert_eq!(sample.sizes, Some(vec![1, 3]));
    }
}
