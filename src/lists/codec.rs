//! JSON encoding of a stored list.

use crate::errors::AppError;
use crate::models::ListItem;

/// Decode the blob stored under `key`.
///
/// An absent or empty value is an empty list. So is a value that fails to
/// decode: the failure is logged and the caller carries on with no items.
pub fn decode(key: &str, raw: Option<&str>) -> Vec<ListItem> {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<Option<Vec<ListItem>>>(raw) {
        Ok(items) => items.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(key, error = %e, value = raw, "Stored list is not valid JSON, using empty list");
            Vec::new()
        }
    }
}

/// Encode a list for storage. An empty list is `[]`.
pub fn encode(items: &[ListItem]) -> Result<String, AppError> {
    Ok(serde_json::to_string(items)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_empty_values() {
        assert!(decode("k", None).is_empty());
        assert!(decode("k", Some("")).is_empty());
    }

    #[test]
    fn test_corrupt_value_degrades_to_empty() {
        assert!(decode("k", Some(r#"[{"name":"milk","bou"#)).is_empty());
        assert!(decode("k", Some(r#"{"name":"milk"}"#)).is_empty());
    }

    #[test]
    fn test_null_value() {
        // lists emptied by older writers were stored as `null`
        assert!(decode("k", Some("null")).is_empty());
    }

    #[test]
    fn test_decode_keeps_order() {
        let raw = r#"[{"name":"b","bought":false,"category":"c","priority":1},{"name":"a","bought":true,"category":"c","priority":3}]"#;
        let items = decode("k", Some(raw));
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert!(items[1].bought);
    }

    #[test]
    fn test_encode_empty_list() {
        assert_eq!(encode(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_encode_field_names() {
        let item = ListItem {
            name: "milk".into(),
            bought: false,
            category: "купить".into(),
            priority: 2,
        };
        assert_eq!(
            encode(&[item]).unwrap(),
            r#"[{"name":"milk","bought":false,"category":"купить","priority":2}]"#
        );
    }
}
