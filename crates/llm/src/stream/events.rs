//! Typed accessors over raw upstream stream events.
//!
//! Responses stream events are loosely specified maps: an event may carry
//! `output_index` or only `item_id`, and nested objects appear and vanish
//! between upstream versions. Events are therefore kept as parsed JSON and
//! queried through these helpers instead of being deserialized into structs.

use serde_json::Value;

/// String field lookup.
pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// String field lookup, treating the empty string as absent.
pub(crate) fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    str_field(value, key).filter(|text| !text.is_empty())
}

/// Unsigned integer field lookup.
pub(crate) fn u64_field(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}

/// Nested object field lookup.
pub(crate) fn object_field<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|nested| nested.is_object())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn lookups_distinguish_absent_and_mistyped() {
        let event = json!({
            "type": "response.output_text.delta",
            "delta": "hi",
            "output_index": 2,
            "empty": "",
            "response": {"id": "resp_1"},
            "not_object": [1]
        });

        assert_eq!(str_field(&event, "delta"), Some("hi"));
        assert_eq!(str_field(&event, "output_index"), None);
        assert_eq!(non_empty_str(&event, "empty"), None);
        assert_eq!(u64_field(&event, "output_index"), Some(2));
        assert_eq!(u64_field(&event, "delta"), None);
        assert!(object_field(&event, "response").is_some());
        assert!(object_field(&event, "not_object").is_none());
        assert!(object_field(&event, "missing").is_none());
    }
}
