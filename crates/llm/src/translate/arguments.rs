//! Tool-call argument parsing shared by every translation direction.

use serde_json::{Map, Value, json};

/// Parse a serialized tool-call argument string into an argument object.
///
/// Upstreams occasionally produce arguments that are not a JSON object:
/// arrays, bare scalars, or plain broken JSON. Translation must not fail on
/// those, so every shape is recovered into an object:
///
/// - a JSON object parses through unchanged
/// - an array is wrapped as `{"arguments": [...]}`
/// - a scalar or unparseable string is wrapped as `{"raw_arguments": "..."}`
/// - an empty or whitespace-only string becomes `{}`
pub(crate) fn parse_function_call_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => value,
        Ok(value @ Value::Array(_)) => json!({ "arguments": value }),
        Ok(_) => {
            log::warn!("tool call arguments are a JSON scalar, wrapping as raw_arguments");
            json!({ "raw_arguments": raw })
        }
        Err(error) => {
            log::warn!("failed to parse tool call arguments as JSON: {error}");
            json!({ "raw_arguments": raw })
        }
    }
}

/// Serialize a tool input object back to the string form used by the
/// Chat-Completions and Responses dialects.
pub(crate) fn serialize_tool_input(input: &Value) -> String {
    serde_json::to_string(input).unwrap_or_else(|error| {
        log::warn!("failed to serialize tool input: {error}");
        "{}".to_string()
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn object_passes_through() {
        let input = json!({"city": "SF", "units": "metric"});
        let raw = serde_json::to_string(&input).unwrap();
        assert_eq!(parse_function_call_arguments(&raw), input);
    }

    #[test]
    fn array_is_wrapped() {
        assert_eq!(
            parse_function_call_arguments("[1, 2]"),
            json!({"arguments": [1, 2]})
        );
    }

    #[test]
    fn scalar_is_wrapped_raw() {
        assert_eq!(
            parse_function_call_arguments("42"),
            json!({"raw_arguments": "42"})
        );
    }

    #[test]
    fn invalid_json_is_wrapped_raw() {
        assert_eq!(
            parse_function_call_arguments("not json"),
            json!({"raw_arguments": "not json"})
        );
    }

    #[test]
    fn empty_and_whitespace_become_empty_object() {
        assert_eq!(parse_function_call_arguments(""), json!({}));
        assert_eq!(parse_function_call_arguments("  \n"), json!({}));
    }
}
