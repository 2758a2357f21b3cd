//! Responses dialect.
//!
//! Typed payloads for the upstream Responses API and the client-facing
//! `/v1/responses` pass-through. A payload is an ordered list of items
//! (messages, function calls, function call outputs, reasoning); item and
//! part enums keep an untagged `Other` variant so unrecognized shapes
//! survive the trip. Streaming events are deliberately not modeled here:
//! the stream translators query them as raw JSON records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for the Responses API.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResponsesRequest {
    pub model: String,

    pub input: Input,

    /// System instructions, kept outside the input list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,

    /// Extra response fields to include, e.g. `reasoning.encrypted_content`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety_identifier: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_cache_key: Option<String>,
}

/// Request input, either a bare string or an ordered item list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Input {
    Text(String),
    Items(Vec<Item>),
}

impl Default for Input {
    fn default() -> Self {
        Input::Items(Vec::new())
    }
}

/// A top-level item in a Responses payload, on either side of the wire.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    /// A conversation message.
    Message {
        role: String,
        content: MessageContent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },

    /// A tool invocation produced by the model.
    FunctionCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        name: String,
        /// JSON-encoded argument object.
        arguments: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },

    /// The caller-supplied result of a previous tool invocation.
    FunctionCallOutput {
        call_id: String,
        output: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },

    /// Model reasoning with optional encrypted verification payload.
    Reasoning {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        summary: Vec<SummaryPart>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        encrypted_content: Option<String>,
        /// Providers disagree on where reasoning text lives; the extra
        /// fields below are scanned when aggregating.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thinking: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },

    /// Unknown item shape, preserved as-is.
    #[serde(untagged)]
    Other(Value),
}

/// Message content, either a bare string or typed parts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Typed content part of a Responses message.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
    OutputText { text: String },
    InputImage { image_url: String },
    Refusal { refusal: String },
    /// Unknown part shape, preserved as-is.
    #[serde(untagged)]
    Other(Value),
}

/// One entry of a reasoning item's summary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SummaryPart {
    pub r#type: String,
    #[serde(default)]
    pub text: String,
}

/// Tool definition. Responses tools are flat, unlike Chat Completions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tool {
    pub r#type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
}

impl Tool {
    /// A function tool.
    pub fn function(name: String, description: Option<String>, parameters: Value) -> Self {
        Self {
            r#type: "function".to_string(),
            name,
            description,
            parameters,
        }
    }
}

/// Tool choice policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ToolChoice {
    Mode(ToolChoiceMode),
    Function { r#type: String, name: String },
}

/// Mode-based tool choice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoiceMode {
    Auto,
    None,
    Required,
}

/// Reasoning knobs sent with the request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Reasoning {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Response body for a non-streaming request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResponsesResponse {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incomplete_details: Option<IncompleteDetails>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<Item>,

    /// Convenience concatenation of all output text, when provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Why a response ended early.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IncompleteDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Token usage counters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_tokens_details: Option<InputTokensDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_tokens_details: Option<OutputTokensDetails>,
}

/// Breakdown of input token usage.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct InputTokensDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_tokens: Option<u64>,
}

/// Breakdown of output token usage.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct OutputTokensDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn item_round_trips_function_call() {
        let item: Item = serde_json::from_value(json!({
            "type": "function_call",
            "call_id": "c1",
            "name": "getWeather",
            "arguments": "{\"city\":\"SF\"}",
            "status": "completed"
        }))
        .unwrap();

        assert!(matches!(
            &item,
            Item::FunctionCall { call_id: Some(id), name, .. } if id == "c1" && name == "getWeather"
        ));

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "function_call");
        assert_eq!(value["arguments"], "{\"city\":\"SF\"}");
    }

    #[test]
    fn unknown_item_is_preserved() {
        let raw = json!({"type": "web_search_call", "id": "ws_1", "status": "completed"});
        let item: Item = serde_json::from_value(raw.clone()).unwrap();

        match &item {
            Item::Other(value) => assert_eq!(*value, raw),
            other => panic!("expected Other, got {other:?}"),
        }
    }

    #[test]
    fn message_content_accepts_string_and_parts() {
        let text: MessageContent = serde_json::from_value(json!("hello")).unwrap();
        assert!(matches!(text, MessageContent::Text(s) if s == "hello"));

        let parts: MessageContent = serde_json::from_value(json!([
            {"type": "input_text", "text": "hello"},
            {"type": "input_image", "image_url": "data:image/png;base64,abc"}
        ]))
        .unwrap();
        assert!(matches!(parts, MessageContent::Parts(p) if p.len() == 2));
    }

    #[test]
    fn reasoning_item_parses_summary_and_signature() {
        let item: Item = serde_json::from_value(json!({
            "type": "reasoning",
            "id": "rs_1",
            "summary": [{"type": "summary_text", "text": "thinking..."}],
            "encrypted_content": "sig"
        }))
        .unwrap();

        match item {
            Item::Reasoning {
                summary,
                encrypted_content,
                ..
            } => {
                assert_eq!(summary.len(), 1);
                assert_eq!(summary[0].text, "thinking...");
                assert_eq!(encrypted_content.as_deref(), Some("sig"));
            }
            other => panic!("expected Reasoning, got {other:?}"),
        }
    }
}
