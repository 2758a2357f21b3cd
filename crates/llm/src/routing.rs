//! Model catalog and per-request routing decisions.
//!
//! The catalog is fetched once at startup and read without locking
//! afterwards. Routing picks the upstream dialect per model capability and
//! derives the request-side flags the upstream client turns into headers.

use serde::Deserialize;
use serde_json::Value;

use crate::error::GatewayError;
use crate::messages::{openai, responses};

/// One model as advertised by the upstream `/models` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Model {
    pub id: String,

    #[serde(default)]
    pub capabilities: Capabilities,

    #[serde(default)]
    pub supported_endpoints: Vec<String>,
}

/// Capability envelope of a model.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub limits: Limits,
}

/// Model limits.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Limits {
    #[serde(default)]
    pub max_output_tokens: Option<u64>,
}

/// Which upstream API a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpstreamKind {
    Responses,
    ChatCompletions,
}

/// Read-mostly catalog of upstream models, loaded once at startup.
#[derive(Debug, Default)]
pub(crate) struct ModelCatalog {
    models: Vec<Model>,
}

impl ModelCatalog {
    pub(crate) fn new(models: Vec<Model>) -> Self {
        Self { models }
    }

    pub(crate) fn models(&self) -> &[Model] {
        &self.models
    }

    pub(crate) fn get(&self, id: &str) -> Option<&Model> {
        self.models.iter().find(|model| model.id == id)
    }

    /// Pick the upstream dialect for a model, or reject unknown models.
    pub(crate) fn upstream_for(&self, model: &str) -> crate::Result<UpstreamKind> {
        let model = self
            .get(model)
            .ok_or_else(|| GatewayError::InvalidRequest(format!("Unknown model: {model}")))?;

        Ok(if supports_responses(model) {
            UpstreamKind::Responses
        } else {
            UpstreamKind::ChatCompletions
        })
    }

    /// Output-token ceiling for a model, when the catalog advertises one.
    pub(crate) fn max_output_tokens(&self, model: &str) -> Option<u64> {
        self.get(model)
            .and_then(|model| model.capabilities.limits.max_output_tokens)
    }
}

pub(crate) fn supports_responses(model: &Model) -> bool {
    model
        .supported_endpoints
        .iter()
        .any(|endpoint| endpoint == "/responses")
}

/// Who instigated the request; becomes the upstream `x-initiator` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Initiator {
    Agent,
    User,
}

impl Initiator {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Initiator::Agent => "agent",
            Initiator::User => "user",
        }
    }
}

/// Request-side metadata derived from the upstream payload.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RequestOptions {
    pub(crate) vision: bool,
    pub(crate) initiator: Initiator,
}

/// Derive options for a Responses payload.
///
/// An item without an explicit role (function calls, reasoning, unknown
/// shapes) counts as assistant-instigated.
pub(crate) fn responses_request_options(request: &responses::ResponsesRequest) -> RequestOptions {
    let items = match &request.input {
        responses::Input::Text(_) => {
            return RequestOptions {
                vision: false,
                initiator: Initiator::User,
            };
        }
        responses::Input::Items(items) => items,
    };

    let mut vision = false;
    let mut agent = false;

    for item in items {
        match item {
            responses::Item::Message { role, content, .. } => {
                if role == "assistant" {
                    agent = true;
                }

                if let responses::MessageContent::Parts(parts) = content {
                    vision = vision
                        || parts.iter().any(|part| {
                            matches!(part, responses::ContentPart::InputImage { .. })
                                || matches!(part, responses::ContentPart::Other(value) if contains_input_image(value))
                        });
                }
            }
            responses::Item::Other(value) => {
                match value.get("role").and_then(Value::as_str) {
                    Some("assistant") | None => agent = true,
                    Some(_) => {}
                }

                vision = vision || contains_input_image(value);
            }
            _ => agent = true,
        }
    }

    RequestOptions {
        vision,
        initiator: if agent { Initiator::Agent } else { Initiator::User },
    }
}

/// Derive options for a Chat-Completions payload.
pub(crate) fn chat_request_options(request: &openai::ChatCompletionRequest) -> RequestOptions {
    let mut vision = false;
    let mut agent = false;

    for message in &request.messages {
        if message.role == openai::ChatRole::Assistant {
            agent = true;
        }

        if let Some(openai::MessageContent::Parts(parts)) = &message.content {
            vision = vision
                || parts
                    .iter()
                    .any(|part| matches!(part, openai::ContentPart::ImageUrl { .. }));
        }
    }

    RequestOptions {
        vision,
        initiator: if agent { Initiator::Agent } else { Initiator::User },
    }
}

/// Derive options for a raw pass-through Responses payload without forcing
/// it through the typed model.
pub(crate) fn raw_responses_options(payload: &Value) -> RequestOptions {
    let Some(items) = payload.get("input").and_then(Value::as_array) else {
        return RequestOptions {
            vision: false,
            initiator: Initiator::User,
        };
    };

    let agent = items.iter().any(|item| {
        matches!(item.get("role").and_then(Value::as_str), Some("assistant") | None)
    });

    RequestOptions {
        vision: items.iter().any(contains_input_image),
        initiator: if agent { Initiator::Agent } else { Initiator::User },
    }
}

/// Recursive scan for an `input_image`-typed record.
fn contains_input_image(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("input_image") {
                return true;
            }

            map.values().any(contains_input_image)
        }
        Value::Array(values) => values.iter().any(contains_input_image),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn catalog() -> ModelCatalog {
        let models: Vec<Model> = serde_json::from_value(json!([
            {
                "id": "gpt-5",
                "capabilities": {"limits": {"max_output_tokens": 64000}},
                "supported_endpoints": ["/chat/completions", "/responses"]
            },
            {
                "id": "claude-sonnet-4",
                "supported_endpoints": ["/chat/completions"]
            }
        ]))
        .unwrap();

        ModelCatalog::new(models)
    }

    #[test]
    fn responses_endpoint_wins_when_supported() {
        let catalog = catalog();

        assert_eq!(catalog.upstream_for("gpt-5").unwrap(), UpstreamKind::Responses);
        assert_eq!(
            catalog.upstream_for("claude-sonnet-4").unwrap(),
            UpstreamKind::ChatCompletions
        );
        assert!(catalog.upstream_for("nope").is_err());
    }

    #[test]
    fn max_output_tokens_comes_from_capabilities() {
        let catalog = catalog();

        assert_eq!(catalog.max_output_tokens("gpt-5"), Some(64000));
        assert_eq!(catalog.max_output_tokens("claude-sonnet-4"), None);
    }

    #[test]
    fn vision_flag_requires_an_input_image() {
        let request: crate::messages::responses::ResponsesRequest = serde_json::from_value(json!({
            "model": "gpt-5",
            "input": [{
                "type": "message",
                "role": "user",
                "content": [
                    {"type": "input_text", "text": "look"},
                    {"type": "input_image", "image_url": "data:image/png;base64,abc"}
                ]
            }]
        }))
        .unwrap();

        let options = responses_request_options(&request);
        assert!(options.vision);
        assert_eq!(options.initiator, Initiator::User);
    }

    #[test]
    fn tool_history_marks_the_agent_initiator() {
        let request: crate::messages::responses::ResponsesRequest = serde_json::from_value(json!({
            "model": "gpt-5",
            "input": [
                {"type": "message", "role": "user", "content": "weather?"},
                {"type": "function_call", "call_id": "c1", "name": "f", "arguments": "{}"}
            ]
        }))
        .unwrap();

        assert_eq!(responses_request_options(&request).initiator, Initiator::Agent);
    }

    #[test]
    fn roleless_unknown_items_count_as_agent() {
        let request: crate::messages::responses::ResponsesRequest = serde_json::from_value(json!({
            "model": "gpt-5",
            "input": [{"type": "item_reference", "id": "ref_1"}]
        }))
        .unwrap();

        assert_eq!(responses_request_options(&request).initiator, Initiator::Agent);
    }

    #[test]
    fn chat_options_scan_messages() {
        let request: crate::messages::openai::ChatCompletionRequest = serde_json::from_value(json!({
            "model": "gpt-5",
            "messages": [
                {"role": "user", "content": [
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,abc"}}
                ]},
                {"role": "assistant", "content": "looked"}
            ]
        }))
        .unwrap();

        let options = chat_request_options(&request);
        assert!(options.vision);
        assert_eq!(options.initiator, Initiator::Agent);
    }
}
