//! Stateful translator: Responses event stream → Chat-Completions chunks.
//!
//! Much lighter than the Anthropic-facing variant: chunks carry no block
//! lifecycle, so translation is mostly field mapping. Reasoning deltas are
//! emitted under `reasoning_content`, the name Chat-Completions clients
//! expect on the wire.

use serde_json::Value;

use crate::messages::openai;
use crate::stream::events::{non_empty_str, object_field, str_field, u64_field};

/// Translates upstream Responses events into Chat-Completions chunks.
#[derive(Debug, Default)]
pub(crate) struct ResponsesToOpenAiStream {
    response_id: Option<String>,
    model: Option<String>,
    finished: bool,
}

impl ResponsesToOpenAiStream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal event has been handled.
    pub(crate) fn is_complete(&self) -> bool {
        self.finished
    }

    /// Translate one upstream event into zero or one chunks.
    pub(crate) fn process_event(&mut self, event: &Value) -> Option<openai::ChatCompletionChunk> {
        match str_field(event, "type").unwrap_or_default() {
            "response.created" => {
                if let Some(response) = object_field(event, "response") {
                    self.response_id = non_empty_str(response, "id").map(str::to_string);
                    self.model = non_empty_str(response, "model").map(str::to_string);
                }

                Some(self.chunk(openai::MessageDelta {
                    role: Some(openai::ChatRole::Assistant),
                    ..Default::default()
                }))
            }
            "response.output_text.delta" => {
                let delta = non_empty_str(event, "delta")?;

                Some(self.chunk(openai::MessageDelta {
                    content: Some(delta.to_string()),
                    ..Default::default()
                }))
            }
            "response.reasoning_summary_text.delta" => {
                let delta = non_empty_str(event, "delta")?;

                Some(self.chunk(openai::MessageDelta {
                    reasoning_content: Some(delta.to_string()),
                    ..Default::default()
                }))
            }
            "response.output_item.added" => {
                let item = object_field(event, "item")?;

                if str_field(item, "type") != Some("function_call") {
                    return None;
                }

                let id = non_empty_str(item, "call_id")
                    .or_else(|| non_empty_str(item, "id"))
                    .map(str::to_string);

                Some(self.chunk(openai::MessageDelta {
                    tool_calls: Some(vec![openai::ToolCallDelta {
                        index: 0,
                        id,
                        r#type: Some(openai::ToolType::Function),
                        function: Some(openai::FunctionCallDelta {
                            name: str_field(item, "name").map(str::to_string),
                            arguments: Some(String::new()),
                        }),
                    }]),
                    ..Default::default()
                }))
            }
            "response.function_call_arguments.delta" => {
                let delta = non_empty_str(event, "delta")?;

                Some(self.chunk(openai::MessageDelta {
                    tool_calls: Some(vec![openai::ToolCallDelta {
                        index: 0,
                        id: None,
                        r#type: None,
                        function: Some(openai::FunctionCallDelta {
                            name: None,
                            arguments: Some(delta.to_string()),
                        }),
                    }]),
                    ..Default::default()
                }))
            }
            "response.completed" | "response.incomplete" => {
                self.finished = true;

                let mut chunk = self.chunk(openai::MessageDelta::default());
                chunk.choices[0].finish_reason = Some(openai::FinishReason::Stop);

                chunk.usage = object_field(event, "response")
                    .and_then(|response| object_field(response, "usage"))
                    .map(|usage| {
                        let prompt_tokens = u64_field(usage, "input_tokens").unwrap_or(0);
                        let completion_tokens = u64_field(usage, "output_tokens").unwrap_or(0);

                        openai::Usage {
                            prompt_tokens,
                            completion_tokens,
                            total_tokens: prompt_tokens + completion_tokens,
                            prompt_tokens_details: object_field(usage, "input_tokens_details")
                                .and_then(|details| u64_field(details, "cached_tokens"))
                                .map(|cached_tokens| openai::PromptTokensDetails {
                                    cached_tokens: Some(cached_tokens),
                                }),
                        }
                    });

                Some(chunk)
            }
            "response.failed" | "error" => {
                // The stream just ends for Chat-Completions clients.
                self.finished = true;
                None
            }
            other => {
                log::debug!("ignoring unknown Responses stream event: {other}");
                None
            }
        }
    }

    fn chunk(&self, delta: openai::MessageDelta) -> openai::ChatCompletionChunk {
        openai::ChatCompletionChunk::new(
            self.response_id.clone().unwrap_or_default(),
            self.model.clone().unwrap_or_default(),
            delta,
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::messages::openai;

    #[test]
    fn text_and_reasoning_deltas() {
        let mut stream = ResponsesToOpenAiStream::new();

        let chunk = stream
            .process_event(&json!({"type": "response.created", "response": {"id": "resp_1", "model": "gpt-5"}}))
            .unwrap();
        assert_eq!(chunk.choices[0].delta.role, Some(openai::ChatRole::Assistant));
        assert_eq!(chunk.id, "resp_1");

        let chunk = stream
            .process_event(&json!({"type": "response.output_text.delta", "delta": "hi"}))
            .unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("hi"));

        let chunk = stream
            .process_event(&json!({"type": "response.reasoning_summary_text.delta", "delta": "hm"}))
            .unwrap();
        assert_eq!(chunk.choices[0].delta.reasoning_content.as_deref(), Some("hm"));
        assert_eq!(chunk.choices[0].delta.reasoning_text, None);
    }

    #[test]
    fn tool_call_chunks() {
        let mut stream = ResponsesToOpenAiStream::new();

        let chunk = stream
            .process_event(&json!({
                "type": "response.output_item.added",
                "output_index": 0,
                "item": {"type": "function_call", "call_id": "c1", "name": "f", "arguments": ""}
            }))
            .unwrap();

        let calls = chunk.choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].id.as_deref(), Some("c1"));
        assert_eq!(calls[0].function.as_ref().unwrap().name.as_deref(), Some("f"));

        let chunk = stream
            .process_event(&json!({
                "type": "response.function_call_arguments.delta",
                "output_index": 0,
                "delta": "{\"x\":1}"
            }))
            .unwrap();

        let calls = chunk.choices[0].delta.tool_calls.as_ref().unwrap();
        assert_eq!(
            calls[0].function.as_ref().unwrap().arguments.as_deref(),
            Some("{\"x\":1}")
        );
    }

    #[test]
    fn completion_carries_finish_reason_and_usage() {
        let mut stream = ResponsesToOpenAiStream::new();

        let chunk = stream
            .process_event(&json!({
                "type": "response.completed",
                "response": {"status": "completed", "usage": {"input_tokens": 3, "output_tokens": 2}}
            }))
            .unwrap();

        assert_eq!(chunk.choices[0].finish_reason, Some(openai::FinishReason::Stop));

        let usage = chunk.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 3);
        assert_eq!(usage.completion_tokens, 2);
        assert_eq!(usage.total_tokens, 5);

        assert!(stream.is_complete());
    }

    #[test]
    fn failure_ends_without_synthesizing_chunks() {
        let mut stream = ResponsesToOpenAiStream::new();

        assert!(
            stream
                .process_event(&json!({"type": "response.failed", "error": {"message": "boom"}}))
                .is_none()
        );
        assert!(stream.is_complete());
    }
}
