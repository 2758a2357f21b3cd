//! Responses response → Chat-Completions response.

use crate::messages::{openai, responses};

/// Map a non-streaming Responses result to the Chat-Completions dialect.
pub(crate) fn translate_response(response: responses::ResponsesResponse) -> openai::ChatCompletionResponse {
    let mut text = String::new();
    let mut reasoning = String::new();
    let mut tool_calls = Vec::new();

    for item in response.output {
        match item {
            responses::Item::Message { content, .. } => match content {
                responses::MessageContent::Text(value) => text.push_str(&value),
                responses::MessageContent::Parts(parts) => {
                    for part in parts {
                        match part {
                            responses::ContentPart::OutputText { text: value } => text.push_str(&value),
                            responses::ContentPart::Refusal { refusal } => text.push_str(&refusal),
                            _ => {}
                        }
                    }
                }
            },
            responses::Item::FunctionCall {
                id, call_id, name, arguments, ..
            } => {
                tool_calls.push(openai::ToolCall {
                    id: call_id
                        .or(id)
                        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4())),
                    r#type: openai::ToolType::Function,
                    function: openai::FunctionCall { name, arguments },
                });
            }
            responses::Item::Reasoning { summary, .. } => {
                for part in summary {
                    reasoning.push_str(&part.text);
                }
            }
            _ => {}
        }
    }

    let finish_reason = if tool_calls.is_empty() {
        openai::FinishReason::Stop
    } else {
        openai::FinishReason::ToolCalls
    };

    let usage = response.usage.map(|usage| openai::Usage {
        prompt_tokens: usage.input_tokens,
        completion_tokens: usage.output_tokens,
        total_tokens: usage
            .total_tokens
            .unwrap_or(usage.input_tokens + usage.output_tokens),
        prompt_tokens_details: usage
            .input_tokens_details
            .and_then(|details| details.cached_tokens)
            .map(|cached_tokens| openai::PromptTokensDetails {
                cached_tokens: Some(cached_tokens),
            }),
    });

    openai::ChatCompletionResponse {
        id: response.id,
        object: "chat.completion".to_string(),
        created: response.created_at.unwrap_or_default(),
        model: response.model.unwrap_or_default(),
        choices: vec![openai::ChatChoice {
            index: 0,
            message: openai::ChatMessage {
                role: openai::ChatRole::Assistant,
                content: if text.is_empty() {
                    None
                } else {
                    Some(openai::MessageContent::Text(text))
                },
                tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
                tool_call_id: None,
                reasoning_text: if reasoning.is_empty() { None } else { Some(reasoning) },
                reasoning_opaque: None,
            },
            finish_reason: Some(finish_reason),
        }],
        usage,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::messages::{openai, responses};

    fn response(value: serde_json::Value) -> responses::ResponsesResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn text_and_reasoning_are_aggregated() {
        let translated = super::translate_response(response(json!({
            "id": "resp_1",
            "created_at": 1700000000,
            "model": "gpt-5",
            "status": "completed",
            "output": [
                {"type": "reasoning", "summary": [{"type": "summary_text", "text": "think"}]},
                {
                    "type": "message",
                    "role": "assistant",
                    "content": [
                        {"type": "output_text", "text": "hel"},
                        {"type": "output_text", "text": "lo"}
                    ]
                }
            ],
            "usage": {
                "input_tokens": 12,
                "output_tokens": 7,
                "input_tokens_details": {"cached_tokens": 3}
            }
        })));

        let message = &translated.choices[0].message;
        assert_eq!(message.content.as_ref().unwrap().to_text(), "hello");
        assert_eq!(message.reasoning_text.as_deref(), Some("think"));
        assert_eq!(translated.choices[0].finish_reason, Some(openai::FinishReason::Stop));

        let usage = translated.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 7);
        assert_eq!(usage.total_tokens, 19);
        assert_eq!(usage.prompt_tokens_details.unwrap().cached_tokens, Some(3));
    }

    #[test]
    fn function_calls_flip_the_finish_reason() {
        let translated = super::translate_response(response(json!({
            "id": "resp_1",
            "output": [
                {"type": "function_call", "call_id": "c1", "name": "f", "arguments": "{}"}
            ]
        })));

        let message = &translated.choices[0].message;
        let calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].id, "c1");
        assert_eq!(
            translated.choices[0].finish_reason,
            Some(openai::FinishReason::ToolCalls)
        );
    }
}
