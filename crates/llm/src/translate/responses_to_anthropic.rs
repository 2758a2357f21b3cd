//! Responses response → Anthropic Messages response.

use serde_json::Value;

use crate::messages::{anthropic, responses};
use crate::translate::arguments::parse_function_call_arguments;

/// Map a non-streaming Responses result to the Anthropic dialect.
pub(crate) fn translate_response(response: responses::ResponsesResponse) -> anthropic::MessagesResponse {
    let stop_reason = map_stop_reason(
        response.status.as_deref(),
        response
            .incomplete_details
            .as_ref()
            .and_then(|details| details.reason.as_deref()),
    );

    let usage = response
        .usage
        .as_ref()
        .map(|usage| anthropic::Usage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            cache_read_input_tokens: None,
            cache_creation_input_tokens: None,
        })
        .unwrap_or_default();

    let mut content = Vec::with_capacity(response.output.len());

    for item in response.output {
        match item {
            responses::Item::Reasoning {
                summary,
                encrypted_content,
                content: reasoning_content,
                thinking,
                text,
                ..
            } => {
                content.push(anthropic::ContentBlock::Thinking {
                    thinking: aggregate_reasoning_text(&summary, reasoning_content.as_ref(), thinking, text),
                    signature: encrypted_content.unwrap_or_default(),
                });
            }
            responses::Item::FunctionCall {
                id, call_id, name, arguments, ..
            } => {
                content.push(anthropic::ContentBlock::ToolUse {
                    id: call_id
                        .or(id)
                        .unwrap_or_else(|| format!("toolu_{}", uuid::Uuid::new_v4())),
                    name,
                    input: parse_function_call_arguments(&arguments),
                });
            }
            responses::Item::FunctionCallOutput { output, .. } => {
                if !output.is_empty() {
                    content.push(anthropic::ContentBlock::Text { text: output });
                }
            }
            responses::Item::Message {
                content: message_content,
                ..
            } => {
                let text = aggregate_message_text(&message_content);

                if !text.is_empty() {
                    content.push(anthropic::ContentBlock::Text { text });
                }
            }
            responses::Item::Other(_) => {}
        }
    }

    if content.is_empty()
        && let Some(text) = response.output_text.filter(|text| !text.is_empty())
    {
        content.push(anthropic::ContentBlock::Text { text });
    }

    anthropic::MessagesResponse {
        id: response.id,
        r#type: "message".to_string(),
        role: "assistant".to_string(),
        model: response.model.unwrap_or_default(),
        content,
        stop_reason,
        stop_sequence: None,
        usage,
    }
}

/// Shared Responses → Anthropic stop-reason rule, reused by the stream
/// translator for the terminal `message_delta`.
pub(crate) fn map_stop_reason(
    status: Option<&str>,
    incomplete_reason: Option<&str>,
) -> Option<anthropic::StopReason> {
    match status {
        Some("completed") => Some(anthropic::StopReason::EndTurn),
        Some("incomplete") => match incomplete_reason {
            Some("max_output_tokens") => Some(anthropic::StopReason::MaxTokens),
            Some("content_filter") => Some(anthropic::StopReason::EndTurn),
            Some("tool_use") => Some(anthropic::StopReason::ToolUse),
            _ => None,
        },
        _ => None,
    }
}

fn aggregate_message_text(content: &responses::MessageContent) -> String {
    match content {
        responses::MessageContent::Text(text) => text.clone(),
        responses::MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                responses::ContentPart::OutputText { text } => Some(text.as_str()),
                responses::ContentPart::Refusal { refusal } => Some(refusal.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(""),
    }
}

/// Providers stash reasoning text in several places: the summary list, a
/// nested content list with `text`/`thinking`/`reasoning` entries, and
/// top-level `thinking`/`text` fields. Collect every non-empty piece.
fn aggregate_reasoning_text(
    summary: &[responses::SummaryPart],
    content: Option<&Value>,
    thinking: Option<String>,
    text: Option<String>,
) -> String {
    let mut pieces: Vec<String> = summary
        .iter()
        .filter(|part| !part.text.is_empty())
        .map(|part| part.text.clone())
        .collect();

    if let Some(Value::Array(entries)) = content {
        for entry in entries {
            let piece = ["text", "thinking", "reasoning"]
                .iter()
                .find_map(|key| entry.get(key).and_then(Value::as_str));

            if let Some(piece) = piece.filter(|piece| !piece.is_empty()) {
                pieces.push(piece.to_string());
            }
        }
    }

    pieces.extend(thinking.filter(|value| !value.is_empty()));
    pieces.extend(text.filter(|value| !value.is_empty()));

    pieces.join("\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::messages::{anthropic, responses};

    fn response(value: serde_json::Value) -> responses::ResponsesResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn output_walk_preserves_block_order() {
        let translated = super::translate_response(response(json!({
            "id": "resp_1",
            "model": "gpt-5",
            "status": "completed",
            "output": [
                {
                    "type": "reasoning",
                    "summary": [{"type": "summary_text", "text": "plan"}],
                    "encrypted_content": "sig"
                },
                {
                    "type": "message",
                    "role": "assistant",
                    "content": [{"type": "output_text", "text": "hello"}]
                },
                {
                    "type": "function_call",
                    "call_id": "c1",
                    "name": "getWeather",
                    "arguments": "{\"city\":\"SF\"}"
                }
            ],
            "usage": {"input_tokens": 10, "output_tokens": 4}
        })));

        assert_eq!(translated.content.len(), 3);
        assert!(matches!(
            &translated.content[0],
            anthropic::ContentBlock::Thinking { thinking, signature } if thinking == "plan" && signature == "sig"
        ));
        assert!(matches!(
            &translated.content[1],
            anthropic::ContentBlock::Text { text } if text == "hello"
        ));
        assert!(matches!(
            &translated.content[2],
            anthropic::ContentBlock::ToolUse { id, name, input }
                if id == "c1" && name == "getWeather" && input == &json!({"city": "SF"})
        ));

        assert_eq!(translated.stop_reason, Some(anthropic::StopReason::EndTurn));
        assert_eq!(translated.usage.input_tokens, 10);
        assert_eq!(translated.usage.output_tokens, 4);
    }

    #[test]
    fn refusals_count_as_text() {
        let translated = super::translate_response(response(json!({
            "id": "resp_1",
            "output": [{
                "type": "message",
                "role": "assistant",
                "content": [
                    {"type": "output_text", "text": "partial"},
                    {"type": "refusal", "refusal": " denied"}
                ]
            }]
        })));

        assert!(matches!(
            &translated.content[0],
            anthropic::ContentBlock::Text { text } if text == "partial denied"
        ));
    }

    #[test]
    fn empty_walk_falls_back_to_output_text() {
        let translated = super::translate_response(response(json!({
            "id": "resp_1",
            "output": [],
            "output_text": "fallback"
        })));

        assert_eq!(translated.content.len(), 1);
        assert!(matches!(
            &translated.content[0],
            anthropic::ContentBlock::Text { text } if text == "fallback"
        ));
    }

    #[test]
    fn incomplete_reasons_map_to_stop_reasons() {
        for (reason, expected) in [
            (Some("max_output_tokens"), Some(anthropic::StopReason::MaxTokens)),
            (Some("content_filter"), Some(anthropic::StopReason::EndTurn)),
            (Some("tool_use"), Some(anthropic::StopReason::ToolUse)),
            (None, None),
        ] {
            assert_eq!(super::map_stop_reason(Some("incomplete"), reason), expected);
        }

        assert_eq!(super::map_stop_reason(Some("failed"), None), None);
    }

    #[test]
    fn reasoning_text_is_collected_from_all_carriers() {
        let translated = super::translate_response(response(json!({
            "id": "resp_1",
            "output": [{
                "type": "reasoning",
                "summary": [{"type": "summary_text", "text": "one"}],
                "content": [{"type": "reasoning_text", "text": "two"}, {"thinking": "three"}],
                "thinking": "four",
                "text": "five"
            }]
        })));

        assert!(matches!(
            &translated.content[0],
            anthropic::ContentBlock::Thinking { thinking, .. }
                if thinking == "one\n\ntwo\n\nthree\n\nfour\n\nfive"
        ));
    }
}
