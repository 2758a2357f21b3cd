//! Chat-Completions request → Responses request.

use config::ReasoningEffort;

use crate::messages::{openai, responses};

/// Build the upstream Responses payload for a Chat-Completions request.
///
/// `effort` comes from the per-model configuration lookup and defaults to
/// high.
pub(crate) fn translate_request(
    request: openai::ChatCompletionRequest,
    effort: ReasoningEffort,
) -> responses::ResponsesRequest {
    let mut instructions = None;
    let mut items = Vec::with_capacity(request.messages.len());

    for message in request.messages {
        match message.role {
            openai::ChatRole::System
                if instructions.is_none()
                    && matches!(message.content, Some(openai::MessageContent::Text(_))) =>
            {
                if let Some(openai::MessageContent::Text(text)) = message.content {
                    instructions = Some(text);
                }
            }
            openai::ChatRole::Tool => {
                items.push(responses::Item::FunctionCallOutput {
                    call_id: message.tool_call_id.unwrap_or_default(),
                    output: message.content.map(|content| content.to_text()).unwrap_or_default(),
                    status: None,
                });
            }
            openai::ChatRole::Assistant if message.tool_calls.is_some() => {
                let has_content = message
                    .content
                    .as_ref()
                    .is_some_and(|content| !content.is_empty());

                if has_content {
                    items.push(message_item("assistant", message.content.unwrap(), true));
                }

                for tool_call in message.tool_calls.unwrap_or_default() {
                    items.push(responses::Item::FunctionCall {
                        id: None,
                        call_id: Some(tool_call.id),
                        name: tool_call.function.name,
                        arguments: tool_call.function.arguments,
                        status: Some("completed".to_string()),
                    });
                }
            }
            role => {
                let Some(content) = message.content else {
                    continue;
                };

                let (name, is_output) = match role {
                    openai::ChatRole::Assistant => ("assistant", true),
                    openai::ChatRole::Developer => ("developer", false),
                    openai::ChatRole::System => ("system", false),
                    openai::ChatRole::Other(ref value) => (value.as_str(), false),
                    _ => ("user", false),
                };

                items.push(message_item(name, content, is_output));
            }
        }
    }

    responses::ResponsesRequest {
        model: request.model,
        input: responses::Input::Items(items),
        instructions,
        max_output_tokens: request.max_tokens,
        temperature: request.temperature,
        top_p: request.top_p,
        stream: request.stream,
        tools: request.tools.map(|tools| {
            tools
                .into_iter()
                .map(|tool| {
                    responses::Tool::function(
                        tool.function.name,
                        tool.function.description,
                        tool.function.parameters,
                    )
                })
                .collect()
        }),
        tool_choice: request.tool_choice.map(translate_tool_choice),
        store: None,
        parallel_tool_calls: Some(true),
        reasoning: Some(responses::Reasoning {
            effort: Some(effort.to_string()),
            summary: Some("detailed".to_string()),
        }),
        include: Some(vec!["reasoning.encrypted_content".to_string()]),
        safety_identifier: None,
        prompt_cache_key: None,
    }
}

fn message_item(role: &str, content: openai::MessageContent, is_output: bool) -> responses::Item {
    let content = match content {
        openai::MessageContent::Text(text) => responses::MessageContent::Text(text),
        openai::MessageContent::Parts(parts) => responses::MessageContent::Parts(
            parts
                .into_iter()
                .filter_map(|part| match part {
                    openai::ContentPart::Text { text } if is_output => {
                        Some(responses::ContentPart::OutputText { text })
                    }
                    openai::ContentPart::Text { text } => Some(responses::ContentPart::InputText { text }),
                    openai::ContentPart::ImageUrl { image_url } => Some(responses::ContentPart::InputImage {
                        image_url: image_url.url,
                    }),
                    openai::ContentPart::Other(_) => None,
                })
                .collect(),
        ),
    };

    responses::Item::Message {
        role: role.to_string(),
        content,
        id: None,
        status: None,
    }
}

fn translate_tool_choice(choice: openai::ToolChoice) -> responses::ToolChoice {
    match choice {
        openai::ToolChoice::Mode(openai::ToolChoiceMode::Auto) => {
            responses::ToolChoice::Mode(responses::ToolChoiceMode::Auto)
        }
        openai::ToolChoice::Mode(openai::ToolChoiceMode::None) => {
            responses::ToolChoice::Mode(responses::ToolChoiceMode::None)
        }
        openai::ToolChoice::Mode(openai::ToolChoiceMode::Required) => {
            responses::ToolChoice::Mode(responses::ToolChoiceMode::Required)
        }
        openai::ToolChoice::Function { function, .. } => responses::ToolChoice::Function {
            r#type: "function".to_string(),
            name: function.name,
        },
    }
}

#[cfg(test)]
mod tests {
    use config::ReasoningEffort;
    use serde_json::json;

    use crate::messages::{openai, responses};

    fn request(value: serde_json::Value) -> openai::ChatCompletionRequest {
        serde_json::from_value(value).unwrap()
    }

    fn items(request: responses::ResponsesRequest) -> Vec<responses::Item> {
        match request.input {
            responses::Input::Items(items) => items,
            responses::Input::Text(_) => panic!("expected item list"),
        }
    }

    #[test]
    fn first_system_message_becomes_instructions() {
        let translated = super::translate_request(
            request(json!({
                "model": "gpt-5",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ]
            })),
            ReasoningEffort::High,
        );

        assert_eq!(translated.instructions.as_deref(), Some("be brief"));
        assert_eq!(items(translated).len(), 1);
    }

    #[test]
    fn tool_message_becomes_function_call_output() {
        let translated = super::translate_request(
            request(json!({
                "model": "gpt-5",
                "messages": [
                    {"role": "tool", "tool_call_id": "c1", "content": "sunny"}
                ]
            })),
            ReasoningEffort::High,
        );

        let items = items(translated);
        assert!(matches!(
            &items[0],
            responses::Item::FunctionCallOutput { call_id, output, .. } if call_id == "c1" && output == "sunny"
        ));
    }

    #[test]
    fn assistant_tool_calls_follow_optional_message() {
        let translated = super::translate_request(
            request(json!({
                "model": "gpt-5",
                "messages": [{
                    "role": "assistant",
                    "content": "let me check",
                    "tool_calls": [
                        {"id": "c1", "type": "function", "function": {"name": "f", "arguments": "{}"}},
                        {"id": "c2", "type": "function", "function": {"name": "g", "arguments": "{\"x\":1}"}}
                    ]
                }]
            })),
            ReasoningEffort::High,
        );

        let items = items(translated);
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[0], responses::Item::Message { role, .. } if role == "assistant"));
        assert!(matches!(
            &items[1],
            responses::Item::FunctionCall { call_id: Some(id), name, .. } if id == "c1" && name == "f"
        ));
        assert!(matches!(
            &items[2],
            responses::Item::FunctionCall { call_id: Some(id), arguments, .. }
                if id == "c2" && arguments == "{\"x\":1}"
        ));
    }

    #[test]
    fn assistant_without_content_emits_only_function_calls() {
        let translated = super::translate_request(
            request(json!({
                "model": "gpt-5",
                "messages": [{
                    "role": "assistant",
                    "tool_calls": [
                        {"id": "c1", "type": "function", "function": {"name": "f", "arguments": "{}"}}
                    ]
                }]
            })),
            ReasoningEffort::High,
        );

        let items = items(translated);
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], responses::Item::FunctionCall { .. }));
    }

    #[test]
    fn reasoning_effort_is_configurable() {
        let translated = super::translate_request(
            request(json!({"model": "gpt-5-mini", "messages": []})),
            ReasoningEffort::Low,
        );

        let reasoning = translated.reasoning.unwrap();
        assert_eq!(reasoning.effort.as_deref(), Some("low"));
        assert_eq!(reasoning.summary.as_deref(), Some("detailed"));
        assert_eq!(translated.parallel_tool_calls, Some(true));
    }
}
