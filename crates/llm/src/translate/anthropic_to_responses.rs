//! Anthropic Messages request → Responses request.

use crate::messages::{anthropic, responses};
use crate::translate::arguments::serialize_tool_input;

/// Guidance appended to the system prompt when targeting the Responses
/// upstream, steering agentic clients toward its tool conventions.
const AGENT_GUIDANCE: &str = "\
You are an agent operating inside a developer tool.\n\
- Use the Bash tool for shell commands and check long-running commands with BashOutput instead of blocking.\n\
- Keep the TodoWrite plan current: mark items in_progress before starting them and completed as soon as they are done.\n\
- Prefer small, verifiable steps over large speculative changes.";

/// Build the upstream Responses payload for an Anthropic request.
///
/// `extra_prompt` is the per-model addition from the gateway configuration;
/// it lands after the built-in agent guidance.
pub(crate) fn translate_request(
    request: anthropic::MessagesRequest,
    extra_prompt: Option<&str>,
) -> responses::ResponsesRequest {
    let instructions = request.system.map(|system| fold_instructions(system, extra_prompt));

    let mut items = Vec::with_capacity(request.messages.len());

    for message in request.messages {
        match message.role {
            anthropic::Role::User => translate_user_message(message.content, &mut items),
            anthropic::Role::Assistant => translate_assistant_message(message.content, &mut items),
        }
    }

    let (safety_identifier, prompt_cache_key) = request
        .metadata
        .and_then(|metadata| metadata.user_id)
        .map(parse_user_id)
        .unwrap_or((None, None));

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
                .map(|tool| responses::Tool::function(tool.name, tool.description, tool.input_schema))
                .collect()
        }),
        tool_choice: request.tool_choice.map(translate_tool_choice),
        store: Some(false),
        parallel_tool_calls: Some(true),
        reasoning: Some(responses::Reasoning {
            effort: Some("high".to_string()),
            summary: Some("auto".to_string()),
        }),
        include: Some(vec!["reasoning.encrypted_content".to_string()]),
        safety_identifier,
        prompt_cache_key,
    }
}

fn fold_instructions(system: anthropic::SystemPrompt, extra_prompt: Option<&str>) -> String {
    let mut appendix = AGENT_GUIDANCE.to_string();

    if let Some(extra) = extra_prompt
        && !extra.is_empty()
    {
        appendix.push_str("\n\n");
        appendix.push_str(extra);
    }

    match system {
        anthropic::SystemPrompt::Text(text) => format!("{text}\n\n{appendix}"),
        anthropic::SystemPrompt::Blocks(blocks) => {
            let mut texts: Vec<String> = blocks
                .into_iter()
                .filter_map(|block| match block {
                    anthropic::SystemBlock::Text { text } => Some(text),
                    anthropic::SystemBlock::Other(_) => None,
                })
                .collect();

            match texts.first_mut() {
                Some(first) => {
                    first.push_str("\n\n");
                    first.push_str(&appendix);
                }
                None => texts.push(appendix),
            }

            texts.join("\n\n")
        }
    }
}

/// `user_<safety>_account…_session_<cache_key>` → (safety, cache key).
fn parse_user_id(user_id: String) -> (Option<String>, Option<String>) {
    let Some(rest) = user_id.strip_prefix("user_") else {
        return (None, None);
    };

    let safety = rest
        .find("_account")
        .map(|position| rest[..position].to_string())
        .filter(|safety| !safety.is_empty());

    let cache_key = user_id
        .find("_session_")
        .map(|position| user_id[position + "_session_".len()..].to_string())
        .filter(|key| !key.is_empty());

    (safety, cache_key)
}

fn translate_user_message(content: anthropic::MessageContent, items: &mut Vec<responses::Item>) {
    let blocks = match content {
        anthropic::MessageContent::Text(text) => {
            items.push(responses::Item::Message {
                role: "user".to_string(),
                content: responses::MessageContent::Text(text),
                id: None,
                status: None,
            });
            return;
        }
        anthropic::MessageContent::Blocks(blocks) => blocks,
    };

    let mut pending: Vec<responses::ContentPart> = Vec::new();

    for block in blocks {
        match block {
            anthropic::ContentBlock::Text { text } => {
                pending.push(responses::ContentPart::InputText { text });
            }
            anthropic::ContentBlock::Image { source } => {
                pending.push(responses::ContentPart::InputImage {
                    image_url: source.to_image_url(),
                });
            }
            anthropic::ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                flush_user_content(&mut pending, items);

                items.push(responses::Item::FunctionCallOutput {
                    call_id: tool_use_id,
                    output: content.map(|content| content.to_text()).unwrap_or_default(),
                    status: Some(if is_error.unwrap_or(false) {
                        "incomplete".to_string()
                    } else {
                        "completed".to_string()
                    }),
                });
            }
            _ => {}
        }
    }

    flush_user_content(&mut pending, items);
}

fn flush_user_content(pending: &mut Vec<responses::ContentPart>, items: &mut Vec<responses::Item>) {
    if pending.is_empty() {
        return;
    }

    let parts = std::mem::take(pending);

    // A lone text part collapses to a plain string.
    let content = if parts.len() == 1
        && let responses::ContentPart::InputText { text } = &parts[0]
    {
        responses::MessageContent::Text(text.clone())
    } else {
        responses::MessageContent::Parts(parts)
    };

    items.push(responses::Item::Message {
        role: "user".to_string(),
        content,
        id: None,
        status: None,
    });
}

fn translate_assistant_message(content: anthropic::MessageContent, items: &mut Vec<responses::Item>) {
    let blocks = match content {
        anthropic::MessageContent::Text(text) => {
            vec![anthropic::ContentBlock::Text { text }]
        }
        anthropic::MessageContent::Blocks(blocks) => blocks,
    };

    let mut pending: Vec<responses::ContentPart> = Vec::new();

    for block in blocks {
        match block {
            anthropic::ContentBlock::Text { text } => {
                pending.push(responses::ContentPart::OutputText { text });
            }
            anthropic::ContentBlock::Thinking { thinking, .. } => {
                pending.push(responses::ContentPart::OutputText { text: thinking });
            }
            anthropic::ContentBlock::ToolUse { id, name, input } => {
                flush_assistant_content(&mut pending, items);

                items.push(responses::Item::FunctionCall {
                    id: None,
                    call_id: Some(id),
                    name,
                    arguments: serialize_tool_input(&input),
                    status: Some("completed".to_string()),
                });
            }
            _ => {}
        }
    }

    flush_assistant_content(&mut pending, items);
}

fn flush_assistant_content(pending: &mut Vec<responses::ContentPart>, items: &mut Vec<responses::Item>) {
    if pending.is_empty() {
        return;
    }

    items.push(responses::Item::Message {
        role: "assistant".to_string(),
        content: responses::MessageContent::Parts(std::mem::take(pending)),
        id: None,
        status: None,
    });
}

fn translate_tool_choice(choice: anthropic::ToolChoice) -> responses::ToolChoice {
    match choice {
        anthropic::ToolChoice::Auto => responses::ToolChoice::Mode(responses::ToolChoiceMode::Auto),
        anthropic::ToolChoice::Any => responses::ToolChoice::Mode(responses::ToolChoiceMode::Required),
        anthropic::ToolChoice::Tool { name } => responses::ToolChoice::Function {
            r#type: "function".to_string(),
            name,
        },
        anthropic::ToolChoice::None => responses::ToolChoice::Mode(responses::ToolChoiceMode::None),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::messages::{anthropic, responses};

    fn request(value: serde_json::Value) -> anthropic::MessagesRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn instructions_carry_agent_guidance() {
        let translated = super::translate_request(
            request(json!({
                "model": "gpt-5",
                "messages": [],
                "system": "You are helpful."
            })),
            None,
        );

        let instructions = translated.instructions.unwrap();
        assert!(instructions.starts_with("You are helpful.\n\n"));
        assert!(instructions.contains("TodoWrite"));
    }

    #[test]
    fn system_blocks_fold_guidance_into_first_block() {
        let translated = super::translate_request(
            request(json!({
                "model": "gpt-5",
                "messages": [],
                "system": [
                    {"type": "text", "text": "first"},
                    {"type": "text", "text": "second"}
                ]
            })),
            Some("Stay in scope."),
        );

        let instructions = translated.instructions.unwrap();
        assert!(instructions.starts_with("first\n\n"));
        assert!(instructions.contains("Stay in scope."));
        assert!(instructions.ends_with("second"));
    }

    #[test]
    fn tool_results_flush_pending_content() {
        let translated = super::translate_request(
            request(json!({
                "model": "gpt-5",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "before"},
                        {"type": "tool_result", "tool_use_id": "c1", "content": "sunny", "is_error": false},
                        {"type": "text", "text": "after"}
                    ]
                }]
            })),
            None,
        );

        let responses::Input::Items(items) = translated.input else {
            panic!("expected item list");
        };

        assert_eq!(items.len(), 3);
        assert!(matches!(
            &items[0],
            responses::Item::Message { content: responses::MessageContent::Text(text), .. } if text == "before"
        ));
        assert!(matches!(
            &items[1],
            responses::Item::FunctionCallOutput { call_id, output, status }
                if call_id == "c1" && output == "sunny" && status.as_deref() == Some("completed")
        ));
        assert!(matches!(
            &items[2],
            responses::Item::Message { content: responses::MessageContent::Text(text), .. } if text == "after"
        ));
    }

    #[test]
    fn erroring_tool_result_is_incomplete() {
        let translated = super::translate_request(
            request(json!({
                "model": "gpt-5",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "tool_result", "tool_use_id": "c1", "content": "boom", "is_error": true}
                    ]
                }]
            })),
            None,
        );

        let responses::Input::Items(items) = translated.input else {
            panic!("expected item list");
        };

        assert!(matches!(
            &items[0],
            responses::Item::FunctionCallOutput { status, .. } if status.as_deref() == Some("incomplete")
        ));
    }

    #[test]
    fn assistant_tool_use_becomes_function_call() {
        let translated = super::translate_request(
            request(json!({
                "model": "gpt-5",
                "messages": [{
                    "role": "assistant",
                    "content": [
                        {"type": "thinking", "thinking": "hmm", "signature": "s"},
                        {"type": "text", "text": "checking"},
                        {"type": "tool_use", "id": "c1", "name": "getWeather", "input": {"city": "SF"}}
                    ]
                }]
            })),
            None,
        );

        let responses::Input::Items(items) = translated.input else {
            panic!("expected item list");
        };

        assert_eq!(items.len(), 2);

        match &items[0] {
            responses::Item::Message { role, content, .. } => {
                assert_eq!(role, "assistant");
                let responses::MessageContent::Parts(parts) = content else {
                    panic!("expected parts");
                };
                assert_eq!(parts.len(), 2);
            }
            other => panic!("expected message, got {other:?}"),
        }

        assert!(matches!(
            &items[1],
            responses::Item::FunctionCall { call_id: Some(id), name, status, .. }
                if id == "c1" && name == "getWeather" && status.as_deref() == Some("completed")
        ));
    }

    #[test]
    fn metadata_user_id_is_parsed() {
        let translated = super::translate_request(
            request(json!({
                "model": "gpt-5",
                "messages": [],
                "metadata": {"user_id": "user_abc123_account-xyz_session_cache456"}
            })),
            None,
        );

        assert_eq!(translated.safety_identifier.as_deref(), Some("abc123"));
        assert_eq!(translated.prompt_cache_key.as_deref(), Some("cache456"));
    }

    #[test]
    fn fixed_extras_are_set() {
        let translated = super::translate_request(
            request(json!({"model": "gpt-5", "messages": []})),
            None,
        );

        assert_eq!(translated.store, Some(false));
        assert_eq!(translated.parallel_tool_calls, Some(true));

        let reasoning = translated.reasoning.unwrap();
        assert_eq!(reasoning.effort.as_deref(), Some("high"));
        assert_eq!(reasoning.summary.as_deref(), Some("auto"));

        assert_eq!(
            translated.include.unwrap(),
            vec!["reasoning.encrypted_content".to_string()]
        );
    }
}
