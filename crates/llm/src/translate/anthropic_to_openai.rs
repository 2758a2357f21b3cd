//! Anthropic Messages request → Chat-Completions request.

use crate::messages::{anthropic, openai};
use crate::translate::arguments::serialize_tool_input;
use crate::translate::normalize_model;

/// Build the upstream Chat-Completions payload for an Anthropic request.
pub(crate) fn translate_request(request: anthropic::MessagesRequest) -> openai::ChatCompletionRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);

    if let Some(system) = request.system {
        messages.push(openai::ChatMessage {
            role: openai::ChatRole::System,
            content: Some(openai::MessageContent::Text(flatten_system(system))),
            ..Default::default()
        });
    }

    for message in request.messages {
        match message.role {
            anthropic::Role::User => translate_user_message(message.content, &mut messages),
            anthropic::Role::Assistant => translate_assistant_message(message.content, &mut messages),
        }
    }

    openai::ChatCompletionRequest {
        model: normalize_model(&request.model),
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        top_p: request.top_p,
        stop: request
            .stop_sequences
            .map(|sequences| serde_json::to_value(sequences).unwrap_or_default()),
        stream: request.stream,
        tools: request.tools.map(|tools| tools.into_iter().map(translate_tool).collect()),
        tool_choice: request.tool_choice.map(translate_tool_choice),
        parallel_tool_calls: None,
    }
}

fn flatten_system(system: anthropic::SystemPrompt) -> String {
    match system {
        anthropic::SystemPrompt::Text(text) => text,
        anthropic::SystemPrompt::Blocks(blocks) => blocks
            .into_iter()
            .filter_map(|block| match block {
                anthropic::SystemBlock::Text { text } => Some(text),
                anthropic::SystemBlock::Other(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

/// Tool results split into dedicated `role=tool` messages ahead of the rest
/// of the turn. The protocol requires tool_use → tool_result → user content.
fn translate_user_message(content: anthropic::MessageContent, messages: &mut Vec<openai::ChatMessage>) {
    let blocks = match content {
        anthropic::MessageContent::Text(text) => {
            messages.push(openai::ChatMessage {
                role: openai::ChatRole::User,
                content: Some(openai::MessageContent::Text(text)),
                ..Default::default()
            });
            return;
        }
        anthropic::MessageContent::Blocks(blocks) => blocks,
    };

    let mut remainder = Vec::new();

    for block in blocks {
        match block {
            anthropic::ContentBlock::ToolResult {
                tool_use_id, content, ..
            } => {
                let output = content.map(|content| content.to_text()).unwrap_or_default();

                messages.push(openai::ChatMessage {
                    role: openai::ChatRole::Tool,
                    content: Some(openai::MessageContent::Text(output)),
                    tool_call_id: Some(tool_use_id),
                    ..Default::default()
                });
            }
            other => remainder.push(other),
        }
    }

    if remainder.is_empty() {
        return;
    }

    let has_images = remainder
        .iter()
        .any(|block| matches!(block, anthropic::ContentBlock::Image { .. }));

    let content = if has_images {
        let parts = remainder
            .into_iter()
            .filter_map(|block| match block {
                anthropic::ContentBlock::Text { text } => Some(openai::ContentPart::Text { text }),
                anthropic::ContentBlock::Image { source } => Some(openai::ContentPart::ImageUrl {
                    image_url: openai::ImageUrl {
                        url: source.to_image_url(),
                    },
                }),
                _ => None,
            })
            .collect();

        openai::MessageContent::Parts(parts)
    } else {
        let text = remainder
            .into_iter()
            .filter_map(|block| match block {
                anthropic::ContentBlock::Text { text } => Some(text),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        openai::MessageContent::Text(text)
    };

    messages.push(openai::ChatMessage {
        role: openai::ChatRole::User,
        content: Some(content),
        ..Default::default()
    });
}

fn translate_assistant_message(content: anthropic::MessageContent, messages: &mut Vec<openai::ChatMessage>) {
    let blocks = match content {
        anthropic::MessageContent::Text(text) => {
            messages.push(openai::ChatMessage {
                role: openai::ChatRole::Assistant,
                content: Some(openai::MessageContent::Text(text)),
                ..Default::default()
            });
            return;
        }
        anthropic::MessageContent::Blocks(blocks) => blocks,
    };

    let mut texts = Vec::new();
    let mut thinking_texts = Vec::new();
    let mut signature = None;
    let mut tool_calls = Vec::new();

    for block in blocks {
        match block {
            anthropic::ContentBlock::Text { text } => texts.push(text),
            anthropic::ContentBlock::Thinking {
                thinking,
                signature: block_signature,
            } => {
                thinking_texts.push(thinking);

                if signature.is_none() && !block_signature.is_empty() {
                    signature = Some(block_signature);
                }
            }
            anthropic::ContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(openai::ToolCall {
                    id,
                    r#type: openai::ToolType::Function,
                    function: openai::FunctionCall {
                        name,
                        arguments: serialize_tool_input(&input),
                    },
                });
            }
            _ => {}
        }
    }

    let content = if texts.is_empty() {
        None
    } else {
        Some(openai::MessageContent::Text(texts.join("\n\n")))
    };

    let reasoning_text = if thinking_texts.is_empty() {
        None
    } else {
        Some(thinking_texts.join("\n\n"))
    };

    messages.push(openai::ChatMessage {
        role: openai::ChatRole::Assistant,
        content,
        tool_calls: if tool_calls.is_empty() { None } else { Some(tool_calls) },
        tool_call_id: None,
        reasoning_text,
        reasoning_opaque: signature,
    });
}

fn translate_tool(tool: anthropic::Tool) -> openai::Tool {
    openai::Tool {
        r#type: openai::ToolType::Function,
        function: openai::FunctionDefinition {
            name: tool.name,
            description: tool.description,
            parameters: tool.input_schema,
        },
    }
}

fn translate_tool_choice(choice: anthropic::ToolChoice) -> openai::ToolChoice {
    match choice {
        anthropic::ToolChoice::Auto => openai::ToolChoice::Mode(openai::ToolChoiceMode::Auto),
        anthropic::ToolChoice::Any => openai::ToolChoice::Mode(openai::ToolChoiceMode::Required),
        anthropic::ToolChoice::Tool { name } => openai::ToolChoice::Function {
            r#type: openai::ToolType::Function,
            function: openai::FunctionName { name },
        },
        anthropic::ToolChoice::None => openai::ToolChoice::Mode(openai::ToolChoiceMode::None),
    }
}
