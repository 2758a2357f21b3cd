//! Chat-Completions response → Anthropic Messages response.

use crate::messages::{anthropic, openai};
use crate::translate::arguments::parse_function_call_arguments;

/// Map a non-streaming Chat-Completions result to the Anthropic dialect.
///
/// Choices are concatenated in order; blocks within each choice follow the
/// canonical output order: thinking, then text, then tool_use.
pub(crate) fn translate_response(response: openai::ChatCompletionResponse) -> anthropic::MessagesResponse {
    let mut content = Vec::new();
    let mut stop_reason = None;
    let mut saw_tool_calls = false;

    for choice in response.choices {
        let message = choice.message;

        if message.reasoning_text.is_some() || message.reasoning_opaque.is_some() {
            content.push(anthropic::ContentBlock::Thinking {
                thinking: message.reasoning_text.unwrap_or_default(),
                signature: message.reasoning_opaque.unwrap_or_default(),
            });
        }

        if let Some(text) = message.content.map(|content| content.to_text())
            && !text.is_empty()
        {
            content.push(anthropic::ContentBlock::Text { text });
        }

        for tool_call in message.tool_calls.unwrap_or_default() {
            saw_tool_calls = true;

            content.push(anthropic::ContentBlock::ToolUse {
                id: tool_call.id,
                name: tool_call.function.name,
                input: parse_function_call_arguments(&tool_call.function.arguments),
            });
        }

        if stop_reason.is_none() {
            stop_reason = choice.finish_reason.map(map_finish_reason);
        }
    }

    // Any tool call anywhere wins over the first choice's reason.
    if saw_tool_calls {
        stop_reason = Some(anthropic::StopReason::ToolUse);
    }

    let usage = response
        .usage
        .map(|usage| {
            let cached = usage
                .prompt_tokens_details
                .and_then(|details| details.cached_tokens);

            anthropic::Usage {
                input_tokens: usage.prompt_tokens.saturating_sub(cached.unwrap_or(0)),
                output_tokens: usage.completion_tokens,
                cache_read_input_tokens: cached,
                cache_creation_input_tokens: None,
            }
        })
        .unwrap_or_default();

    anthropic::MessagesResponse {
        id: response.id,
        r#type: "message".to_string(),
        role: "assistant".to_string(),
        model: response.model,
        content,
        stop_reason,
        stop_sequence: None,
        usage,
    }
}

pub(crate) fn map_finish_reason(reason: openai::FinishReason) -> anthropic::StopReason {
    match reason {
        openai::FinishReason::Stop => anthropic::StopReason::EndTurn,
        openai::FinishReason::Length => anthropic::StopReason::MaxTokens,
        openai::FinishReason::ToolCalls => anthropic::StopReason::ToolUse,
        openai::FinishReason::ContentFilter => anthropic::StopReason::EndTurn,
        openai::FinishReason::Other(value) => anthropic::StopReason::Other(value),
    }
}
