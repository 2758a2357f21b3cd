//! Stateful translator: Chat-Completions chunk stream → Anthropic SSE events.
//!
//! Upstream chunks carry flat deltas, so this machine reconstructs the
//! Anthropic content-block lifecycle: a dedicated thinking block for
//! reasoning deltas, one text block for content, and one tool_use block per
//! streamed tool call. Blocks are sequential; starting a new block closes
//! the previous one.

use std::collections::{BTreeSet, HashMap};

use crate::messages::{anthropic, openai};
use crate::translate::openai_to_anthropic::map_finish_reason;

/// Which block the machine is currently appending to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum OpenKind {
    Thinking,
    Text,
    Tool(u64),
}

/// Translates upstream Chat-Completions chunks into Anthropic stream events.
#[derive(Debug, Default)]
pub(crate) struct OpenAiToAnthropicStream {
    message_start_sent: bool,

    next_block_index: u64,
    open_blocks: BTreeSet<u64>,
    current: Option<(OpenKind, u64)>,
    /// Upstream tool-call index → client block index.
    tool_blocks: HashMap<u64, u64>,

    finish_reason: Option<openai::FinishReason>,
    usage: Option<openai::Usage>,
}

impl OpenAiToAnthropicStream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Translate one upstream chunk into zero or more client events.
    pub(crate) fn process_chunk(&mut self, chunk: &openai::ChatCompletionChunk) -> Vec<anthropic::StreamEvent> {
        let mut out = Vec::new();

        self.ensure_message_start(chunk, &mut out);

        if let Some(usage) = &chunk.usage {
            self.usage = Some(usage.clone());
        }

        for choice in &chunk.choices {
            let delta = &choice.delta;

            let reasoning = delta
                .reasoning_text
                .as_deref()
                .or(delta.reasoning_content.as_deref());

            if let Some(reasoning) = reasoning.filter(|text| !text.is_empty()) {
                let index = self.switch_block(
                    OpenKind::Thinking,
                    || anthropic::ContentBlock::Thinking {
                        thinking: String::new(),
                        signature: String::new(),
                    },
                    &mut out,
                );

                out.push(anthropic::StreamEvent::ContentBlockDelta {
                    index,
                    delta: anthropic::BlockDelta::ThinkingDelta {
                        thinking: reasoning.to_string(),
                    },
                });
            }

            if let Some(content) = delta.content.as_deref().filter(|text| !text.is_empty()) {
                let index = self.switch_block(
                    OpenKind::Text,
                    || anthropic::ContentBlock::Text { text: String::new() },
                    &mut out,
                );

                out.push(anthropic::StreamEvent::ContentBlockDelta {
                    index,
                    delta: anthropic::BlockDelta::TextDelta {
                        text: content.to_string(),
                    },
                });
            }

            for tool_call in delta.tool_calls.iter().flatten() {
                self.process_tool_call(tool_call, &mut out);
            }

            if let Some(reason) = &choice.finish_reason
                && self.finish_reason.is_none()
            {
                self.finish_reason = Some(reason.clone());
            }
        }

        out
    }

    /// Finish the stream after the upstream `[DONE]` sentinel or EOF.
    pub(crate) fn finish(&mut self) -> Vec<anthropic::StreamEvent> {
        let mut out = Vec::new();

        if !self.message_start_sent {
            self.message_start_sent = true;
            out.push(self.message_start_event("", ""));
        }

        self.current = None;
        for index in std::mem::take(&mut self.open_blocks) {
            out.push(anthropic::StreamEvent::ContentBlockStop { index });
        }

        let usage = self.usage.take().map(|usage| {
            let cached = usage
                .prompt_tokens_details
                .and_then(|details| details.cached_tokens);

            anthropic::Usage {
                input_tokens: usage.prompt_tokens.saturating_sub(cached.unwrap_or(0)),
                output_tokens: usage.completion_tokens,
                cache_read_input_tokens: cached,
                cache_creation_input_tokens: None,
            }
        });

        out.push(anthropic::StreamEvent::MessageDelta {
            delta: anthropic::MessageDeltaBody {
                stop_reason: self.finish_reason.take().map(map_finish_reason),
                stop_sequence: None,
            },
            usage,
        });

        out.push(anthropic::StreamEvent::MessageStop);
        out
    }

    fn ensure_message_start(&mut self, chunk: &openai::ChatCompletionChunk, out: &mut Vec<anthropic::StreamEvent>) {
        if self.message_start_sent {
            return;
        }

        self.message_start_sent = true;
        out.push(self.message_start_event(&chunk.id, &chunk.model));
    }

    fn message_start_event(&self, id: &str, model: &str) -> anthropic::StreamEvent {
        anthropic::StreamEvent::MessageStart {
            message: Box::new(anthropic::MessagesResponse {
                id: if id.is_empty() {
                    format!("msg_{}", uuid::Uuid::new_v4())
                } else {
                    id.to_string()
                },
                r#type: "message".to_string(),
                role: "assistant".to_string(),
                model: model.to_string(),
                content: Vec::new(),
                stop_reason: None,
                stop_sequence: None,
                usage: anthropic::Usage::default(),
            }),
        }
    }

    /// Ensure a block of the given kind is open, closing the previous block
    /// when the kind changes. Returns the block index to append to.
    fn switch_block(
        &mut self,
        kind: OpenKind,
        content_block: impl FnOnce() -> anthropic::ContentBlock,
        out: &mut Vec<anthropic::StreamEvent>,
    ) -> u64 {
        if let Some((current_kind, index)) = self.current
            && current_kind == kind
        {
            return index;
        }

        self.close_current(out);

        let index = self.next_block_index;
        self.next_block_index += 1;
        self.open_blocks.insert(index);
        self.current = Some((kind, index));

        out.push(anthropic::StreamEvent::ContentBlockStart {
            index,
            content_block: content_block(),
        });

        index
    }

    fn close_current(&mut self, out: &mut Vec<anthropic::StreamEvent>) {
        if let Some((_, index)) = self.current.take()
            && self.open_blocks.remove(&index)
        {
            out.push(anthropic::StreamEvent::ContentBlockStop { index });
        }
    }

    fn process_tool_call(&mut self, tool_call: &openai::ToolCallDelta, out: &mut Vec<anthropic::StreamEvent>) {
        let block_index = match self.tool_blocks.get(&tool_call.index) {
            Some(&index) => index,
            None => {
                self.close_current(out);

                let index = self.next_block_index;
                self.next_block_index += 1;
                self.open_blocks.insert(index);
                self.current = Some((OpenKind::Tool(tool_call.index), index));
                self.tool_blocks.insert(tool_call.index, index);

                let id = tool_call
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("tool_call_{index}"));

                let name = tool_call
                    .function
                    .as_ref()
                    .and_then(|function| function.name.clone())
                    .unwrap_or_default();

                out.push(anthropic::StreamEvent::ContentBlockStart {
                    index,
                    content_block: anthropic::ContentBlock::ToolUse {
                        id,
                        name,
                        input: serde_json::Value::Object(serde_json::Map::new()),
                    },
                });

                index
            }
        };

        let arguments = tool_call
            .function
            .as_ref()
            .and_then(|function| function.arguments.as_deref())
            .filter(|arguments| !arguments.is_empty());

        if let Some(arguments) = arguments {
            out.push(anthropic::StreamEvent::ContentBlockDelta {
                index: block_index,
                delta: anthropic::BlockDelta::InputJsonDelta {
                    partial_json: arguments.to_string(),
                },
            });
        }
    }
}
