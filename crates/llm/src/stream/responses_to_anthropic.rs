//! Stateful translator: Responses event stream → Anthropic SSE events.
//!
//! One instance lives per streaming request and is driven by the single
//! consumer of the upstream stream. It maintains the content-block lifecycle
//! guarantees of the Anthropic protocol: block indices are monotonically
//! assigned from 0, `content_block_start` strictly precedes deltas for the
//! same index, and every opened block is closed before `message_stop`.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde_json::Value;

use crate::messages::anthropic;
use crate::stream::events::{non_empty_str, object_field, str_field, u64_field};
use crate::translate::responses_to_anthropic::map_stop_reason;

/// Message shown when the upstream closes without a terminal event.
pub(crate) const PREMATURE_EOF_MESSAGE: &str = "Responses stream ended without completion";

#[derive(Debug)]
struct FunctionCallState {
    block_index: u64,
}

/// Translates upstream Responses events into Anthropic stream events.
#[derive(Debug, Default)]
pub(crate) struct ResponsesToAnthropicStream {
    message_start_sent: bool,
    message_completed: bool,

    /// Next client-facing content block index; first-touch-wins allocation.
    next_block_index: u64,
    /// `(output_index, content_index)` → client block index.
    block_index_by_key: HashMap<(u64, u64), u64>,
    open_blocks: BTreeSet<u64>,
    blocks_with_delta: HashSet<u64>,

    response_id: Option<String>,
    model: Option<String>,
    initial_input_tokens: u64,
    initial_cached_tokens: u64,

    /// Function-call bookkeeping by upstream `output_index`.
    function_calls: HashMap<u64, FunctionCallState>,
    /// Fallback resolution for events that only carry `item_id`.
    call_index_by_item_id: HashMap<String, u64>,
}

impl ResponsesToAnthropicStream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal event has been handled; the driving loop stops
    /// reading once this turns true.
    pub(crate) fn is_complete(&self) -> bool {
        self.message_completed
    }

    /// Translate one upstream event into zero or more client events.
    pub(crate) fn process_event(&mut self, event: &Value) -> Vec<anthropic::StreamEvent> {
        let mut out = Vec::new();

        match str_field(event, "type").unwrap_or_default() {
            "response.created" => {
                self.record_response_metadata(event);
                self.ensure_message_start(&mut out);
            }
            "response.output_item.added" => {
                self.ensure_message_start(&mut out);
                self.handle_output_item_added(event, &mut out);
            }
            "response.output_item.done" => {
                self.ensure_message_start(&mut out);
                self.handle_output_item_done(event, &mut out);
            }
            "response.output_text.delta" => {
                self.ensure_message_start(&mut out);
                self.handle_text_delta(event, &mut out);
            }
            "response.output_text.done" => {
                self.ensure_message_start(&mut out);
                self.handle_text_done(event, &mut out);
            }
            "response.reasoning_summary_text.delta" => {
                self.ensure_message_start(&mut out);
                self.handle_thinking_delta(event, &mut out);
            }
            "response.reasoning_summary_part.done" => {
                self.ensure_message_start(&mut out);
                self.handle_thinking_part_done(event, &mut out);
            }
            "response.function_call_arguments.delta" => {
                self.ensure_message_start(&mut out);
                self.handle_arguments_delta(event, &mut out);
            }
            "response.function_call_arguments.done" => {
                self.ensure_message_start(&mut out);
                self.handle_arguments_done(event, &mut out);
            }
            "response.completed" | "response.incomplete" => {
                self.ensure_message_start(&mut out);
                self.handle_terminal(event, &mut out);
            }
            "response.failed" => {
                self.ensure_message_start(&mut out);
                self.close_open_blocks(&mut out);

                out.push(anthropic::StreamEvent::Error {
                    error: anthropic::ErrorBody {
                        r#type: "api_error".to_string(),
                        message: extract_error_message(event)
                            .unwrap_or_else(|| "Responses stream failed".to_string()),
                    },
                });

                self.message_completed = true;
            }
            "error" => {
                // Assumed fatal; open blocks are left as-is.
                self.ensure_message_start(&mut out);

                out.push(anthropic::StreamEvent::Error {
                    error: anthropic::ErrorBody {
                        r#type: "api_error".to_string(),
                        message: extract_error_message(event)
                            .unwrap_or_else(|| "Responses stream error".to_string()),
                    },
                });

                self.message_completed = true;
            }
            other => {
                log::debug!("ignoring unknown Responses stream event: {other}");
            }
        }

        out
    }

    /// Finish the stream after upstream EOF. Emits the synthetic error when
    /// no terminal event was observed.
    pub(crate) fn finish(&mut self) -> Vec<anthropic::StreamEvent> {
        let mut out = Vec::new();

        if self.message_completed {
            return out;
        }

        self.ensure_message_start(&mut out);

        out.push(anthropic::StreamEvent::Error {
            error: anthropic::ErrorBody {
                r#type: "api_error".to_string(),
                message: PREMATURE_EOF_MESSAGE.to_string(),
            },
        });

        self.message_completed = true;
        out
    }

    fn record_response_metadata(&mut self, event: &Value) {
        let Some(response) = object_field(event, "response") else {
            return;
        };

        if let Some(id) = non_empty_str(response, "id") {
            self.response_id = Some(id.to_string());
        }

        if let Some(model) = non_empty_str(response, "model") {
            self.model = Some(model.to_string());
        }

        if let Some(usage) = object_field(response, "usage") {
            self.initial_input_tokens = u64_field(usage, "input_tokens").unwrap_or(0);
            self.initial_cached_tokens = object_field(usage, "input_tokens_details")
                .and_then(|details| u64_field(details, "cached_tokens"))
                .unwrap_or(0);
        }
    }

    fn ensure_message_start(&mut self, out: &mut Vec<anthropic::StreamEvent>) {
        if self.message_start_sent {
            return;
        }

        self.message_start_sent = true;

        out.push(anthropic::StreamEvent::MessageStart {
            message: Box::new(anthropic::MessagesResponse {
                id: self
                    .response_id
                    .clone()
                    .unwrap_or_else(|| format!("msg_{}", uuid::Uuid::new_v4())),
                r#type: "message".to_string(),
                role: "assistant".to_string(),
                model: self.model.clone().unwrap_or_default(),
                content: Vec::new(),
                stop_reason: None,
                stop_sequence: None,
                usage: anthropic::Usage {
                    input_tokens: self.initial_input_tokens.saturating_sub(self.initial_cached_tokens),
                    output_tokens: 0,
                    cache_read_input_tokens: None,
                    cache_creation_input_tokens: (self.initial_cached_tokens > 0)
                        .then_some(self.initial_cached_tokens),
                },
            }),
        });
    }

    fn block_key(event: &Value) -> (u64, u64) {
        (
            u64_field(event, "output_index").unwrap_or(0),
            u64_field(event, "content_index").unwrap_or(0),
        )
    }

    /// Returns the block index for the key, opening a block when the key is
    /// seen for the first time.
    fn open_block(
        &mut self,
        key: (u64, u64),
        content_block: impl FnOnce() -> anthropic::ContentBlock,
        out: &mut Vec<anthropic::StreamEvent>,
    ) -> u64 {
        if let Some(&index) = self.block_index_by_key.get(&key) {
            return index;
        }

        let index = self.next_block_index;
        self.next_block_index += 1;

        self.block_index_by_key.insert(key, index);
        self.open_blocks.insert(index);

        out.push(anthropic::StreamEvent::ContentBlockStart {
            index,
            content_block: content_block(),
        });

        index
    }

    fn close_block(&mut self, index: u64, out: &mut Vec<anthropic::StreamEvent>) {
        if self.open_blocks.remove(&index) {
            out.push(anthropic::StreamEvent::ContentBlockStop { index });
        }
    }

    fn close_open_blocks(&mut self, out: &mut Vec<anthropic::StreamEvent>) {
        let open = std::mem::take(&mut self.open_blocks);

        for index in open {
            out.push(anthropic::StreamEvent::ContentBlockStop { index });
        }
    }

    fn handle_text_delta(&mut self, event: &Value, out: &mut Vec<anthropic::StreamEvent>) {
        let Some(delta) = non_empty_str(event, "delta") else {
            return;
        };

        let key = Self::block_key(event);
        let index = self.open_block(key, || anthropic::ContentBlock::Text { text: String::new() }, out);

        out.push(anthropic::StreamEvent::ContentBlockDelta {
            index,
            delta: anthropic::BlockDelta::TextDelta {
                text: delta.to_string(),
            },
        });

        self.blocks_with_delta.insert(index);
    }

    fn handle_text_done(&mut self, event: &Value, out: &mut Vec<anthropic::StreamEvent>) {
        let key = Self::block_key(event);
        let index = self.open_block(key, || anthropic::ContentBlock::Text { text: String::new() }, out);

        if self.open_blocks.contains(&index)
            && !self.blocks_with_delta.contains(&index)
            && let Some(text) = non_empty_str(event, "text")
        {
            out.push(anthropic::StreamEvent::ContentBlockDelta {
                index,
                delta: anthropic::BlockDelta::TextDelta {
                    text: text.to_string(),
                },
            });

            self.blocks_with_delta.insert(index);
        }

        self.close_block(index, out);
    }

    /// Reasoning summaries map to a single thinking block per output item.
    fn thinking_key(event: &Value) -> (u64, u64) {
        (u64_field(event, "output_index").unwrap_or(0), 0)
    }

    fn open_thinking_block(&mut self, event: &Value, out: &mut Vec<anthropic::StreamEvent>) -> u64 {
        self.open_block(
            Self::thinking_key(event),
            || anthropic::ContentBlock::Thinking {
                thinking: String::new(),
                signature: String::new(),
            },
            out,
        )
    }

    fn handle_thinking_delta(&mut self, event: &Value, out: &mut Vec<anthropic::StreamEvent>) {
        let Some(delta) = non_empty_str(event, "delta") else {
            return;
        };

        let index = self.open_thinking_block(event, out);

        out.push(anthropic::StreamEvent::ContentBlockDelta {
            index,
            delta: anthropic::BlockDelta::ThinkingDelta {
                thinking: delta.to_string(),
            },
        });

        self.blocks_with_delta.insert(index);
    }

    fn handle_thinking_part_done(&mut self, event: &Value, out: &mut Vec<anthropic::StreamEvent>) {
        let index = self.open_thinking_block(event, out);

        if self.open_blocks.contains(&index)
            && !self.blocks_with_delta.contains(&index)
            && let Some(text) = object_field(event, "part").and_then(|part| non_empty_str(part, "text"))
        {
            out.push(anthropic::StreamEvent::ContentBlockDelta {
                index,
                delta: anthropic::BlockDelta::ThinkingDelta {
                    thinking: text.to_string(),
                },
            });

            self.blocks_with_delta.insert(index);
        }
    }

    fn handle_output_item_added(&mut self, event: &Value, out: &mut Vec<anthropic::StreamEvent>) {
        let Some(item) = object_field(event, "item") else {
            return;
        };

        if str_field(item, "type") != Some("function_call") {
            return;
        }

        let output_index = u64_field(event, "output_index").unwrap_or(0);

        let index = self.next_block_index;
        self.next_block_index += 1;
        self.open_blocks.insert(index);

        self.function_calls
            .insert(output_index, FunctionCallState { block_index: index });

        if let Some(item_id) = non_empty_str(item, "id") {
            self.call_index_by_item_id.insert(item_id.to_string(), output_index);
        }

        let id = non_empty_str(item, "call_id")
            .or_else(|| non_empty_str(item, "id"))
            .map(str::to_string)
            .unwrap_or_else(|| format!("tool_call_{index}"));

        out.push(anthropic::StreamEvent::ContentBlockStart {
            index,
            content_block: anthropic::ContentBlock::ToolUse {
                id,
                name: str_field(item, "name").unwrap_or_default().to_string(),
                input: Value::Object(serde_json::Map::new()),
            },
        });

        // Arguments may arrive fully formed in the initial payload.
        if let Some(arguments) = non_empty_str(item, "arguments") {
            out.push(anthropic::StreamEvent::ContentBlockDelta {
                index,
                delta: anthropic::BlockDelta::InputJsonDelta {
                    partial_json: arguments.to_string(),
                },
            });

            self.blocks_with_delta.insert(index);
        }
    }

    fn handle_output_item_done(&mut self, event: &Value, out: &mut Vec<anthropic::StreamEvent>) {
        let Some(item) = object_field(event, "item") else {
            return;
        };

        if str_field(item, "type") != Some("reasoning") {
            return;
        }

        let index = self.open_thinking_block(event, out);

        if self.open_blocks.contains(&index)
            && let Some(signature) = non_empty_str(item, "encrypted_content")
        {
            out.push(anthropic::StreamEvent::ContentBlockDelta {
                index,
                delta: anthropic::BlockDelta::SignatureDelta {
                    signature: signature.to_string(),
                },
            });
        }

        self.close_block(index, out);
    }

    /// Resolve a function-call event to its upstream output index, falling
    /// back to `item_id` when `output_index` is missing.
    fn resolve_call_index(&self, event: &Value) -> Option<u64> {
        u64_field(event, "output_index").or_else(|| {
            str_field(event, "item_id")
                .and_then(|item_id| self.call_index_by_item_id.get(item_id))
                .copied()
        })
    }

    fn handle_arguments_delta(&mut self, event: &Value, out: &mut Vec<anthropic::StreamEvent>) {
        let Some(delta) = non_empty_str(event, "delta") else {
            return;
        };

        let Some(index) = self
            .resolve_call_index(event)
            .and_then(|call_index| self.function_calls.get(&call_index))
            .map(|state| state.block_index)
        else {
            log::warn!("function call arguments delta for unknown output item");
            return;
        };

        out.push(anthropic::StreamEvent::ContentBlockDelta {
            index,
            delta: anthropic::BlockDelta::InputJsonDelta {
                partial_json: delta.to_string(),
            },
        });

        self.blocks_with_delta.insert(index);
    }

    fn handle_arguments_done(&mut self, event: &Value, out: &mut Vec<anthropic::StreamEvent>) {
        let Some(call_index) = self.resolve_call_index(event) else {
            return;
        };

        let Some(state) = self.function_calls.remove(&call_index) else {
            return;
        };

        let index = state.block_index;

        if !self.blocks_with_delta.contains(&index)
            && let Some(arguments) = non_empty_str(event, "arguments")
        {
            out.push(anthropic::StreamEvent::ContentBlockDelta {
                index,
                delta: anthropic::BlockDelta::InputJsonDelta {
                    partial_json: arguments.to_string(),
                },
            });

            self.blocks_with_delta.insert(index);
        }

        self.close_block(index, out);
    }

    fn handle_terminal(&mut self, event: &Value, out: &mut Vec<anthropic::StreamEvent>) {
        self.close_open_blocks(out);

        match object_field(event, "response") {
            Some(response) => {
                let stop_reason = map_stop_reason(
                    str_field(response, "status"),
                    object_field(response, "incomplete_details")
                        .and_then(|details| str_field(details, "reason")),
                );

                let usage = object_field(response, "usage").map(|usage| anthropic::Usage {
                    input_tokens: u64_field(usage, "input_tokens").unwrap_or(0),
                    output_tokens: u64_field(usage, "output_tokens").unwrap_or(0),
                    cache_read_input_tokens: None,
                    cache_creation_input_tokens: None,
                });

                out.push(anthropic::StreamEvent::MessageDelta {
                    delta: anthropic::MessageDeltaBody {
                        stop_reason,
                        stop_sequence: None,
                    },
                    usage,
                });
            }
            None => {
                out.push(anthropic::StreamEvent::MessageDelta {
                    delta: anthropic::MessageDeltaBody {
                        stop_reason: None,
                        stop_sequence: None,
                    },
                    usage: None,
                });
            }
        }

        out.push(anthropic::StreamEvent::MessageStop);
        self.message_completed = true;
    }
}

fn extract_error_message(event: &Value) -> Option<String> {
    match event.get("error") {
        Some(Value::String(message)) => Some(message.clone()),
        Some(Value::Object(error)) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
