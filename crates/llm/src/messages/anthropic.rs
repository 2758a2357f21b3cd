//! Anthropic Messages dialect.
//!
//! Request and response types for the `/v1/messages` surface, plus the SSE
//! event vocabulary emitted on streaming responses. Content is modeled as
//! typed blocks; unknown block shapes are preserved through an untagged
//! `Other` variant so they can be passed along where the target dialect
//! accepts them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for the Anthropic Messages API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessagesRequest {
    /// The model to answer the request with.
    pub model: String,

    /// Conversation turns, alternating between `user` and `assistant`.
    pub messages: Vec<Message>,

    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,

    /// System prompt, either a plain string or a list of text blocks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemPrompt>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Request metadata. The `user_id` field may encode a safety identifier
    /// and a prompt cache key (see the Responses translation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,

    /// Tools the model may invoke.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,

    /// Controls how the model uses tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,

    /// Extended-thinking toggle, forwarded opaquely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<Value>,
}

impl MessagesRequest {
    /// Whether the request carries at least one tool definition.
    pub fn has_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|tools| !tools.is_empty())
    }
}

/// System prompt in either of its two accepted shapes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SystemPrompt {
    /// Plain string prompt.
    Text(String),
    /// A list of text blocks.
    Blocks(Vec<SystemBlock>),
}

/// A single block of a structured system prompt.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SystemBlock {
    /// Text content.
    Text { text: String },
    /// Unknown block shape, preserved as-is.
    #[serde(untagged)]
    Other(Value),
}

/// A conversation turn.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Message content, either a bare string or typed blocks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// Content block in a message or response.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },

    /// Image content.
    Image { source: ImageSource },

    /// Tool invocation requested by the assistant.
    ToolUse {
        /// Stable identifier the matching tool_result refers back to.
        id: String,
        name: String,
        input: Value,
    },

    /// Result of a previous tool invocation, in a user turn.
    ToolResult {
        tool_use_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<ToolResultContent>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },

    /// Model reasoning, optionally signed for upstream verification.
    Thinking {
        thinking: String,
        #[serde(default)]
        signature: String,
    },

    /// Unknown block shape, preserved as-is.
    #[serde(untagged)]
    Other(Value),
}

/// Content of a tool result, either a bare string or nested blocks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl ToolResultContent {
    /// Flatten the result into a single string, joining text blocks.
    pub fn to_text(&self) -> String {
        match self {
            ToolResultContent::Text(text) => text.clone(),
            ToolResultContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Image source for image content blocks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageSource {
    /// Base64-encoded image data.
    Base64 { media_type: String, data: String },
    /// Externally hosted image.
    Url { url: String },
}

impl ImageSource {
    /// Renders the source as a data URL, or the plain URL for hosted images.
    pub fn to_image_url(&self) -> String {
        match self {
            ImageSource::Base64 { media_type, data } => {
                format!("data:{media_type};base64,{data}")
            }
            ImageSource::Url { url } => url.clone(),
        }
    }
}

/// Request metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Tool definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema describing the tool input.
    pub input_schema: Value,
}

/// Tool choice policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    /// The model decides whether to use tools.
    Auto,
    /// The model must use at least one tool.
    Any,
    /// The model must use the named tool.
    Tool { name: String },
    /// The model must not use tools.
    None,
}

/// Response body for a non-streaming message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub id: String,
    pub r#type: String,
    pub role: String,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
    Refusal,
    /// Forward-compatible catch-all carrying the raw value.
    #[serde(untagged)]
    Other(String),
}

/// Token usage counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_read_input_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_creation_input_tokens: Option<u64>,
}

/// Response body for `/v1/messages/count_tokens`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CountTokensResponse {
    pub input_tokens: u64,
}

/// Server-sent events emitted on a streaming response.
///
/// Each variant maps to a concrete SSE `event:` name. Streams begin with
/// `message_start`, emit one or more content block lifecycles
/// (`content_block_start` → `content_block_delta`* → `content_block_stop`),
/// and finish with `message_delta` followed by `message_stop`, or a terminal
/// `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart { message: Box<MessagesResponse> },
    ContentBlockStart { index: u64, content_block: ContentBlock },
    ContentBlockDelta { index: u64, delta: BlockDelta },
    ContentBlockStop { index: u64 },
    MessageDelta {
        delta: MessageDeltaBody,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
    MessageStop,
    Ping,
    Error { error: ErrorBody },
}

impl StreamEvent {
    /// The SSE `event:` line matching this payload.
    pub fn event_name(&self) -> &'static str {
        match self {
            StreamEvent::MessageStart { .. } => "message_start",
            StreamEvent::ContentBlockStart { .. } => "content_block_start",
            StreamEvent::ContentBlockDelta { .. } => "content_block_delta",
            StreamEvent::ContentBlockStop { .. } => "content_block_stop",
            StreamEvent::MessageDelta { .. } => "message_delta",
            StreamEvent::MessageStop => "message_stop",
            StreamEvent::Ping => "ping",
            StreamEvent::Error { .. } => "error",
        }
    }
}

/// Incremental update to a content block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
}

/// Top-level changes carried by a `message_delta` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeltaBody {
    pub stop_reason: Option<StopReason>,
    pub stop_sequence: Option<String>,
}

/// Error payload for both HTTP error bodies and terminal stream events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub r#type: String,
    pub message: String,
}

/// HTTP error envelope for the Anthropic surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub r#type: String,
    pub error: ErrorBody,
}
