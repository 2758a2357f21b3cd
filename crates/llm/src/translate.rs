//! Pure request/response translation between the three dialects.
//!
//! Request translators build the upstream payload for a client request;
//! response translators map a non-streaming upstream result back to the
//! client dialect. Streaming translation lives in [`crate::stream`].

pub(crate) mod anthropic_to_openai;
pub(crate) mod anthropic_to_responses;
pub(crate) mod arguments;
pub(crate) mod openai_to_anthropic;
pub(crate) mod openai_to_responses;
pub(crate) mod responses_to_anthropic;
pub(crate) mod responses_to_openai;

/// Collapse dated Claude release names to their catalog entries.
pub(crate) fn normalize_model(model: &str) -> String {
    if model.starts_with("claude-sonnet-4-") {
        return "claude-sonnet-4".to_string();
    }

    if model.starts_with("claude-opus-4-") {
        return "claude-opus-4".to_string();
    }

    model.to_string()
}
