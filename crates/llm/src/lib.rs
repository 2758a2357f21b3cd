//! LLM gateway core: three client dialects, one upstream.
//!
//! The handlers here are thin: they parse the client dialect, let the
//! routing layer pick the upstream API for the requested model, run the
//! request translators, and stream or return the translated reply.

use std::{convert::Infallible, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response, Sse, sse::Event},
    routing::{get, post},
};
use axum_serde::Sonic;
use futures::StreamExt;
use serde_json::Value;

mod error;
mod messages;
mod routing;
mod server;
mod stream;
mod token_count;
mod translate;
mod upstream;

pub use error::{AnthropicResult, GatewayError, Result};

use messages::{anthropic, openai, responses};
use routing::UpstreamKind;
use server::GatewayServer;
use stream::{
    openai_to_anthropic::OpenAiToAnthropicStream, responses_to_anthropic::ResponsesToAnthropicStream,
    responses_to_openai::ResponsesToOpenAiStream,
};
use upstream::{SseStream, UpstreamReply};

/// Creates an axum router for the gateway endpoints.
pub async fn router(config: config::Config) -> anyhow::Result<Router> {
    let server = Arc::new(GatewayServer::initialize(config).await?);

    Ok(Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/messages", post(anthropic_messages))
        .route("/v1/messages/count_tokens", post(count_tokens))
        .route("/v1/responses", post(responses_passthrough))
        .route("/v1/models", get(list_models))
        .with_state(server))
}

/// Handle Anthropic messages requests, streaming or not.
async fn anthropic_messages(
    State(server): State<Arc<GatewayServer>>,
    headers: HeaderMap,
    Sonic(mut request): Sonic<anthropic::MessagesRequest>,
) -> AnthropicResult<Response> {
    log::debug!(
        "Anthropic messages request for model {} ({} messages, streaming: {})",
        request.model,
        request.messages.len(),
        request.stream.unwrap_or(false)
    );

    // Tool-less requests under an anthropic-beta header are warmup or
    // title-generation traffic; route them to the configured small model.
    if !request.has_tools()
        && headers.contains_key("anthropic-beta")
        && let Some(small_model) = server.config.small_model()
    {
        log::debug!("rewriting warmup request from {} to {small_model}", request.model);
        request.model = small_model.to_string();
    }

    let routed_model = translate::normalize_model(&request.model);
    let upstream = server.catalog.upstream_for(&routed_model)?;
    let limit = server.catalog.max_output_tokens(&routed_model);

    match upstream {
        UpstreamKind::Responses => {
            let extra_prompt = server.config.extra_prompt_for(&request.model).map(str::to_string);

            let mut payload = translate::anthropic_to_responses::translate_request(request, extra_prompt.as_deref());
            payload.max_output_tokens = server::clamp_max_tokens(payload.max_output_tokens, limit);

            let options = routing::responses_request_options(&payload);
            let payload = to_value(&payload)?;

            match server.client.create_responses(&payload, options).await? {
                UpstreamReply::Stream(events) => Ok(anthropic_sse_from_responses(events).into_response()),
                UpstreamReply::Complete(body) => {
                    let response: responses::ResponsesResponse = parse_upstream(body)?;
                    let response = translate::responses_to_anthropic::translate_response(response);

                    Ok(Json(response).into_response())
                }
            }
        }
        UpstreamKind::ChatCompletions => {
            let mut payload = translate::anthropic_to_openai::translate_request(request);
            payload.max_tokens = server::clamp_max_tokens(payload.max_tokens, limit);

            let options = routing::chat_request_options(&payload);
            let payload = to_value(&payload)?;

            match server.client.create_chat_completions(&payload, options).await? {
                UpstreamReply::Stream(chunks) => Ok(anthropic_sse_from_chat(chunks).into_response()),
                UpstreamReply::Complete(body) => {
                    let response: openai::ChatCompletionResponse = parse_upstream(body)?;
                    let response = translate::openai_to_anthropic::translate_response(response);

                    Ok(Json(response).into_response())
                }
            }
        }
    }
}

/// Handle chat completion requests, streaming or not.
///
/// Models without Responses support are forwarded as-is so unknown request
/// fields survive the trip.
async fn chat_completions(
    State(server): State<Arc<GatewayServer>>,
    Sonic(payload): Sonic<Value>,
) -> Result<Response> {
    let Some(model) = payload.get("model").and_then(Value::as_str) else {
        return Err(GatewayError::InvalidRequest("Missing required field: model".to_string()));
    };

    log::debug!("chat completions request for model {model}");

    let routed_model = translate::normalize_model(model);
    let upstream = server.catalog.upstream_for(&routed_model)?;

    match upstream {
        UpstreamKind::Responses => {
            let request: openai::ChatCompletionRequest = parse_client(payload)?;
            let effort = server.config.reasoning_effort_for(&request.model);
            let limit = server.catalog.max_output_tokens(&routed_model);

            let mut translated = translate::openai_to_responses::translate_request(request, effort);
            translated.max_output_tokens = server::clamp_max_tokens(translated.max_output_tokens, limit);

            let options = routing::responses_request_options(&translated);
            let translated = to_value(&translated)?;

            match server.client.create_responses(&translated, options).await? {
                UpstreamReply::Stream(events) => Ok(chat_sse_from_responses(events).into_response()),
                UpstreamReply::Complete(body) => {
                    let response: responses::ResponsesResponse = parse_upstream(body)?;
                    let response = translate::responses_to_openai::translate_response(response);

                    Ok(Json(response).into_response())
                }
            }
        }
        UpstreamKind::ChatCompletions => {
            let request: openai::ChatCompletionRequest = parse_client(payload.clone())?;
            let options = routing::chat_request_options(&request);

            match server.client.create_chat_completions(&payload, options).await? {
                UpstreamReply::Stream(chunks) => Ok(forward_sse(chunks, false).into_response()),
                UpstreamReply::Complete(body) => Ok(Json(body).into_response()),
            }
        }
    }
}

/// Handle Anthropic count-tokens requests.
async fn count_tokens(
    State(_server): State<Arc<GatewayServer>>,
    headers: HeaderMap,
    Sonic(request): Sonic<anthropic::MessagesRequest>,
) -> AnthropicResult<Json<anthropic::CountTokensResponse>> {
    let claude_code_beta = headers
        .get("anthropic-beta")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("claude-code"));

    let has_mcp_tool = request
        .tools
        .iter()
        .flatten()
        .any(|tool| tool.name.starts_with("mcp__"));

    let count = token_count::get_token_count(&request)?;

    let input_tokens = token_count::adjust_token_count(
        &request.model,
        count,
        request.has_tools(),
        has_mcp_tool,
        claude_code_beta,
    );

    Ok(Json(anthropic::CountTokensResponse { input_tokens }))
}

/// Handle Responses pass-through requests.
async fn responses_passthrough(
    State(server): State<Arc<GatewayServer>>,
    Sonic(payload): Sonic<Value>,
) -> Result<Response> {
    let Some(model) = payload.get("model").and_then(Value::as_str) else {
        return Err(GatewayError::InvalidRequest("Missing required field: model".to_string()));
    };

    let entry = server
        .catalog
        .get(model)
        .ok_or_else(|| GatewayError::InvalidRequest(format!("Unknown model: {model}")))?;

    if !routing::supports_responses(entry) {
        return Err(GatewayError::InvalidRequest(format!(
            "Model '{model}' does not support the Responses API"
        )));
    }

    let options = routing::raw_responses_options(&payload);

    match server.client.create_responses(&payload, options).await? {
        UpstreamReply::Stream(events) => Ok(forward_sse(events, true).into_response()),
        UpstreamReply::Complete(body) => Ok(Json(body).into_response()),
    }
}

/// Handle list models requests.
async fn list_models(State(server): State<Arc<GatewayServer>>) -> Json<Value> {
    let data: Vec<Value> = server
        .catalog
        .models()
        .iter()
        .map(|model| {
            serde_json::json!({
                "id": model.id,
                "object": "model",
                "created": 0,
                "owned_by": "copilot",
            })
        })
        .collect();

    log::debug!("returning {} models", data.len());

    Json(serde_json::json!({ "object": "list", "data": data }))
}

fn to_value<T: serde::Serialize>(payload: &T) -> Result<Value> {
    serde_json::to_value(payload).map_err(|e| {
        log::error!("failed to serialize upstream payload: {e}");
        GatewayError::InternalError(None)
    })
}

fn parse_upstream<T: serde::de::DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| {
        log::error!("failed to parse upstream response: {e}");
        GatewayError::InternalError(None)
    })
}

fn parse_client<T: serde::de::DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| GatewayError::InvalidRequest(format!("Invalid request body: {e}")))
}

/// Anthropic SSE response driven by a Responses upstream stream.
fn anthropic_sse_from_responses(
    events: SseStream,
) -> Sse<impl futures::Stream<Item = std::result::Result<Event, Infallible>>> {
    let batches = futures::stream::unfold(
        Some((ResponsesToAnthropicStream::new(), events)),
        |state| async move {
            let (mut translator, mut events) = state?;

            loop {
                if translator.is_complete() {
                    return None;
                }

                match events.next().await {
                    Some(event) => {
                        if event.data == "[DONE]" {
                            continue;
                        }

                        let value: Value = match sonic_rs::from_str(&event.data) {
                            Ok(value) => value,
                            Err(error) => {
                                log::warn!("failed to parse upstream stream event: {error}");
                                continue;
                            }
                        };

                        let batch = translator.process_event(&value);

                        if batch.is_empty() {
                            continue;
                        }

                        return Some((batch, Some((translator, events))));
                    }
                    None => {
                        let batch = translator.finish();

                        return if batch.is_empty() { None } else { Some((batch, None)) };
                    }
                }
            }
        },
    );

    anthropic_sse(batches)
}

/// Anthropic SSE response driven by a Chat-Completions upstream stream.
fn anthropic_sse_from_chat(
    chunks: SseStream,
) -> Sse<impl futures::Stream<Item = std::result::Result<Event, Infallible>>> {
    let batches = futures::stream::unfold(
        Some((OpenAiToAnthropicStream::new(), chunks)),
        |state| async move {
            let (mut translator, mut chunks) = state?;

            loop {
                match chunks.next().await {
                    Some(event) => {
                        if event.data == "[DONE]" {
                            return Some((translator.finish(), None));
                        }

                        let chunk: openai::ChatCompletionChunk = match sonic_rs::from_str(&event.data) {
                            Ok(chunk) => chunk,
                            Err(error) => {
                                log::warn!("failed to parse upstream chunk: {error}");
                                continue;
                            }
                        };

                        let batch = translator.process_chunk(&chunk);

                        if batch.is_empty() {
                            continue;
                        }

                        return Some((batch, Some((translator, chunks))));
                    }
                    None => return Some((translator.finish(), None)),
                }
            }
        },
    );

    anthropic_sse(batches)
}

/// Frame batches of Anthropic events as SSE with per-event `event:` lines.
fn anthropic_sse<S>(batches: S) -> Sse<impl futures::Stream<Item = std::result::Result<Event, Infallible>>>
where
    S: futures::Stream<Item = Vec<anthropic::StreamEvent>> + Send + 'static,
{
    let events = batches.flat_map(futures::stream::iter).map(|event| {
        let data = sonic_rs::to_string(&event).unwrap_or_else(|error| {
            log::error!("failed to serialize stream event: {error}");
            r#"{"type":"error","error":{"type":"internal_error","message":"serialization failed"}}"#.to_string()
        });

        Ok::<_, Infallible>(Event::default().event(event.event_name()).data(data))
    });

    Sse::new(events)
}

/// Chat-Completions SSE response driven by a Responses upstream stream,
/// terminated by the `[DONE]` sentinel.
fn chat_sse_from_responses(
    events: SseStream,
) -> Sse<impl futures::Stream<Item = std::result::Result<Event, Infallible>>> {
    let chunks = futures::stream::unfold(
        Some((ResponsesToOpenAiStream::new(), events)),
        |state| async move {
            let (mut translator, mut events) = state?;

            loop {
                if translator.is_complete() {
                    return None;
                }

                match events.next().await {
                    Some(event) => {
                        if event.data == "[DONE]" {
                            continue;
                        }

                        let value: Value = match sonic_rs::from_str(&event.data) {
                            Ok(value) => value,
                            Err(error) => {
                                log::warn!("failed to parse upstream stream event: {error}");
                                continue;
                            }
                        };

                        if let Some(chunk) = translator.process_event(&value) {
                            return Some((chunk, Some((translator, events))));
                        }
                    }
                    None => return None,
                }
            }
        },
    );

    let events = chunks
        .map(|chunk| {
            let data = sonic_rs::to_string(&chunk).unwrap_or_else(|error| {
                log::error!("failed to serialize chunk: {error}");
                r#"{"error":"serialization failed"}"#.to_string()
            });

            Ok(Event::default().data(data))
        })
        .chain(futures::stream::once(async {
            Ok::<_, Infallible>(Event::default().data("[DONE]"))
        }));

    Sse::new(events)
}

/// Forward an upstream SSE stream verbatim, optionally keeping the
/// per-event `event:` names (the Responses framing).
fn forward_sse(
    events: SseStream,
    keep_event_names: bool,
) -> Sse<impl futures::Stream<Item = std::result::Result<Event, Infallible>>> {
    let events = events.map(move |upstream_event| {
        let mut event = Event::default();

        if keep_event_names && upstream_event.event != "message" {
            event = event.event(&upstream_event.event);
        }

        Ok::<_, Infallible>(event.data(upstream_event.data))
    });

    Sse::new(events)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::messages::openai;
    use crate::routing::{Model, ModelCatalog};

    fn catalog() -> ModelCatalog {
        let models: Vec<Model> = serde_json::from_value(json!([{
            "id": "gpt-5",
            "capabilities": {"limits": {"max_output_tokens": 64000}},
            "supported_endpoints": ["/chat/completions", "/responses"]
        }]))
        .unwrap();

        ModelCatalog::new(models)
    }

    /// The chat surface clamps to the catalog limit on the Responses path,
    /// the same way the Anthropic surface does.
    #[test]
    fn chat_to_responses_clamps_max_output_tokens() {
        let catalog = catalog();
        let limit = catalog.max_output_tokens("gpt-5");

        let request: openai::ChatCompletionRequest = serde_json::from_value(json!({
            "model": "gpt-5",
            "max_tokens": 999999,
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        let mut translated = crate::translate::openai_to_responses::translate_request(
            request,
            config::ReasoningEffort::High,
        );
        translated.max_output_tokens = crate::server::clamp_max_tokens(translated.max_output_tokens, limit);

        assert_eq!(translated.max_output_tokens, Some(64000));
    }

    /// A request without a token cap picks up the model's limit.
    #[test]
    fn chat_to_responses_defaults_max_output_tokens_to_the_limit() {
        let catalog = catalog();
        let limit = catalog.max_output_tokens("gpt-5");

        let request: openai::ChatCompletionRequest = serde_json::from_value(json!({
            "model": "gpt-5",
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();

        let mut translated = crate::translate::openai_to_responses::translate_request(
            request,
            config::ReasoningEffort::High,
        );
        translated.max_output_tokens = crate::server::clamp_max_tokens(translated.max_output_tokens, limit);

        assert_eq!(translated.max_output_tokens, Some(64000));
    }
}
