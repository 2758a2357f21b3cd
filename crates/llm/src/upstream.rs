//! HTTP client for the upstream Copilot-compatible backend.

use std::{sync::OnceLock, time::Duration};

use eventsource_stream::Eventsource;
use futures::{StreamExt, stream::BoxStream};
use reqwest::{Client, header::AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::error::GatewayError;
use crate::routing::{Model, RequestOptions};

/// Header asserting that the payload carries at least one input image.
const VISION_HEADER: &str = "copilot-vision-request";

/// Header naming who instigated the turn.
const INITIATOR_HEADER: &str = "x-initiator";

/// Raw SSE records from the upstream. Parse failures are logged and dropped
/// before reaching the translators.
pub(crate) type SseStream = BoxStream<'static, eventsource_stream::Event>;

/// Result of an upstream call: a complete JSON body, or an event source for
/// streaming requests.
pub(crate) enum UpstreamReply {
    Complete(Value),
    Stream(SseStream),
}

fn default_http_client_builder() -> reqwest::ClientBuilder {
    let mut headers = http::HeaderMap::new();
    headers.insert(http::header::CONNECTION, http::HeaderValue::from_static("keep-alive"));

    // No overall request timeout: streaming completions regularly outlive
    // any sane value. Connection establishment is still bounded.
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .default_headers(headers)
}

/// Common HTTP client to re-use as much as possible the same connections.
fn http_client() -> reqwest::Client {
    static CLIENT: OnceLock<Client> = OnceLock::new();

    CLIENT
        .get_or_init(|| {
            default_http_client_builder()
                .build()
                .unwrap_or_else(|_| Client::new())
        })
        .clone()
}

/// Client for the Copilot-compatible upstream.
pub(crate) struct CopilotClient {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl CopilotClient {
    pub(crate) fn new(config: &config::UpstreamConfig) -> Self {
        Self {
            client: http_client(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    /// POST a Responses payload, streaming when the payload asks for it.
    pub(crate) async fn create_responses(
        &self,
        payload: &Value,
        options: RequestOptions,
    ) -> crate::Result<UpstreamReply> {
        let streaming = payload.get("stream").and_then(Value::as_bool).unwrap_or(false);
        self.post("/responses", payload, options, streaming).await
    }

    /// POST a Chat-Completions payload, streaming when the payload asks for it.
    pub(crate) async fn create_chat_completions(
        &self,
        payload: &Value,
        options: RequestOptions,
    ) -> crate::Result<UpstreamReply> {
        let streaming = payload.get("stream").and_then(Value::as_bool).unwrap_or(false);
        self.post("/chat/completions", payload, options, streaming).await
    }

    /// Fetch the model catalog.
    pub(crate) async fn list_models(&self) -> crate::Result<Vec<Model>> {
        #[derive(serde::Deserialize)]
        struct ModelsPayload {
            data: Vec<Model>,
        }

        let mut request = self.client.get(format!("{}/models", self.base_url));

        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::ConnectionError(format!("Failed to fetch models: {e}")))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Upstream models request failed ({status}): {body}");

            return Err(GatewayError::from_upstream_status(status.as_u16(), body));
        }

        let payload: ModelsPayload = response.json().await.map_err(|e| {
            log::error!("Failed to parse upstream models response: {e}");
            GatewayError::InternalError(None)
        })?;

        Ok(payload.data)
    }

    async fn post(
        &self,
        path: &str,
        payload: &Value,
        options: RequestOptions,
        streaming: bool,
    ) -> crate::Result<UpstreamReply> {
        let url = format!("{}{path}", self.base_url);

        let mut request = self.client.post(&url).header("Content-Type", "application/json");

        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()));
        }

        if options.vision {
            request = request.header(VISION_HEADER, "true");
        }

        request = request.header(INITIATOR_HEADER, options.initiator.as_str());

        let body = serde_json::to_vec(payload)
            .map_err(|e| GatewayError::InvalidRequest(format!("Failed to serialize request: {e}")))?;

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| GatewayError::ConnectionError(format!("Failed to send request to upstream: {e}")))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Upstream API error ({status}) on {path}: {error_text}");

            return Err(GatewayError::from_upstream_status(status.as_u16(), error_text));
        }

        if streaming {
            let event_stream = response.bytes_stream().eventsource().filter_map(|event| async {
                match event {
                    Ok(event) => Some(event),
                    Err(error) => {
                        log::warn!("SSE parsing error in upstream stream: {error}");
                        None
                    }
                }
            });

            return Ok(UpstreamReply::Stream(event_stream.boxed()));
        }

        let text = response.text().await.map_err(|e| {
            log::error!("Failed to read upstream response body: {e}");
            GatewayError::InternalError(None)
        })?;

        let value: Value = sonic_rs::from_str(&text).map_err(|e| {
            log::error!("Failed to parse upstream response: {e}");
            GatewayError::InternalError(None)
        })?;

        Ok(UpstreamReply::Complete(value))
    }
}
