use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::messages::{anthropic, openai};

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Gateway errors with appropriate HTTP status codes.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Invalid request parameters, including unknown models.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication failed against the upstream.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Rate limit exceeded upstream.
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded { message: String },

    /// Insufficient quota or disabled upstream feature.
    #[error("Insufficient quota: {0}")]
    InsufficientQuota(String),

    /// The upstream API returned an error.
    #[error("Upstream API error ({status}): {message}")]
    UpstreamApiError { status: u16, message: String },

    /// Network or connection error talking to the upstream.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Internal server error.
    /// If Some(message), it came from the upstream and can be shown.
    /// If None, details must not leak to the client.
    #[error("Internal server error")]
    InternalError(Option<String>),
}

impl GatewayError {
    /// Map an upstream HTTP status and body to the matching error.
    pub(crate) fn from_upstream_status(status: u16, message: String) -> Self {
        match status {
            400 => GatewayError::InvalidRequest(message),
            401 => GatewayError::AuthenticationFailed(message),
            403 => GatewayError::InsufficientQuota(message),
            404 => GatewayError::InvalidRequest(message),
            429 => GatewayError::RateLimitExceeded { message },
            500 => GatewayError::InternalError(Some(message)),
            status => GatewayError::UpstreamApiError { status, message },
        }
    }

    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientQuota(_) => StatusCode::FORBIDDEN,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::ConnectionError(_) => StatusCode::BAD_GATEWAY,
            Self::UpstreamApiError { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string for the response body.
    pub fn error_type(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::AuthenticationFailed(_) => "authentication_error",
            Self::InsufficientQuota(_) => "insufficient_quota",
            Self::RateLimitExceeded { .. } => "rate_limit_error",
            Self::ConnectionError(_) | Self::UpstreamApiError { .. } => "api_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Message that is safe to expose to API consumers.
    pub fn client_message(&self) -> String {
        match self {
            Self::InternalError(Some(upstream_message)) => upstream_message.clone(),
            Self::InternalError(None) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = openai::ErrorResponse {
            error: openai::ErrorDetails {
                message: self.client_message(),
                r#type: self.error_type().to_string(),
                code: Some(status.as_u16()),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Error response shaped for the Anthropic surface.
pub struct AnthropicErrorResponse {
    status: StatusCode,
    body: anthropic::ErrorResponse,
}

impl From<GatewayError> for AnthropicErrorResponse {
    fn from(error: GatewayError) -> Self {
        let status = error.status_code();

        let body = anthropic::ErrorResponse {
            r#type: "error".to_string(),
            error: anthropic::ErrorBody {
                r#type: error.error_type().to_string(),
                message: error.client_message(),
            },
        };

        Self { status, body }
    }
}

impl IntoResponse for AnthropicErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub type AnthropicResult<T> = std::result::Result<T, AnthropicErrorResponse>;
