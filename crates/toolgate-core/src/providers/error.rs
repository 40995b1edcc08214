//! Gateway and transport error types

use thiserror::Error;

/// Failure of a single provider transport call, before classification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Connection refused, DNS failure, reset...
    #[error("Network error: {0}")]
    Network(String),

    /// Success status with a body that is not JSON
    #[error("Malformed response body: {0}")]
    InvalidBody(String),

    #[error("API key is required for {0}")]
    MissingApiKey(String),
}

/// Errors returned by `ProviderGateway::send_message`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Model {model} does not support {required}")]
    CapabilityMismatch { model: String, required: String },

    /// The request is malformed; nothing was sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{provider} authentication failed: {message}")]
    AuthError { provider: String, message: String },

    #[error("{provider} rate limited: {message}")]
    RateLimited { provider: String, message: String },

    #[error("{provider} temporarily unavailable: {message}")]
    TransientProviderError { provider: String, message: String },

    #[error("{provider} API error ({status}): {body}")]
    ProviderError { provider: String, status: u16, body: String },

    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("Request cancelled")]
    Cancelled,
}

impl GatewayError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthError {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn rate_limited(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientProviderError {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn provider_error(provider: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::ProviderError {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Map a transport failure onto the gateway taxonomy
    pub fn classify(provider: &str, error: TransportError) -> Self {
        match error {
            TransportError::Status { status: 401, body } => Self::auth(provider, body),
            TransportError::Status { status: 429, body } => Self::rate_limited(provider, body),
            TransportError::Status { status, body } if (500..600).contains(&status) => {
                Self::transient(provider, format!("HTTP {}: {}", status, body))
            }
            TransportError::Status { status, body } => Self::provider_error(provider, status, body),
            TransportError::Timeout(message) | TransportError::Network(message) => Self::transient(provider, message),
            TransportError::InvalidBody(message) => Self::invalid_response(provider, message),
            TransportError::MissingApiKey(_) => Self::auth(provider, "no API key configured"),
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedProvider(_) => "unsupported_provider",
            Self::CapabilityMismatch { .. } => "capability_mismatch",
            Self::InvalidRequest(_) => "invalid_request",
            Self::AuthError { .. } => "auth_error",
            Self::RateLimited { .. } => "rate_limited",
            Self::TransientProviderError { .. } => "transient_provider_error",
            Self::ProviderError { .. } => "provider_error",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the same request may succeed if the caller tries again later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientProviderError { .. } | Self::RateLimited { .. })
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
