//! HTTP transport for real provider backends

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::error::TransportError;
use super::traits::{ProviderTransport, WireRequest};
use super::wire::Dialect;
use crate::logging::SharedLogger;
use crate::secrets::SecretStore;
use crate::types::{ProviderConfig, ProviderKind};
use crate::{log_debug, log_warn};

/// Messages API version header value
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One provider backend reached over HTTPS with `reqwest`
pub struct HttpTransport {
    kind: ProviderKind,
    config: ProviderConfig,
    client: reqwest::Client,
    secrets: Arc<dyn SecretStore>,
    logger: SharedLogger,
}

impl HttpTransport {
    pub fn new(
        kind: ProviderKind,
        config: ProviderConfig,
        secrets: Arc<dyn SecretStore>,
        logger: SharedLogger,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            kind,
            config,
            client,
            secrets,
            logger,
        })
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Full request URL for a model
    pub fn endpoint(&self, model: &str) -> String {
        let base = self.config.api_base_for(self.kind);
        match Dialect::for_kind(self.kind) {
            Dialect::OpenAi => format!("{}/chat/completions", base),
            Dialect::Anthropic => format!("{}/v1/messages", base),
            Dialect::Gemini => format!("{}/v1beta/models/{}:generateContent", base, model),
        }
    }

    /// Explicit key from settings, then the secret store
    fn api_key(&self) -> Option<String> {
        if let Some(key) = self.config.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        let lookup = self.config.api_key_env.as_deref().unwrap_or(self.kind.id());
        self.secrets.get(lookup).filter(|k| !k.is_empty())
    }

    /// Build the HTTP request; fails without touching the network when a key is missing
    pub fn build_request(&self, request: &WireRequest) -> Result<reqwest::Request, TransportError> {
        let key = self.api_key();
        if key.is_none() && self.kind.requires_api_key() {
            return Err(TransportError::MissingApiKey(self.kind.id().to_string()));
        }

        let mut builder = self.client.post(self.endpoint(&request.model)).json(&request.body);
        builder = match Dialect::for_kind(self.kind) {
            Dialect::OpenAi => match key {
                Some(key) => builder.bearer_auth(key),
                None => builder,
            },
            Dialect::Anthropic => {
                let builder = builder.header("anthropic-version", ANTHROPIC_VERSION);
                match key {
                    Some(key) => builder.header("x-api-key", key),
                    None => builder,
                }
            }
            Dialect::Gemini => match key {
                Some(key) => builder.header("x-goog-api-key", key),
                None => builder,
            },
        };

        builder
            .build()
            .map_err(|e| TransportError::Network(format!("invalid request: {}", e)))
    }
}

fn from_reqwest(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn send(&self, request: WireRequest) -> Result<Value, TransportError> {
        let http_request = self.build_request(&request)?;
        log_debug!(self.logger, "[HttpTransport] POST {} ({})", http_request.url(), self.kind);

        let response = self.client.execute(http_request).await.map_err(from_reqwest)?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log_warn!(self.logger, "[HttpTransport] {} returned {}", self.kind, status);
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&text).map_err(|e| TransportError::InvalidBody(e.to_string()))
    }
}
