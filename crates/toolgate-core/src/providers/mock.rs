//! Mock provider transport for testing
//!
//! Answers in the wire shape of whichever provider kind the request targets, so the
//! gateway's decoding runs exactly as it would against a real backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::error::TransportError;
use super::traits::{ProviderTransport, WireRequest};
use super::wire::{Dialect, ToolNameMap};
use crate::log_debug;
use crate::logging::{NoOpLogger, SharedLogger};
use crate::types::{MessageRole, ToolCall};

/// Mock response mode
#[derive(Debug, Clone, Default)]
pub enum MockReply {
    /// Echo back the last user message
    #[default]
    Echo,
    /// Return a fixed response
    Fixed(String),
    /// Request tool calls; names are wire names as a provider would send them
    ToolCalls(Vec<ToolCall>),
    /// Fail with an HTTP status
    Status { status: u16, body: String },
    /// Succeed with a body no dialect can decode
    Malformed,
    /// Never answer
    Hang,
}

/// Scripted [`ProviderTransport`] with a call counter
pub struct MockTransport {
    reply: Mutex<MockReply>,
    calls: AtomicUsize,
    requests: Mutex<Vec<WireRequest>>,
    logger: SharedLogger,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new(MockReply::Echo)
    }
}

impl MockTransport {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply: Mutex::new(reply),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            logger: Arc::new(NoOpLogger::new()),
        }
    }

    pub fn echo() -> Self {
        Self::new(MockReply::Echo)
    }

    pub fn fixed(response: impl Into<String>) -> Self {
        Self::new(MockReply::Fixed(response.into()))
    }

    pub fn status_error(status: u16, body: impl Into<String>) -> Self {
        Self::new(MockReply::Status {
            status,
            body: body.into(),
        })
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn set_reply(&self, reply: MockReply) {
        *self.reply.lock() = reply;
    }

    /// Number of `send` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<WireRequest> {
        self.requests.lock().last().cloned()
    }

    fn last_user_text(dialect: Dialect, body: &Value) -> String {
        dialect
            .decode_messages(body, &ToolNameMap::default())
            .ok()
            .and_then(|messages| {
                messages
                    .iter()
                    .rev()
                    .find(|m| m.role == MessageRole::User)
                    .map(|m| m.content.joined_text())
            })
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "Hello from MockTransport!".to_string())
    }
}

#[async_trait]
impl ProviderTransport for MockTransport {
    async fn send(&self, request: WireRequest) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let reply = self.reply.lock().clone();
        let dialect = Dialect::for_kind(request.kind);
        log_debug!(self.logger, "[MockTransport] {:?} reply for {} ({})", reply, request.kind, request.model);

        match reply {
            MockReply::Echo => {
                let text = Self::last_user_text(dialect, &request.body);
                Ok(dialect.encode_response(&format!("Echo: {}", text), &[]))
            }
            MockReply::Fixed(text) => Ok(dialect.encode_response(&text, &[])),
            MockReply::ToolCalls(calls) => Ok(dialect.encode_response("", &calls)),
            MockReply::Status { status, body } => Err(TransportError::Status { status, body }),
            MockReply::Malformed => Ok(json!({ "mock": "malformed" })),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::traits::SendOptions;
    use crate::types::{ChatMessage, ProviderKind};

    fn request(kind: ProviderKind, text: &str) -> WireRequest {
        let dialect = Dialect::for_kind(kind);
        let body = dialect
            .encode_request("mock-model", &[ChatMessage::user(text)], &SendOptions::new(), &ToolNameMap::default())
            .unwrap();
        WireRequest {
            kind,
            model: "mock-model".to_string(),
            body,
        }
    }

    #[tokio::test]
    async fn test_echo_in_every_dialect() {
        let transport = MockTransport::echo();

        for kind in [ProviderKind::Mock, ProviderKind::Anthropic, ProviderKind::Gemini] {
            let raw = transport.send(request(kind, "Hello, world!")).await.unwrap();
            let response = Dialect::for_kind(kind)
                .decode_response(raw, &ToolNameMap::default())
                .unwrap();
            assert_eq!(response.content, "Echo: Hello, world!");
        }
        assert_eq!(transport.call_count(), 3);
        assert_eq!(transport.last_request().unwrap().kind, ProviderKind::Gemini);
    }

    #[tokio::test]
    async fn test_status_error() {
        let transport = MockTransport::status_error(429, "slow down");
        let err = transport.send(request(ProviderKind::Mock, "hi")).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::Status {
                status: 429,
                body: "slow down".to_string()
            }
        );
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_set_reply() {
        let transport = MockTransport::fixed("first");
        transport.set_reply(MockReply::Fixed("second".to_string()));

        let raw = transport.send(request(ProviderKind::Mock, "hi")).await.unwrap();
        assert_eq!(raw["choices"][0]["message"]["content"], "second");
    }
}
