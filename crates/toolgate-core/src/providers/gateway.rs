//! Provider routing gateway
//!
//! `send_message` picks the transport from the model descriptor, validates the request,
//! translates it into the provider's dialect and makes exactly one transport call.
//! A request that fails validation never reaches a transport.

use std::collections::HashMap;
use std::sync::Arc;

use super::error::{GatewayError, GatewayResult};
use super::http::HttpTransport;
use super::traits::{ProviderResponse, ProviderTransport, SendOptions, WireRequest};
use super::wire::{Dialect, ToolNameMap};
use crate::logging::SharedLogger;
use crate::secrets::SecretStore;
use crate::types::{CancellationToken, ChatMessage, ModelCapability, ModelDescriptor, ProviderConfig, ProviderKind};
use crate::{log_debug, log_info, log_warn};

/// Phase of a single `send_message` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Validating,
    Dispatching,
    Succeeded,
    /// Carries [`GatewayError::kind`]
    Failed(&'static str),
}

impl std::fmt::Display for InvocationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvocationState::Validating => write!(f, "validating"),
            InvocationState::Dispatching => write!(f, "dispatching"),
            InvocationState::Succeeded => write!(f, "succeeded"),
            InvocationState::Failed(kind) => write!(f, "failed({})", kind),
        }
    }
}

/// A validated request ready for dispatch
struct Prepared {
    kind: ProviderKind,
    transport: Arc<dyn ProviderTransport>,
    request: WireRequest,
    names: ToolNameMap,
}

/// Routes normalized requests to provider transports
///
/// The transport table is fixed after construction; `send_message` only reads it.
pub struct ProviderGateway {
    transports: HashMap<ProviderKind, Arc<dyn ProviderTransport>>,
    logger: SharedLogger,
}

impl ProviderGateway {
    /// Create a gateway with no transports
    pub fn new(logger: SharedLogger) -> Self {
        Self {
            transports: HashMap::new(),
            logger,
        }
    }

    /// HTTP transports for every real provider kind, using `configs` where one matches
    ///
    /// Kinds whose config is disabled are left out. The mock kind is never registered here.
    pub fn from_configs(configs: &[ProviderConfig], secrets: Arc<dyn SecretStore>, logger: SharedLogger) -> Self {
        let mut gateway = Self::new(logger.clone());

        for kind in ProviderKind::ALL {
            if kind == ProviderKind::Mock {
                continue;
            }

            let config = configs
                .iter()
                .find(|c| c.name.parse::<ProviderKind>() == Ok(kind))
                .cloned()
                .unwrap_or_else(|| ProviderConfig::new(kind.id()));

            if !config.enabled {
                log_debug!(logger, "[ProviderGateway] Provider '{}' is disabled", kind);
                continue;
            }

            match HttpTransport::new(kind, config, secrets.clone(), logger.clone()) {
                Ok(transport) => gateway.register(kind, Arc::new(transport)),
                Err(e) => log_warn!(logger, "[ProviderGateway] Skipping provider '{}': {}", kind, e),
            }
        }

        gateway
    }

    /// Add a transport, builder style
    pub fn with_transport(mut self, kind: ProviderKind, transport: Arc<dyn ProviderTransport>) -> Self {
        self.register(kind, transport);
        self
    }

    /// Add or replace the transport for a kind
    pub fn register(&mut self, kind: ProviderKind, transport: Arc<dyn ProviderTransport>) {
        self.transports.insert(kind, transport);
    }

    pub fn supports(&self, kind: ProviderKind) -> bool {
        self.transports.contains_key(&kind)
    }

    /// Registered kinds in stable order
    pub fn providers(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.transports.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Send a conversation to the model's provider
    pub async fn send_message(
        &self,
        messages: &[ChatMessage],
        model: &ModelDescriptor,
        options: &SendOptions,
        cancel: &CancellationToken,
    ) -> GatewayResult<ProviderResponse> {
        let prepared = match self.prepare(messages, model, options) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.trace(model, InvocationState::Failed(e.kind()));
                return Err(e);
            }
        };

        let Prepared {
            kind,
            transport,
            request,
            names,
        } = prepared;
        self.trace(model, InvocationState::Dispatching);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(GatewayError::Cancelled),
            sent = transport.send(request) => sent.map_err(|e| GatewayError::classify(kind.id(), e)),
        };

        let result = result.and_then(|raw| {
            Dialect::for_kind(kind)
                .decode_response(raw, &names)
                .map_err(|message| GatewayError::invalid_response(kind.id(), message))
        });

        match &result {
            Ok(response) => {
                self.trace(model, InvocationState::Succeeded);
                log_info!(
                    self.logger,
                    "[ProviderGateway] {} ({}) answered with {} tool calls",
                    model.id,
                    kind,
                    response.tool_calls.len()
                );
            }
            Err(e) => {
                self.trace(model, InvocationState::Failed(e.kind()));
                log_warn!(self.logger, "[ProviderGateway] {} ({}) failed: {}", model.id, kind, e);
            }
        }

        result
    }

    fn prepare(&self, messages: &[ChatMessage], model: &ModelDescriptor, options: &SendOptions) -> GatewayResult<Prepared> {
        self.trace(model, InvocationState::Validating);

        let kind = model
            .provider_kind()
            .map_err(|_| GatewayError::UnsupportedProvider(model.provider.clone()))?;
        let transport = self
            .transports
            .get(&kind)
            .cloned()
            .ok_or_else(|| GatewayError::UnsupportedProvider(model.provider.clone()))?;

        if messages.iter().any(ChatMessage::has_image) && !model.accepts_images() {
            return Err(GatewayError::CapabilityMismatch {
                model: model.id.clone(),
                required: "image input (image_analysis, vision or multimodal)".to_string(),
            });
        }

        let dialect = Dialect::for_kind(kind);
        dialect.validate(messages)?;

        let mut effective = options.clone();
        if !effective.tools.is_empty() && !model.has_capability(ModelCapability::FunctionCalling) {
            log_warn!(
                self.logger,
                "[ProviderGateway] Model {} lacks function_calling; omitting {} tools",
                model.id,
                effective.tools.len()
            );
            effective.tools.clear();
            effective.tool_choice = None;
        }

        let names = ToolNameMap::for_request(messages, &effective.tools);
        let body = dialect.encode_request(&model.id, messages, &effective, &names)?;

        Ok(Prepared {
            kind,
            transport,
            request: WireRequest {
                kind,
                model: model.id.clone(),
                body,
            },
            names,
        })
    }

    fn trace(&self, model: &ModelDescriptor, state: InvocationState) {
        log_debug!(self.logger, "[ProviderGateway] {} → {}", model.id, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};
    use crate::providers::mock::{MockReply, MockTransport};
    use crate::providers::traits::StopReason;
    use crate::secrets::MemorySecretStore;
    use crate::types::{CallableTool, ContentPart, MessageRole, ToolCall, ToolOrigin};
    use serde_json::json;
    use std::time::Duration;

    fn mock_gateway(transport: Arc<MockTransport>) -> ProviderGateway {
        ProviderGateway::new(Arc::new(NoOpLogger::new()))
            .with_transport(ProviderKind::Mock, transport.clone())
            .with_transport(ProviderKind::Anthropic, transport.clone())
            .with_transport(ProviderKind::Gemini, transport)
    }

    fn calc_tool() -> CallableTool {
        CallableTool {
            name: "calc:add".to_string(),
            description: "[calc] Add two numbers".to_string(),
            input_schema: json!({"type": "object", "properties": {"a": {"type": "number"}}}),
            origin: ToolOrigin::Server {
                server_id: "calc".to_string(),
                tool_name: "add".to_string(),
            },
        }
    }

    fn image_message() -> ChatMessage {
        ChatMessage::with_parts(
            MessageRole::User,
            vec![
                ContentPart::text("What is this?"),
                ContentPart::image("https://example.com/cat.png"),
            ],
        )
    }

    #[tokio::test]
    async fn test_echo_round_trip() {
        let transport = Arc::new(MockTransport::echo());
        let gateway = mock_gateway(transport.clone());
        let model = ModelDescriptor::new("mock-echo", "mock");

        let response = gateway
            .send_message(&[ChatMessage::user("Hello")], &model, &SendOptions::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.content, "Echo: Hello");
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
        assert!(response.raw.get("choices").is_some());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_provider_makes_no_calls() {
        let transport = Arc::new(MockTransport::echo());
        let gateway = mock_gateway(transport.clone());
        let cancel = CancellationToken::new();

        let unknown = ModelDescriptor::new("x-1", "acme");
        let err = gateway
            .send_message(&[ChatMessage::user("hi")], &unknown, &SendOptions::new(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::UnsupportedProvider("acme".to_string()));

        // Known kind, but nothing registered for it
        let unregistered = ModelDescriptor::new("gpt-4o", "openai");
        let err = gateway
            .send_message(&[ChatMessage::user("hi")], &unregistered, &SendOptions::new(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unsupported_provider");

        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_capability_gate_makes_no_calls() {
        let transport = Arc::new(MockTransport::echo());
        let gateway = mock_gateway(transport.clone());
        let text_only = ModelDescriptor::new("mock-text", "mock");

        let err = gateway
            .send_message(&[image_message()], &text_only, &SendOptions::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::CapabilityMismatch { .. }));
        assert_eq!(transport.call_count(), 0);

        let vision = text_only.with_capability(ModelCapability::Vision);
        let response = gateway
            .send_message(&[image_message()], &vision, &SendOptions::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.content, "Echo: What is this?");
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_calls() {
        let transport = Arc::new(MockTransport::echo());
        let gateway = mock_gateway(transport.clone());
        let claude = ModelDescriptor::new("claude-3-5-sonnet", "claude");
        let messages = [ChatMessage::user("hi"), ChatMessage::system("late")];

        let err = gateway
            .send_message(&messages, &claude, &SendOptions::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_tools_omitted_without_function_calling() {
        let transport = Arc::new(MockTransport::echo());
        let logger = Arc::new(MemoryLogger::new());
        let gateway = ProviderGateway::new(logger.clone()).with_transport(ProviderKind::Mock, transport.clone());
        let options = SendOptions::new().with_tools(vec![calc_tool()]);

        let plain = ModelDescriptor::new("mock-plain", "mock");
        gateway
            .send_message(&[ChatMessage::user("add")], &plain, &options, &CancellationToken::new())
            .await
            .unwrap();
        let body = transport.last_request().unwrap().body;
        assert!(body.get("tools").is_none());
        assert!(logger.contains(LogLevel::Warn, "lacks function_calling"));

        let capable = plain.with_capability(ModelCapability::FunctionCalling);
        gateway
            .send_message(&[ChatMessage::user("add")], &capable, &options, &CancellationToken::new())
            .await
            .unwrap();
        let body = transport.last_request().unwrap().body;
        assert_eq!(body["tools"][0]["function"]["name"], "calc__add");
    }

    #[tokio::test]
    async fn test_tool_calls_come_back_qualified() {
        let transport = Arc::new(MockTransport::new(MockReply::ToolCalls(vec![ToolCall::new(
            "call_1",
            "calc__add",
            json!({"a": 1, "b": 2}),
        )])));
        let gateway = mock_gateway(transport.clone());
        let options = SendOptions::new().with_tools(vec![calc_tool()]);

        for provider in ["mock", "anthropic", "gemini"] {
            let model = ModelDescriptor::new("m", provider).with_capability(ModelCapability::FunctionCalling);
            let response = gateway
                .send_message(&[ChatMessage::user("1+2")], &model, &options, &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(
                response.tool_calls,
                vec![ToolCall::new("call_1", "calc:add", json!({"a": 1, "b": 2}))],
                "{}",
                provider
            );
            assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        }
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn test_status_classification() {
        let model = ModelDescriptor::new("mock", "mock");
        let cases = [
            (401, "auth_error", false),
            (429, "rate_limited", true),
            (503, "transient_provider_error", true),
            (400, "provider_error", false),
        ];

        for (status, kind, retryable) in cases {
            let transport = Arc::new(MockTransport::status_error(status, "upstream says no"));
            let gateway = mock_gateway(transport.clone());
            let err = gateway
                .send_message(&[ChatMessage::user("hi")], &model, &SendOptions::new(), &CancellationToken::new())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), kind);
            assert_eq!(err.is_retryable(), retryable);
            assert_eq!(transport.call_count(), 1, "no retries");
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let transport = Arc::new(MockTransport::new(MockReply::Malformed));
        let gateway = mock_gateway(transport);
        let err = gateway
            .send_message(
                &[ChatMessage::user("hi")],
                &ModelDescriptor::new("mock", "mock"),
                &SendOptions::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_response");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_in_flight() {
        let transport = Arc::new(MockTransport::new(MockReply::Hang));
        let gateway = mock_gateway(transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel_after(Duration::from_millis(50));

        let err = gateway
            .send_message(&[ChatMessage::user("hi")], &ModelDescriptor::new("mock", "mock"), &SendOptions::new(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Cancelled);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let transport = Arc::new(MockTransport::echo());
        let gateway = mock_gateway(transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = gateway
            .send_message(&[ChatMessage::user("hi")], &ModelDescriptor::new("mock", "mock"), &SendOptions::new(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Cancelled);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_from_configs() {
        let gateway = ProviderGateway::from_configs(
            &[ProviderConfig::new("groq").disabled()],
            Arc::new(MemorySecretStore::new()),
            Arc::new(NoOpLogger::new()),
        );

        assert!(gateway.supports(ProviderKind::OpenAi));
        assert!(gateway.supports(ProviderKind::Gemini));
        assert!(!gateway.supports(ProviderKind::Groq));
        assert!(!gateway.supports(ProviderKind::Mock));

        // No key anywhere: rejected before any network traffic
        let err = gateway
            .send_message(
                &[ChatMessage::user("hi")],
                &ModelDescriptor::new("gpt-4o", "openai"),
                &SendOptions::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "auth_error");
    }
}
