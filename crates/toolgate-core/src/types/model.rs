//! Model descriptors, provider kinds and provider configuration

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Backend kinds the gateway knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    Ollama,
    OpenRouter,
    Mistral,
    Groq,
    /// In-process test backend
    Mock,
}

impl ProviderKind {
    /// All supported kinds, in a stable order
    pub const ALL: [ProviderKind; 8] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Gemini,
        ProviderKind::Ollama,
        ProviderKind::OpenRouter,
        ProviderKind::Mistral,
        ProviderKind::Groq,
        ProviderKind::Mock,
    ];

    /// Canonical lowercase identifier
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Mistral => "mistral",
            ProviderKind::Groq => "groq",
            ProviderKind::Mock => "mock",
        }
    }

    /// Default API base URL (without trailing slash)
    pub fn default_api_base(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::Ollama => "http://localhost:11434/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Mistral => "https://api.mistral.ai/v1",
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
            ProviderKind::Mock => "http://localhost:0/mock",
        }
    }

    /// Whether requests need an API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderKind::Ollama | ProviderKind::Mock)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "ollama" => Ok(ProviderKind::Ollama),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "mistral" => Ok(ProviderKind::Mistral),
            "groq" => Ok(ProviderKind::Groq),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(format!("unknown provider '{}'", other)),
        }
    }
}

/// Declared feature of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelCapability {
    Text,
    Vision,
    ImageAnalysis,
    Multimodal,
    FunctionCalling,
    Streaming,
}

impl ModelCapability {
    /// Any of these lets a request carry image content
    pub const IMAGE_INPUT: [ModelCapability; 3] = [
        ModelCapability::ImageAnalysis,
        ModelCapability::Vision,
        ModelCapability::Multimodal,
    ];
}

/// Reference data describing the target model of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model identifier as used by the provider's API
    pub id: String,
    /// Provider name (openai, anthropic, gemini, ...)
    pub provider: String,
    /// Capability tags
    #[serde(default)]
    pub capabilities: BTreeSet<ModelCapability>,
}

impl ModelDescriptor {
    /// Create a text-only descriptor
    pub fn new(id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider: provider.into(),
            capabilities: BTreeSet::from([ModelCapability::Text]),
        }
    }

    /// Add a capability tag
    pub fn with_capability(mut self, capability: ModelCapability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Replace the capability set
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = ModelCapability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    pub fn has_capability(&self, capability: ModelCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Whether the model accepts image content
    pub fn accepts_images(&self) -> bool {
        ModelCapability::IMAGE_INPUT.iter().any(|c| self.capabilities.contains(c))
    }

    /// Parse the provider string
    pub fn provider_kind(&self) -> Result<ProviderKind, String> {
        self.provider.parse()
    }
}

/// Per-provider transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name (e.g., 'openai', 'anthropic')
    pub name: String,
    /// Whether this provider is enabled (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Custom API base URL (optional, uses provider default if not set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Explicit API key; never written back to disk
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Secret key to look up instead of the provider name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    120
}

impl ProviderConfig {
    /// Create a new provider configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            api_base: None,
            api_key: None,
            api_key_env: None,
            request_timeout_secs: default_request_timeout(),
        }
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Disable the provider
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Effective API base for a kind, without trailing slash
    pub fn api_base_for(&self, kind: ProviderKind) -> String {
        self.api_base
            .as_deref()
            .unwrap_or(kind.default_api_base())
            .trim_end_matches('/')
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAi));
        assert_eq!("google".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert!("Unknown".parse::<ProviderKind>().is_err());

        for kind in ProviderKind::ALL {
            assert_eq!(kind.id().parse::<ProviderKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_image_capabilities() {
        let text_only = ModelDescriptor::new("gpt-3.5-turbo", "openai");
        assert!(!text_only.accepts_images());

        for cap in ModelCapability::IMAGE_INPUT {
            assert!(text_only.clone().with_capability(cap).accepts_images());
        }

        let tools_only = text_only.with_capability(ModelCapability::FunctionCalling);
        assert!(!tools_only.accepts_images());
    }

    #[test]
    fn test_descriptor_serialization() {
        let json = r#"{"id":"claude-3","provider":"anthropic","capabilities":["vision","function_calling"]}"#;
        let model: ModelDescriptor = serde_json::from_str(json).unwrap();
        assert!(model.has_capability(ModelCapability::Vision));
        assert!(model.has_capability(ModelCapability::FunctionCalling));
        assert_eq!(model.provider_kind(), Ok(ProviderKind::Anthropic));
    }

    #[test]
    fn test_provider_config_api_key_not_serialized() {
        let config = ProviderConfig::new("openai")
            .with_api_key("sk-secret")
            .with_api_base("https://proxy.local/v1/");

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
        assert_eq!(config.api_base_for(ProviderKind::OpenAi), "https://proxy.local/v1");
        assert_eq!(
            ProviderConfig::new("anthropic").api_base_for(ProviderKind::Anthropic),
            "https://api.anthropic.com"
        );
    }
}
