use serde::{Deserialize, Serialize};

/// Reranker provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankProviderConfig {
    /// Provider type.
    pub provider_type: ProviderType,

    /// Model identifier.
    pub model: String,

    /// API key; loaded from the provider's environment variable when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API (`…/v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Sampling temperature sent with each request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

/// Provider type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "ollama")]
    Ollama,
    #[serde(rename = "local")]
    LocalCustom,
}

impl ProviderType {
    fn default_endpoint(self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some("https://api.openai.com/v1"),
            ProviderType::Ollama => Some("http://localhost:11434/v1"),
            ProviderType::LocalCustom => None,
        }
    }

    fn api_key_env(self) -> Option<&'static str> {
        match self {
            ProviderType::OpenAI => Some("OPENAI_API_KEY"),
            _ => None,
        }
    }
}

impl RerankProviderConfig {
    fn endpoint_has_scheme(endpoint: &str) -> bool {
        endpoint.starts_with("http://") || endpoint.starts_with("https://")
    }

    fn infer_endpoint_scheme(provider_type: ProviderType, endpoint: &str) -> String {
        let endpoint = endpoint.trim().trim_end_matches('/');
        if provider_type == ProviderType::LocalCustom && !Self::endpoint_has_scheme(endpoint) {
            format!("https://{}", endpoint)
        } else {
            endpoint.to_string()
        }
    }

    /// Configured endpoint with a scheme, or the provider default.
    pub fn normalized_endpoint(&self) -> Option<String> {
        match self.endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(endpoint) => Some(Self::infer_endpoint_scheme(self.provider_type, endpoint)),
            None => self.provider_type.default_endpoint().map(str::to_string),
        }
    }

    /// Configured key, or the provider's environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                self.provider_type
                    .api_key_env()
                    .and_then(|var| std::env::var(var).ok())
                    .filter(|key| !key.trim().is_empty())
            })
    }

    /// Whether requests can be made at all.
    pub fn is_usable(&self) -> bool {
        if self.model.trim().is_empty() || self.normalized_endpoint().is_none() {
            return false;
        }
        self.provider_type != ProviderType::OpenAI || self.resolved_api_key().is_some()
    }

    /// Validate provider configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if self.provider_type == ProviderType::LocalCustom && self.endpoint.is_none() {
            return Err("Local provider requires endpoint".to_string());
        }
        if let Some(endpoint) = self.normalized_endpoint() {
            if !Self::endpoint_has_scheme(&endpoint) || endpoint.contains(char::is_whitespace) {
                return Err(format!("Invalid endpoint URL: {}", endpoint));
            }
        }
        if let Some(temp) = self.temperature {
            if !(0.0..=2.0).contains(&temp) {
                return Err(format!(
                    "Temperature must be between 0.0 and 2.0, got {}",
                    temp
                ));
            }
        }
        Ok(())
    }
}
