//! Client configuration for OpenAI-compatible chat-completions endpoints

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tooling::config::{get_env, get_env_or, get_env_parse_or, get_env_secs};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-08-01-preview";

/// Azure OpenAI routes requests to a named deployment instead of a model id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureDeployment {
    pub deployment: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl AzureDeployment {
    pub fn new(deployment: impl Into<String>) -> Self {
        Self {
            deployment: deployment.into(),
            api_version: default_api_version(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,

    /// Root of the API, without a trailing `/chat/completions`.
    /// For Azure this is the resource endpoint, e.g. `https://my-res.openai.azure.com`.
    pub base_url: String,

    /// Default model; requests may override it
    pub model: String,

    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Attempts after the first one for retryable failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureDeployment>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
            organization: None,
            azure: None,
        }
    }

    /// Load from the environment
    ///
    /// With `AZURE_OPENAI_ENDPOINT` set the client targets Azure: the key comes from
    /// `AZURE_OPENAI_API_KEY` (falling back to `OPENAI_API_KEY`), the deployment from
    /// `AZURE_OPENAI_DEPLOYMENT` (falling back to `model`) and the version from
    /// `OPENAI_API_VERSION`. Otherwise `OPENAI_API_KEY`, `OPENAI_BASE_URL`,
    /// `OPENAI_ORGANIZATION`, `OPENAI_TIMEOUT_SECS` and `OPENAI_MAX_RETRIES` are read.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let model = model.into();

        if let Some(endpoint) = get_env("AZURE_OPENAI_ENDPOINT")? {
            let api_key = match get_env("AZURE_OPENAI_API_KEY")? {
                Some(key) => key,
                None => require_env("OPENAI_API_KEY")?,
            };
            let deployment = get_env_or("AZURE_OPENAI_DEPLOYMENT", model.clone())?;
            let api_version = get_env_or("OPENAI_API_VERSION", DEFAULT_AZURE_API_VERSION)?;
            return Ok(Self::new(api_key, endpoint, model)
                .with_azure(AzureDeployment::new(deployment).with_api_version(api_version)));
        }

        let mut config = Self::new(
            require_env("OPENAI_API_KEY")?,
            get_env_or("OPENAI_BASE_URL", DEFAULT_BASE_URL)?,
            model,
        );
        config.organization = get_env("OPENAI_ORGANIZATION")?;
        if let Some(timeout) = get_env_secs("OPENAI_TIMEOUT_SECS")? {
            config.timeout = timeout;
        }
        config.max_retries = get_env_parse_or("OPENAI_MAX_RETRIES", config.max_retries)?;
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn with_azure(mut self, azure: AzureDeployment) -> Self {
        self.azure = Some(azure);
        self
    }

    pub fn is_azure(&self) -> bool {
        self.azure.is_some()
    }

    /// Full chat-completions URL for this configuration
    pub fn completions_url(&self) -> String {
        match &self.azure {
            Some(azure) => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base_url, azure.deployment, azure.api_version
            ),
            None => format!("{}/chat/completions", self.base_url),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::ApiKeyNotFound("empty API key".to_string()));
        }
        if self.base_url.is_empty() {
            return Err(LlmError::ConfigError("base URL is empty".to_string()));
        }
        Ok(())
    }
}

fn require_env(key: &str) -> Result<String> {
    get_env(key)?.ok_or_else(|| LlmError::ApiKeyNotFound(key.to_string()))
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_retries() -> u32 {
    2
}

fn default_api_version() -> String {
    DEFAULT_AZURE_API_VERSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = OpenAiConfig::new("test-key", "https://api.openai.com/v1/", "gpt-4o")
            .with_timeout(Duration::from_secs(120))
            .with_max_retries(5)
            .with_organization("org-123");

        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.organization.as_deref(), Some("org-123"));
        assert_eq!(config.completions_url(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_azure_url() {
        let config = OpenAiConfig::new("k", "https://my-res.openai.azure.com", "gpt-4o")
            .with_azure(AzureDeployment::new("gpt-4o-mini").with_api_version("2024-06-01"));

        assert!(config.is_azure());
        assert_eq!(
            config.completions_url(),
            "https://my-res.openai.azure.com/openai/deployments/gpt-4o-mini/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let config = OpenAiConfig::new(" ", DEFAULT_BASE_URL, DEFAULT_MODEL);
        assert!(matches!(config.validate(), Err(LlmError::ApiKeyNotFound(_))));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: OpenAiConfig = serde_json::from_value(serde_json::json!({
            "api_key": "k",
            "base_url": "http://localhost:8000/v1",
            "model": "gpt-4o"
        }))
        .unwrap();
        assert_eq!(config.max_retries, 2);
        assert!(config.azure.is_none());
    }
}
