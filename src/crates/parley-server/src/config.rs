//! Server configuration
//!
//! Settings are layered: built-in defaults, then a TOML file, then environment variables,
//! then command-line flags (applied by the binary).
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [model]
//! name = "gpt-4o"
//!
//! [graph]
//! kind = "office"
//! hidden_tools = ["make_prompt"]
//! interrupt_ttl_secs = 900
//!
//! [graph.context]
//! "001 - Huerfanos 740 EDW" = "SLA y ranking disponibles de 2024-01 a 2024-10"
//!
//! [checkpoint]
//! dev = false
//! dir = "/var/lib/parley/threads"
//! ```

use llm::{AzureDeployment, LlmError, OpenAiConfig};
use parley_core::DEFAULT_RECURSION_LIMIT;
use parley_prebuilt::agents::office::{ANALYST_AGENT, GUIDANCE_AGENT, REQUEST_SELECTION};
use parley_prebuilt::agents::react::AGENT_NODE;
use parley_prebuilt::MAKE_PROMPT_TOOL;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tooling::config::{get_env, get_env_bool, get_env_list, get_env_parse};

/// Origins allowed by default in addition to any `http://localhost:<port>`
pub const DEFAULT_CORS_ORIGINS: [&str; 5] = [
    "http://localhost",
    "http://localhost:8080",
    "http://localhost:3000",
    "http://127.0.0.1:4040",
    "http://127.0.0.1:8000",
];

const DEFAULT_CONFIG_FILE: &str = "parley.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment override: {0}")]
    Env(#[from] tooling::ToolingError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which prebuilt graph the server runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GraphKind {
    /// One model looping over tools
    #[default]
    React,
    /// Selection gate, guidance stage and analyst stage
    Office,
}

impl GraphKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::React => "react",
            Self::Office => "office",
        }
    }

    /// Nodes whose messages reach the client when none are configured
    pub fn default_streamed_nodes(&self) -> Vec<String> {
        let nodes: &[&str] = match self {
            Self::React => &[AGENT_NODE],
            Self::Office => &[GUIDANCE_AGENT, ANALYST_AGENT, REQUEST_SELECTION],
        };
        nodes.iter().map(|n| n.to_string()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Default model; a request's `model` field overrides it
    pub name: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Azure OpenAI deployment; when set `base_url` is the Azure resource endpoint
    pub azure_deployment: Option<String>,
    pub azure_api_version: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: llm::config::DEFAULT_MODEL.to_string(),
            base_url: None,
            api_key: None,
            azure_deployment: None,
            azure_api_version: None,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl ModelConfig {
    /// Client configuration for the model endpoint
    pub fn client_config(&self) -> std::result::Result<OpenAiConfig, LlmError> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| LlmError::ApiKeyNotFound("OPENAI_API_KEY".to_string()))?;

        let mut config = match &self.azure_deployment {
            Some(deployment) => {
                let endpoint = self.base_url.clone().ok_or_else(|| {
                    LlmError::ConfigError("an Azure deployment needs the resource endpoint as base_url".to_string())
                })?;
                let mut azure = AzureDeployment::new(deployment);
                if let Some(version) = &self.azure_api_version {
                    azure = azure.with_api_version(version);
                }
                OpenAiConfig::new(api_key, endpoint, &self.name).with_azure(azure)
            }
            None => OpenAiConfig::new(
                api_key,
                self.base_url
                    .clone()
                    .unwrap_or_else(|| llm::config::DEFAULT_BASE_URL.to_string()),
                &self.name,
            ),
        };
        config = config
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_max_retries(self.max_retries);
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub kind: GraphKind,

    /// Nodes whose output is streamed; empty means the graph's defaults
    pub streamed_nodes: Vec<String>,

    /// Internal tools whose calls are never shown to the client
    pub hidden_tools: Vec<String>,

    pub selection_pattern: Option<String>,
    pub recursion_limit: usize,

    /// How long a question to the human stays answerable; unset keeps it forever
    pub interrupt_ttl_secs: Option<u64>,

    pub human_prompt: Option<String>,

    /// Role text for the ReAct agent or guidance stage
    pub role: Option<String>,

    /// Per-office context text served to the context node
    pub context: BTreeMap<String, String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            kind: GraphKind::default(),
            streamed_nodes: Vec::new(),
            hidden_tools: vec![MAKE_PROMPT_TOOL.to_string()],
            selection_pattern: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            interrupt_ttl_secs: None,
            human_prompt: None,
            role: None,
            context: BTreeMap::new(),
        }
    }
}

impl GraphConfig {
    pub fn streamed_nodes(&self) -> Vec<String> {
        if self.streamed_nodes.is_empty() {
            self.kind.default_streamed_nodes()
        } else {
            self.streamed_nodes.clone()
        }
    }

    pub fn interrupt_ttl(&self) -> Option<Duration> {
        self.interrupt_ttl_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointSettings {
    /// Development mode keeps threads in memory only
    pub dev: bool,
    /// Directory for the file-backed store, used when `dev` is off
    pub dir: Option<PathBuf>,
    /// Indented JSON files
    pub pretty: bool,
    /// Checkpoints kept per thread. Unset keeps all in memory and 100 per file.
    pub max_history: Option<usize>,
}

impl Default for CheckpointSettings {
    fn default() -> Self {
        Self {
            dev: true,
            dir: None,
            pretty: false,
            max_history: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub model: ModelConfig,
    pub graph: GraphConfig,
    pub checkpoint: CheckpointSettings,
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the file (explicit path, `CONFIG_PATH`, or `./parley.toml` when
    /// present), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => get_env("CONFIG_PATH")?
                .map(PathBuf::from)
                .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists())),
        };

        let mut config = match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading configuration file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Override settings from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(host) = get_env("PARLEY_HOST")? {
            self.server.host = host;
        }
        if let Some(port) = get_env_parse("PARLEY_PORT")? {
            self.server.port = port;
        }
        if let Some(origins) = get_env_list("PARLEY_CORS_ORIGINS")? {
            self.server.cors_origins = origins;
        }

        if let Some(model) = get_env("PARLEY_MODEL")? {
            self.model.name = model;
        }
        if let Some(key) = get_env("OPENAI_API_KEY")? {
            self.model.api_key = Some(key);
        }
        if let Some(url) = get_env("OPENAI_BASE_URL")? {
            self.model.base_url = Some(url);
        }
        if let Some(endpoint) = get_env("AZURE_OPENAI_ENDPOINT")? {
            self.model.base_url = Some(endpoint);
        }
        if let Some(key) = get_env("AZURE_OPENAI_API_KEY")? {
            self.model.api_key = Some(key);
        }
        if let Some(deployment) = get_env("AZURE_OPENAI_DEPLOYMENT")? {
            self.model.azure_deployment = Some(deployment);
        }
        if let Some(version) = get_env("OPENAI_API_VERSION")? {
            self.model.azure_api_version = Some(version);
        }

        if let Some(kind) = get_env("PARLEY_GRAPH")? {
            self.graph.kind = match kind.trim().to_lowercase().as_str() {
                "react" => GraphKind::React,
                "office" => GraphKind::Office,
                other => return Err(ConfigError::Invalid(format!("unknown graph kind '{}'", other))),
            };
        }
        if let Some(ttl) = get_env_parse("PARLEY_INTERRUPT_TTL_SECS")? {
            self.graph.interrupt_ttl_secs = Some(ttl);
        }

        if let Some(dev) = get_env_bool("DEV_CHECKPOINTER")? {
            self.checkpoint.dev = dev;
        }
        if let Some(dir) = get_env("PARLEY_CHECKPOINT_DIR")? {
            self.checkpoint.dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.graph.recursion_limit == 0 {
            return Err(ConfigError::Invalid("graph.recursion_limit must be positive".to_string()));
        }
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::Invalid("model.name is empty".to_string()));
        }
        if self.graph.interrupt_ttl_secs == Some(0) {
            return Err(ConfigError::Invalid("graph.interrupt_ttl_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.cors_origins.len(), 5);
        assert_eq!(config.model.name, "gpt-4o");
        assert_eq!(config.graph.kind, GraphKind::React);
        assert_eq!(config.graph.streamed_nodes(), vec!["agent"]);
        assert_eq!(config.graph.hidden_tools, vec!["make_prompt"]);
        assert!(config.checkpoint.dev);
    }

    #[test]
    fn test_parse_partial_file() {
        let config = ServerConfig::from_toml(
            r#"
[server]
port = 9000

[graph]
kind = "office"
interrupt_ttl_secs = 600

[graph.context]
"004 - Apoquindo EDW" = "datos de 2024-01 a 2024-10"

[checkpoint]
dev = false
dir = "/tmp/parley"
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.graph.kind, GraphKind::Office);
        assert_eq!(
            config.graph.streamed_nodes(),
            vec!["guidance_agent", "analyst_agent", "request_selection"]
        );
        assert_eq!(config.graph.interrupt_ttl(), Some(Duration::from_secs(600)));
        assert_eq!(config.graph.context.len(), 1);
        assert!(!config.checkpoint.dev);
        assert_eq!(config.checkpoint.dir, Some(PathBuf::from("/tmp/parley")));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ServerConfig::from_toml("[graph]\nrecursion_limit = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ServerConfig::from_toml("[graph]\nkind = \"planner\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_client_config() {
        let mut model = ModelConfig::default();
        assert!(matches!(model.client_config(), Err(LlmError::ApiKeyNotFound(_))));

        model.api_key = Some("sk-test".to_string());
        let openai = model.client_config().unwrap();
        assert_eq!(openai.completions_url(), "https://api.openai.com/v1/chat/completions");

        model.azure_deployment = Some("gpt-4o-mini".to_string());
        assert!(matches!(model.client_config(), Err(LlmError::ConfigError(_))));
        model.base_url = Some("https://res.openai.azure.com".to_string());
        let azure = model.client_config().unwrap();
        assert!(azure.is_azure());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("PARLEY_PORT", "9100");
        std::env::set_var("PARLEY_CORS_ORIGINS", "https://chat.example.cl, http://localhost:5173");
        std::env::set_var("DEV_CHECKPOINTER", "false");
        std::env::set_var("PARLEY_CHECKPOINT_DIR", "/tmp/threads");
        std::env::set_var("PARLEY_INTERRUPT_TTL_SECS", "120");

        let mut config = ServerConfig::default();
        config.apply_env().unwrap();

        for key in [
            "PARLEY_PORT",
            "PARLEY_CORS_ORIGINS",
            "DEV_CHECKPOINTER",
            "PARLEY_CHECKPOINT_DIR",
            "PARLEY_INTERRUPT_TTL_SECS",
        ] {
            std::env::remove_var(key);
        }

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.cors_origins, vec!["https://chat.example.cl", "http://localhost:5173"]);
        assert!(!config.checkpoint.dev);
        assert_eq!(config.checkpoint.dir, Some(PathBuf::from("/tmp/threads")));
        assert_eq!(config.graph.interrupt_ttl_secs, Some(120));
    }
}
