//! Chat model client for parley graphs
//!
//! [`OpenAiClient`] implements [`parley_core::llm::ChatModel`] over the chat-completions
//! API of OpenAI, Azure OpenAI and compatible servers. It supports tool calling,
//! token streaming over server-sent events and retries rate-limit, timeout and 5xx
//! failures with exponential backoff.
//!
//! ```rust,ignore
//! use llm::{AzureDeployment, OpenAiClient, OpenAiConfig};
//!
//! // OpenAI
//! let openai = OpenAiClient::new(OpenAiConfig::from_env("gpt-4o")?)?;
//!
//! // Azure OpenAI: requests go to the deployment with an `api-key` header
//! let azure = OpenAiClient::new(
//!     OpenAiConfig::new(key, "https://my-res.openai.azure.com", "gpt-4o")
//!         .with_azure(AzureDeployment::new("gpt-4o-mini")),
//! )?;
//! ```

pub mod config;
pub mod error;
pub mod openai;

pub use config::{AzureDeployment, OpenAiConfig};
pub use error::{LlmError, Result};
pub use openai::OpenAiClient;
