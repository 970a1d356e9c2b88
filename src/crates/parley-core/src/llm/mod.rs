//! Language-model capability used by model nodes
//!
//! The engine does not talk to any provider itself. Model nodes hold an
//! `Arc<dyn ChatModel>`; the `llm` crate provides an OpenAI-compatible implementation and
//! [`ScriptedChatModel`] replays canned responses for tests.
//!
//! ```rust,no_run
//! use parley_core::llm::{ChatModel, ChatRequest};
//! use parley_core::messages::Message;
//! # async fn example(model: &dyn ChatModel) -> parley_core::Result<()> {
//! let request = ChatRequest::new(vec![Message::human("hola")])
//!     .with_system("Eres un analista de oficinas.")
//!     .with_temperature(0.0);
//!
//! let response = model.chat(request).await?;
//! println!("{}", response.message.content());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod mock;
pub mod response;
pub mod tools;
pub mod traits;

pub use config::{ChatConfig, ChatRequest};
pub use mock::ScriptedChatModel;
pub use response::{ChatResponse, UsageMetadata};
pub use tools::ToolDefinition;
pub use traits::{ChatModel, ChatStream, StreamChunk};
