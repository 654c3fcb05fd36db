//! # agent-runtime
//!
//! Model-client implementations for the agent service.
//!
//! ## Backends
//!
//! - **OpenAI** (default): chat-completions API with native tool
//!   calling. Works with any OpenAI-compatible endpoint via
//!   `OPENAI_BASE_URL`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::OpenAiClient;
//!
//! let model = OpenAiClient::from_env()?;
//! let agent = AgentBuilder::new()
//!     .model(Arc::new(model))
//!     .connect()
//!     .await?;
//! ```

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(feature = "openai")]
pub use openai::{OpenAiClient, OpenAiConfig};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentError, AgentProfile, ModelClient, ModelTurn, Reply, Result, Tool, ToolRegistry,
};
