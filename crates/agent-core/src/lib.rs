//! # agent-core
//!
//! The agent dispatch loop: a bounded, fault-isolated protocol that
//! alternates model inference and tool execution for a single request.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐   │
//! │  │  Reasoning  │  │    Tool     │  │   ModelClient       │   │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │   │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘   │
//! │         │                                                    │
//! │  ┌─────────────┐                                             │
//! │  │   Health    │                                             │
//! │  │   Monitor   │                                             │
//! │  └─────────────┘                                             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Concrete agents are configuration values (an [`AgentProfile`] plus a
//! tool registry), not a type hierarchy: the same reasoning loop serves
//! every capability set. The `ModelClient` trait enables swapping the
//! inference backend without changing agent logic.

pub mod agent;
pub mod error;
pub mod health;
pub mod message;
pub mod model;
pub mod reasoning;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentInfo, AgentProfile};
pub use error::{AgentError, Result};
pub use health::{AgentStatus, HealthMonitor, HealthReport};
pub use message::{Conversation, Message, Role};
pub use model::{ModelClient, ModelTurn, ToolCallRequest};
pub use reasoning::{LoopConfig, ReasoningLoop, Reply};
pub use tool::{ParameterSchema, Tool, ToolInvocation, ToolRegistry, ToolSpec};
