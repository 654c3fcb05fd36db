//! Model Client Contract
//!
//! Narrow interface between the reasoning loop and a language-model
//! inference endpoint. Implementations live outside this crate (see
//! `agent-runtime`); the loop depends only on this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Conversation;
use crate::tool::ToolSpec;

/// A tool call requested by the model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Tool identifier, resolved against the registry
    pub name: String,

    /// Raw arguments text as emitted by the model (usually JSON)
    pub arguments_text: String,
}

/// One model turn: either a final answer or a batch of requested tool
/// calls, in the order the model emitted them
#[derive(Clone, Debug)]
pub enum ModelTurn {
    /// The model answered directly; the loop terminates with this text
    Final(String),

    /// The model wants tool results before answering
    ToolCalls(Vec<ToolCallRequest>),
}

impl ModelTurn {
    pub fn is_final(&self) -> bool {
        matches!(self, ModelTurn::Final(_))
    }
}

/// Strategy trait for language-model backends
///
/// Implementations must be stateless between calls and safe to call
/// repeatedly: the conversation carries all request state.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run one inference over the conversation. The tool catalog is
    /// supplied so backends with native function calling can advertise
    /// it; the returned turn is either a final answer or tool calls.
    async fn infer(&self, conversation: &Conversation, catalog: &[ToolSpec])
        -> Result<ModelTurn>;

    /// Lightweight reachability/credential check. Used once at agent
    /// construction and by the periodic liveness probe.
    async fn probe(&self) -> Result<()>;

    /// Identifier of the backing model, for info reporting
    fn model_name(&self) -> &str;
}
