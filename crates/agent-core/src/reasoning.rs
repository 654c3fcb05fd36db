//! Reasoning Loop
//!
//! The bounded, fault-isolated protocol that drives one request to
//! completion by alternating model inference and tool execution.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! Seeding ──► AwaitingModel ──► Done (final answer / budget spent)
//!    │            │   ▲
//!    ▼            ▼   │
//!  Failed     ExecutingTool
//! ```
//!
//! Tool calls within a round run strictly sequentially, in the order
//! the model emitted them; each result is appended to the conversation
//! before the next call is considered, so later calls see earlier
//! results. Handler faults and unknown tool names are absorbed into
//! the conversation and never abort the request.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::model::{ModelClient, ModelTurn, ToolCallRequest};
use crate::tool::{ToolInvocation, ToolRegistry};

/// Loop tuning knobs
#[derive(Clone, Debug)]
pub struct LoopConfig {
    /// Maximum model rounds before giving up with a degraded reply
    pub max_rounds: usize,

    /// Additional model-call attempts after a retryable failure
    pub model_retries: usize,

    /// Base backoff between model-call retries (doubles per attempt)
    pub retry_backoff: Duration,

    /// Deadline for the whole run, all rounds included
    pub request_timeout: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            model_retries: 2,
            retry_backoff: Duration::from_millis(200),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Final outcome of a reasoning-loop run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Reply {
    /// Answer text (best-effort summary when the budget ran out)
    pub content: String,

    /// Every tool invocation made during the run, in execution order
    pub used_tools: Vec<ToolInvocation>,

    /// True when the round cap was reached without a final answer
    pub budget_exceeded: bool,
}

/// Loop states, with literal transitions in [`ReasoningLoop::drive`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoopState {
    Seeding,
    AwaitingModel,
    ExecutingTool,
    Done,
    Failed,
}

/// Mutable per-run bookkeeping. One of these exists per request;
/// nothing here outlives the run.
struct LoopRun {
    conversation: Conversation,
    invocations: Vec<ToolInvocation>,
    pending_calls: VecDeque<ToolCallRequest>,
    rounds: usize,
    last_action: String,
    outcome: Option<Reply>,
    failure: Option<AgentError>,
}

impl LoopRun {
    fn new() -> Self {
        Self {
            conversation: Conversation::new(),
            invocations: Vec::new(),
            pending_calls: VecDeque::new(),
            rounds: 0,
            last_action: String::new(),
            outcome: None,
            failure: None,
        }
    }
}

/// The dispatch loop, parameterized by a capability set's seeded
/// system prompt. One instance serves all requests; every run gets a
/// fresh [`LoopRun`], so concurrent requests share nothing mutable.
pub struct ReasoningLoop {
    model: Arc<dyn ModelClient>,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
    config: LoopConfig,
}

impl ReasoningLoop {
    pub fn new(
        model: Arc<dyn ModelClient>,
        tools: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
        config: LoopConfig,
    ) -> Self {
        Self {
            model,
            tools,
            system_prompt: system_prompt.into(),
            config,
        }
    }

    /// Drive one request to completion under the per-request deadline.
    /// Cancellation is dropping the returned future: no further rounds
    /// execute, and no reply is produced.
    pub async fn run(&self, input: &str) -> Result<Reply> {
        let outcome = tokio::time::timeout(self.config.request_timeout, self.drive(input))
            .await
            .map_err(|_| AgentError::RequestTimeout(self.config.request_timeout))?;
        outcome.map(|(reply, _)| reply)
    }

    /// The state machine proper. Returns the reply together with the
    /// final conversation for diagnostics.
    async fn drive(&self, input: &str) -> Result<(Reply, Conversation)> {
        let mut run = LoopRun::new();
        let mut state = LoopState::Seeding;

        loop {
            state = match state {
                LoopState::Seeding => self.seed(input, &mut run),
                LoopState::AwaitingModel => self.await_model(&mut run).await,
                LoopState::ExecutingTool => self.execute_pending(&mut run).await,
                LoopState::Done => {
                    let reply = run.outcome.take().unwrap_or_else(|| Reply {
                        content: String::new(),
                        used_tools: std::mem::take(&mut run.invocations),
                        budget_exceeded: false,
                    });
                    return Ok((reply, run.conversation));
                }
                LoopState::Failed => {
                    let err = run
                        .failure
                        .take()
                        .unwrap_or_else(|| AgentError::Other("loop failed without cause".into()));
                    return Err(err);
                }
            };
        }
    }

    /// Seeding: validate the input and build the fresh conversation
    /// from the capability set's template plus the user message. An
    /// empty request is rejected here, before any model call.
    fn seed(&self, input: &str, run: &mut LoopRun) -> LoopState {
        if input.trim().is_empty() {
            run.failure = Some(AgentError::InvalidInput(
                "request text is empty".into(),
            ));
            return LoopState::Failed;
        }

        run.conversation = Conversation::with_system_prompt(&self.system_prompt);
        run.conversation.push(Message::user(input));
        LoopState::AwaitingModel
    }

    /// AwaitingModel: spend one round on a model call, or terminate
    /// with a degraded reply when the budget is already spent.
    async fn await_model(&self, run: &mut LoopRun) -> LoopState {
        if run.rounds >= self.config.max_rounds {
            tracing::warn!(
                rounds = run.rounds,
                "round budget exhausted without a final answer"
            );
            run.outcome = Some(Reply {
                content: self.budget_summary(run),
                used_tools: std::mem::take(&mut run.invocations),
                budget_exceeded: true,
            });
            return LoopState::Done;
        }
        run.rounds += 1;

        match self.infer_with_retry(&run.conversation).await {
            Ok(ModelTurn::Final(answer)) => {
                run.conversation.push(Message::assistant(&answer));
                run.outcome = Some(Reply {
                    content: answer,
                    used_tools: std::mem::take(&mut run.invocations),
                    budget_exceeded: false,
                });
                LoopState::Done
            }
            Ok(ModelTurn::ToolCalls(calls)) => {
                run.last_action = render_calls(&calls);
                run.pending_calls = calls.into();
                LoopState::ExecutingTool
            }
            Err(e) => {
                run.failure = Some(e);
                LoopState::Failed
            }
        }
    }

    /// ExecutingTool: drain the round's requested calls one at a time.
    /// Each (call, result) message pair is appended before the next
    /// call is looked at.
    async fn execute_pending(&self, run: &mut LoopRun) -> LoopState {
        while let Some(call) = run.pending_calls.pop_front() {
            run.conversation
                .push(Message::assistant(render_calls(std::slice::from_ref(&call))));

            let invocation = self.execute_call(&call).await;
            run.conversation.push(Message::tool_result(format!(
                "[tool '{}' {}]\n{}",
                invocation.tool_name,
                if invocation.success { "returned" } else { "failed" },
                invocation.result_text
            )));
            run.last_action = format!(
                "{} -> {}",
                invocation.tool_name, invocation.result_text
            );
            run.invocations.push(invocation);
        }
        LoopState::AwaitingModel
    }

    /// Resolve and run a single tool call. Unknown names and handler
    /// faults both come back as failed invocations; the model is
    /// expected to recover from the fed-back result text.
    async fn execute_call(&self, call: &ToolCallRequest) -> ToolInvocation {
        let handler = match self.tools.lookup(&call.name) {
            Ok(handler) => handler,
            Err(_) => {
                tracing::debug!(tool = %call.name, "model requested unknown tool");
                return ToolInvocation {
                    tool_name: call.name.clone(),
                    arguments_text: call.arguments_text.clone(),
                    result_text: format!(
                        "tool not found: '{}'. Available tools: {}",
                        call.name,
                        self.tools.names().join(", ")
                    ),
                    success: false,
                };
            }
        };

        tracing::debug!(tool = %call.name, "executing tool");
        match handler.execute(&call.arguments_text).await {
            Ok(output) => ToolInvocation {
                tool_name: call.name.clone(),
                arguments_text: call.arguments_text.clone(),
                result_text: output,
                success: true,
            },
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "tool handler failed");
                ToolInvocation {
                    tool_name: call.name.clone(),
                    arguments_text: call.arguments_text.clone(),
                    result_text: e.user_message(),
                    success: false,
                }
            }
        }
    }

    /// Call the model with bounded retries and exponential backoff.
    /// Non-retryable failures and exhausted retries surface as-is.
    async fn infer_with_retry(&self, conversation: &Conversation) -> Result<ModelTurn> {
        let mut attempt = 0;
        loop {
            match self.model.infer(conversation, self.tools.list()).await {
                Ok(turn) => return Ok(turn),
                Err(e) if e.is_retryable() && attempt < self.config.model_retries => {
                    let backoff = self.config.retry_backoff * 2u32.saturating_pow(attempt as u32);
                    tracing::warn!(attempt, error = %e, "model call failed, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Best-effort content for a budget-exhausted reply
    fn budget_summary(&self, run: &LoopRun) -> String {
        if run.last_action.is_empty() {
            "I could not produce an answer within the allotted reasoning rounds.".into()
        } else {
            format!(
                "I could not finish within the allotted reasoning rounds. \
                 Last progress: {}",
                run.last_action
            )
        }
    }
}

fn render_calls(calls: &[ToolCallRequest]) -> String {
    calls
        .iter()
        .map(|c| format!("[tool call] {}({})", c.name, c.arguments_text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::tool::{Tool, ToolSpec};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Model stub that replays a fixed script of turns
    struct ScriptedModel {
        script: Mutex<VecDeque<ModelTurn>>,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(turns: Vec<ModelTurn>) -> Self {
            Self {
                script: Mutex::new(turns.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn infer(&self, _conversation: &Conversation, _catalog: &[ToolSpec]) -> Result<ModelTurn> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            Ok(next.unwrap_or_else(|| ModelTurn::Final("done".into())))
        }

        async fn probe(&self) -> Result<()> {
            Ok(())
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    /// Model stub that requests the same tool forever
    struct OscillatingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelClient for OscillatingModel {
        async fn infer(&self, _conversation: &Conversation, _catalog: &[ToolSpec]) -> Result<ModelTurn> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ModelTurn::ToolCalls(vec![ToolCallRequest {
                name: "counter".into(),
                arguments_text: "{}".into(),
            }]))
        }

        async fn probe(&self) -> Result<()> {
            Ok(())
        }

        fn model_name(&self) -> &str {
            "oscillating"
        }
    }

    /// Model stub that is never reachable
    struct UnreachableModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelClient for UnreachableModel {
        async fn infer(&self, _conversation: &Conversation, _catalog: &[ToolSpec]) -> Result<ModelTurn> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(AgentError::Upstream("connection refused".into()))
        }

        async fn probe(&self) -> Result<()> {
            Err(AgentError::Upstream("connection refused".into()))
        }

        fn model_name(&self) -> &str {
            "unreachable"
        }
    }

    /// Tool that returns how many times it has run
    struct CounterTool {
        count: AtomicUsize,
    }

    #[async_trait]
    impl Tool for CounterTool {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "counter".into(),
                description: "Counts invocations".into(),
                parameters: vec![],
            }
        }

        async fn execute(&self, _arguments_text: &str) -> Result<String> {
            let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(n.to_string())
        }
    }

    /// Tool whose handler always raises
    struct FaultyTool;

    #[async_trait]
    impl Tool for FaultyTool {
        fn spec(&self) -> ToolSpec {
            ToolSpec {
                name: "faulty".into(),
                description: "Always fails".into(),
                parameters: vec![],
            }
        }

        async fn execute(&self, _arguments_text: &str) -> Result<String> {
            Err(AgentError::ToolExecution("deliberate fault".into()))
        }
    }

    fn registry_with_counter() -> Arc<ToolRegistry> {
        let mut tools = ToolRegistry::new();
        tools
            .register(CounterTool { count: AtomicUsize::new(0) })
            .unwrap();
        Arc::new(tools)
    }

    fn quick_config() -> LoopConfig {
        LoopConfig {
            retry_backoff: Duration::from_millis(1),
            ..LoopConfig::default()
        }
    }

    fn call(name: &str) -> ToolCallRequest {
        ToolCallRequest {
            name: name.into(),
            arguments_text: "{}".into(),
        }
    }

    #[tokio::test]
    async fn test_empty_input_rejected_before_model_call() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let looped = ReasoningLoop::new(model.clone(), registry_with_counter(), "seed", quick_config());

        let err = looped.run("   \n\t ").await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_direct_final_answer() {
        let model = Arc::new(ScriptedModel::new(vec![ModelTurn::Final("42".into())]));
        let looped = ReasoningLoop::new(model.clone(), registry_with_counter(), "seed", quick_config());

        let reply = looped.run("what is six times seven?").await.unwrap();
        assert_eq!(reply.content, "42");
        assert!(reply.used_tools.is_empty());
        assert!(!reply.budget_exceeded);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_recovered_not_fatal() {
        let model = Arc::new(ScriptedModel::new(vec![
            ModelTurn::ToolCalls(vec![call("nonexistent")]),
            ModelTurn::Final("recovered".into()),
        ]));
        let looped = ReasoningLoop::new(model, registry_with_counter(), "seed", quick_config());

        let reply = looped.run("use a tool").await.unwrap();
        assert_eq!(reply.content, "recovered");
        assert_eq!(reply.used_tools.len(), 1);
        assert!(!reply.used_tools[0].success);
        assert!(reply.used_tools[0].result_text.contains("tool not found"));
    }

    #[tokio::test]
    async fn test_round_budget_terminates_at_cap() {
        let model = Arc::new(OscillatingModel { calls: AtomicUsize::new(0) });
        let config = LoopConfig { max_rounds: 3, ..quick_config() };
        let looped = ReasoningLoop::new(model.clone(), registry_with_counter(), "seed", config);

        let reply = looped.run("loop forever").await.unwrap();
        assert!(reply.budget_exceeded);
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
        assert_eq!(reply.used_tools.len(), 3);
        assert!(reply.content.contains("allotted reasoning rounds"));
    }

    #[tokio::test]
    async fn test_handler_fault_recorded_not_propagated() {
        let mut tools = ToolRegistry::new();
        tools.register(FaultyTool).unwrap();
        let model = Arc::new(ScriptedModel::new(vec![
            ModelTurn::ToolCalls(vec![call("faulty")]),
            ModelTurn::Final("degraded but alive".into()),
        ]));
        let looped = ReasoningLoop::new(model, Arc::new(tools), "seed", quick_config());

        let reply = looped.run("break something").await.unwrap();
        assert_eq!(reply.content, "degraded but alive");
        assert_eq!(reply.used_tools.len(), 1);
        assert!(!reply.used_tools[0].success);
    }

    #[tokio::test]
    async fn test_same_round_calls_run_sequentially() {
        let model = Arc::new(ScriptedModel::new(vec![
            ModelTurn::ToolCalls(vec![call("counter"), call("counter")]),
            ModelTurn::Final("done".into()),
        ]));
        let looped = ReasoningLoop::new(model, registry_with_counter(), "seed", quick_config());

        let (reply, conversation) = looped.drive("count twice").await.unwrap();

        // Execution order matches emission order
        assert_eq!(reply.used_tools.len(), 2);
        assert_eq!(reply.used_tools[0].result_text, "1");
        assert_eq!(reply.used_tools[1].result_text, "2");

        // The first call's result message precedes the second call's
        // request message in the conversation
        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::ToolResult,
                Role::Assistant,
                Role::ToolResult,
                Role::Assistant,
            ]
        );
        assert!(conversation.messages()[3].content.contains('1'));
    }

    #[tokio::test]
    async fn test_upstream_failure_after_bounded_retries() {
        let model = Arc::new(UnreachableModel { calls: AtomicUsize::new(0) });
        let config = LoopConfig { model_retries: 2, ..quick_config() };
        let looped = ReasoningLoop::new(model.clone(), registry_with_counter(), "seed", config);

        let err = looped.run("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::Upstream(_)));
        // 1 initial attempt + 2 retries
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_request_timeout_aborts_cleanly() {
        struct StallingModel;

        #[async_trait]
        impl ModelClient for StallingModel {
            async fn infer(&self, _c: &Conversation, _t: &[ToolSpec]) -> Result<ModelTurn> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ModelTurn::Final("never".into()))
            }

            async fn probe(&self) -> Result<()> {
                Ok(())
            }

            fn model_name(&self) -> &str {
                "stalling"
            }
        }

        let config = LoopConfig {
            request_timeout: Duration::from_millis(50),
            ..quick_config()
        };
        let looped = ReasoningLoop::new(Arc::new(StallingModel), registry_with_counter(), "seed", config);

        let err = looped.run("hang").await.unwrap_err();
        assert!(matches!(err, AgentError::RequestTimeout(_)));
    }
}
