//! Agent Assembly
//!
//! An agent is a capability set bound to the shared reasoning loop:
//! a profile (description + seed template), a tool registry and a
//! model client. New agents are expressed as data, not subclasses:
//! build a different profile and registry and hand them to the same
//! loop.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::health::{HealthMonitor, HealthReport};
use crate::model::ModelClient;
use crate::reasoning::{LoopConfig, ReasoningLoop, Reply};
use crate::tool::{ToolRegistry, ToolSpec};

const DEFAULT_SEED_TEMPLATE: &str = "\
You are {name}, {description}.
You have access to tools to help you complete tasks. Use them when appropriate.
Be helpful, accurate, and concise in your responses.";

/// Capability-set configuration value. Concrete agents differ only in
/// this data and in the tools they register.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Agent name, shown in replies and the info report
    pub name: String,

    /// One-line description of what this agent does
    pub description: String,

    /// System-prompt template. `{name}` and `{description}` are
    /// substituted; the tool catalog is appended.
    pub seed_template: String,
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            name: "SingleAgent".into(),
            description: "A helpful AI agent that can calculate and analyze text".into(),
            seed_template: DEFAULT_SEED_TEMPLATE.into(),
        }
    }
}

impl AgentProfile {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    /// Render the seed template into the system prompt, appending the
    /// tool catalog when the registry is non-empty
    fn render_seed(&self, tools: &ToolRegistry) -> String {
        let mut prompt = self
            .seed_template
            .replace("{name}", &self.name)
            .replace("{description}", &self.description);

        if !tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&tools.catalog_prompt_section());
        }

        prompt
    }
}

/// Capability report for discovery endpoints
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
    pub model: String,
    pub tools: Vec<ToolSpec>,
}

/// A fully assembled agent: profile + tools + model client, driven by
/// the shared reasoning loop and observed by a health monitor.
pub struct Agent {
    profile: AgentProfile,
    tools: Arc<ToolRegistry>,
    model: Arc<dyn ModelClient>,
    reasoning: ReasoningLoop,
    health: Arc<HealthMonitor>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Assemble an agent and eagerly validate the model endpoint.
    ///
    /// A failed validation is fatal and permanent for this instance:
    /// the status becomes `Unavailable` and every subsequent
    /// `handle_message` fails with a configuration error. There is no
    /// silent retry; operators see the failure through `health()`.
    pub async fn connect(
        profile: AgentProfile,
        tools: ToolRegistry,
        model: Arc<dyn ModelClient>,
        loop_config: LoopConfig,
    ) -> Self {
        let tools = Arc::new(tools);
        let health = Arc::new(HealthMonitor::new());

        match model.probe().await {
            Ok(()) => {
                tracing::info!(
                    agent = %profile.name,
                    model = %model.model_name(),
                    tools = tools.len(),
                    "agent validated and ready"
                );
                health.mark_ready(format!("model '{}' reachable", model.model_name()));
            }
            Err(e) => {
                tracing::error!(agent = %profile.name, error = %e, "agent validation failed");
                health.mark_unavailable(format!("model endpoint validation failed: {e}"));
            }
        }

        let reasoning = ReasoningLoop::new(
            model.clone(),
            tools.clone(),
            profile.render_seed(&tools),
            loop_config,
        );

        Self {
            profile,
            tools,
            model,
            reasoning,
            health,
        }
    }

    /// Handle one request with a fresh conversation state.
    ///
    /// Tool-level failures never surface here; they are absorbed into
    /// the reply. Hard failures are limited to invalid input, an
    /// unreachable model after bounded retries, the per-request
    /// deadline, and a permanently unavailable instance.
    pub async fn handle_message(&self, text: &str) -> Result<Reply> {
        let report = self.health.report();
        if report.status == crate::health::AgentStatus::Unavailable {
            return Err(AgentError::Config(report.detail));
        }

        self.reasoning.run(text).await
    }

    /// Current readiness. Pure read, safe to poll frequently.
    pub fn health(&self) -> HealthReport {
        self.health.report()
    }

    /// Capability report for discovery
    pub fn info(&self) -> AgentInfo {
        AgentInfo {
            name: self.profile.name.clone(),
            description: self.profile.description.clone(),
            model: self.model.model_name().to_string(),
            tools: self.tools.list().to_vec(),
        }
    }

    /// Registered tools
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Spawn the periodic liveness probe. Flips Ready ↔ Degraded on
    /// probe failure/recovery; an Unavailable instance stays that way.
    pub fn spawn_liveness_probe(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let model = self.model.clone();
        let health = self.health.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                match model.probe().await {
                    Ok(()) => health.mark_ready("liveness probe ok"),
                    Err(e) => health.mark_degraded(format!("liveness probe failed: {e}")),
                }
            }
        })
    }
}

/// Builder for agent assembly
pub struct AgentBuilder {
    profile: AgentProfile,
    tools: ToolRegistry,
    model: Option<Arc<dyn ModelClient>>,
    loop_config: LoopConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            profile: AgentProfile::default(),
            tools: ToolRegistry::new(),
            model: None,
            loop_config: LoopConfig::default(),
        }
    }

    pub fn profile(mut self, profile: AgentProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Register a tool, failing on a duplicate name
    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Result<Self> {
        self.tools.register(tool)?;
        Ok(self)
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn model(mut self, model: Arc<dyn ModelClient>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn max_rounds(mut self, max: usize) -> Self {
        self.loop_config.max_rounds = max;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.loop_config.request_timeout = timeout;
        self
    }

    pub fn loop_config(mut self, config: LoopConfig) -> Self {
        self.loop_config = config;
        self
    }

    /// Assemble and validate. Errors only on a structurally incomplete
    /// build (no model client); a reachable-but-misconfigured endpoint
    /// yields an `Unavailable` instance instead.
    pub async fn connect(self) -> Result<Agent> {
        let model = self
            .model
            .ok_or_else(|| AgentError::Config("model client is required".into()))?;

        Ok(Agent::connect(self.profile, self.tools, model, self.loop_config).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::AgentStatus;
    use crate::message::Conversation;
    use crate::model::ModelTurn;
    use async_trait::async_trait;

    struct HealthyModel;

    #[async_trait]
    impl ModelClient for HealthyModel {
        async fn infer(&self, _c: &Conversation, _t: &[ToolSpec]) -> Result<ModelTurn> {
            Ok(ModelTurn::Final("hi".into()))
        }

        async fn probe(&self) -> Result<()> {
            Ok(())
        }

        fn model_name(&self) -> &str {
            "healthy"
        }
    }

    struct BadCredentialsModel;

    #[async_trait]
    impl ModelClient for BadCredentialsModel {
        async fn infer(&self, _c: &Conversation, _t: &[ToolSpec]) -> Result<ModelTurn> {
            Err(AgentError::Config("invalid api key".into()))
        }

        async fn probe(&self) -> Result<()> {
            Err(AgentError::Config("invalid api key".into()))
        }

        fn model_name(&self) -> &str {
            "bad-credentials"
        }
    }

    #[tokio::test]
    async fn test_validated_agent_is_ready() {
        let agent = AgentBuilder::new()
            .model(Arc::new(HealthyModel))
            .connect()
            .await
            .unwrap();

        assert_eq!(agent.health().status, AgentStatus::Ready);
        let reply = agent.handle_message("hello").await.unwrap();
        assert_eq!(reply.content, "hi");
    }

    #[tokio::test]
    async fn test_failed_validation_is_terminal() {
        let agent = AgentBuilder::new()
            .model(Arc::new(BadCredentialsModel))
            .connect()
            .await
            .unwrap();

        assert_eq!(agent.health().status, AgentStatus::Unavailable);

        let err = agent.handle_message("hello").await.unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));

        // Status does not regress even if someone tries
        agent.health.mark_ready("nope");
        assert_eq!(agent.health().status, AgentStatus::Unavailable);
    }

    #[tokio::test]
    async fn test_builder_requires_model() {
        let err = AgentBuilder::new().connect().await.unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_seed_rendering() {
        let profile = AgentProfile::new("TestAgent", "a test fixture");
        let tools = ToolRegistry::new();
        let seed = profile.render_seed(&tools);

        assert!(seed.contains("TestAgent"));
        assert!(seed.contains("a test fixture"));
        assert!(!seed.contains("{name}"));
    }
}
