//! Agent Service HTTP Server
//!
//! Axum-based transport over the agent core: health, query and
//! discovery endpoints. Configuration comes from the environment
//! (`.env` supported).

mod handlers;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{AgentBuilder, AgentProfile, AgentStatus, ToolRegistry};
use agent_runtime::OpenAiClient;
use agent_toolkit::{CalculatorTool, TextAnalyzerTool};

use crate::handlers::{agent_info, agent_tools, health_check, process_query};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Agent identity
    let profile = AgentProfile::new(
        std::env::var("AGENT_NAME").unwrap_or_else(|_| "SingleAgent".into()),
        std::env::var("AGENT_DESCRIPTION")
            .unwrap_or_else(|_| "A helpful AI agent that can calculate and analyze text".into()),
    );

    // Register tools before serving traffic; the registry is read-only
    // afterwards
    let mut tools = ToolRegistry::new();
    tools.register(CalculatorTool)?;
    tools.register(TextAnalyzerTool)?;

    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    // Model client + agent assembly with eager validation
    let model = Arc::new(OpenAiClient::from_env()?);
    let agent = Arc::new(
        AgentBuilder::new()
            .profile(profile)
            .tools(tools)
            .model(model)
            .connect()
            .await?,
    );

    let health = agent.health();
    match health.status {
        AgentStatus::Ready => tracing::info!("✓ Agent ready: {}", health.detail),
        status => {
            tracing::warn!("⚠ Agent not ready ({status}): {}", health.detail);
            tracing::warn!("  Check OPENAI_API_KEY and OPENAI_BASE_URL in .env");
        }
    }

    // Periodic liveness probe keeps Ready/Degraded current
    let probe_secs = std::env::var("LIVENESS_PROBE_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    let _probe = agent.spawn_liveness_probe(Duration::from_secs(probe_secs));

    let state = AppState { agent };

    // CORS so the chat page can talk to this API
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .route("/agent/query", post(process_query))
        .route("/agent/info", get(agent_info))
        .route("/agent/tools", get(agent_tools))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🚀 agent-server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health       - Health check");
    tracing::info!("  POST /agent/query  - Send a message");
    tracing::info!("  GET  /agent/info   - Agent capabilities");
    tracing::info!("  GET  /agent/tools  - Tool catalog");

    axum::serve(listener, app).await?;

    Ok(())
}
