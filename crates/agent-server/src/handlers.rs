//! HTTP Handlers

use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};

use agent_core::{AgentError, AgentInfo, AgentStatus, ToolInvocation};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub response: String,
    pub session_id: String,
    pub agent_name: String,
    pub status: &'static str,
    pub used_tools: Vec<ToolInvocation>,
    pub budget_exceeded: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: AgentStatus,
    pub detail: String,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

fn error_response(err: &AgentError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, code) = match err {
        AgentError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        AgentError::Config(_) => (StatusCode::SERVICE_UNAVAILABLE, "AGENT_UNAVAILABLE"),
        AgentError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        AgentError::RequestTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "REQUEST_TIMEOUT"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR"),
    };

    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            code,
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint. 503 while the agent is unavailable so
/// orchestrators take the instance out of rotation.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let report = state.agent.health();
    let body = HealthResponse {
        status: report.status,
        detail: report.detail,
        version: env!("CARGO_PKG_VERSION"),
    };

    match body.status {
        AgentStatus::Unavailable => Err((StatusCode::SERVICE_UNAVAILABLE, Json(body))),
        _ => Ok(Json(body)),
    }
}

/// Main query endpoint
pub async fn process_query(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let reply = state
        .agent
        .handle_message(&payload.query)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "query failed");
            error_response(&e)
        })?;

    let session_id = payload
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    Ok(Json(QueryResponse {
        query: payload.query,
        response: reply.content,
        session_id,
        agent_name: state.agent.info().name,
        status: "success",
        used_tools: reply.used_tools,
        budget_exceeded: reply.budget_exceeded,
    }))
}

/// Capability report
pub async fn agent_info(State(state): State<AppState>) -> Json<AgentInfo> {
    Json(state.agent.info())
}

/// Tool catalog
pub async fn agent_tools(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "tools": state.agent.tools().list(),
    }))
}
