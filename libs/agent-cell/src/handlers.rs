// libs/agent-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{AgentReply, ChatRequest, Role};
use crate::state::AgentState;

/// Runs a single tool by name, for integrations that drive the model themselves.
#[axum::debug_handler]
pub async fn dispatch_tool(
    State(state): State<Arc<AgentState>>,
    Path((business_id, name)): Path<(Uuid, String)>,
    Json(arguments): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let result = state.agent.tools().dispatch(business_id, &name, &arguments).await?;

    Ok(Json(json!({
        "tool": name,
        "result": result
    })))
}

#[axum::debug_handler]
pub async fn chat(
    State(state): State<Arc<AgentState>>,
    Path(business_id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<AgentReply>, AppError> {
    if !request.messages.iter().any(|message| message.role == Role::User) {
        return Err(AppError::BadRequest("Conversation has no user message".to_string()));
    }

    let reply = state.agent.respond(business_id, request.messages).await?;

    Ok(Json(reply))
}
