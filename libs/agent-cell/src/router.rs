// libs/agent-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers;
use crate::state::AgentState;

pub fn agent_routes(state: Arc<AgentState>) -> Router {
    Router::new()
        .route("/businesses/{business_id}/agent/tools/{name}", post(handlers::dispatch_tool))
        .route("/businesses/{business_id}/agent/chat", post(handlers::chat))
        .with_state(state)
}
