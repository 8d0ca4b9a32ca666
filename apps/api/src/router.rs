use std::sync::Arc;

use axum::{routing::get, Router};

use agent_cell::{agent_routes, AgentState};
use appointment_cell::{appointment_routes, AppointmentState};

pub fn create_router(appointments: Arc<AppointmentState>, agent: Arc<AgentState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Booking engine API is running!" }))
        .merge(appointment_routes(appointments))
        .merge(agent_routes(agent))
}
