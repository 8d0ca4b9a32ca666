// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::AppointmentState;

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    // Booking page and calendar
    let public_routes = Router::new()
        .route("/businesses/{business_id}/slots", get(handlers::get_available_slots))
        .route("/businesses/{business_id}/calendar", get(handlers::get_day_schedule))
        .route("/businesses/{business_id}/hours", get(handlers::get_business_hours))
        .route("/businesses/{business_id}/appointments/validate", post(handlers::validate_appointment))
        .route("/businesses/{business_id}/appointments", post(handlers::create_appointment));

    // Dashboard
    let protected_routes = Router::new()
        .route("/businesses/{business_id}/appointments", get(handlers::list_appointments))
        .route(
            "/businesses/{business_id}/appointments/{appointment_id}/reschedule",
            patch(handlers::reschedule_appointment),
        )
        .route(
            "/businesses/{business_id}/appointments/{appointment_id}/cancel",
            post(handlers::cancel_appointment),
        )
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
