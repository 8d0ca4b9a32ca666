// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_business_access;

use crate::models::{
    AvailableSlots, CreateAppointmentRequest, DaySchedule, RescheduleAppointmentRequest, ValidationRequest,
    ValidationResult,
};
use crate::state::AppointmentState;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    #[serde(default)]
    pub professional: String,
    pub service: Option<String>,
    pub date: Option<NaiveDate>,
    pub interval: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    #[serde(default)]
    pub professional: String,
    pub date: Option<NaiveDate>,
    pub service: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HoursQuery {
    pub from: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentsQuery {
    pub date: Option<NaiveDate>,
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppointmentState>>,
    Path(business_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<AvailableSlots>, AppError> {
    let slots = state
        .availability
        .available_slots(
            business_id,
            &query.professional,
            query.service.as_deref(),
            query.date,
            query.interval,
        )
        .await?;

    Ok(Json(slots))
}

/// 15-minute grid for the calendar view.
#[axum::debug_handler]
pub async fn get_day_schedule(
    State(state): State<Arc<AppointmentState>>,
    Path(business_id): Path<Uuid>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<DaySchedule>, AppError> {
    let schedule = state
        .availability
        .day_schedule(business_id, &query.professional, query.date, query.service.as_deref())
        .await?;

    Ok(Json(schedule))
}

#[axum::debug_handler]
pub async fn get_business_hours(
    State(state): State<Arc<AppointmentState>>,
    Path(business_id): Path<Uuid>,
    Query(query): Query<HoursQuery>,
) -> Result<Json<Value>, AppError> {
    let days = state.availability.business_hours(business_id, query.from).await?;

    Ok(Json(json!({ "days": days })))
}

#[axum::debug_handler]
pub async fn validate_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(business_id): Path<Uuid>,
    Json(request): Json<ValidationRequest>,
) -> Result<Json<ValidationResult>, AppError> {
    let result = state.validator.validate(business_id, request).await?;

    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppointmentState>>,
    Path(business_id): Path<Uuid>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let receipt = state.booking.create_appointment(business_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": receipt.appointment,
            "service": receipt.service,
            "professional": receipt.professional,
            "client": receipt.client,
            "message": "Appointment booked successfully"
        })),
    ))
}

// ==============================================================================
// DASHBOARD HANDLERS (authenticated)
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path(business_id): Path<Uuid>,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Value>, AppError> {
    require_business_access(&user, business_id)?;

    let appointments = state.booking.list_appointments(business_id, query.date).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path((business_id, appointment_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_business_access(&user, business_id)?;

    let appointment = state
        .booking
        .reschedule_appointment(business_id, appointment_id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled successfully"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(user): Extension<User>,
    Path((business_id, appointment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    require_business_access(&user, business_id)?;

    let appointment = state.booking.cancel_appointment(business_id, appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled successfully"
    })))
}
