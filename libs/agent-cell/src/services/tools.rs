// libs/agent-cell/src/services/tools.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::models::{hhmm, BookingError, CreateAppointmentRequest, EntitySummary, ValidationRequest};
use appointment_cell::AppointmentState;

use crate::models::AgentError;
use crate::services::normalize::InputNormalizer;

pub const LIST_SERVICES: &str = "listServices";
pub const LIST_PROFESSIONALS: &str = "listProfessionals";
pub const CHECK_AVAILABILITY: &str = "checkAvailability";
pub const VALIDATE_APPOINTMENT: &str = "validateAppointment";
pub const CREATE_APPOINTMENT: &str = "createAppointment";
pub const GET_BUSINESS_HOURS: &str = "getBusinessHours";

const SERVICE_KEYS: &[&str] = &["serviceId", "service_id", "service", "serviceName", "service_name"];
const PROFESSIONAL_KEYS: &[&str] = &[
    "professionalId",
    "professional_id",
    "professional",
    "professionalName",
    "professional_name",
];
const DATE_KEYS: &[&str] = &["date", "day"];
const TIME_KEYS: &[&str] = &["time", "startTime", "start_time"];
const CLIENT_NAME_KEYS: &[&str] = &["clientName", "client_name", "name"];
const CLIENT_PHONE_KEYS: &[&str] = &["clientPhone", "client_phone", "phone"];
const INTERVAL_KEYS: &[&str] = &["interval", "intervalMinutes", "interval_minutes"];
const FROM_KEYS: &[&str] = &["from", "startDate", "start_date", "date"];

/// First non-empty value among `keys`. Numbers are accepted as text since
/// models sometimes send `"time": 14`.
fn text_arg(args: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| match args.get(key) {
            Some(Value::String(text)) => Some(text.trim().to_string()),
            Some(Value::Number(number)) => Some(number.to_string()),
            _ => None,
        })
        .find(|text| !text.is_empty())
}

/// Maps named tool calls onto the booking engine. Identifier fields take
/// either a canonical id or a free-text name; both go through the entity
/// resolver inside the engine. Stateless across calls.
#[derive(Clone)]
pub struct ToolDispatcher {
    appointments: Arc<AppointmentState>,
    normalizer: Arc<InputNormalizer>,
}

impl ToolDispatcher {
    pub fn new(appointments: Arc<AppointmentState>) -> Self {
        Self {
            appointments,
            normalizer: Arc::new(InputNormalizer::new()),
        }
    }

    /// Current date in the business timezone.
    pub fn today(&self) -> NaiveDate {
        self.appointments.availability.clock().today()
    }

    pub async fn dispatch(&self, business_id: Uuid, name: &str, args: &Value) -> Result<Value, AgentError> {
        debug!("Dispatching tool {} for business {}", name, business_id);

        match name {
            LIST_SERVICES => self.list_services(business_id).await,
            LIST_PROFESSIONALS => self.list_professionals(business_id).await,
            CHECK_AVAILABILITY => self.check_availability(business_id, args).await,
            VALIDATE_APPOINTMENT => self.validate_appointment(business_id, args).await,
            CREATE_APPOINTMENT => self.create_appointment(business_id, args).await,
            GET_BUSINESS_HOURS => self.get_business_hours(business_id, args).await,
            other => Err(AgentError::UnknownTool(other.to_string())),
        }
    }

    async fn list_services(&self, business_id: Uuid) -> Result<Value, AgentError> {
        let services = self.appointments.availability.services(business_id).await?;

        Ok(json!({
            "services": services
                .iter()
                .map(|s| json!({
                    "id": s.id,
                    "name": s.name,
                    "duration_minutes": s.duration_minutes,
                    "price": s.price
                }))
                .collect::<Vec<_>>()
        }))
    }

    async fn list_professionals(&self, business_id: Uuid) -> Result<Value, AgentError> {
        let professionals = self.appointments.availability.professionals(business_id).await?;

        Ok(json!({
            "professionals": professionals.iter().map(EntitySummary::of).collect::<Vec<_>>()
        }))
    }

    async fn check_availability(&self, business_id: Uuid, args: &Value) -> Result<Value, AgentError> {
        let professional = text_arg(args, PROFESSIONAL_KEYS).unwrap_or_default();
        let service = text_arg(args, SERVICE_KEYS);
        let date = self.date_arg(args)?;
        let interval = match text_arg(args, INTERVAL_KEYS) {
            Some(raw) => Some(
                raw.parse::<u32>()
                    .map_err(|_| AgentError::InvalidArguments(format!("interval '{}' is not a number of minutes", raw)))?,
            ),
            None => None,
        };

        let slots = self
            .appointments
            .availability
            .available_slots(business_id, &professional, service.as_deref(), date, interval)
            .await?;

        to_value(&slots)
    }

    async fn validate_appointment(&self, business_id: Uuid, args: &Value) -> Result<Value, AgentError> {
        let request = ValidationRequest {
            service: text_arg(args, SERVICE_KEYS).unwrap_or_default(),
            professional: text_arg(args, PROFESSIONAL_KEYS),
            date: self.date_arg(args)?,
            time: self.time_arg(args)?,
        };

        let result = self.appointments.validator.validate(business_id, request).await?;
        to_value(&result)
    }

    async fn create_appointment(&self, business_id: Uuid, args: &Value) -> Result<Value, AgentError> {
        let request = CreateAppointmentRequest {
            service: text_arg(args, SERVICE_KEYS).unwrap_or_default(),
            professional: text_arg(args, PROFESSIONAL_KEYS).unwrap_or_default(),
            date: self.date_arg(args)?,
            time: self.time_arg(args)?,
            client_name: text_arg(args, CLIENT_NAME_KEYS).unwrap_or_default(),
            client_phone: text_arg(args, CLIENT_PHONE_KEYS).unwrap_or_default(),
            notes: text_arg(args, &["notes"]),
        };

        let receipt = self.appointments.booking.create_appointment(business_id, request).await?;
        let local_start = self
            .appointments
            .availability
            .clock()
            .to_local(receipt.appointment.start_time);
        let date = local_start.date();
        let time = hhmm::format(&local_start.time());

        info!("Agent booked appointment {}", receipt.appointment.id);

        Ok(json!({
            "success": true,
            "appointment_id": receipt.appointment.id,
            "service": EntitySummary::of(&receipt.service),
            "professional": EntitySummary::of(&receipt.professional),
            "client_name": receipt.client.name,
            "date": date,
            "time": time,
            "duration_minutes": receipt.appointment.duration_minutes(),
            "message": format!(
                "{} with {} booked for {} at {}",
                receipt.service.name, receipt.professional.name, date, time
            )
        }))
    }

    async fn get_business_hours(&self, business_id: Uuid, args: &Value) -> Result<Value, AgentError> {
        let from = match text_arg(args, FROM_KEYS) {
            Some(raw) => Some(self.parse_date(&raw)?),
            None => None,
        };

        let days = self.appointments.availability.business_hours(business_id, from).await?;
        Ok(json!({ "days": days }))
    }

    fn date_arg(&self, args: &Value) -> Result<Option<NaiveDate>, AgentError> {
        text_arg(args, DATE_KEYS).map(|raw| self.parse_date(&raw)).transpose()
    }

    fn time_arg(&self, args: &Value) -> Result<Option<NaiveTime>, AgentError> {
        text_arg(args, TIME_KEYS)
            .map(|raw| {
                self.normalizer
                    .parse_time(&raw)
                    .ok_or_else(|| AgentError::InvalidArguments(format!("Could not understand the time '{}'", raw)))
            })
            .transpose()
    }

    fn parse_date(&self, raw: &str) -> Result<NaiveDate, AgentError> {
        self.normalizer
            .parse_date(raw, self.today())
            .ok_or_else(|| AgentError::InvalidArguments(format!("Could not understand the date '{}'", raw)))
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, AgentError> {
    serde_json::to_value(value).map_err(|e| AgentError::Booking(BookingError::Internal(e.to_string())))
}

/// Function-calling schemas advertised to the model.
pub fn tool_definitions() -> Value {
    json!([
        function(
            LIST_SERVICES,
            "List the salon's services with duration in minutes and price.",
            json!({ "type": "object", "properties": {} })
        ),
        function(
            LIST_PROFESSIONALS,
            "List the professionals working at the salon.",
            json!({ "type": "object", "properties": {} })
        ),
        function(
            CHECK_AVAILABILITY,
            "List free start times (HH:MM) for a professional on a date. Pass the service so its duration is respected.",
            json!({
                "type": "object",
                "properties": {
                    "professional": { "type": "string", "description": "Professional id or name" },
                    "service": { "type": "string", "description": "Service id or name" },
                    "date": { "type": "string", "description": "YYYY-MM-DD, DD/MM or 'today'/'tomorrow'. Defaults to today" }
                },
                "required": ["professional"]
            })
        ),
        function(
            VALIDATE_APPOINTMENT,
            "Check whether a service, professional, date and time can be booked. Returns suggestions and alternative times when not.",
            json!({
                "type": "object",
                "properties": {
                    "service": { "type": "string", "description": "Service id or name" },
                    "professional": { "type": "string", "description": "Professional id or name" },
                    "date": { "type": "string", "description": "YYYY-MM-DD, DD/MM or 'today'/'tomorrow'" },
                    "time": { "type": "string", "description": "HH:MM" }
                },
                "required": ["service"]
            })
        ),
        function(
            CREATE_APPOINTMENT,
            "Book an appointment. Only call after the client confirmed the details.",
            json!({
                "type": "object",
                "properties": {
                    "service": { "type": "string", "description": "Service id or name" },
                    "professional": { "type": "string", "description": "Professional id or name" },
                    "date": { "type": "string", "description": "YYYY-MM-DD, DD/MM or 'today'/'tomorrow'" },
                    "time": { "type": "string", "description": "HH:MM" },
                    "clientName": { "type": "string" },
                    "clientPhone": { "type": "string" },
                    "notes": { "type": "string" }
                },
                "required": ["service", "professional", "time", "clientName", "clientPhone"]
            })
        ),
        function(
            GET_BUSINESS_HOURS,
            "Opening hours for the seven days starting at a date, including closed days.",
            json!({
                "type": "object",
                "properties": {
                    "from": { "type": "string", "description": "First day, defaults to today" }
                }
            })
        ),
    ])
}

fn function(name: &str, description: &str, parameters: Value) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": parameters
        }
    })
}
