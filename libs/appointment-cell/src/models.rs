// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::services::conflict::overlaps;

// ==============================================================================
// CORE BOOKING MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Professional {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    /// Digits only, country code included.
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub business_id: Uuid,
    pub professional_id: Uuid,
    pub service_id: Uuid,
    pub client_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Only active appointments occupy the professional's time.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

/// Working hours for one weekday. `day_of_week` is 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusinessHours {
    pub business_id: Uuid,
    pub day_of_week: u8,
    pub is_open: bool,
    #[serde(with = "hhmm")]
    pub open_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub close_time: NaiveTime,
}

/// Catalog entries the resolver can look up by name.
pub trait Named {
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
}

impl Named for Service {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Professional {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Service,
    Professional,
    Appointment,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Service => write!(f, "Service"),
            EntityKind::Professional => write!(f, "Professional"),
            EntityKind::Appointment => write!(f, "Appointment"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySummary {
    pub id: Uuid,
    pub name: String,
}

impl EntitySummary {
    pub fn of<T: Named>(entity: &T) -> Self {
        Self {
            id: entity.id(),
            name: entity.name().to_string(),
        }
    }
}

// ==============================================================================
// TIME MODELS
// ==============================================================================

/// Half-open `[start, end)` interval on the business's local wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// `None` when the end falls outside chrono's representable range.
    pub fn starting_at(start: NaiveDateTime, minutes: i64) -> Option<Self> {
        let end = start.checked_add_signed(Duration::minutes(minutes))?;
        Some(Self { start, end })
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }
}

/// Open/close instants of a business day. Closed days still have limits;
/// callers check `BusinessCalendar::is_open` separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayLimits {
    pub open: NaiveDateTime,
    pub close: NaiveDateTime,
}

impl DayLimits {
    pub fn contains(&self, range: &TimeRange) -> bool {
        range.start >= self.open && range.end <= self.close
    }
}

/// `HH:MM` wire format for times of day. Accepts `HH:MM:SS` from Postgres `time` columns.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(time: &NaiveTime) -> String {
        time.format("%H:%M").to_string()
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => serializer.serialize_str(&super::format(time)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid time '{}', expected HH:MM", raw))),
                None => Ok(None),
            }
        }
    }
}

// ==============================================================================
// SLOT / CALENDAR MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotCell {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableSlots {
    pub date: NaiveDate,
    pub professional: EntitySummary,
    pub service: Option<EntitySummary>,
    pub is_open: bool,
    pub interval_minutes: u32,
    pub duration_minutes: i64,
    pub slots: Vec<String>,
}

/// Calendar-rendering view of one professional's day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub professional: EntitySummary,
    pub is_open: bool,
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
    pub cell_minutes: u32,
    pub cells: Vec<SlotCell>,
    /// Starts whose every covered cell is free, present when a service was given.
    pub bookable_starts: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub weekday: String,
    pub is_open: bool,
    #[serde(with = "hhmm")]
    pub open: NaiveTime,
    #[serde(with = "hhmm")]
    pub close: NaiveTime,
}

// ==============================================================================
// RESOLUTION MODELS
// ==============================================================================

/// Which tier of the name lookup produced the answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    /// Input was a canonical id and the record exists.
    Canonical(T),
    ExactMatch(T),
    /// Alphabetically-first substring match, plus up to five candidates.
    SubstringMatch { primary: T, candidates: Vec<T> },
    NoMatch { suggestions: Vec<T> },
}

impl<T> Resolution<T> {
    pub fn matched(&self) -> Option<&T> {
        match self {
            Resolution::Canonical(found) | Resolution::ExactMatch(found) => Some(found),
            Resolution::SubstringMatch { primary, .. } => Some(primary),
            Resolution::NoMatch { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionResult<T> {
    pub found: bool,
    #[serde(rename = "match")]
    pub matched: Option<T>,
    pub suggestions: Vec<T>,
}

impl<T> From<Resolution<T>> for ResolutionResult<T> {
    fn from(resolution: Resolution<T>) -> Self {
        match resolution {
            Resolution::Canonical(found) | Resolution::ExactMatch(found) => Self {
                found: true,
                matched: Some(found),
                suggestions: Vec::new(),
            },
            Resolution::SubstringMatch { primary, candidates } => Self {
                found: true,
                matched: Some(primary),
                suggestions: candidates,
            },
            Resolution::NoMatch { suggestions } => Self {
                found: false,
                matched: None,
                suggestions,
            },
        }
    }
}

// ==============================================================================
// VALIDATION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    Valid,
    Invalid,
    NotChecked,
}

impl CheckOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, CheckOutcome::Valid)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationChecks {
    pub service: CheckOutcome,
    pub professional: CheckOutcome,
    pub availability: CheckOutcome,
}

impl ValidationChecks {
    /// Valid only when every check ran and passed.
    pub fn all_valid(&self) -> bool {
        self.service.is_valid() && self.professional.is_valid() && self.availability.is_valid()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRequest {
    #[serde(default)]
    pub service: String,
    pub professional: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(default, with = "hhmm::option")]
    pub time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub service_valid: bool,
    pub professional_valid: bool,
    pub availability_valid: bool,
    pub checks: ValidationChecks,
    pub service: Option<EntitySummary>,
    pub professional: Option<EntitySummary>,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub service_suggestions: Vec<String>,
    pub professional_suggestions: Vec<String>,
    pub available_slots: Vec<String>,
    pub message: String,
}

// ==============================================================================
// BOOKING MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub professional: String,
    pub date: Option<NaiveDate>,
    #[serde(default, with = "hhmm::option")]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_phone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub date: Option<NaiveDate>,
    #[serde(default, with = "hhmm::option")]
    pub time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingReceipt {
    pub appointment: Appointment,
    pub service: Service,
    pub professional: Professional,
    pub client: Client,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BookingError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("{entity} '{reference}' was not found{}", format_suggestions(.suggestions))]
    NotFound {
        entity: EntityKind,
        reference: String,
        suggestions: Vec<String>,
    },

    #[error("The time {requested} is not available{}", format_alternatives(.available_slots))]
    SlotUnavailable {
        requested: String,
        available_slots: Vec<String>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(". Did you mean: {}?", suggestions.join(", "))
    }
}

fn format_alternatives(slots: &[String]) -> String {
    if slots.is_empty() {
        ". There are no other available times on this date".to_string()
    } else {
        format!(". Available times: {}", slots.join(", "))
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::MissingField(_) | BookingError::InvalidInput(_) => AppError::BadRequest(err.to_string()),
            BookingError::NotFound { .. } => AppError::NotFound(err.to_string()),
            BookingError::SlotUnavailable { .. } => AppError::Conflict(err.to_string()),
            BookingError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
