// libs/appointment-cell/src/store/mod.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, BookingError, BusinessHours, Client, Professional, Service};

pub mod memory;
pub mod supabase;

pub use memory::MemoryBookingStore;
pub use supabase::SupabaseBookingStore;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The write would overlap an active appointment of the same professional.
    #[error("Appointment conflicts with an existing booking")]
    Conflict,

    /// A unique key other than the appointment slot already exists, e.g. a
    /// client phone inserted by a concurrent booking.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        BookingError::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewClient {
    pub business_id: Uuid,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub business_id: Uuid,
    pub professional_id: Uuid,
    pub service_id: Uuid,
    pub client_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

/// Persistence collaborator for the booking engine. Every query is scoped to
/// one business.
///
/// `insert_appointment` and `reschedule_appointment` must check for overlap
/// and write atomically, returning `StoreError::Conflict` when another active
/// appointment of the same professional overlaps the new interval.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn business_hours(&self, business_id: Uuid) -> Result<Vec<BusinessHours>, StoreError>;

    async fn find_service_by_id(&self, business_id: Uuid, id: Uuid) -> Result<Option<Service>, StoreError>;
    async fn find_service_by_exact_name(&self, business_id: Uuid, name: &str) -> Result<Option<Service>, StoreError>;
    /// Case- and accent-insensitive substring match on `folded`.
    async fn find_services_like(&self, business_id: Uuid, folded: &str) -> Result<Vec<Service>, StoreError>;
    async fn list_services(&self, business_id: Uuid, limit: Option<usize>) -> Result<Vec<Service>, StoreError>;

    async fn find_professional_by_id(&self, business_id: Uuid, id: Uuid) -> Result<Option<Professional>, StoreError>;
    async fn find_professional_by_exact_name(&self, business_id: Uuid, name: &str) -> Result<Option<Professional>, StoreError>;
    async fn find_professionals_like(&self, business_id: Uuid, folded: &str) -> Result<Vec<Professional>, StoreError>;
    async fn list_professionals(&self, business_id: Uuid, limit: Option<usize>) -> Result<Vec<Professional>, StoreError>;

    /// Active appointments of the professional overlapping `[from, to)`.
    async fn find_appointments_for_professional(
        &self,
        business_id: Uuid,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Appointments of any status starting within `[from, to)`, ordered by start.
    async fn find_appointments_for_business(
        &self,
        business_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn find_appointment(&self, business_id: Uuid, id: Uuid) -> Result<Option<Appointment>, StoreError>;

    async fn find_client_by_phone(&self, business_id: Uuid, phone: &str) -> Result<Option<Client>, StoreError>;
    async fn insert_client(&self, client: NewClient) -> Result<Client, StoreError>;
    async fn update_client_name(&self, business_id: Uuid, client_id: Uuid, name: &str) -> Result<Client, StoreError>;

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;
    async fn update_appointment_status(
        &self,
        business_id: Uuid,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError>;
    async fn reschedule_appointment(
        &self,
        business_id: Uuid,
        id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Appointment, StoreError>;
}
