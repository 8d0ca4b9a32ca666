// libs/appointment-cell/src/store/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::{SupabaseClient, SupabaseError, EXCLUSION_VIOLATION};

use crate::models::{Appointment, AppointmentStatus, BusinessHours, Client, Professional, Service};

use super::{BookingStore, NewAppointment, NewClient, StoreError};

const SERVICE_COLUMNS: &str = "id,business_id,name,duration_minutes,price";
const PROFESSIONAL_COLUMNS: &str = "id,business_id,name";
const APPOINTMENT_COLUMNS: &str =
    "id,business_id,professional_id,service_id,client_id,start_time,end_time,status,notes,created_at";

/// PostgREST-backed store. Overlap protection on writes comes from the
/// `appointments_no_overlap` exclusion constraint; violations surface as
/// `StoreError::Conflict`.
pub struct SupabaseBookingStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseBookingStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn select<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, StoreError> {
        debug!("Store query: {}", path);
        self.supabase
            .request::<Vec<T>>(Method::GET, path, None, None)
            .await
            .map_err(store_error)
    }

    async fn select_one<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        Ok(self.select::<T>(path).await?.into_iter().next())
    }

    async fn write<T: DeserializeOwned>(&self, method: Method, path: &str, body: serde_json::Value) -> Result<T, StoreError> {
        self.supabase
            .write_returning::<T>(method, path, body)
            .await
            .map_err(store_error)?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Database(format!("write to {} returned no rows", path)))
    }
}

/// Unique index guarding one start time per professional.
const APPOINTMENT_START_INDEX: &str = "appointments_professional_start_uidx";

fn store_error(err: anyhow::Error) -> StoreError {
    match err.downcast_ref::<SupabaseError>() {
        Some(SupabaseError::Conflict { code, message })
            if code == EXCLUSION_VIOLATION || message.contains(APPOINTMENT_START_INDEX) =>
        {
            StoreError::Conflict
        }
        Some(SupabaseError::Conflict { message, .. }) => StoreError::Duplicate(message.clone()),
        _ => StoreError::Database(err.to_string()),
    }
}

fn timestamp(instant: DateTime<Utc>) -> String {
    urlencoding::encode(&instant.to_rfc3339_opts(SecondsFormat::Secs, true)).into_owned()
}

fn limit_clause(limit: Option<usize>) -> String {
    limit.map(|limit| format!("&limit={}", limit)).unwrap_or_default()
}

#[async_trait]
impl BookingStore for SupabaseBookingStore {
    async fn business_hours(&self, business_id: Uuid) -> Result<Vec<BusinessHours>, StoreError> {
        let path = format!(
            "/rest/v1/business_hours?business_id=eq.{}&select=business_id,day_of_week,is_open,open_time,close_time",
            business_id
        );
        self.select(&path).await
    }

    async fn find_service_by_id(&self, business_id: Uuid, id: Uuid) -> Result<Option<Service>, StoreError> {
        let path = format!(
            "/rest/v1/services?business_id=eq.{}&id=eq.{}&select={}",
            business_id, id, SERVICE_COLUMNS
        );
        self.select_one(&path).await
    }

    async fn find_service_by_exact_name(&self, business_id: Uuid, name: &str) -> Result<Option<Service>, StoreError> {
        let path = format!(
            "/rest/v1/services?business_id=eq.{}&name=eq.{}&select={}&limit=1",
            business_id,
            urlencoding::encode(name),
            SERVICE_COLUMNS
        );
        self.select_one(&path).await
    }

    async fn find_services_like(&self, business_id: Uuid, folded: &str) -> Result<Vec<Service>, StoreError> {
        let path = format!(
            "/rest/v1/services?business_id=eq.{}&search_name=ilike.*{}*&select={}&order=name.asc",
            business_id,
            urlencoding::encode(folded),
            SERVICE_COLUMNS
        );
        self.select(&path).await
    }

    async fn list_services(&self, business_id: Uuid, limit: Option<usize>) -> Result<Vec<Service>, StoreError> {
        let path = format!(
            "/rest/v1/services?business_id=eq.{}&select={}&order=name.asc{}",
            business_id,
            SERVICE_COLUMNS,
            limit_clause(limit)
        );
        self.select(&path).await
    }

    async fn find_professional_by_id(&self, business_id: Uuid, id: Uuid) -> Result<Option<Professional>, StoreError> {
        let path = format!(
            "/rest/v1/professionals?business_id=eq.{}&id=eq.{}&select={}",
            business_id, id, PROFESSIONAL_COLUMNS
        );
        self.select_one(&path).await
    }

    async fn find_professional_by_exact_name(&self, business_id: Uuid, name: &str) -> Result<Option<Professional>, StoreError> {
        let path = format!(
            "/rest/v1/professionals?business_id=eq.{}&name=eq.{}&select={}&limit=1",
            business_id,
            urlencoding::encode(name),
            PROFESSIONAL_COLUMNS
        );
        self.select_one(&path).await
    }

    async fn find_professionals_like(&self, business_id: Uuid, folded: &str) -> Result<Vec<Professional>, StoreError> {
        let path = format!(
            "/rest/v1/professionals?business_id=eq.{}&search_name=ilike.*{}*&select={}&order=name.asc",
            business_id,
            urlencoding::encode(folded),
            PROFESSIONAL_COLUMNS
        );
        self.select(&path).await
    }

    async fn list_professionals(&self, business_id: Uuid, limit: Option<usize>) -> Result<Vec<Professional>, StoreError> {
        let path = format!(
            "/rest/v1/professionals?business_id=eq.{}&select={}&order=name.asc{}",
            business_id,
            PROFESSIONAL_COLUMNS,
            limit_clause(limit)
        );
        self.select(&path).await
    }

    async fn find_appointments_for_professional(
        &self,
        business_id: Uuid,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?business_id=eq.{}&professional_id=eq.{}&status=in.(scheduled,confirmed)\
             &start_time=lt.{}&end_time=gt.{}&select={}&order=start_time.asc",
            business_id,
            professional_id,
            timestamp(to),
            timestamp(from),
            APPOINTMENT_COLUMNS
        );
        self.select(&path).await
    }

    async fn find_appointments_for_business(
        &self,
        business_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?business_id=eq.{}&start_time=gte.{}&start_time=lt.{}&select={}&order=start_time.asc",
            business_id,
            timestamp(from),
            timestamp(to),
            APPOINTMENT_COLUMNS
        );
        self.select(&path).await
    }

    async fn find_appointment(&self, business_id: Uuid, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?business_id=eq.{}&id=eq.{}&select={}",
            business_id, id, APPOINTMENT_COLUMNS
        );
        self.select_one(&path).await
    }

    async fn find_client_by_phone(&self, business_id: Uuid, phone: &str) -> Result<Option<Client>, StoreError> {
        let path = format!(
            "/rest/v1/clients?business_id=eq.{}&phone=eq.{}&select=id,business_id,name,phone&limit=1",
            business_id,
            urlencoding::encode(phone)
        );
        self.select_one(&path).await
    }

    async fn insert_client(&self, client: NewClient) -> Result<Client, StoreError> {
        let body = serde_json::to_value(&client).map_err(|e| StoreError::Database(e.to_string()))?;
        self.write(Method::POST, "/rest/v1/clients", body).await
    }

    async fn update_client_name(&self, business_id: Uuid, client_id: Uuid, name: &str) -> Result<Client, StoreError> {
        let path = format!("/rest/v1/clients?business_id=eq.{}&id=eq.{}", business_id, client_id);
        self.write(Method::PATCH, &path, json!({ "name": name })).await
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let body = serde_json::to_value(&appointment).map_err(|e| StoreError::Database(e.to_string()))?;
        self.write(Method::POST, "/rest/v1/appointments", body).await
    }

    async fn update_appointment_status(
        &self,
        business_id: Uuid,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let path = format!("/rest/v1/appointments?business_id=eq.{}&id=eq.{}", business_id, id);
        self.write(
            Method::PATCH,
            &path,
            json!({ "status": status, "updated_at": Utc::now().to_rfc3339() }),
        )
        .await
    }

    async fn reschedule_appointment(
        &self,
        business_id: Uuid,
        id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let path = format!("/rest/v1/appointments?business_id=eq.{}&id=eq.{}", business_id, id);
        self.write(
            Method::PATCH,
            &path,
            json!({
                "start_time": start_time.to_rfc3339(),
                "end_time": end_time.to_rfc3339(),
                "updated_at": Utc::now().to_rfc3339()
            }),
        )
        .await
    }
}
