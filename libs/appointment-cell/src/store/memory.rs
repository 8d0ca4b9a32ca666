// libs/appointment-cell/src/store/memory.rs
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, BusinessHours, Client, Professional, Service};
use crate::services::conflict::{conflicting_appointments, overlaps};
use crate::services::resolver::fold_name;

use super::{BookingStore, NewAppointment, NewClient, StoreError};

#[derive(Debug, Default)]
struct Tables {
    hours: Vec<BusinessHours>,
    services: Vec<Service>,
    professionals: Vec<Professional>,
    clients: Vec<Client>,
    appointments: Vec<Appointment>,
}

/// Process-local store. All reads and writes go through one async mutex, so
/// the overlap check and the insert are a single critical section.
#[derive(Debug, Default)]
pub struct MemoryBookingStore {
    tables: Mutex<Tables>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Small salon catalog for running the API without a database.
    pub async fn with_demo_catalog(business_id: Uuid) -> Self {
        let store = Self::new();
        store.add_service(business_id, "Corte feminino", 60, Decimal::new(8000, 2)).await;
        store.add_service(business_id, "Corte masculino", 30, Decimal::new(4500, 2)).await;
        store.add_service(business_id, "Escova", 45, Decimal::new(5000, 2)).await;
        store.add_service(business_id, "Manicure", 30, Decimal::new(3500, 2)).await;
        store.add_professional(business_id, "Ana Souza").await;
        store.add_professional(business_id, "João Pedro").await;
        store.add_professional(business_id, "João Silva").await;

        if let (Some(open), Some(close)) = (NaiveTime::from_hms_opt(9, 0, 0), NaiveTime::from_hms_opt(19, 0, 0)) {
            for day in 1..=6 {
                store.add_business_hours(BusinessHours {
                    business_id,
                    day_of_week: day,
                    is_open: true,
                    open_time: open,
                    close_time: close,
                }).await;
            }
            store.add_business_hours(BusinessHours {
                business_id,
                day_of_week: 0,
                is_open: false,
                open_time: open,
                close_time: close,
            }).await;
        }

        store
    }

    pub async fn add_business_hours(&self, hours: BusinessHours) {
        let mut tables = self.tables.lock().await;
        tables.hours.retain(|row| !(row.business_id == hours.business_id && row.day_of_week == hours.day_of_week));
        tables.hours.push(hours);
    }

    pub async fn add_service(&self, business_id: Uuid, name: &str, duration_minutes: i32, price: Decimal) -> Service {
        let service = Service {
            id: Uuid::new_v4(),
            business_id,
            name: name.to_string(),
            duration_minutes,
            price,
        };
        self.tables.lock().await.services.push(service.clone());
        service
    }

    pub async fn add_professional(&self, business_id: Uuid, name: &str) -> Professional {
        let professional = Professional {
            id: Uuid::new_v4(),
            business_id,
            name: name.to_string(),
        };
        self.tables.lock().await.professionals.push(professional.clone());
        professional
    }

    /// Seeds a row without the overlap check.
    pub async fn add_appointment(&self, appointment: Appointment) {
        self.tables.lock().await.appointments.push(appointment);
    }

    pub async fn appointments(&self) -> Vec<Appointment> {
        self.tables.lock().await.appointments.clone()
    }

    pub async fn clients(&self) -> Vec<Client> {
        self.tables.lock().await.clients.clone()
    }
}

fn sorted_by_name<T: Clone>(rows: impl Iterator<Item = T>, name: impl Fn(&T) -> &str, limit: Option<usize>) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by(|a, b| name(a).cmp(name(b)));
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    rows
}

fn professional_conflicts(tables: &Tables, appointment: &NewAppointment, exclude: Option<Uuid>) -> bool {
    let same_professional: Vec<Appointment> = tables
        .appointments
        .iter()
        .filter(|row| row.business_id == appointment.business_id && row.professional_id == appointment.professional_id)
        .cloned()
        .collect();

    !conflicting_appointments(appointment.start_time, appointment.end_time, &same_professional, exclude).is_empty()
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn business_hours(&self, business_id: Uuid) -> Result<Vec<BusinessHours>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.hours.iter().filter(|row| row.business_id == business_id).cloned().collect())
    }

    async fn find_service_by_id(&self, business_id: Uuid, id: Uuid) -> Result<Option<Service>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.services.iter().find(|s| s.business_id == business_id && s.id == id).cloned())
    }

    async fn find_service_by_exact_name(&self, business_id: Uuid, name: &str) -> Result<Option<Service>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.services.iter().find(|s| s.business_id == business_id && s.name == name).cloned())
    }

    async fn find_services_like(&self, business_id: Uuid, folded: &str) -> Result<Vec<Service>, StoreError> {
        let tables = self.tables.lock().await;
        let rows = tables
            .services
            .iter()
            .filter(|s| s.business_id == business_id && fold_name(&s.name).contains(folded))
            .cloned();
        Ok(sorted_by_name(rows, |s| s.name.as_str(), None))
    }

    async fn list_services(&self, business_id: Uuid, limit: Option<usize>) -> Result<Vec<Service>, StoreError> {
        let tables = self.tables.lock().await;
        let rows = tables.services.iter().filter(|s| s.business_id == business_id).cloned();
        Ok(sorted_by_name(rows, |s| s.name.as_str(), limit))
    }

    async fn find_professional_by_id(&self, business_id: Uuid, id: Uuid) -> Result<Option<Professional>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.professionals.iter().find(|p| p.business_id == business_id && p.id == id).cloned())
    }

    async fn find_professional_by_exact_name(&self, business_id: Uuid, name: &str) -> Result<Option<Professional>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.professionals.iter().find(|p| p.business_id == business_id && p.name == name).cloned())
    }

    async fn find_professionals_like(&self, business_id: Uuid, folded: &str) -> Result<Vec<Professional>, StoreError> {
        let tables = self.tables.lock().await;
        let rows = tables
            .professionals
            .iter()
            .filter(|p| p.business_id == business_id && fold_name(&p.name).contains(folded))
            .cloned();
        Ok(sorted_by_name(rows, |p| p.name.as_str(), None))
    }

    async fn list_professionals(&self, business_id: Uuid, limit: Option<usize>) -> Result<Vec<Professional>, StoreError> {
        let tables = self.tables.lock().await;
        let rows = tables.professionals.iter().filter(|p| p.business_id == business_id).cloned();
        Ok(sorted_by_name(rows, |p| p.name.as_str(), limit))
    }

    async fn find_appointments_for_professional(
        &self,
        business_id: Uuid,
        professional_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Appointment> = tables
            .appointments
            .iter()
            .filter(|a| a.business_id == business_id && a.professional_id == professional_id)
            .filter(|a| a.is_active() && overlaps(a.start_time, a.end_time, from, to))
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.start_time);
        Ok(rows)
    }

    async fn find_appointments_for_business(
        &self,
        business_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let tables = self.tables.lock().await;
        let mut rows: Vec<Appointment> = tables
            .appointments
            .iter()
            .filter(|a| a.business_id == business_id && a.start_time >= from && a.start_time < to)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.start_time);
        Ok(rows)
    }

    async fn find_appointment(&self, business_id: Uuid, id: Uuid) -> Result<Option<Appointment>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.appointments.iter().find(|a| a.business_id == business_id && a.id == id).cloned())
    }

    async fn find_client_by_phone(&self, business_id: Uuid, phone: &str) -> Result<Option<Client>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.clients.iter().find(|c| c.business_id == business_id && c.phone == phone).cloned())
    }

    async fn insert_client(&self, client: NewClient) -> Result<Client, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.clients.iter().any(|c| c.business_id == client.business_id && c.phone == client.phone) {
            return Err(StoreError::Duplicate(format!("client with phone {} already exists", client.phone)));
        }

        let created = Client {
            id: Uuid::new_v4(),
            business_id: client.business_id,
            name: client.name,
            phone: client.phone,
        };
        tables.clients.push(created.clone());
        Ok(created)
    }

    async fn update_client_name(&self, business_id: Uuid, client_id: Uuid, name: &str) -> Result<Client, StoreError> {
        let mut tables = self.tables.lock().await;
        let client = tables
            .clients
            .iter_mut()
            .find(|c| c.business_id == business_id && c.id == client_id)
            .ok_or_else(|| StoreError::Database(format!("client {} not found", client_id)))?;
        client.name = name.to_string();
        Ok(client.clone())
    }

    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.lock().await;
        if appointment.status.is_active() && professional_conflicts(&tables, &appointment, None) {
            return Err(StoreError::Conflict);
        }

        let created = Appointment {
            id: Uuid::new_v4(),
            business_id: appointment.business_id,
            professional_id: appointment.professional_id,
            service_id: appointment.service_id,
            client_id: appointment.client_id,
            start_time: appointment.start_time,
            end_time: appointment.end_time,
            status: appointment.status,
            notes: appointment.notes,
            created_at: Utc::now(),
        };
        tables.appointments.push(created.clone());
        Ok(created)
    }

    async fn update_appointment_status(
        &self,
        business_id: Uuid,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.lock().await;
        let appointment = tables
            .appointments
            .iter_mut()
            .find(|a| a.business_id == business_id && a.id == id)
            .ok_or_else(|| StoreError::Database(format!("appointment {} not found", id)))?;
        appointment.status = status;
        Ok(appointment.clone())
    }

    async fn reschedule_appointment(
        &self,
        business_id: Uuid,
        id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Appointment, StoreError> {
        let mut tables = self.tables.lock().await;
        let current = tables
            .appointments
            .iter()
            .find(|a| a.business_id == business_id && a.id == id)
            .cloned()
            .ok_or_else(|| StoreError::Database(format!("appointment {} not found", id)))?;

        let moved = NewAppointment {
            business_id,
            professional_id: current.professional_id,
            service_id: current.service_id,
            client_id: current.client_id,
            start_time,
            end_time,
            status: current.status,
            notes: current.notes.clone(),
        };
        if professional_conflicts(&tables, &moved, Some(id)) {
            return Err(StoreError::Conflict);
        }

        let appointment = tables
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::Database(format!("appointment {} not found", id)))?;
        appointment.start_time = start_time;
        appointment.end_time = end_time;
        Ok(appointment.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn new_appointment(business_id: Uuid, professional_id: Uuid, hour: u32, minutes: i64) -> NewAppointment {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, hour, 0, 0).unwrap();
        NewAppointment {
            business_id,
            professional_id,
            service_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            status: AppointmentStatus::Scheduled,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_overlap_for_same_professional() {
        let store = MemoryBookingStore::new();
        let business = Uuid::new_v4();
        let professional = Uuid::new_v4();

        store.insert_appointment(new_appointment(business, professional, 10, 60)).await.unwrap();

        let result = store.insert_appointment(new_appointment(business, professional, 10, 30)).await;
        assert_eq!(result.unwrap_err(), StoreError::Conflict);

        // Another professional is free at the same time.
        assert!(store.insert_appointment(new_appointment(business, Uuid::new_v4(), 10, 30)).await.is_ok());
        // Back-to-back is fine.
        assert!(store.insert_appointment(new_appointment(business, professional, 11, 30)).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_client_phone_is_distinct_from_slot_conflict() {
        let store = MemoryBookingStore::new();
        let business = Uuid::new_v4();
        let client = || NewClient {
            business_id: business,
            name: "Carla Dias".to_string(),
            phone: "5511987654321".to_string(),
        };

        store.insert_client(client()).await.unwrap();
        assert!(matches!(store.insert_client(client()).await, Err(StoreError::Duplicate(_))));

        // Same phone in another business is a different client.
        let mut elsewhere = client();
        elsewhere.business_id = Uuid::new_v4();
        assert!(store.insert_client(elsewhere).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_rows_free_the_slot() {
        let store = MemoryBookingStore::new();
        let business = Uuid::new_v4();
        let professional = Uuid::new_v4();

        let first = store.insert_appointment(new_appointment(business, professional, 10, 30)).await.unwrap();
        store
            .update_appointment_status(business, first.id, AppointmentStatus::Cancelled)
            .await
            .unwrap();

        assert!(store.insert_appointment(new_appointment(business, professional, 10, 30)).await.is_ok());
    }

    #[tokio::test]
    async fn test_reschedule_ignores_itself_but_not_others() {
        let store = MemoryBookingStore::new();
        let business = Uuid::new_v4();
        let professional = Uuid::new_v4();

        let moving = store.insert_appointment(new_appointment(business, professional, 10, 60)).await.unwrap();
        store.insert_appointment(new_appointment(business, professional, 12, 60)).await.unwrap();

        let shifted = moving.start_time + Duration::minutes(30);
        let updated = store
            .reschedule_appointment(business, moving.id, shifted, shifted + Duration::minutes(60))
            .await
            .unwrap();
        assert_eq!(updated.start_time, shifted);

        let clash = moving.start_time + Duration::hours(2);
        let result = store
            .reschedule_appointment(business, moving.id, clash, clash + Duration::minutes(60))
            .await;
        assert_eq!(result.unwrap_err(), StoreError::Conflict);
    }

    #[tokio::test]
    async fn test_like_lookup_folds_accents() {
        let store = MemoryBookingStore::new();
        let business = Uuid::new_v4();
        store.add_professional(business, "João Silva").await;
        store.add_professional(business, "Maria").await;

        let found = store.find_professionals_like(business, "joao").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "João Silva");
    }
}
