// libs/appointment-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AvailableSlots, BookingError, DaySchedule, DaySummary, EntityKind, EntitySummary, Named, Professional,
    Resolution, Service, TimeRange,
};
use crate::services::calendar::{BusinessCalendar, BusinessClock, DefaultBusinessHours};
use crate::services::resolver::{EntityResolver, MAX_SUGGESTIONS};
use crate::services::slots::{cells_fitting_duration, slot_labels, SlotGenerator};
use crate::store::BookingStore;

/// Read-side queries shared by the REST handlers, the validator, the
/// booking transaction and the agent tools.
#[derive(Clone)]
pub struct AvailabilityService {
    store: Arc<dyn BookingStore>,
    resolver: EntityResolver,
    clock: BusinessClock,
    default_hours: DefaultBusinessHours,
    booking_interval: u32,
    calendar_interval: u32,
}

impl AvailabilityService {
    pub fn new(
        store: Arc<dyn BookingStore>,
        clock: BusinessClock,
        default_hours: DefaultBusinessHours,
        booking_interval: u32,
        calendar_interval: u32,
    ) -> Self {
        Self {
            resolver: EntityResolver::new(Arc::clone(&store)),
            store,
            clock,
            default_hours,
            booking_interval,
            calendar_interval,
        }
    }

    pub fn clock(&self) -> &BusinessClock {
        &self.clock
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    pub fn booking_interval(&self) -> u32 {
        self.booking_interval
    }

    pub async fn calendar(&self, business_id: Uuid) -> Result<BusinessCalendar, BookingError> {
        let rows = self.store.business_hours(business_id).await?;
        Ok(BusinessCalendar::new(rows, self.default_hours))
    }

    /// Local-time intervals occupied by the professional's active bookings on `date`.
    pub async fn busy_ranges(
        &self,
        business_id: Uuid,
        professional_id: Uuid,
        date: NaiveDate,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<TimeRange>, BookingError> {
        let (from, to) = self
            .clock
            .day_window(date)
            .ok_or_else(|| BookingError::InvalidInput(format!("Date {} is out of range", date)))?;

        let appointments = self
            .store
            .find_appointments_for_professional(business_id, professional_id, from, to)
            .await?;

        Ok(appointments
            .iter()
            .filter(|appointment| appointment.is_active())
            .filter(|appointment| Some(appointment.id) != exclude_appointment_id)
            .map(|appointment| self.clock.local_range(appointment))
            .collect())
    }

    /// Bookable starts for a duration on `date`; empty on closed days.
    pub async fn open_slots(
        &self,
        business_id: Uuid,
        professional_id: Uuid,
        date: NaiveDate,
        duration_minutes: i64,
        interval_minutes: u32,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<NaiveTime>, BookingError> {
        let calendar = self.calendar(business_id).await?;
        if !calendar.is_open(date) {
            return Ok(Vec::new());
        }

        let busy = self.busy_ranges(business_id, professional_id, date, exclude_appointment_id).await?;
        Ok(SlotGenerator::new(interval_minutes).generate(&calendar.day_limits(date), duration_minutes, &busy))
    }

    pub async fn require_service(&self, business_id: Uuid, reference: &str) -> Result<Service, BookingError> {
        match self.resolver.resolve_service(business_id, reference).await? {
            Resolution::NoMatch { suggestions } => Err(not_found(EntityKind::Service, reference, &suggestions)),
            Resolution::Canonical(found)
            | Resolution::ExactMatch(found)
            | Resolution::SubstringMatch { primary: found, .. } => Ok(found),
        }
    }

    pub async fn require_professional(&self, business_id: Uuid, reference: &str) -> Result<Professional, BookingError> {
        match self.resolver.resolve_professional(business_id, reference).await? {
            Resolution::NoMatch { .. } => {
                let alternatives = self.professional_alternatives(business_id).await?;
                Err(not_found(EntityKind::Professional, reference, &alternatives))
            }
            Resolution::Canonical(found)
            | Resolution::ExactMatch(found)
            | Resolution::SubstringMatch { primary: found, .. } => Ok(found),
        }
    }

    pub async fn services(&self, business_id: Uuid) -> Result<Vec<Service>, BookingError> {
        Ok(self.store.list_services(business_id, None).await?)
    }

    pub async fn professionals(&self, business_id: Uuid) -> Result<Vec<Professional>, BookingError> {
        Ok(self.store.list_professionals(business_id, None).await?)
    }

    /// Professionals offered when a name did not resolve.
    pub async fn professional_alternatives(&self, business_id: Uuid) -> Result<Vec<Professional>, BookingError> {
        Ok(self.store.list_professionals(business_id, Some(MAX_SUGGESTIONS)).await?)
    }

    /// Slot listing for a professional. Without a service the interval
    /// doubles as the nominal duration.
    pub async fn available_slots(
        &self,
        business_id: Uuid,
        professional_ref: &str,
        service_ref: Option<&str>,
        date: Option<NaiveDate>,
        interval_minutes: Option<u32>,
    ) -> Result<AvailableSlots, BookingError> {
        if professional_ref.trim().is_empty() {
            return Err(BookingError::MissingField("professional"));
        }

        let professional = self.require_professional(business_id, professional_ref).await?;
        let service = match service_ref.filter(|reference| !reference.trim().is_empty()) {
            Some(reference) => Some(self.require_service(business_id, reference).await?),
            None => None,
        };

        let date = date.unwrap_or_else(|| self.clock.today());
        let interval = interval_minutes.unwrap_or(self.booking_interval).max(1);
        let duration = service
            .as_ref()
            .map(|service| service.duration_minutes as i64)
            .unwrap_or(interval as i64);

        let calendar = self.calendar(business_id).await?;
        let slots = self
            .open_slots(business_id, professional.id, date, duration, interval, None)
            .await?;

        debug!(
            "{} slot(s) for professional {} on {} ({} min)",
            slots.len(),
            professional.id,
            date,
            duration
        );

        Ok(AvailableSlots {
            date,
            professional: EntitySummary::of(&professional),
            service: service.as_ref().map(EntitySummary::of),
            is_open: calendar.is_open(date),
            interval_minutes: interval,
            duration_minutes: duration,
            slots: slot_labels(&slots),
        })
    }

    /// Calendar-rendering grid at the calendar granularity. With a service,
    /// also lists starts whose every covered cell is free.
    pub async fn day_schedule(
        &self,
        business_id: Uuid,
        professional_ref: &str,
        date: Option<NaiveDate>,
        service_ref: Option<&str>,
    ) -> Result<DaySchedule, BookingError> {
        if professional_ref.trim().is_empty() {
            return Err(BookingError::MissingField("professional"));
        }

        let professional = self.require_professional(business_id, professional_ref).await?;
        let service = match service_ref.filter(|reference| !reference.trim().is_empty()) {
            Some(reference) => Some(self.require_service(business_id, reference).await?),
            None => None,
        };

        let date = date.unwrap_or_else(|| self.clock.today());
        let calendar = self.calendar(business_id).await?;
        let limits = calendar.day_limits(date);
        let is_open = calendar.is_open(date);

        let cells = if is_open {
            let busy = self.busy_ranges(business_id, professional.id, date, None).await?;
            SlotGenerator::new(self.calendar_interval).cell_grid(&limits, &busy)
        } else {
            Vec::new()
        };

        let bookable_starts = service.map(|service| {
            slot_labels(&cells_fitting_duration(
                &cells,
                &limits,
                self.calendar_interval,
                service.duration_minutes as i64,
            ))
        });

        Ok(DaySchedule {
            date,
            professional: EntitySummary::of(&professional),
            is_open,
            open: limits.open.time(),
            close: limits.close.time(),
            cell_minutes: self.calendar_interval,
            cells,
            bookable_starts,
        })
    }

    pub async fn business_hours(&self, business_id: Uuid, from: Option<NaiveDate>) -> Result<Vec<DaySummary>, BookingError> {
        let calendar = self.calendar(business_id).await?;
        Ok(calendar.week_overview(from.unwrap_or_else(|| self.clock.today())))
    }
}

fn not_found<T: Named>(entity: EntityKind, reference: &str, suggestions: &[T]) -> BookingError {
    BookingError::NotFound {
        entity,
        reference: reference.trim().to_string(),
        suggestions: suggestions.iter().map(|s| s.name().to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::models::{Appointment, AppointmentStatus, BusinessHours};
    use crate::store::MemoryBookingStore;

    // 2025-03-10 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    async fn fixture() -> (AvailabilityService, Arc<MemoryBookingStore>, Uuid, Professional) {
        let store = Arc::new(MemoryBookingStore::new());
        let business_id = Uuid::new_v4();
        store.add_service(business_id, "Corte", 30, Decimal::new(4000, 2)).await;
        store.add_service(business_id, "Escova", 45, Decimal::new(5000, 2)).await;
        let ana = store.add_professional(business_id, "Ana Souza").await;

        let service = AvailabilityService::new(
            store.clone(),
            BusinessClock::new(chrono_tz::UTC),
            DefaultBusinessHours::default(),
            30,
            15,
        );
        (service, store, business_id, ana)
    }

    #[tokio::test]
    async fn test_slots_skip_existing_booking() {
        let (service, store, business_id, ana) = fixture().await;
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        store
            .add_appointment(Appointment {
                id: Uuid::new_v4(),
                business_id,
                professional_id: ana.id,
                service_id: Uuid::new_v4(),
                client_id: Uuid::new_v4(),
                start_time: start,
                end_time: start + Duration::minutes(30),
                status: AppointmentStatus::Scheduled,
                notes: None,
                created_at: start,
            })
            .await;

        let result = service
            .available_slots(business_id, "Ana", Some("Corte"), Some(monday()), None)
            .await
            .unwrap();

        assert_eq!(result.slots.len(), 19);
        assert!(!result.slots.contains(&"10:00".to_string()));
        assert!(result.slots.contains(&"09:30".to_string()));
        assert!(result.slots.contains(&"10:30".to_string()));
    }

    #[tokio::test]
    async fn test_closed_day_has_no_slots_or_cells() {
        let (service, store, business_id, _) = fixture().await;
        store
            .add_business_hours(BusinessHours {
                business_id,
                day_of_week: 1,
                is_open: false,
                open_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                close_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            })
            .await;

        let slots = service
            .available_slots(business_id, "Ana Souza", None, Some(monday()), None)
            .await
            .unwrap();
        assert!(!slots.is_open);
        assert!(slots.slots.is_empty());

        let schedule = service
            .day_schedule(business_id, "Ana Souza", Some(monday()), None)
            .await
            .unwrap();
        assert!(schedule.cells.is_empty());
    }

    #[tokio::test]
    async fn test_day_schedule_lists_duration_aware_starts() {
        let (service, _, business_id, _) = fixture().await;

        let schedule = service
            .day_schedule(business_id, "Ana", Some(monday()), Some("Escova"))
            .await
            .unwrap();

        assert_eq!(schedule.cells.len(), 40);
        let starts = schedule.bookable_starts.unwrap();
        assert_eq!(starts.first().map(String::as_str), Some("09:00"));
        assert_eq!(starts.last().map(String::as_str), Some("18:15"));
    }

    #[tokio::test]
    async fn test_unknown_professional_lists_alternatives() {
        let (service, _, business_id, _) = fixture().await;

        let err = service
            .available_slots(business_id, "Carlos", None, Some(monday()), None)
            .await
            .unwrap_err();

        assert_matches!(err, BookingError::NotFound { entity: EntityKind::Professional, suggestions, .. } => {
            assert_eq!(suggestions, vec!["Ana Souza".to_string()]);
        });
    }
}
