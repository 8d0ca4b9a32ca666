// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_utils::phone::normalize_phone;

use crate::models::{
    hhmm, Appointment, AppointmentStatus, BookingError, BookingReceipt, Client, CreateAppointmentRequest,
    EntityKind, Professional, RescheduleAppointmentRequest, Service, TimeRange,
};
use crate::services::availability::AvailabilityService;
use crate::services::cache::{appointment_tags, invalidate_quietly, CacheInvalidator};
use crate::services::conflict::has_conflict;
use crate::services::notifications::{notify_with_timeout, AppointmentNotification, NotificationKind, Notifier};
use crate::store::{BookingStore, NewAppointment, NewClient, StoreError};

/// The only component that writes appointments. Every write is fail-fast:
/// references are resolved and the slot is rechecked before the first
/// mutation, and the store's atomic check closes the remaining race.
#[derive(Clone)]
pub struct BookingService {
    availability: AvailabilityService,
    store: Arc<dyn BookingStore>,
    notifier: Arc<dyn Notifier>,
    cache: Arc<dyn CacheInvalidator>,
    phone_country_code: String,
    notification_timeout: Duration,
}

fn require_text(value: &str, field: &'static str) -> Result<(), BookingError> {
    if value.trim().is_empty() {
        Err(BookingError::MissingField(field))
    } else {
        Ok(())
    }
}

fn describe(date: NaiveDate, time: NaiveTime) -> String {
    format!("{} {}", date, hhmm::format(&time))
}

impl BookingService {
    pub fn new(
        availability: AvailabilityService,
        store: Arc<dyn BookingStore>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<dyn CacheInvalidator>,
        phone_country_code: impl Into<String>,
        notification_timeout: Duration,
    ) -> Self {
        Self {
            availability,
            store,
            notifier,
            cache,
            phone_country_code: phone_country_code.into(),
            notification_timeout,
        }
    }

    pub async fn create_appointment(
        &self,
        business_id: Uuid,
        request: CreateAppointmentRequest,
    ) -> Result<BookingReceipt, BookingError> {
        require_text(&request.service, "service")?;
        require_text(&request.professional, "professional")?;
        let time = request.time.ok_or(BookingError::MissingField("time"))?;
        require_text(&request.client_name, "client_name")?;
        require_text(&request.client_phone, "client_phone")?;

        let service = self.availability.require_service(business_id, &request.service).await?;
        let professional = self.availability.require_professional(business_id, &request.professional).await?;

        let phone = normalize_phone(&request.client_phone, &self.phone_country_code)
            .ok_or_else(|| BookingError::InvalidInput(format!("Invalid phone number: {}", request.client_phone.trim())))?;

        let date = request.date.unwrap_or_else(|| self.availability.clock().today());
        let (start_time, end_time) = self
            .check_slot(business_id, &professional, &service, date, time, None)
            .await?;

        let client = self.upsert_client(business_id, request.client_name.trim(), &phone).await?;

        let new_appointment = NewAppointment {
            business_id,
            professional_id: professional.id,
            service_id: service.id,
            client_id: client.id,
            start_time,
            end_time,
            status: AppointmentStatus::Scheduled,
            notes: request.notes.filter(|notes| !notes.trim().is_empty()),
        };

        let appointment = match self.store.insert_appointment(new_appointment).await {
            Ok(appointment) => appointment,
            Err(StoreError::Conflict) => {
                warn!(
                    "Slot {} for professional {} was taken concurrently",
                    describe(date, time),
                    professional.id
                );
                return Err(self.slot_unavailable(business_id, &professional, &service, date, time, None).await);
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            "Appointment {} booked: {} with {} at {}",
            appointment.id,
            service.name,
            professional.name,
            describe(date, time)
        );

        self.after_commit(
            NotificationKind::Created,
            &appointment,
            Some(client.clone()),
            Some(&service),
            Some(&professional),
        )
        .await;

        Ok(BookingReceipt {
            appointment,
            service,
            professional,
            client,
        })
    }

    pub async fn cancel_appointment(&self, business_id: Uuid, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        let appointment = self.find_appointment(business_id, appointment_id).await?;

        match appointment.status {
            AppointmentStatus::Cancelled => {
                debug!("Appointment {} already cancelled", appointment_id);
                return Ok(appointment);
            }
            AppointmentStatus::Completed | AppointmentStatus::NoShow => {
                return Err(BookingError::InvalidInput(format!(
                    "Appointment {} is {} and cannot be cancelled",
                    appointment_id, appointment.status
                )));
            }
            AppointmentStatus::Scheduled | AppointmentStatus::Confirmed => {}
        }

        let cancelled = self
            .store
            .update_appointment_status(business_id, appointment_id, AppointmentStatus::Cancelled)
            .await?;

        info!("Appointment {} cancelled", appointment_id);
        self.after_commit(NotificationKind::Cancelled, &cancelled, None, None, None).await;

        Ok(cancelled)
    }

    /// Moves an active appointment, keeping `end = start + service duration`.
    /// The date defaults to the appointment's current local date.
    pub async fn reschedule_appointment(
        &self,
        business_id: Uuid,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, BookingError> {
        let time = request.time.ok_or(BookingError::MissingField("time"))?;
        let current = self.find_appointment(business_id, appointment_id).await?;

        if !current.is_active() {
            return Err(BookingError::InvalidInput(format!(
                "Appointment {} is {} and cannot be rescheduled",
                appointment_id, current.status
            )));
        }

        let service = self
            .availability
            .require_service(business_id, &current.service_id.to_string())
            .await?;
        let professional = self
            .availability
            .require_professional(business_id, &current.professional_id.to_string())
            .await?;

        let date = request
            .date
            .unwrap_or_else(|| self.availability.clock().to_local(current.start_time).date());
        let (start_time, end_time) = self
            .check_slot(business_id, &professional, &service, date, time, Some(appointment_id))
            .await?;

        let moved = match self
            .store
            .reschedule_appointment(business_id, appointment_id, start_time, end_time)
            .await
        {
            Ok(moved) => moved,
            Err(StoreError::Conflict) => {
                return Err(self
                    .slot_unavailable(business_id, &professional, &service, date, time, Some(appointment_id))
                    .await);
            }
            Err(e) => return Err(e.into()),
        };

        info!("Appointment {} rescheduled to {}", appointment_id, describe(date, time));
        self.after_commit(
            NotificationKind::Rescheduled,
            &moved,
            None,
            Some(&service),
            Some(&professional),
        )
        .await;

        Ok(moved)
    }

    /// Every appointment (any status) starting on the local `date`.
    pub async fn list_appointments(&self, business_id: Uuid, date: Option<NaiveDate>) -> Result<Vec<Appointment>, BookingError> {
        let date = date.unwrap_or_else(|| self.availability.clock().today());
        let (from, to) = self
            .availability
            .clock()
            .day_window(date)
            .ok_or_else(|| BookingError::InvalidInput(format!("Date {} is out of range", date)))?;

        Ok(self.store.find_appointments_for_business(business_id, from, to).await?)
    }

    async fn find_appointment(&self, business_id: Uuid, appointment_id: Uuid) -> Result<Appointment, BookingError> {
        self.store
            .find_appointment(business_id, appointment_id)
            .await?
            .ok_or_else(|| BookingError::NotFound {
                entity: EntityKind::Appointment,
                reference: appointment_id.to_string(),
                suggestions: Vec::new(),
            })
    }

    /// Re-reads the professional's bookings and checks the requested
    /// interval, returning its UTC bounds when bookable.
    async fn check_slot(
        &self,
        business_id: Uuid,
        professional: &Professional,
        service: &Service,
        date: NaiveDate,
        time: NaiveTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), BookingError> {
        let range = TimeRange::starting_at(date.and_time(time), service.duration_minutes as i64)
            .ok_or_else(|| BookingError::InvalidInput(format!("Date {} is out of range", date)))?;

        let calendar = self.availability.calendar(business_id).await?;
        let mut bookable = calendar.is_open(date) && calendar.day_limits(date).contains(&range);
        if bookable {
            let busy = self
                .availability
                .busy_ranges(business_id, professional.id, date, exclude_appointment_id)
                .await?;
            bookable = !has_conflict(&range, &busy);
        }

        if !bookable {
            return Err(self
                .slot_unavailable(business_id, professional, service, date, time, exclude_appointment_id)
                .await);
        }

        let clock = self.availability.clock();
        match (clock.to_utc(range.start), clock.to_utc(range.end)) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(BookingError::InvalidInput(format!(
                "{} does not exist in the business timezone",
                describe(date, time)
            ))),
        }
    }

    async fn slot_unavailable(
        &self,
        business_id: Uuid,
        professional: &Professional,
        service: &Service,
        date: NaiveDate,
        time: NaiveTime,
        exclude_appointment_id: Option<Uuid>,
    ) -> BookingError {
        let available_slots = match self
            .availability
            .open_slots(
                business_id,
                professional.id,
                date,
                service.duration_minutes as i64,
                self.availability.booking_interval(),
                exclude_appointment_id,
            )
            .await
        {
            Ok(slots) => slots.iter().map(hhmm::format).collect(),
            Err(e) => {
                warn!("Could not compute alternatives for {}: {}", describe(date, time), e);
                Vec::new()
            }
        };

        BookingError::SlotUnavailable {
            requested: describe(date, time),
            available_slots,
        }
    }

    /// Phone is the durable key; a repeat booking refreshes the stored name.
    async fn upsert_client(&self, business_id: Uuid, name: &str, phone: &str) -> Result<Client, BookingError> {
        match self.store.find_client_by_phone(business_id, phone).await? {
            Some(existing) if existing.name == name => Ok(existing),
            Some(existing) => {
                debug!("Updating name of client {}", existing.id);
                Ok(self.store.update_client_name(business_id, existing.id, name).await?)
            }
            None => {
                let inserted = self
                    .store
                    .insert_client(NewClient {
                        business_id,
                        name: name.to_string(),
                        phone: phone.to_string(),
                    })
                    .await;

                match inserted {
                    Ok(client) => {
                        debug!("Created client {}", client.id);
                        Ok(client)
                    }
                    // A concurrent booking registered the same phone first.
                    Err(StoreError::Duplicate(reason)) => {
                        debug!("Client insert lost a race ({}), reusing existing row", reason);
                        match self.store.find_client_by_phone(business_id, phone).await? {
                            Some(existing) if existing.name == name => Ok(existing),
                            Some(existing) => Ok(self.store.update_client_name(business_id, existing.id, name).await?),
                            None => Err(StoreError::Duplicate(reason).into()),
                        }
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    async fn after_commit(
        &self,
        kind: NotificationKind,
        appointment: &Appointment,
        client: Option<Client>,
        service: Option<&Service>,
        professional: Option<&Professional>,
    ) {
        invalidate_quietly(self.cache.as_ref(), &appointment_tags(appointment.business_id)).await;

        let notification = AppointmentNotification {
            kind,
            business_id: appointment.business_id,
            appointment: appointment.clone(),
            client,
            service_name: service.map(|s| s.name.clone()),
            professional_name: professional.map(|p| p.name.clone()),
        };
        notify_with_timeout(self.notifier.as_ref(), &notification, self.notification_timeout).await;
    }
}
