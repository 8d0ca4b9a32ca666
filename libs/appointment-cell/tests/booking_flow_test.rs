// libs/appointment-cell/tests/booking_flow_test.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;
use uuid::Uuid;

use appointment_cell::models::{
    AppointmentStatus, BookingError, CheckOutcome, CreateAppointmentRequest, EntityKind, Professional,
    RescheduleAppointmentRequest, Service, ValidationRequest,
};
use appointment_cell::services::cache::CacheInvalidator;
use appointment_cell::services::notifications::{AppointmentNotification, NotificationKind, Notifier};
use appointment_cell::services::{LogCacheInvalidator, LogNotifier};
use appointment_cell::store::{BookingStore, MemoryBookingStore};
use appointment_cell::AppointmentState;
use shared_utils::test_utils::TestConfig;

struct Fixture {
    state: AppointmentState,
    store: Arc<MemoryBookingStore>,
    business_id: Uuid,
    corte: Service,
    escova: Service,
    ana: Professional,
}

async fn fixture_with(notifier: Arc<dyn Notifier>, cache: Arc<dyn CacheInvalidator>) -> Fixture {
    let store = Arc::new(MemoryBookingStore::new());
    let business_id = Uuid::new_v4();

    let corte = store.add_service(business_id, "Corte", 30, Decimal::new(4000, 2)).await;
    let escova = store.add_service(business_id, "Escova", 45, Decimal::new(5000, 2)).await;
    store.add_service(business_id, "Manicure", 30, Decimal::new(3500, 2)).await;
    let ana = store.add_professional(business_id, "Ana Souza").await;
    store.add_professional(business_id, "João Pedro").await;

    let state = AppointmentState::new(TestConfig::default().to_arc(), store.clone(), notifier, cache);

    Fixture { state, store, business_id, corte, escova, ana }
}

async fn fixture() -> Fixture {
    fixture_with(Arc::new(LogNotifier), Arc::new(LogCacheInvalidator)).await
}

// 2030-01-07 is a Monday; with no configured hours every day is open 09:00-19:00.
fn booking_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
}

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn request(service: &str, professional: &str, at: NaiveTime) -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        service: service.to_string(),
        professional: professional.to_string(),
        date: Some(booking_date()),
        time: Some(at),
        client_name: "Carla Dias".to_string(),
        client_phone: "(11) 98765-4321".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn test_created_appointment_spans_service_duration() {
    let f = fixture().await;

    let receipt = f
        .state
        .booking
        .create_appointment(f.business_id, request("Escova", "Ana Souza", time(10, 0)))
        .await
        .unwrap();

    assert_eq!(receipt.service.id, f.escova.id);
    assert_eq!(receipt.appointment.status, AppointmentStatus::Scheduled);
    assert_eq!(receipt.client.phone, "5511987654321");

    let (from, to) = f.state.availability.clock().day_window(booking_date()).unwrap();
    let stored = f
        .store
        .find_appointments_for_professional(f.business_id, f.ana.id, from, to)
        .await
        .unwrap();

    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].duration_minutes(), 45);
    assert_eq!(stored[0].start_time.hour(), 10);
}

#[tokio::test]
async fn test_repeat_client_is_reused_and_renamed() {
    let f = fixture().await;

    let first = f
        .state
        .booking
        .create_appointment(f.business_id, request("Corte", "Ana Souza", time(9, 0)))
        .await
        .unwrap();

    let mut second_request = request("Corte", "Ana Souza", time(11, 0));
    second_request.client_name = "Carla Dias Lima".to_string();
    second_request.client_phone = "+55 11 98765 4321".to_string();
    let second = f
        .state
        .booking
        .create_appointment(f.business_id, second_request)
        .await
        .unwrap();

    assert_eq!(first.client.id, second.client.id);
    let clients = f.store.clients().await;
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].name, "Carla Dias Lima");
}

#[tokio::test]
async fn test_double_booking_is_rejected_with_alternatives() {
    let f = fixture().await;

    f.state
        .booking
        .create_appointment(f.business_id, request("Corte", "Ana Souza", time(10, 0)))
        .await
        .unwrap();

    let err = f
        .state
        .booking
        .create_appointment(f.business_id, request("Corte", "Ana Souza", time(10, 0)))
        .await
        .unwrap_err();

    assert_matches!(err, BookingError::SlotUnavailable { requested, available_slots } => {
        assert_eq!(requested, "2030-01-07 10:00");
        assert!(!available_slots.contains(&"10:00".to_string()));
        assert!(available_slots.contains(&"09:30".to_string()));
        assert!(available_slots.contains(&"10:30".to_string()));
    });
}

#[tokio::test]
async fn test_concurrent_bookings_for_same_slot_commit_once() {
    let f = fixture().await;
    let booking = f.state.booking.clone();
    let other = f.state.booking.clone();

    let (a, b) = tokio::join!(
        booking.create_appointment(f.business_id, request("Corte", "Ana Souza", time(14, 0))),
        other.create_appointment(f.business_id, request("Corte", "Ana Souza", time(14, 0))),
    );

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(f.store.appointments().await.len(), 1);
}

#[tokio::test]
async fn test_outside_business_hours_is_unavailable() {
    let f = fixture().await;

    // 18:45 + 30 minutes runs past the 19:00 close.
    let err = f
        .state
        .booking
        .create_appointment(f.business_id, request("Corte", "Ana Souza", time(18, 45)))
        .await
        .unwrap_err();

    assert_matches!(err, BookingError::SlotUnavailable { available_slots, .. } => {
        assert_eq!(available_slots.last().map(String::as_str), Some("18:30"));
    });
}

#[tokio::test]
async fn test_missing_fields_fail_before_any_write() {
    let f = fixture().await;

    let mut missing_phone = request("Corte", "Ana Souza", time(10, 0));
    missing_phone.client_phone = "  ".to_string();
    let err = f.state.booking.create_appointment(f.business_id, missing_phone).await.unwrap_err();
    assert_eq!(err, BookingError::MissingField("client_phone"));

    let mut missing_time = request("Corte", "Ana Souza", time(10, 0));
    missing_time.time = None;
    let err = f.state.booking.create_appointment(f.business_id, missing_time).await.unwrap_err();
    assert_eq!(err, BookingError::MissingField("time"));

    assert!(f.store.clients().await.is_empty());
    assert!(f.store.appointments().await.is_empty());
}

#[tokio::test]
async fn test_unknown_service_carries_suggestions() {
    let f = fixture().await;

    let err = f
        .state
        .booking
        .create_appointment(f.business_id, request("Massagem", "Ana Souza", time(10, 0)))
        .await
        .unwrap_err();

    assert_matches!(&err, BookingError::NotFound { entity: EntityKind::Service, suggestions, .. } => {
        assert_eq!(suggestions, &vec!["Corte".to_string(), "Escova".to_string(), "Manicure".to_string()]);
    });
    assert!(err.to_string().contains("Did you mean: Corte, Escova, Manicure?"));
    assert!(f.store.clients().await.is_empty());
}

#[tokio::test]
async fn test_invalid_phone_is_rejected() {
    let f = fixture().await;

    let mut bad_phone = request("Corte", "Ana Souza", time(10, 0));
    bad_phone.client_phone = "1234".to_string();
    let err = f.state.booking.create_appointment(f.business_id, bad_phone).await.unwrap_err();

    assert_matches!(err, BookingError::InvalidInput(_));
}

#[tokio::test]
async fn test_cancel_frees_the_slot_and_is_idempotent() {
    let f = fixture().await;

    let receipt = f
        .state
        .booking
        .create_appointment(f.business_id, request("Corte", "Ana Souza", time(10, 0)))
        .await
        .unwrap();

    let cancelled = f
        .state
        .booking
        .cancel_appointment(f.business_id, receipt.appointment.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

    let again = f
        .state
        .booking
        .cancel_appointment(f.business_id, receipt.appointment.id)
        .await
        .unwrap();
    assert_eq!(again.status, AppointmentStatus::Cancelled);

    assert!(f
        .state
        .booking
        .create_appointment(f.business_id, request("Corte", "Ana Souza", time(10, 0)))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_cancel_unknown_appointment_is_not_found() {
    let f = fixture().await;

    let err = f
        .state
        .booking
        .cancel_appointment(f.business_id, Uuid::new_v4())
        .await
        .unwrap_err();

    assert_matches!(err, BookingError::NotFound { entity: EntityKind::Appointment, .. });
}

#[tokio::test]
async fn test_reschedule_keeps_duration_and_checks_conflicts() {
    let f = fixture().await;

    let moving = f
        .state
        .booking
        .create_appointment(f.business_id, request("Escova", "Ana Souza", time(10, 0)))
        .await
        .unwrap();
    f.state
        .booking
        .create_appointment(f.business_id, request("Corte", "Ana Souza", time(13, 0)))
        .await
        .unwrap();

    // Overlapping its own old interval is fine.
    let moved = f
        .state
        .booking
        .reschedule_appointment(
            f.business_id,
            moving.appointment.id,
            RescheduleAppointmentRequest { date: None, time: Some(time(10, 30)) },
        )
        .await
        .unwrap();
    assert_eq!(moved.duration_minutes(), 45);
    assert_eq!(moved.start_time.hour(), 10);
    assert_eq!(moved.start_time.minute(), 30);

    let err = f
        .state
        .booking
        .reschedule_appointment(
            f.business_id,
            moving.appointment.id,
            RescheduleAppointmentRequest { date: Some(booking_date()), time: Some(time(12, 30)) },
        )
        .await
        .unwrap_err();
    assert_matches!(err, BookingError::SlotUnavailable { .. });
}

#[tokio::test]
async fn test_list_appointments_for_day() {
    let f = fixture().await;

    for hour in [15, 9, 12] {
        f.state
            .booking
            .create_appointment(f.business_id, request("Corte", "Ana Souza", time(hour, 0)))
            .await
            .unwrap();
    }

    let listed = f
        .state
        .booking
        .list_appointments(f.business_id, Some(booking_date()))
        .await
        .unwrap();
    let hours: Vec<u32> = listed.iter().map(|a| a.start_time.hour()).collect();
    assert_eq!(hours, vec![9, 12, 15]);

    let next_day = booking_date().succ_opt().unwrap();
    assert!(f.state.booking.list_appointments(f.business_id, Some(next_day)).await.unwrap().is_empty());
}

struct BrokenCollaborators {
    calls: AtomicUsize,
}

#[async_trait]
impl Notifier for BrokenCollaborators {
    async fn notify(&self, notification: &AppointmentNotification) -> anyhow::Result<()> {
        assert_eq!(notification.kind, NotificationKind::Created);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("whatsapp gateway down"))
    }
}

#[async_trait]
impl CacheInvalidator for BrokenCollaborators {
    async fn invalidate(&self, tags: &[String]) -> anyhow::Result<()> {
        assert_eq!(tags.len(), 2);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("redis down"))
    }
}

#[tokio::test]
async fn test_side_effect_failures_do_not_fail_booking() {
    let broken = Arc::new(BrokenCollaborators { calls: AtomicUsize::new(0) });
    let f = fixture_with(broken.clone(), broken.clone()).await;

    let receipt = f
        .state
        .booking
        .create_appointment(f.business_id, request("Corte", "Ana Souza", time(10, 0)))
        .await;

    assert!(receipt.is_ok());
    assert_eq!(broken.calls.load(Ordering::SeqCst), 2);
    assert_eq!(f.store.appointments().await.len(), 1);
}

// ==============================================================================
// VALIDATOR
// ==============================================================================

fn validation(service: &str, professional: Option<&str>, at: Option<NaiveTime>) -> ValidationRequest {
    ValidationRequest {
        service: service.to_string(),
        professional: professional.map(str::to_string),
        date: Some(booking_date()),
        time: at,
    }
}

#[tokio::test]
async fn test_validate_available_combination() {
    let f = fixture().await;

    let result = f
        .state
        .validator
        .validate(f.business_id, validation("corte", Some("ana"), Some(time(10, 0))))
        .await
        .unwrap();

    assert!(result.valid);
    assert!(result.service_valid && result.professional_valid && result.availability_valid);
    assert_eq!(result.service.unwrap().id, f.corte.id);
    assert_eq!(result.professional.unwrap().id, f.ana.id);
    assert_eq!(result.available_slots.len(), 20);
}

#[tokio::test]
async fn test_validate_unknown_service_skips_availability() {
    let f = fixture().await;

    let result = f
        .state
        .validator
        .validate(f.business_id, validation("Massagem", Some("Ana Souza"), Some(time(10, 0))))
        .await
        .unwrap();

    assert!(!result.valid);
    assert!(!result.service_valid);
    assert!(result.professional_valid);
    assert!(!result.availability_valid);
    assert_eq!(result.checks.availability, CheckOutcome::NotChecked);
    assert_eq!(result.service_suggestions, vec!["Corte", "Escova", "Manicure"]);
    assert!(result.message.contains("Service 'Massagem' was not found"));
    // Alternatives are still offered using the booking interval as duration.
    assert_eq!(result.available_slots.len(), 20);
}

#[tokio::test]
async fn test_validate_without_professional_does_not_claim_availability() {
    let f = fixture().await;

    let result = f
        .state
        .validator
        .validate(f.business_id, validation("Corte", None, Some(time(10, 0))))
        .await
        .unwrap();

    assert!(!result.valid);
    assert!(result.service_valid);
    assert_eq!(result.checks.professional, CheckOutcome::NotChecked);
    assert_eq!(result.checks.availability, CheckOutcome::NotChecked);
    assert!(!result.availability_valid);
}

#[tokio::test]
async fn test_validate_conflict_lists_alternatives() {
    let f = fixture().await;
    f.state
        .booking
        .create_appointment(f.business_id, request("Corte", "Ana Souza", time(10, 0)))
        .await
        .unwrap();

    let result = f
        .state
        .validator
        .validate(f.business_id, validation("Corte", Some("Ana Souza"), Some(time(10, 0))))
        .await
        .unwrap();

    assert!(!result.valid);
    assert_eq!(result.checks.availability, CheckOutcome::Invalid);
    assert!(!result.available_slots.contains(&"10:00".to_string()));
    assert!(result.message.contains("Available times: 09:00, 09:30, 10:30"));
}

#[tokio::test]
async fn test_validate_unknown_professional_suggests_team() {
    let f = fixture().await;

    let result = f
        .state
        .validator
        .validate(f.business_id, validation("Corte", Some("Carlos"), Some(time(10, 0))))
        .await
        .unwrap();

    assert_eq!(result.checks.professional, CheckOutcome::Invalid);
    assert_eq!(result.professional_suggestions, vec!["Ana Souza", "João Pedro"]);
    assert!(result.available_slots.is_empty());
}

#[tokio::test]
async fn test_validate_blank_service_reports_missing_field() {
    let f = fixture().await;

    let result = f
        .state
        .validator
        .validate(f.business_id, validation("  ", Some("Ana Souza"), Some(time(10, 0))))
        .await
        .unwrap();

    assert!(!result.valid);
    assert_eq!(result.checks.service, CheckOutcome::Invalid);
    assert!(result.message.contains("Missing required field: service"));
    assert!(!result.message.contains("was not found"));
    assert_eq!(result.service_suggestions, vec!["Corte", "Escova", "Manicure"]);
}

#[tokio::test]
async fn test_last_calendar_day_is_rejected_as_invalid_input() {
    let f = fixture().await;

    let mut far_future = request("Corte", "Ana Souza", time(10, 0));
    far_future.date = Some(NaiveDate::MAX);
    let err = f.state.booking.create_appointment(f.business_id, far_future).await.unwrap_err();
    assert_matches!(err, BookingError::InvalidInput(_));

    let mut late = request("Corte", "Ana Souza", time(23, 45));
    late.date = Some(NaiveDate::MAX);
    let err = f.state.booking.create_appointment(f.business_id, late).await.unwrap_err();
    assert_matches!(err, BookingError::InvalidInput(_));

    let mut far_future_check = validation("Corte", Some("Ana Souza"), Some(time(10, 0)));
    far_future_check.date = Some(NaiveDate::MAX);
    let err = f.state.validator.validate(f.business_id, far_future_check).await.unwrap_err();
    assert_matches!(err, BookingError::InvalidInput(_));

    assert!(f.store.appointments().await.is_empty());
}
