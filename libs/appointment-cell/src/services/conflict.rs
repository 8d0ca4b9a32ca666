// libs/appointment-cell/src/services/conflict.rs
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Appointment, TimeRange};

/// Half-open interval overlap: `[a_start, a_end)` and `[b_start, b_end)`
/// conflict iff `a_start < b_end && a_end > b_start`. Back-to-back intervals
/// do not conflict.
///
/// Every overlap check in the engine goes through this predicate.
pub fn overlaps<T: PartialOrd>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool {
    a_start < b_end && a_end > b_start
}

/// Active appointments among `existing` that overlap `[start, end)`.
pub fn conflicting_appointments<'a>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    existing: &'a [Appointment],
    exclude_appointment_id: Option<Uuid>,
) -> Vec<&'a Appointment> {
    existing
        .iter()
        .filter(|appointment| appointment.is_active())
        .filter(|appointment| Some(appointment.id) != exclude_appointment_id)
        .filter(|appointment| overlaps(start, end, appointment.start_time, appointment.end_time))
        .collect()
}

/// True when `candidate` overlaps any busy interval.
pub fn has_conflict(candidate: &TimeRange, busy: &[TimeRange]) -> bool {
    busy.iter().any(|range| candidate.overlaps(range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone};
    use crate::models::AppointmentStatus;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn appointment(start_hour: u32, minutes: i64, status: AppointmentStatus) -> Appointment {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, start_hour, 0, 0).unwrap();
        Appointment {
            id: Uuid::new_v4(),
            business_id: Uuid::nil(),
            professional_id: Uuid::nil(),
            service_id: Uuid::nil(),
            client_id: Uuid::nil(),
            start_time: start,
            end_time: start + Duration::minutes(minutes),
            status,
            notes: None,
            created_at: start,
        }
    }

    #[test]
    fn test_back_to_back_does_not_conflict() {
        assert!(!overlaps(at(9, 0), at(9, 30), at(9, 30), at(10, 0)));
        assert!(!overlaps(at(9, 30), at(10, 0), at(9, 0), at(9, 30)));
    }

    #[test]
    fn test_overlap_is_symmetric_and_reflexive() {
        let pairs = [
            ((at(9, 0), at(10, 0)), (at(9, 30), at(10, 30))),
            ((at(9, 0), at(12, 0)), (at(10, 0), at(10, 15))),
            ((at(9, 0), at(9, 15)), (at(14, 0), at(15, 0))),
            ((at(9, 0), at(9, 30)), (at(9, 30), at(10, 0))),
        ];

        for ((a_start, a_end), (b_start, b_end)) in pairs {
            assert_eq!(
                overlaps(a_start, a_end, b_start, b_end),
                overlaps(b_start, b_end, a_start, a_end)
            );
            assert!(overlaps(a_start, a_end, a_start, a_end));
        }
    }

    #[test]
    fn test_containment_conflicts() {
        assert!(overlaps(at(10, 0), at(10, 15), at(9, 0), at(12, 0)));
        assert!(overlaps(at(9, 0), at(12, 0), at(10, 0), at(10, 15)));
    }

    #[test]
    fn test_cancelled_and_excluded_appointments_are_ignored() {
        let active = appointment(10, 30, AppointmentStatus::Scheduled);
        let cancelled = appointment(10, 30, AppointmentStatus::Cancelled);
        let existing = vec![active.clone(), cancelled];

        let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 15, 0).unwrap();
        let end = start + Duration::minutes(30);

        let found = conflicting_appointments(start, end, &existing, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, active.id);

        assert!(conflicting_appointments(start, end, &existing, Some(active.id)).is_empty());
    }

    #[test]
    fn test_has_conflict_against_busy_list() {
        let busy = vec![TimeRange::new(at(10, 0), at(10, 30))];
        assert!(has_conflict(&TimeRange::new(at(9, 45), at(10, 15)), &busy));
        assert!(!has_conflict(&TimeRange::new(at(10, 30), at(11, 0)), &busy));
    }
}
