// libs/appointment-cell/src/services/calendar.rs
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

use shared_config::AppConfig;

use crate::models::{hhmm, Appointment, BusinessHours, DayLimits, DaySummary, TimeRange};

/// Window used for weekdays the business never configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultBusinessHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for DefaultBusinessHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(19, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl DefaultBusinessHours {
    pub fn from_config(config: &AppConfig) -> Self {
        let fallback = Self::default();
        let open = hhmm::parse(&config.default_open_time);
        let close = hhmm::parse(&config.default_close_time);

        match (open, close) {
            (Some(open), Some(close)) if open < close => Self { open, close },
            _ => {
                warn!(
                    "Invalid default business hours {}-{}, using 09:00-19:00",
                    config.default_open_time, config.default_close_time
                );
                fallback
            }
        }
    }
}

/// 0 = Sunday .. 6 = Saturday, matching the `business_hours.day_of_week` column.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Day-indexed working hours of one business.
#[derive(Debug, Clone)]
pub struct BusinessCalendar {
    hours: [Option<BusinessHours>; 7],
    defaults: DefaultBusinessHours,
}

impl BusinessCalendar {
    pub fn new(rows: Vec<BusinessHours>, defaults: DefaultBusinessHours) -> Self {
        let mut hours: [Option<BusinessHours>; 7] = Default::default();
        for row in rows {
            match hours.get_mut(row.day_of_week as usize) {
                Some(slot) => *slot = Some(row),
                None => warn!("Ignoring business hours with day_of_week {}", row.day_of_week),
            }
        }
        Self { hours, defaults }
    }

    fn hours_for(&self, date: NaiveDate) -> Option<&BusinessHours> {
        self.hours[weekday_index(date) as usize].as_ref()
    }

    /// Unconfigured weekdays count as open with the default window.
    pub fn is_open(&self, date: NaiveDate) -> bool {
        self.hours_for(date).map(|row| row.is_open).unwrap_or(true)
    }

    pub fn day_limits(&self, date: NaiveDate) -> DayLimits {
        let (open, close) = match self.hours_for(date) {
            Some(row) => (row.open_time, row.close_time),
            None => (self.defaults.open, self.defaults.close),
        };

        DayLimits {
            open: date.and_time(open),
            close: date.and_time(close),
        }
    }

    pub fn week_overview(&self, start: NaiveDate) -> Vec<DaySummary> {
        (0..7)
            .filter_map(|offset| start.checked_add_signed(Duration::days(offset)))
            .map(|date| {
                let limits = self.day_limits(date);
                DaySummary {
                    date,
                    weekday: date.format("%A").to_string(),
                    is_open: self.is_open(date),
                    open: limits.open.time(),
                    close: limits.close.time(),
                }
            })
            .collect()
    }
}

/// Wall-clock conversions for the single timezone the business operates in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusinessClock {
    tz: Tz,
}

impl BusinessClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        match config.business_timezone.parse::<Tz>() {
            Ok(tz) => Self::new(tz),
            Err(_) => {
                warn!("Unknown BUSINESS_TIMEZONE '{}', using UTC", config.business_timezone);
                Self::new(Tz::UTC)
            }
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn now_local(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.tz).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.now_local().date()
    }

    /// `None` for wall-clock times skipped by a DST jump.
    pub fn to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.tz
            .from_local_datetime(&local)
            .earliest()
            .map(|instant| instant.with_timezone(&Utc))
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.tz).naive_local()
    }

    /// UTC bounds of the local calendar day `[00:00, next 00:00)`. `None` at
    /// the edge of the representable calendar.
    pub fn day_window(&self, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let next = date.succ_opt()?;
        let start = self.to_utc(date.and_time(NaiveTime::MIN))?;
        let end = self.to_utc(next.and_time(NaiveTime::MIN))?;
        Some((start, end))
    }

    pub fn local_range(&self, appointment: &Appointment) -> TimeRange {
        TimeRange::new(
            self.to_local(appointment.start_time),
            self.to_local(appointment.end_time),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn time(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    fn hours(day: u8, open: NaiveTime, close: NaiveTime, is_open: bool) -> BusinessHours {
        BusinessHours {
            business_id: Uuid::nil(),
            day_of_week: day,
            is_open,
            open_time: open,
            close_time: close,
        }
    }

    // 2025-03-09 is a Sunday.
    fn sunday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    #[test]
    fn test_configured_day_uses_its_window() {
        let calendar = BusinessCalendar::new(
            vec![hours(1, time(8, 0), time(12, 0), true)],
            DefaultBusinessHours::default(),
        );
        let monday = sunday() + Duration::days(1);

        let limits = calendar.day_limits(monday);
        assert_eq!(limits.open, monday.and_time(time(8, 0)));
        assert_eq!(limits.close, monday.and_time(time(12, 0)));
        assert!(calendar.is_open(monday));
    }

    #[test]
    fn test_unconfigured_day_falls_back_to_defaults() {
        let calendar = BusinessCalendar::new(vec![], DefaultBusinessHours::default());
        let limits = calendar.day_limits(sunday());

        assert_eq!(limits.open.time(), time(9, 0));
        assert_eq!(limits.close.time(), time(19, 0));
        assert!(calendar.is_open(sunday()));
    }

    #[test]
    fn test_closed_day_still_reports_limits() {
        let calendar = BusinessCalendar::new(
            vec![hours(0, time(10, 0), time(14, 0), false)],
            DefaultBusinessHours::default(),
        );

        assert!(!calendar.is_open(sunday()));
        assert_eq!(calendar.day_limits(sunday()).open.time(), time(10, 0));
    }

    #[test]
    fn test_week_overview_marks_closed_days() {
        let calendar = BusinessCalendar::new(
            vec![hours(0, time(9, 0), time(13, 0), false)],
            DefaultBusinessHours::default(),
        );
        let week = calendar.week_overview(sunday());

        assert_eq!(week.len(), 7);
        assert_eq!(week[0].weekday, "Sunday");
        assert!(!week[0].is_open);
        assert!(week[1..].iter().all(|day| day.is_open));
    }

    #[test]
    fn test_clock_round_trips_local_time() {
        let clock = BusinessClock::new(chrono_tz::America::Sao_Paulo);
        let local = sunday().and_time(time(10, 0));
        let instant = clock.to_utc(local).unwrap();

        // Sao Paulo has been UTC-3 year-round since 2019.
        assert_eq!(instant, Utc.with_ymd_and_hms(2025, 3, 9, 13, 0, 0).unwrap());
        assert_eq!(clock.to_local(instant), local);

        let (start, end) = clock.day_window(sunday()).unwrap();
        assert_eq!(end - start, Duration::hours(24));
    }

    #[test]
    fn test_last_representable_day_has_no_window() {
        let clock = BusinessClock::new(chrono_tz::America::Sao_Paulo);
        assert!(clock.day_window(NaiveDate::MAX).is_none());

        let calendar = BusinessCalendar::new(vec![], DefaultBusinessHours::default());
        let week = calendar.week_overview(NaiveDate::MAX);
        assert_eq!(week.len(), 1);
        assert_eq!(week[0].date, NaiveDate::MAX);
    }

    #[test]
    fn test_invalid_default_hours_fall_back() {
        let mut config = shared_utils::test_utils::TestConfig::default().to_app_config();
        config.default_open_time = "20:00".to_string();
        config.default_close_time = "08:00".to_string();
        assert_eq!(DefaultBusinessHours::from_config(&config), DefaultBusinessHours::default());
    }
}
