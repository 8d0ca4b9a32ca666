// libs/agent-cell/src/services/normalize.rs
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use regex::Regex;

use appointment_cell::models::hhmm;
use appointment_cell::services::resolver::fold_name;

/// Turns the dates and times people type in chat into calendar values.
///
/// Dates: `2025-03-10`, `10/03/2025`, `10/03`, `today`/`hoje`,
/// `tomorrow`/`amanhã`, `day after tomorrow`/`depois de amanhã`.
/// Times: `14:30`, `14:30:00`, `14`, `14h`, `14h30`, `2pm`, `2:30 pm`.
pub struct InputNormalizer {
    day_month: Option<Regex>,
    hour_mark: Option<Regex>,
    meridiem: Option<Regex>,
}

impl Default for InputNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl InputNormalizer {
    pub fn new() -> Self {
        Self {
            day_month: Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{4}))?$").ok(),
            hour_mark: Regex::new(r"^(\d{1,2})\s*h\s*(\d{2})?$").ok(),
            meridiem: Regex::new(r"^(\d{1,2})(?::(\d{2}))?\s*(am|pm)$").ok(),
        }
    }

    /// `today` anchors relative words. A day/month without a year that has
    /// already passed this year means next year.
    pub fn parse_date(&self, raw: &str, today: NaiveDate) -> Option<NaiveDate> {
        let folded = fold_name(raw);

        match folded.as_str() {
            "today" | "hoje" => return Some(today),
            "tomorrow" | "amanha" => return Some(today + Duration::days(1)),
            "day after tomorrow" | "depois de amanha" => return Some(today + Duration::days(2)),
            _ => {}
        }

        if let Ok(date) = NaiveDate::parse_from_str(&folded, "%Y-%m-%d") {
            return Some(date);
        }

        let captures = self.day_month.as_ref()?.captures(&folded)?;
        let day: u32 = captures.get(1)?.as_str().parse().ok()?;
        let month: u32 = captures.get(2)?.as_str().parse().ok()?;

        match captures.get(3) {
            Some(year) => NaiveDate::from_ymd_opt(year.as_str().parse().ok()?, month, day),
            None => {
                let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
                if this_year < today {
                    NaiveDate::from_ymd_opt(today.year() + 1, month, day)
                } else {
                    Some(this_year)
                }
            }
        }
    }

    pub fn parse_time(&self, raw: &str) -> Option<NaiveTime> {
        let folded = fold_name(raw).replace('.', "");

        if let Some(time) = hhmm::parse(&folded) {
            return Some(time);
        }

        if folded.len() <= 2 && folded.chars().all(|c| c.is_ascii_digit()) {
            return NaiveTime::from_hms_opt(folded.parse().ok()?, 0, 0);
        }

        if let Some(captures) = self.hour_mark.as_ref().and_then(|re| re.captures(&folded)) {
            let hour: u32 = captures.get(1)?.as_str().parse().ok()?;
            let minute: u32 = captures.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
            return NaiveTime::from_hms_opt(hour, minute, 0);
        }

        let captures = self.meridiem.as_ref()?.captures(&folded)?;
        let hour: u32 = captures.get(1)?.as_str().parse().ok()?;
        let minute: u32 = captures.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        if !(1..=12).contains(&hour) {
            return None;
        }

        let hour = match (captures.get(3)?.as_str(), hour) {
            ("am", 12) => 0,
            ("am", h) => h,
            ("pm", 12) => 12,
            (_, h) => h + 12,
        };
        NaiveTime::from_hms_opt(hour, minute, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn time(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    #[test]
    fn test_relative_dates_in_both_languages() {
        let normalizer = InputNormalizer::new();

        assert_eq!(normalizer.parse_date("Hoje", today()), date(2025, 3, 10));
        assert_eq!(normalizer.parse_date("amanhã", today()), date(2025, 3, 11));
        assert_eq!(normalizer.parse_date("tomorrow", today()), date(2025, 3, 11));
        assert_eq!(normalizer.parse_date("depois de amanhã", today()), date(2025, 3, 12));
        assert_eq!(normalizer.parse_date("day after tomorrow", today()), date(2025, 3, 12));
    }

    #[test]
    fn test_numeric_dates() {
        let normalizer = InputNormalizer::new();

        assert_eq!(normalizer.parse_date("2025-04-01", today()), date(2025, 4, 1));
        assert_eq!(normalizer.parse_date("01/04/2025", today()), date(2025, 4, 1));
        assert_eq!(normalizer.parse_date("15/03", today()), date(2025, 3, 15));
        // Already past this year.
        assert_eq!(normalizer.parse_date("01/02", today()), date(2026, 2, 1));
        assert_eq!(normalizer.parse_date("31/02/2025", today()), None);
        assert_eq!(normalizer.parse_date("next week", today()), None);
    }

    #[test]
    fn test_time_formats() {
        let normalizer = InputNormalizer::new();

        assert_eq!(normalizer.parse_time("14:30"), time(14, 30));
        assert_eq!(normalizer.parse_time("09:00:00"), time(9, 0));
        assert_eq!(normalizer.parse_time("14"), time(14, 0));
        assert_eq!(normalizer.parse_time("14h"), time(14, 0));
        assert_eq!(normalizer.parse_time("14h30"), time(14, 30));
        assert_eq!(normalizer.parse_time("2pm"), time(14, 0));
        assert_eq!(normalizer.parse_time("2:30 PM"), time(14, 30));
        assert_eq!(normalizer.parse_time("12 am"), time(0, 0));
        assert_eq!(normalizer.parse_time("12 p.m."), time(12, 0));
        assert_eq!(normalizer.parse_time("13pm"), None);
        assert_eq!(normalizer.parse_time("25h"), None);
        assert_eq!(normalizer.parse_time("soon"), None);
    }
}
