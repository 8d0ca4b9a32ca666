// libs/appointment-cell/src/services/slots.rs
use chrono::{Duration, NaiveTime};

use crate::models::{hhmm, DayLimits, SlotCell, TimeRange};
use crate::services::conflict::has_conflict;

/// Discretizes a business day into candidate start times `interval_minutes` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGenerator {
    interval_minutes: u32,
}

impl SlotGenerator {
    pub fn new(interval_minutes: u32) -> Self {
        Self {
            interval_minutes: interval_minutes.max(1),
        }
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    fn step(&self) -> Duration {
        Duration::minutes(self.interval_minutes as i64)
    }

    /// Start times whose `[s, s + duration)` fits before close and is free.
    pub fn generate(&self, limits: &DayLimits, duration_minutes: i64, busy: &[TimeRange]) -> Vec<NaiveTime> {
        if duration_minutes <= 0 {
            return Vec::new();
        }

        let mut slots = Vec::new();
        let mut start = limits.open;

        while start < limits.close {
            let Some(candidate) = TimeRange::starting_at(start, duration_minutes) else {
                break;
            };
            if candidate.end <= limits.close && !has_conflict(&candidate, busy) {
                slots.push(start.time());
            }
            match start.checked_add_signed(self.step()) {
                Some(next) => start = next,
                None => break,
            }
        }

        slots
    }

    /// One cell per step between open and close; a cell is available when
    /// nothing busy overlaps it.
    pub fn cell_grid(&self, limits: &DayLimits, busy: &[TimeRange]) -> Vec<SlotCell> {
        let mut cells = Vec::new();
        let mut start = limits.open;

        while start < limits.close {
            let end = start
                .checked_add_signed(self.step())
                .map_or(limits.close, |next| next.min(limits.close));
            cells.push(SlotCell {
                start: start.time(),
                available: !has_conflict(&TimeRange::new(start, end), busy),
            });
            start = end;
        }

        cells
    }
}

/// Starting cells for which all `ceil(duration / cell_minutes)` consecutive
/// cells exist and are available, and the service still ends by close. The
/// last cell of the day is shorter when close is not on the cell grid.
pub fn cells_fitting_duration(
    cells: &[SlotCell],
    limits: &DayLimits,
    cell_minutes: u32,
    duration_minutes: i64,
) -> Vec<NaiveTime> {
    if duration_minutes <= 0 || cell_minutes == 0 {
        return Vec::new();
    }

    let cell_minutes = cell_minutes as i64;
    let needed = ((duration_minutes + cell_minutes - 1) / cell_minutes) as usize;
    let day = limits.open.date();

    cells
        .iter()
        .enumerate()
        .filter(|(index, first)| {
            let ends_by_close = day
                .and_time(first.start)
                .checked_add_signed(Duration::minutes(duration_minutes))
                .is_some_and(|end| end <= limits.close);
            if !ends_by_close {
                return false;
            }
            let Some(window) = cells.get(*index..*index + needed) else {
                return false;
            };
            window.iter().enumerate().all(|(offset, cell)| {
                cell.available
                    && cell.start.signed_duration_since(first.start) == Duration::minutes(offset as i64 * cell_minutes)
            })
        })
        .map(|(_, cell)| cell.start)
        .collect()
}

pub fn slot_labels(slots: &[NaiveTime]) -> Vec<String> {
    slots.iter().map(hhmm::format).collect()
}
