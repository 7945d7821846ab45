use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Pricing-relevant period detected from a pickup timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    PeakHours,
    Weekend,
    Night,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 3] = [Self::PeakHours, Self::Weekend, Self::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PeakHours => "peak_hours",
            Self::Weekend => "weekend",
            Self::Night => "night",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open local time range `[start, end)`. A range whose end is before its start wraps midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl HourWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Option<Self> {
        Some(Self {
            start: NaiveTime::from_hms_opt(start_hour, 0, 0)?,
            end: NaiveTime::from_hms_opt(end_hour, 0, 0)?,
        })
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            self.start <= time && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindowSchedule {
    /// Offset of the operating region's local time from UTC.
    pub utc_offset_minutes: i32,
    pub peak_windows: Vec<HourWindow>,
    pub night_window: HourWindow,
}

const MAX_OFFSET_MINUTES: i32 = 18 * 60;

impl Default for TimeWindowSchedule {
    fn default() -> Self {
        let window = |start, end| {
            HourWindow::new(start, end)
                .unwrap_or(HourWindow { start: NaiveTime::MIN, end: NaiveTime::MIN })
        };
        Self {
            utc_offset_minutes: 8 * 60,
            peak_windows: vec![window(7, 9), window(17, 19)],
            night_window: window(22, 6),
        }
    }
}

impl TimeWindowSchedule {
    /// Falls back to UTC for an out-of-range offset; `validate` rejects such schedules.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| {
            tracing::warn!(
                event_name = "pricing.schedule.offset_invalid",
                utc_offset_minutes = self.utc_offset_minutes,
                "schedule offset out of range, evaluating windows in UTC"
            );
            Utc.fix()
        })
    }

    /// Every window the pickup instant falls into, each evaluated independently.
    pub fn applicable_windows(&self, pickup_at: DateTime<Utc>) -> Vec<TimeWindow> {
        let local = pickup_at.with_timezone(&self.offset());
        let time = local.time();
        let mut windows = Vec::new();

        if self.peak_windows.iter().any(|window| window.contains(time)) {
            windows.push(TimeWindow::PeakHours);
        }
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            windows.push(TimeWindow::Weekend);
        }
        if self.night_window.contains(time) {
            windows.push(TimeWindow::Night);
        }

        windows
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.utc_offset_minutes.unsigned_abs() > MAX_OFFSET_MINUTES.unsigned_abs() {
            return Err(DomainError::invalid_input(
                "schedule.utc_offset_minutes",
                format!("offset must be within +/-{MAX_OFFSET_MINUTES} minutes"),
            ));
        }
        Ok(())
    }
}
