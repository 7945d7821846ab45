//! Driver earnings over a time window.
//!
//! The aggregator is stateless: it consumes whatever bookings the caller's
//! query produced and sums the earnings of the completed ones. Cancelled and
//! in-flight bookings contribute nothing.

use std::collections::BTreeMap;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::booking::{Booking, BookingStatus};
use crate::errors::DomainError;

/// Half-open interval `[start, end)` matched against completion time.
///
/// `utc_offset_minutes` is the local calendar the window was cut from; daily
/// buckets use the same calendar. Explicit windows are UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl EarningsWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DomainError> {
        if start > end {
            return Err(DomainError::invalid_input(
                "window",
                format!("window start {start} is after its end {end}"),
            ));
        }
        Ok(Self { start, end, utc_offset_minutes: 0 })
    }

    /// The local calendar day containing `reference`.
    pub fn today(reference: DateTime<Utc>, offset: FixedOffset) -> Result<Self, DomainError> {
        let day = reference.with_timezone(&offset).date_naive();
        Self::local_days(day, day + Duration::days(1), offset)
    }

    /// Monday through Sunday of the local week containing `reference`.
    pub fn this_week(reference: DateTime<Utc>, offset: FixedOffset) -> Result<Self, DomainError> {
        let day = reference.with_timezone(&offset).date_naive();
        let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
        Self::local_days(monday, monday + Duration::days(7), offset)
    }

    pub fn this_month(reference: DateTime<Utc>, offset: FixedOffset) -> Result<Self, DomainError> {
        let day = reference.with_timezone(&offset).date_naive();
        let first = day.with_day(1).ok_or_else(|| month_error(day))?;
        let next = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        }
        .ok_or_else(|| month_error(day))?;
        Self::local_days(first, next, offset)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    /// Calendar date of `instant` in the window's local time.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset()).date_naive()
    }

    fn local_days(
        first: NaiveDate,
        end: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Self, DomainError> {
        let window = Self::new(local_midnight(first, offset)?, local_midnight(end, offset)?)?;
        Ok(Self { utc_offset_minutes: offset.local_minus_utc() / 60, ..window })
    }
}

fn local_midnight(day: NaiveDate, offset: FixedOffset) -> Result<DateTime<Utc>, DomainError> {
    offset
        .from_local_datetime(&day.and_time(NaiveTime::MIN))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| DomainError::invalid_input("window", format!("no local midnight for {day}")))
}

fn month_error(day: NaiveDate) -> DomainError {
    DomainError::invalid_input("window", format!("cannot resolve the month containing {day}"))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyEarnings {
    pub date: NaiveDate,
    pub earnings: Decimal,
    pub job_count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsSummary {
    pub window: EarningsWindow,
    pub total_earnings: Decimal,
    pub total_revenue: Decimal,
    pub platform_fees: Decimal,
    pub job_count: u64,
    pub average_per_job: Decimal,
    pub daily: Vec<DailyEarnings>,
}

pub fn aggregate<'a, I>(
    bookings: I,
    window: &EarningsWindow,
) -> Result<EarningsSummary, DomainError>
where
    I: IntoIterator<Item = &'a Booking>,
{
    let mut total_earnings = Decimal::ZERO;
    let mut total_revenue = Decimal::ZERO;
    let mut platform_fees = Decimal::ZERO;
    let mut job_count = 0_u64;
    let mut daily: BTreeMap<NaiveDate, DailyEarnings> = BTreeMap::new();

    for booking in bookings {
        if booking.status != BookingStatus::Completed {
            continue;
        }
        let completed_at = booking.completed_at().ok_or_else(|| {
            DomainError::invalid_input(
                "status_timestamps.completed",
                format!("completed booking {} has no completion time", booking.id),
            )
        })?;
        if !window.contains(completed_at) {
            continue;
        }
        let Some(record) = booking.earnings_record()? else {
            continue;
        };

        total_earnings += record.driver_share;
        platform_fees += record.platform_fee;
        total_revenue += booking.price_breakdown.total_price;
        job_count += 1;

        let date = window.local_date(completed_at);
        let bucket = daily.entry(date).or_insert_with(|| DailyEarnings {
            date,
            earnings: Decimal::ZERO,
            job_count: 0,
        });
        bucket.earnings += record.driver_share;
        bucket.job_count += 1;
    }

    let average_per_job = if job_count == 0 {
        Decimal::ZERO
    } else {
        (total_earnings / Decimal::from(job_count))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };

    tracing::debug!(
        event_name = "earnings.aggregated",
        job_count,
        total_earnings = %total_earnings,
        "aggregated driver earnings"
    );

    Ok(EarningsSummary {
        window: *window,
        total_earnings,
        total_revenue,
        platform_fees,
        job_count,
        average_per_job,
        daily: daily.into_values().collect(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{aggregate, EarningsWindow};
    use crate::domain::booking::{Booking, BookingStatus};
    use crate::errors::DomainError;
    use crate::lifecycle::testing::{booking_in, breakdown_totalling};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).single().expect("valid timestamp")
    }

    fn completed(id: &str, total: i64, completed_at: DateTime<Utc>) -> Booking {
        let mut booking = booking_in(id, BookingStatus::Completed, Some("driver-1"));
        booking.price_breakdown = breakdown_totalling(total);
        booking.status_timestamps.insert(BookingStatus::Completed, completed_at);
        booking
    }

    fn march() -> EarningsWindow {
        EarningsWindow::new(at(1, 0), at(31, 0)).expect("window")
    }

    #[test]
    fn completed_job_counts_and_cancelled_job_does_not() {
        let done = completed("BK-1", 1000, at(4, 10));
        let cancelled = booking_in("BK-2", BookingStatus::Cancelled, Some("driver-1"));

        let summary = aggregate([&done, &cancelled], &march()).expect("aggregate");

        assert_eq!(summary.total_earnings, Decimal::from(800));
        assert_eq!(summary.total_revenue, Decimal::from(1000));
        assert_eq!(summary.platform_fees, Decimal::from(200));
        assert_eq!(summary.job_count, 1);
        assert_eq!(summary.average_per_job, Decimal::from(800));
    }

    #[test]
    fn empty_input_yields_zeroes() {
        let summary = aggregate(std::iter::empty(), &march()).expect("aggregate");
        assert_eq!(summary.job_count, 0);
        assert_eq!(summary.total_earnings, Decimal::ZERO);
        assert_eq!(summary.average_per_job, Decimal::ZERO);
        assert!(summary.daily.is_empty());
    }

    #[test]
    fn in_flight_bookings_are_ignored() {
        let moving = booking_in("BK-1", BookingStatus::InTransit, Some("driver-1"));
        let summary = aggregate([&moving], &march()).expect("aggregate");
        assert_eq!(summary.job_count, 0);
    }

    #[test]
    fn completions_outside_the_window_are_skipped() {
        let early = completed("BK-1", 1000, at(1, 0) - Duration::seconds(1));
        let inside = completed("BK-2", 500, at(1, 0));
        let summary = aggregate([&early, &inside], &march()).expect("aggregate");
        assert_eq!(summary.job_count, 1);
        assert_eq!(summary.total_revenue, Decimal::from(500));
    }

    #[test]
    fn daily_buckets_follow_completion_date() {
        let bookings = [
            completed("BK-1", 1000, at(4, 9)),
            completed("BK-2", 500, at(4, 20)),
            completed("BK-3", 250, at(6, 12)),
        ];
        let summary = aggregate(bookings.iter(), &march()).expect("aggregate");

        assert_eq!(summary.daily.len(), 2);
        assert_eq!(summary.daily[0].date, NaiveDate::from_ymd_opt(2026, 3, 4).expect("date"));
        assert_eq!(summary.daily[0].earnings, Decimal::from(1200));
        assert_eq!(summary.daily[0].job_count, 2);
        assert_eq!(summary.daily[1].earnings, Decimal::from(200));
        assert_eq!(summary.average_per_job, Decimal::new(46667, 2));
    }

    #[test]
    fn aggregate_is_restartable_over_the_same_input() {
        let bookings = vec![completed("BK-1", 1000, at(4, 9))];
        let first = aggregate(&bookings, &march()).expect("first");
        let second = aggregate(&bookings, &march()).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn negative_total_is_invalid_input() {
        let broken = completed("BK-1", -10, at(4, 9));
        let error = aggregate([&broken], &march()).expect_err("negative price");
        assert!(matches!(error, DomainError::InvalidInput { .. }));
    }

    #[test]
    fn completed_booking_without_completion_time_is_invalid_input() {
        let mut broken = completed("BK-1", 1000, at(4, 9));
        broken.status_timestamps.remove(&BookingStatus::Completed);
        let error = aggregate([&broken], &march()).expect_err("missing timestamp");
        assert!(matches!(
            error,
            DomainError::InvalidInput { ref field, .. } if field == "status_timestamps.completed"
        ));
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert!(EarningsWindow::new(at(5, 0), at(4, 0)).is_err());
    }

    #[test]
    fn period_windows_use_local_calendar() {
        let offset = FixedOffset::east_opt(8 * 3600).expect("offset");
        // 2026-03-04 20:00 UTC is Thursday 04:00 in UTC+8.
        let reference = at(4, 20);

        let today = EarningsWindow::today(reference, offset).expect("today");
        assert_eq!(today.start, at(4, 16));
        assert_eq!(today.end, at(5, 16));

        let week = EarningsWindow::this_week(reference, offset).expect("week");
        assert_eq!(week.start, Utc.with_ymd_and_hms(2026, 3, 1, 16, 0, 0).single().expect("ts"));
        assert_eq!(week.end - week.start, Duration::days(7));

        let month = EarningsWindow::this_month(reference, offset).expect("month");
        assert_eq!(month.start, Utc.with_ymd_and_hms(2026, 2, 28, 16, 0, 0).single().expect("ts"));
        assert_eq!(month.end, at(31, 16));
        assert!(month.contains(reference));
    }

    #[test]
    fn local_day_window_reports_a_single_daily_bucket() {
        let offset = FixedOffset::east_opt(8 * 3600).expect("offset");
        // Local 2026-03-05 runs from 03-04 16:00 UTC to 03-05 16:00 UTC.
        let today = EarningsWindow::today(at(5, 2), offset).expect("today");
        let bookings = [completed("BK-1", 1000, at(4, 17)), completed("BK-2", 500, at(5, 9))];

        let summary = aggregate(bookings.iter(), &today).expect("aggregate");

        assert_eq!(summary.job_count, 2);
        assert_eq!(summary.daily.len(), 1);
        assert_eq!(summary.daily[0].date, NaiveDate::from_ymd_opt(2026, 3, 5).expect("date"));
        assert_eq!(summary.daily[0].earnings, Decimal::from(1200));
    }

    #[test]
    fn explicit_windows_bucket_by_utc_date() {
        let window = EarningsWindow::new(at(4, 0), at(6, 0)).expect("window");
        assert_eq!(window.utc_offset_minutes, 0);
        let summary =
            aggregate([&completed("BK-1", 1000, at(4, 23))], &window).expect("aggregate");
        assert_eq!(summary.daily[0].date, NaiveDate::from_ymd_opt(2026, 3, 4).expect("date"));
    }
}
