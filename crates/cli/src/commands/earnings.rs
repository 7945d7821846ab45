use chrono::{DateTime, FixedOffset, Utc};
use clap::{Args, ValueEnum};

use crate::commands::{execute, open_database, CommandFailure, CommandResult};
use cartage_core::config::{AppConfig, LoadOptions};
use cartage_core::domain::booking::DriverId;
use cartage_core::earnings::{aggregate, EarningsSummary, EarningsWindow};
use cartage_db::repositories::{BookingStore, SqlBookingRepository};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Period {
    #[default]
    Today,
    Week,
    Month,
}

#[derive(Debug, Clone, Args)]
pub struct EarningsArgs {
    #[arg(long)]
    pub driver: String,
    #[arg(long, value_enum, default_value_t = Period::Today, conflicts_with_all = ["from", "to"])]
    pub period: Period,
    #[arg(long, requires = "to", help = "Window start (inclusive), RFC 3339")]
    pub from: Option<DateTime<Utc>>,
    #[arg(long, requires = "from", help = "Window end (exclusive), RFC 3339")]
    pub to: Option<DateTime<Utc>>,
    #[arg(
        long,
        default_value_t = 480,
        allow_negative_numbers = true,
        help = "Local offset from UTC, in minutes, that defines day, week and month boundaries"
    )]
    pub utc_offset_minutes: i32,
}

pub fn run(options: &LoadOptions, args: &EarningsArgs) -> CommandResult {
    let driver_id = DriverId(args.driver.clone());
    let window = match resolve_window(args, Utc::now()) {
        Ok(window) => window,
        Err(failure) => return failure.into_result("earnings"),
    };
    execute("earnings", options, |config| summarize(config, driver_id, window))
}

async fn summarize(
    config: AppConfig,
    driver_id: DriverId,
    window: EarningsWindow,
) -> Result<EarningsSummary, CommandFailure> {
    let pool = open_database(&config).await?;
    let completed =
        SqlBookingRepository::new(pool.clone()).list_for_driver(&driver_id, &window).await?;
    pool.close().await;

    Ok(aggregate(&completed, &window)?)
}

fn resolve_window(
    args: &EarningsArgs,
    now: DateTime<Utc>,
) -> Result<EarningsWindow, CommandFailure> {
    if let (Some(from), Some(to)) = (args.from, args.to) {
        return Ok(EarningsWindow::new(from, to)?);
    }

    let offset = args
        .utc_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| {
            CommandFailure::invalid_argument(format!(
                "--utc-offset-minutes {} is outside +/-24h",
                args.utc_offset_minutes
            ))
        })?;

    let window = match args.period {
        Period::Today => EarningsWindow::today(now, offset),
        Period::Week => EarningsWindow::this_week(now, offset),
        Period::Month => EarningsWindow::this_month(now, offset),
    };
    Ok(window?)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::{resolve_window, EarningsArgs, Period};

    fn args(period: Period) -> EarningsArgs {
        EarningsArgs {
            driver: "driver-1".to_string(),
            period,
            from: None,
            to: None,
            utc_offset_minutes: 480,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).single().expect("timestamp")
    }

    #[test]
    fn week_starts_on_local_monday_midnight() {
        // Wednesday 2026-03-04 10:00 local (UTC+8).
        let window = resolve_window(&args(Period::Week), at(4, 2)).expect("window");
        assert_eq!(window.start, at(1, 16));
        assert_eq!(window.end, at(8, 16));
    }

    #[test]
    fn explicit_bounds_win_over_the_period() {
        let mut explicit = args(Period::Month);
        explicit.from = Some(at(2, 0));
        explicit.to = Some(at(3, 0));
        let window = resolve_window(&explicit, at(4, 2)).expect("window");
        assert_eq!((window.start, window.end), (at(2, 0), at(3, 0)));
    }

    #[test]
    fn inverted_bounds_and_bad_offsets_are_rejected() {
        let mut inverted = args(Period::Today);
        inverted.from = Some(at(3, 0));
        inverted.to = Some(at(2, 0));
        let failure = resolve_window(&inverted, at(4, 2)).expect_err("inverted");
        assert_eq!(failure.error_class, "invalid_input");

        let mut offset = args(Period::Today);
        offset.utc_offset_minutes = 24 * 60;
        let failure = resolve_window(&offset, at(4, 2)).expect_err("offset");
        assert_eq!(failure.error_class, "invalid_argument");
    }
}
