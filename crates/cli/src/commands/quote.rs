use chrono::{DateTime, Utc};
use clap::Args;
use rust_decimal::Decimal;

use crate::commands::{current_rates, execute, open_database, CommandFailure, CommandResult};
use cartage_core::config::{AppConfig, LoadOptions};
use cartage_core::domain::trip::TripRequest;
use cartage_core::pricing::{quote, PriceQuote};

/// Trip details as a customer would enter them. Values are checked by the estimator,
/// not by the argument parser, so a bad vehicle or negative helper count is reported
/// as an `invalid_input` rejection.
#[derive(Debug, Clone, Args)]
pub struct TripArgs {
    #[arg(long, help = "motorcycle | sedan | pickup | van | truck")]
    pub vehicle_type: String,
    #[arg(long, default_value = "general", help = "documents | general | furniture | ...")]
    pub load_type: String,
    #[arg(long, allow_negative_numbers = true)]
    pub distance_km: Decimal,
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub duration_minutes: Decimal,
    #[arg(long, help = "Pickup instant, RFC 3339 (e.g. 2026-03-04T08:30:00+08:00)")]
    pub pickup_at: DateTime<Utc>,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub helpers: i64,
}

impl TripArgs {
    pub fn to_request(&self) -> TripRequest {
        TripRequest {
            vehicle_type: self.vehicle_type.clone(),
            load_type: self.load_type.clone(),
            distance_km: self.distance_km,
            duration_minutes: self.duration_minutes,
            pickup_at: self.pickup_at,
            helpers_count: self.helpers,
        }
    }
}

pub fn run(options: &LoadOptions, trip: &TripArgs) -> CommandResult {
    let request = trip.to_request();
    execute("quote", options, |config| quote_trip(config, request))
}

async fn quote_trip(config: AppConfig, request: TripRequest) -> Result<PriceQuote, CommandFailure> {
    let pool = open_database(&config).await?;
    let rates = current_rates(&pool).await?;
    pool.close().await;

    Ok(quote(&request, &rates, &config.pricing.currency)?)
}
