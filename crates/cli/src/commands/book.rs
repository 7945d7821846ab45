use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::commands::quote::TripArgs;
use crate::commands::{current_rates, execute, open_database, CommandFailure, CommandResult};
use cartage_core::config::{AppConfig, LoadOptions};
use cartage_core::domain::booking::{Booking, BookingId, CustomerId};
use cartage_core::domain::trip::TripRequest;
use cartage_core::pricing::{quote, PriceQuote};
use cartage_db::repositories::{BookingStore, SqlBookingRepository};

#[derive(Debug, Serialize)]
struct BookingCreated {
    booking: Booking,
    quote: PriceQuote,
}

/// Prices a trip and stores it as an open booking with the price frozen.
pub fn run(options: &LoadOptions, customer_id: &str, trip: &TripArgs) -> CommandResult {
    let customer_id = CustomerId(customer_id.to_string());
    let request = trip.to_request();
    execute("book", options, |config| book(config, customer_id, request))
}

async fn book(
    config: AppConfig,
    customer_id: CustomerId,
    request: TripRequest,
) -> Result<BookingCreated, CommandFailure> {
    if customer_id.0.trim().is_empty() {
        return Err(CommandFailure::invalid_argument("--customer must not be blank"));
    }

    let pool = open_database(&config).await?;
    let rates = current_rates(&pool).await?;
    let quote = quote(&request, &rates, &config.pricing.currency)?;

    let booking = Booking::new(
        BookingId(format!("booking-{}", Uuid::new_v4())),
        customer_id,
        quote.trip.vehicle_type,
        quote.breakdown.clone(),
        quote.trip.pickup_at,
        Utc::now(),
    );
    SqlBookingRepository::new(pool.clone()).insert(&booking).await?;
    pool.close().await;

    tracing::info!(
        event_name = "cli.booking.created",
        booking_id = %booking.id,
        vehicle_type = %booking.vehicle_type,
        total = %booking.price_breakdown.total_price,
        "booking created"
    );
    Ok(BookingCreated { booking, quote })
}
