use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::trip::{TripInput, TripRequest};
use crate::errors::DomainError;
use crate::pricing::estimator::{estimate, PriceBreakdown};
use crate::pricing::rates::{RateTable, SharedRateTable};

const DISPLAY_DECIMAL_PLACES: u32 = 2;

/// Breakdown amounts rounded to the currency's minor unit, for rendering only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayAmounts {
    pub base: Decimal,
    pub distance: Decimal,
    pub helpers: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
}

impl DisplayAmounts {
    fn from_breakdown(breakdown: &PriceBreakdown) -> Self {
        Self {
            base: round_for_display(breakdown.base_component),
            distance: round_for_display(breakdown.distance_component),
            helpers: round_for_display(breakdown.helper_charge),
            subtotal: round_for_display(breakdown.subtotal_before_floor),
            total: round_for_display(breakdown.total_price),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub trip: TripInput,
    pub breakdown: PriceBreakdown,
    /// Version of the installed rate table; `None` for an admin preview against a candidate table.
    pub rate_table_version: Option<u64>,
    pub currency: String,
    pub minimum_charge_applied: bool,
    pub display: DisplayAmounts,
}

pub fn round_for_display(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(DISPLAY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Customer quote against the currently installed rate table.
pub fn quote(
    request: &TripRequest,
    rates: &SharedRateTable,
    currency: &str,
) -> Result<PriceQuote, DomainError> {
    let snapshot = rates.current();
    let result = build_quote(request, &snapshot.table, Some(snapshot.version), currency);

    match &result {
        Ok(quote) => tracing::debug!(
            event_name = "pricing.quote.estimated",
            rate_table_version = snapshot.version,
            vehicle_type = %quote.trip.vehicle_type,
            total = %quote.breakdown.total_price,
            "trip quoted"
        ),
        Err(error) => tracing::info!(
            event_name = "pricing.quote.rejected",
            rate_table_version = snapshot.version,
            error_kind = error.kind(),
            "trip could not be priced"
        ),
    }

    result
}

/// Operator preview of a candidate table, without installing it.
pub fn preview(
    request: &TripRequest,
    candidate: &RateTable,
    currency: &str,
) -> Result<PriceQuote, DomainError> {
    candidate.validate()?;
    build_quote(request, candidate, None, currency)
}

fn build_quote(
    request: &TripRequest,
    table: &RateTable,
    rate_table_version: Option<u64>,
    currency: &str,
) -> Result<PriceQuote, DomainError> {
    let trip = TripInput::from_request(request)?;
    let breakdown = estimate(&trip, table)?;

    Ok(PriceQuote {
        display: DisplayAmounts::from_breakdown(&breakdown),
        minimum_charge_applied: breakdown.minimum_charge_applied(),
        trip,
        breakdown,
        rate_table_version,
        currency: currency.to_owned(),
    })
}
