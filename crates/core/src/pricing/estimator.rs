use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::trip::TripInput;
use crate::errors::DomainError;
use crate::pricing::rates::RateTable;
use crate::pricing::windows::TimeWindow;

/// Itemized price for a trip. Amounts are unrounded; rounding belongs to presentation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub base_component: Decimal,
    pub distance_component: Decimal,
    pub load_multiplier_applied: Decimal,
    pub time_multiplier_applied: Decimal,
    #[serde(default)]
    pub applied_windows: Vec<TimeWindow>,
    pub helper_charge: Decimal,
    pub subtotal_before_floor: Decimal,
    pub total_price: Decimal,
}

impl PriceBreakdown {
    pub fn minimum_charge_applied(&self) -> bool {
        self.total_price > self.subtotal_before_floor
    }
}

pub trait PricingEngine: Send + Sync {
    fn estimate(&self, trip: &TripInput, rates: &RateTable) -> Result<PriceBreakdown, DomainError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RateTableEstimator;

impl PricingEngine for RateTableEstimator {
    fn estimate(&self, trip: &TripInput, rates: &RateTable) -> Result<PriceBreakdown, DomainError> {
        estimate(trip, rates)
    }
}

/// Prices a trip against a rate table.
///
/// `(base + per_km * km + per_minute * min) * load * time + helpers`, floored at
/// the table's minimum charge. When several time windows apply their
/// multipliers compound. A trip too large to price is rejected as invalid input
/// naming the field that overflowed.
pub fn estimate(trip: &TripInput, rates: &RateTable) -> Result<PriceBreakdown, DomainError> {
    trip.validate()?;
    rates.schedule.validate()?;

    let vehicle_rate = rates.vehicle_rate(trip.vehicle_type);
    let base_component = vehicle_rate.base;
    let distance_charge = priced(vehicle_rate.per_km.checked_mul(trip.distance_km), "distance_km")?;
    let duration_charge = priced(
        vehicle_rate.per_minute.checked_mul(trip.duration_minutes),
        "duration_minutes",
    )?;
    let distance_component =
        priced(distance_charge.checked_add(duration_charge), "duration_minutes")?;

    let load_multiplier_applied = rates.load_multiplier(trip.load_type);

    let applied_windows = rates.schedule.applicable_windows(trip.pickup_at);
    let time_multiplier_applied = applied_windows.iter().try_fold(Decimal::ONE, |acc, window| {
        priced(acc.checked_mul(rates.time_multiplier(*window)), "time_multipliers")
    })?;

    let helper_charge = priced(
        rates.helper_rate.checked_mul(Decimal::from(trip.helpers_count)),
        "helpers_count",
    )?;

    let subtotal_before_floor = priced(
        base_component
            .checked_add(distance_component)
            .and_then(|trip_charge| trip_charge.checked_mul(load_multiplier_applied))
            .and_then(|trip_charge| trip_charge.checked_mul(time_multiplier_applied)),
        "distance_km",
    )?;
    let subtotal_before_floor =
        priced(subtotal_before_floor.checked_add(helper_charge), "helpers_count")?;
    let total_price = subtotal_before_floor.max(rates.minimum_charge).max(Decimal::ZERO);

    Ok(PriceBreakdown {
        base_component,
        distance_component,
        load_multiplier_applied,
        time_multiplier_applied,
        applied_windows,
        helper_charge,
        subtotal_before_floor,
        total_price,
    })
}

fn priced(amount: Option<Decimal>, field: &str) -> Result<Decimal, DomainError> {
    amount.ok_or_else(|| DomainError::invalid_input(field, "value is too large to price"))
}
