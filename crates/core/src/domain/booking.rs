use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::vehicle::VehicleType;
use crate::errors::DomainError;
use crate::pricing::PriceBreakdown;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookingId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriverId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

/// Whoever invokes a lifecycle operation: a driver, the customer, or an operator.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&DriverId> for ActorId {
    fn from(value: &DriverId) -> Self {
        Self(value.0.clone())
    }
}

impl From<&CustomerId> for ActorId {
    fn from(value: &CustomerId) -> Self {
        Self(value.0.clone())
    }
}

/// Booking status. Declaration order is the happy-path order, so `Ord` follows progression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Accepted,
    DriverEnRoute,
    ArrivedPickup,
    Loading,
    InTransit,
    ArrivedDestination,
    Unloading,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Job statuses a claimed booking walks through, in order.
    pub const JOB_PATH: [BookingStatus; 8] = [
        Self::Accepted,
        Self::DriverEnRoute,
        Self::ArrivedPickup,
        Self::Loading,
        Self::InTransit,
        Self::ArrivedDestination,
        Self::Unloading,
        Self::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Accepted => "accepted",
            Self::DriverEnRoute => "driver_en_route",
            Self::ArrivedPickup => "arrived_pickup",
            Self::Loading => "loading",
            Self::InTransit => "in_transit",
            Self::ArrivedDestination => "arrived_destination",
            Self::Unloading => "unloading",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "accepted" => Some(Self::Accepted),
            "driver_en_route" => Some(Self::DriverEnRoute),
            "arrived_pickup" => Some(Self::ArrivedPickup),
            "loading" => Some(Self::Loading),
            "in_transit" => Some(Self::InTransit),
            "arrived_destination" => Some(Self::ArrivedDestination),
            "unloading" => Some(Self::Unloading),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Statuses from which a driver may still claim the booking.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// The single status `advance` may move to next. Open and terminal statuses have none.
    pub fn successor(&self) -> Option<Self> {
        match self {
            Self::Accepted => Some(Self::DriverEnRoute),
            Self::DriverEnRoute => Some(Self::ArrivedPickup),
            Self::ArrivedPickup => Some(Self::Loading),
            Self::Loading => Some(Self::InTransit),
            Self::InTransit => Some(Self::ArrivedDestination),
            Self::ArrivedDestination => Some(Self::Unloading),
            Self::Unloading => Some(Self::Completed),
            Self::Pending | Self::Confirmed | Self::Completed | Self::Cancelled => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| {
            DomainError::invalid_input("status", format!("unknown booking status `{value}`"))
        })
    }
}

/// Driver share and platform fee for a completed booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsRecord {
    pub driver_share: Decimal,
    pub platform_fee: Decimal,
}

impl EarningsRecord {
    pub fn driver_share_rate() -> Decimal {
        Decimal::new(8, 1)
    }

    pub fn from_total(total_price: Decimal) -> Result<Self, DomainError> {
        if total_price.is_sign_negative() && !total_price.is_zero() {
            return Err(DomainError::invalid_input(
                "total_price",
                "a completed booking cannot carry a negative price",
            ));
        }

        let driver_share = (total_price * Self::driver_share_rate())
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        Ok(Self { driver_share, platform_fee: total_price - driver_share })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub customer_id: CustomerId,
    pub vehicle_type: VehicleType,
    pub status: BookingStatus,
    pub assigned_driver_id: Option<DriverId>,
    pub price_breakdown: PriceBreakdown,
    pub pickup_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub status_timestamps: BTreeMap<BookingStatus, DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub earnings: Option<EarningsRecord>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a writer last observed; a compare-and-set only lands if the stored record still matches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingGuard {
    pub status: BookingStatus,
    pub assigned_driver_id: Option<DriverId>,
    pub version: u64,
}

impl Booking {
    pub fn new(
        id: BookingId,
        customer_id: CustomerId,
        vehicle_type: VehicleType,
        price_breakdown: PriceBreakdown,
        pickup_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut status_timestamps = BTreeMap::new();
        status_timestamps.insert(BookingStatus::Pending, created_at);

        Self {
            id,
            customer_id,
            vehicle_type,
            status: BookingStatus::Pending,
            assigned_driver_id: None,
            price_breakdown,
            pickup_at,
            accepted_at: None,
            status_timestamps,
            cancellation_reason: None,
            earnings: None,
            version: 1,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn guard(&self) -> BookingGuard {
        BookingGuard {
            status: self.status,
            assigned_driver_id: self.assigned_driver_id.clone(),
            version: self.version,
        }
    }

    pub fn matches_guard(&self, guard: &BookingGuard) -> bool {
        self.status == guard.status
            && self.assigned_driver_id == guard.assigned_driver_id
            && self.version == guard.version
    }

    pub fn is_assigned_to(&self, actor: &ActorId) -> bool {
        self.assigned_driver_id.as_ref().is_some_and(|driver| driver.0 == actor.0)
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.status_timestamps.get(&BookingStatus::Completed).copied()
    }

    /// Earnings for a completed booking, derived from the frozen price when not yet attached.
    pub fn earnings_record(&self) -> Result<Option<EarningsRecord>, DomainError> {
        if self.status != BookingStatus::Completed {
            return Ok(None);
        }
        match &self.earnings {
            Some(record) => Ok(Some(record.clone())),
            None => EarningsRecord::from_total(self.price_breakdown.total_price).map(Some),
        }
    }
}
