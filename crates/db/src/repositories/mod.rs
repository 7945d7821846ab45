use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use cartage_core::domain::booking::{Booking, DriverId};
use cartage_core::domain::driver::Driver;
use cartage_core::domain::vehicle::VehicleType;
use cartage_core::earnings::EarningsWindow;
use cartage_core::errors::ApplicationError;
use cartage_core::pricing::{RateTable, RateTableSnapshot};
use cartage_core::ports::BookingRepository;

pub mod booking;
pub mod driver;
pub mod memory;
pub mod rate_table;

pub use booking::SqlBookingRepository;
pub use driver::SqlDriverRepository;
pub use memory::{InMemoryBookingRepository, InMemoryDriverRepository};
pub use rate_table::SqlRateTableRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("record `{0}` already exists")]
    Duplicate(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

/// Booking queries beyond the lifecycle's get/compare-and-set.
#[async_trait]
pub trait BookingStore: BookingRepository {
    /// Stores a newly confirmed booking. Existing ids are rejected.
    async fn insert(&self, booking: &Booking) -> Result<(), RepositoryError>;

    /// The job feed: unassigned open bookings for one vehicle type, oldest pickup first.
    async fn list_open(&self, vehicle_type: VehicleType) -> Result<Vec<Booking>, RepositoryError>;

    /// Bookings assigned to `driver_id` that completed inside `window`.
    async fn list_for_driver(
        &self,
        driver_id: &DriverId,
        window: &EarningsWindow,
    ) -> Result<Vec<Booking>, RepositoryError>;
}

#[async_trait]
pub trait DriverStore: Send + Sync {
    async fn find_by_id(&self, id: &DriverId) -> Result<Option<Driver>, RepositoryError>;
    async fn save(&self, driver: &Driver) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<Driver>, RepositoryError>;
}

#[async_trait]
pub trait RateTableStore: Send + Sync {
    async fn load(&self) -> Result<Option<RateTableSnapshot>, RepositoryError>;

    /// Persists `table` as the next version.
    async fn save(&self, table: &RateTable) -> Result<RateTableSnapshot, RepositoryError>;

    async fn reset(&self) -> Result<RateTableSnapshot, RepositoryError>;
}

/// Fixed-width RFC 3339 so stored timestamps compare correctly as text.
pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.map(|timestamp| parse_timestamp(column, timestamp)).transpose()
}

pub(crate) fn parse_u64(column: &str, value: i64) -> Result<u64, RepositoryError> {
    u64::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative integer): {value}"
        ))
    })
}

pub(crate) fn to_i64(column: &str, value: u64) -> Result<i64, RepositoryError> {
    i64::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("`{column}` does not fit in i64: {value}")))
}
