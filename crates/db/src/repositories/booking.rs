use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use cartage_core::domain::booking::{
    Booking, BookingGuard, BookingId, BookingStatus, CustomerId, DriverId, EarningsRecord,
};
use cartage_core::domain::vehicle::VehicleType;
use cartage_core::earnings::EarningsWindow;
use cartage_core::errors::ApplicationError;
use cartage_core::ports::BookingRepository;
use cartage_core::pricing::PriceBreakdown;

use super::{
    format_timestamp, parse_optional_timestamp, parse_timestamp, parse_u64, to_i64, BookingStore,
    RepositoryError,
};
use crate::DbPool;

const BOOKING_COLUMNS: &str = "id,
    customer_id,
    vehicle_type,
    status,
    assigned_driver_id,
    price_breakdown_json,
    pickup_at,
    accepted_at,
    status_timestamps_json,
    cancellation_reason,
    earnings_json,
    version,
    created_at,
    updated_at";

pub struct SqlBookingRepository {
    pool: DbPool,
}

impl SqlBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {BOOKING_COLUMNS} FROM booking WHERE id = ?"))
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(booking_from_row).transpose()
    }

    /// One conditional UPDATE. SQLite serializes writers, so exactly one of any
    /// set of racing updates against the same guard can match.
    async fn swap(
        &self,
        id: &BookingId,
        expected: &BookingGuard,
        update: &Booking,
    ) -> Result<bool, RepositoryError> {
        let row = BookingRow::encode(update)?;
        let result = sqlx::query(
            "UPDATE booking SET
                status = ?,
                assigned_driver_id = ?,
                price_breakdown_json = ?,
                total_price = ?,
                accepted_at = ?,
                completed_at = ?,
                status_timestamps_json = ?,
                cancellation_reason = ?,
                earnings_json = ?,
                version = ?,
                updated_at = ?
             WHERE id = ?
               AND status = ?
               AND version = ?
               AND assigned_driver_id IS ?",
        )
        .bind(update.status.as_str())
        .bind(update.assigned_driver_id.as_ref().map(|driver| driver.0.as_str()))
        .bind(&row.price_breakdown_json)
        .bind(&row.total_price)
        .bind(update.accepted_at.map(format_timestamp))
        .bind(update.completed_at().map(format_timestamp))
        .bind(&row.status_timestamps_json)
        .bind(update.cancellation_reason.as_deref())
        .bind(&row.earnings_json)
        .bind(row.version)
        .bind(format_timestamp(update.updated_at))
        .bind(&id.0)
        .bind(expected.status.as_str())
        .bind(to_i64("version", expected.version)?)
        .bind(expected.assigned_driver_id.as_ref().map(|driver| driver.0.as_str()))
        .execute(&self.pool)
        .await?;

        let swapped = result.rows_affected() == 1;
        tracing::debug!(
            event_name = "db.booking.compare_and_set",
            booking_id = %id,
            expected_version = expected.version,
            swapped,
            "booking compare-and-set"
        );
        Ok(swapped)
    }
}

#[async_trait]
impl BookingRepository for SqlBookingRepository {
    async fn get(&self, id: &BookingId) -> Result<Option<Booking>, ApplicationError> {
        Ok(self.find_by_id(id).await?)
    }

    async fn compare_and_set(
        &self,
        id: &BookingId,
        expected: &BookingGuard,
        update: &Booking,
    ) -> Result<bool, ApplicationError> {
        Ok(self.swap(id, expected, update).await?)
    }
}

#[async_trait]
impl BookingStore for SqlBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), RepositoryError> {
        let row = BookingRow::encode(booking)?;
        let result = sqlx::query(
            "INSERT INTO booking (
                id,
                customer_id,
                vehicle_type,
                status,
                assigned_driver_id,
                price_breakdown_json,
                total_price,
                pickup_at,
                accepted_at,
                completed_at,
                status_timestamps_json,
                cancellation_reason,
                earnings_json,
                version,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&booking.id.0)
        .bind(&booking.customer_id.0)
        .bind(booking.vehicle_type.as_str())
        .bind(booking.status.as_str())
        .bind(booking.assigned_driver_id.as_ref().map(|driver| driver.0.as_str()))
        .bind(&row.price_breakdown_json)
        .bind(&row.total_price)
        .bind(format_timestamp(booking.pickup_at))
        .bind(booking.accepted_at.map(format_timestamp))
        .bind(booking.completed_at().map(format_timestamp))
        .bind(&row.status_timestamps_json)
        .bind(booking.cancellation_reason.as_deref())
        .bind(&row.earnings_json)
        .bind(row.version)
        .bind(format_timestamp(booking.created_at))
        .bind(format_timestamp(booking.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Duplicate(booking.id.0.clone()));
        }
        Ok(())
    }

    async fn list_open(&self, vehicle_type: VehicleType) -> Result<Vec<Booking>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS}
             FROM booking
             WHERE status IN ('pending', 'confirmed')
               AND assigned_driver_id IS NULL
               AND vehicle_type = ?
             ORDER BY pickup_at ASC, id ASC"
        ))
        .bind(vehicle_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(booking_from_row).collect()
    }

    async fn list_for_driver(
        &self,
        driver_id: &DriverId,
        window: &EarningsWindow,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS}
             FROM booking
             WHERE assigned_driver_id = ?
               AND status = 'completed'
               AND completed_at >= ?
               AND completed_at < ?
             ORDER BY completed_at ASC, id ASC"
        ))
        .bind(&driver_id.0)
        .bind(format_timestamp(window.start))
        .bind(format_timestamp(window.end))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(booking_from_row).collect()
    }
}

/// Column values that need encoding before binding.
struct BookingRow {
    price_breakdown_json: String,
    total_price: String,
    status_timestamps_json: String,
    earnings_json: Option<String>,
    version: i64,
}

impl BookingRow {
    fn encode(booking: &Booking) -> Result<Self, RepositoryError> {
        let timestamps: BTreeMap<&'static str, String> = booking
            .status_timestamps
            .iter()
            .map(|(status, at)| (status.as_str(), format_timestamp(*at)))
            .collect();

        Ok(Self {
            price_breakdown_json: encode_json("price_breakdown_json", &booking.price_breakdown)?,
            total_price: booking.price_breakdown.total_price.to_string(),
            status_timestamps_json: encode_json("status_timestamps_json", &timestamps)?,
            earnings_json: booking
                .earnings
                .as_ref()
                .map(|earnings| encode_json("earnings_json", earnings))
                .transpose()?,
            version: to_i64("version", booking.version)?,
        })
    }
}

fn booking_from_row(row: SqliteRow) -> Result<Booking, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = BookingStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown booking status `{status_raw}`")))?;

    let vehicle_raw = row.try_get::<String, _>("vehicle_type")?;
    let vehicle_type = vehicle_raw
        .parse::<VehicleType>()
        .map_err(|_| RepositoryError::Decode(format!("unknown vehicle type `{vehicle_raw}`")))?;

    let price_breakdown: PriceBreakdown =
        decode_json("price_breakdown_json", row.try_get("price_breakdown_json")?)?;
    let earnings = row
        .try_get::<Option<String>, _>("earnings_json")?
        .map(|raw| decode_json::<EarningsRecord>("earnings_json", raw))
        .transpose()?;

    Ok(Booking {
        id: BookingId(row.try_get("id")?),
        customer_id: CustomerId(row.try_get("customer_id")?),
        vehicle_type,
        status,
        assigned_driver_id: row.try_get::<Option<String>, _>("assigned_driver_id")?.map(DriverId),
        price_breakdown,
        pickup_at: parse_timestamp("pickup_at", row.try_get("pickup_at")?)?,
        accepted_at: parse_optional_timestamp("accepted_at", row.try_get("accepted_at")?)?,
        status_timestamps: decode_status_timestamps(row.try_get("status_timestamps_json")?)?,
        cancellation_reason: row.try_get("cancellation_reason")?,
        earnings,
        version: parse_u64("version", row.try_get("version")?)?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn decode_status_timestamps(
    raw: String,
) -> Result<BTreeMap<BookingStatus, chrono::DateTime<chrono::Utc>>, RepositoryError> {
    let encoded: BTreeMap<String, String> = decode_json("status_timestamps_json", raw)?;
    encoded
        .into_iter()
        .map(|(status, at)| {
            let status = BookingStatus::parse(&status).ok_or_else(|| {
                RepositoryError::Decode(format!("unknown status `{status}` in status_timestamps"))
            })?;
            Ok((status, parse_timestamp("status_timestamps_json", at)?))
        })
        .collect()
}

fn encode_json<T: serde::Serialize>(column: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|error| RepositoryError::Decode(format!("could not encode `{column}`: {error}")))
}

fn decode_json<T: serde::de::DeserializeOwned>(
    column: &str,
    raw: String,
) -> Result<T, RepositoryError> {
    serde_json::from_str(&raw)
        .map_err(|error| RepositoryError::Decode(format!("invalid json in `{column}`: {error}")))
}
