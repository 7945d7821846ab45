use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::booking::{
    Booking, BookingGuard, BookingId, BookingStatus, CustomerId, DriverId,
};
use crate::domain::vehicle::VehicleType;
use crate::errors::ApplicationError;
use crate::ports::{BookingRepository, DriverEligibility};
use crate::pricing::PriceBreakdown;

pub fn breakdown_totalling(total: i64) -> PriceBreakdown {
    let total = Decimal::from(total);
    PriceBreakdown {
        base_component: total,
        distance_component: Decimal::ZERO,
        load_multiplier_applied: Decimal::ONE,
        time_multiplier_applied: Decimal::ONE,
        applied_windows: Vec::new(),
        helper_charge: Decimal::ZERO,
        subtotal_before_floor: total,
        total_price: total,
    }
}

pub fn open_booking(id: &str) -> Booking {
    let created_at = Utc.with_ymd_and_hms(2026, 3, 4, 1, 0, 0).single().unwrap_or_else(Utc::now);
    Booking::new(
        BookingId(id.to_owned()),
        CustomerId("customer-1".to_owned()),
        VehicleType::Pickup,
        breakdown_totalling(1000),
        created_at,
        created_at,
    )
}

pub fn booking_in(id: &str, status: BookingStatus, driver: Option<&str>) -> Booking {
    let mut booking = open_booking(id);
    booking.status = status;
    booking.assigned_driver_id = driver.map(|driver| DriverId(driver.to_owned()));
    if !status.is_open() && status != BookingStatus::Cancelled {
        booking.accepted_at = Some(booking.created_at);
    }
    booking
}

#[derive(Default)]
pub struct MemoryBookings {
    records: Mutex<HashMap<BookingId, Booking>>,
}

impl MemoryBookings {
    pub fn with(bookings: impl IntoIterator<Item = Booking>) -> Self {
        let records = bookings.into_iter().map(|booking| (booking.id.clone(), booking)).collect();
        Self { records: Mutex::new(records) }
    }

    pub fn snapshot(&self, id: &str) -> Option<Booking> {
        self.records.lock().ok()?.get(&BookingId(id.to_owned())).cloned()
    }
}

#[async_trait]
impl BookingRepository for MemoryBookings {
    async fn get(&self, id: &BookingId) -> Result<Option<Booking>, ApplicationError> {
        let records =
            self.records.lock().map_err(|_| ApplicationError::Persistence("poisoned".into()))?;
        Ok(records.get(id).cloned())
    }

    async fn compare_and_set(
        &self,
        id: &BookingId,
        expected: &BookingGuard,
        update: &Booking,
    ) -> Result<bool, ApplicationError> {
        let mut records =
            self.records.lock().map_err(|_| ApplicationError::Persistence("poisoned".into()))?;
        match records.get_mut(id) {
            Some(stored) if stored.matches_guard(expected) => {
                *stored = update.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Eligible when the (driver, vehicle) pair is listed.
#[derive(Default)]
pub struct ListedDrivers {
    pairs: BTreeSet<(String, VehicleType)>,
}

impl ListedDrivers {
    pub fn new<'a>(pairs: impl IntoIterator<Item = (&'a str, VehicleType)>) -> Self {
        Self { pairs: pairs.into_iter().map(|(id, vehicle)| (id.to_owned(), vehicle)).collect() }
    }
}

#[async_trait]
impl DriverEligibility for ListedDrivers {
    async fn is_eligible(
        &self,
        driver_id: &DriverId,
        vehicle_type: VehicleType,
    ) -> Result<bool, ApplicationError> {
        Ok(self.pairs.contains(&(driver_id.0.clone(), vehicle_type)))
    }
}

/// Lands `interleaved` in the store just before the next compare-and-set, as
/// if another request committed between this request's read and write.
pub struct InterleavedBookings {
    inner: MemoryBookings,
    interleaved: Mutex<Option<Booking>>,
}

impl InterleavedBookings {
    pub fn new(stored: Booking, interleaved: Booking) -> Self {
        Self { inner: MemoryBookings::with([stored]), interleaved: Mutex::new(Some(interleaved)) }
    }

    pub fn snapshot(&self, id: &str) -> Option<Booking> {
        self.inner.snapshot(id)
    }
}

#[async_trait]
impl BookingRepository for InterleavedBookings {
    async fn get(&self, id: &BookingId) -> Result<Option<Booking>, ApplicationError> {
        self.inner.get(id).await
    }

    async fn compare_and_set(
        &self,
        id: &BookingId,
        expected: &BookingGuard,
        update: &Booking,
    ) -> Result<bool, ApplicationError> {
        let pending = self
            .interleaved
            .lock()
            .map_err(|_| ApplicationError::Persistence("poisoned".into()))?
            .take();
        if let Some(winner) = pending {
            let mut records = self
                .inner
                .records
                .lock()
                .map_err(|_| ApplicationError::Persistence("poisoned".into()))?;
            records.insert(winner.id.clone(), winner);
        }
        self.inner.compare_and_set(id, expected, update).await
    }
}
