use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use cartage_core::domain::booking::{Booking, BookingGuard, BookingId, DriverId};
use cartage_core::domain::driver::Driver;
use cartage_core::domain::vehicle::VehicleType;
use cartage_core::earnings::EarningsWindow;
use cartage_core::errors::ApplicationError;
use cartage_core::ports::{BookingRepository, DriverEligibility};

use super::{BookingStore, DriverStore, RepositoryError};

/// Compare-and-set runs under the write lock, which serializes it per store.
#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<String, Booking>>,
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn get(&self, id: &BookingId) -> Result<Option<Booking>, ApplicationError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(&id.0).cloned())
    }

    async fn compare_and_set(
        &self,
        id: &BookingId,
        expected: &BookingGuard,
        update: &Booking,
    ) -> Result<bool, ApplicationError> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(&id.0) {
            Some(stored) if stored.matches_guard(expected) => {
                *stored = update.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), RepositoryError> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.id.0) {
            return Err(RepositoryError::Duplicate(booking.id.0.clone()));
        }
        bookings.insert(booking.id.0.clone(), booking.clone());
        Ok(())
    }

    async fn list_open(&self, vehicle_type: VehicleType) -> Result<Vec<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        let mut open: Vec<Booking> = bookings
            .values()
            .filter(|booking| {
                booking.status.is_open()
                    && booking.assigned_driver_id.is_none()
                    && booking.vehicle_type == vehicle_type
            })
            .cloned()
            .collect();
        open.sort_by(|a, b| a.pickup_at.cmp(&b.pickup_at).then_with(|| a.id.cmp(&b.id)));
        Ok(open)
    }

    async fn list_for_driver(
        &self,
        driver_id: &DriverId,
        window: &EarningsWindow,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        let mut completed: Vec<Booking> = bookings
            .values()
            .filter(|booking| booking.assigned_driver_id.as_ref() == Some(driver_id))
            .filter(|booking| booking.completed_at().is_some_and(|at| window.contains(at)))
            .cloned()
            .collect();
        completed
            .sort_by(|a, b| a.completed_at().cmp(&b.completed_at()).then_with(|| a.id.cmp(&b.id)));
        Ok(completed)
    }
}

#[derive(Default)]
pub struct InMemoryDriverRepository {
    drivers: RwLock<HashMap<String, Driver>>,
}

#[async_trait]
impl DriverStore for InMemoryDriverRepository {
    async fn find_by_id(&self, id: &DriverId) -> Result<Option<Driver>, RepositoryError> {
        let drivers = self.drivers.read().await;
        Ok(drivers.get(&id.0).cloned())
    }

    async fn save(&self, driver: &Driver) -> Result<(), RepositoryError> {
        let mut drivers = self.drivers.write().await;
        drivers.insert(driver.id.0.clone(), driver.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Driver>, RepositoryError> {
        let drivers = self.drivers.read().await;
        let mut listed: Vec<Driver> = drivers.values().cloned().collect();
        listed.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listed)
    }
}

#[async_trait]
impl DriverEligibility for InMemoryDriverRepository {
    async fn is_eligible(
        &self,
        driver_id: &DriverId,
        vehicle_type: VehicleType,
    ) -> Result<bool, ApplicationError> {
        let drivers = self.drivers.read().await;
        Ok(drivers.get(&driver_id.0).is_some_and(|driver| driver.can_take(vehicle_type)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use cartage_core::domain::booking::{Booking, BookingId, BookingStatus, CustomerId, DriverId};
    use cartage_core::domain::driver::{Driver, DriverApproval};
    use cartage_core::domain::vehicle::VehicleType;
    use cartage_core::ports::{BookingRepository, DriverEligibility};
    use cartage_core::pricing::PriceBreakdown;

    use crate::repositories::{
        BookingStore, DriverStore, InMemoryBookingRepository, InMemoryDriverRepository,
        RepositoryError,
    };

    fn booking(id: &str, vehicle_type: VehicleType, pickup_hour: u32) -> Booking {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, pickup_hour, 0, 0).single().expect("ts");
        let total = Decimal::from(800);
        Booking::new(
            BookingId(id.to_owned()),
            CustomerId("customer-1".to_owned()),
            vehicle_type,
            PriceBreakdown {
                base_component: total,
                distance_component: Decimal::ZERO,
                load_multiplier_applied: Decimal::ONE,
                time_multiplier_applied: Decimal::ONE,
                applied_windows: Vec::new(),
                helper_charge: Decimal::ZERO,
                subtotal_before_floor: total,
                total_price: total,
            },
            at,
            at,
        )
    }

    #[tokio::test]
    async fn in_memory_booking_repo_round_trip() {
        let repo = InMemoryBookingRepository::default();
        let stored = booking("BK-1", VehicleType::Van, 9);

        repo.insert(&stored).await.expect("insert");
        assert_eq!(repo.get(&stored.id).await.expect("get"), Some(stored.clone()));
        assert!(matches!(repo.insert(&stored).await, Err(RepositoryError::Duplicate(_))));
    }

    #[tokio::test]
    async fn stale_guard_does_not_overwrite() {
        let repo = InMemoryBookingRepository::default();
        let open = booking("BK-1", VehicleType::Van, 9);
        repo.insert(&open).await.expect("insert");

        let mut cancelled = open.clone();
        cancelled.status = BookingStatus::Cancelled;
        cancelled.version += 1;

        assert!(repo.compare_and_set(&open.id, &open.guard(), &cancelled).await.expect("cas"));
        assert!(!repo.compare_and_set(&open.id, &open.guard(), &open).await.expect("stale"));
        assert_eq!(
            repo.get(&open.id).await.expect("get").map(|booking| booking.status),
            Some(BookingStatus::Cancelled)
        );
    }

    #[tokio::test]
    async fn job_feed_is_ordered_by_pickup() {
        let repo = InMemoryBookingRepository::default();
        for entry in [
            booking("BK-late", VehicleType::Van, 15),
            booking("BK-early", VehicleType::Van, 8),
            booking("BK-truck", VehicleType::Truck, 7),
        ] {
            repo.insert(&entry).await.expect("insert");
        }

        let feed = repo.list_open(VehicleType::Van).await.expect("feed");
        let ids: Vec<&str> = feed.iter().map(|booking| booking.id.0.as_str()).collect();
        assert_eq!(ids, ["BK-early", "BK-late"]);
    }

    #[tokio::test]
    async fn in_memory_driver_eligibility() {
        let repo = InMemoryDriverRepository::default();
        repo.save(&Driver {
            id: DriverId("d-1".to_owned()),
            display_name: "Lito".to_owned(),
            vehicle_type: VehicleType::Van,
            approval: DriverApproval::Approved,
            available: true,
        })
        .await
        .expect("save");

        let id = DriverId("d-1".to_owned());
        assert!(repo.is_eligible(&id, VehicleType::Van).await.expect("check"));
        assert!(!repo.is_eligible(&id, VehicleType::Sedan).await.expect("check"));
        assert_eq!(repo.list().await.expect("list").len(), 1);
    }
}
