use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use cartage_core::domain::booking::{Booking, BookingId, CustomerId, DriverId};
use cartage_core::domain::driver::{Driver, DriverApproval};
use cartage_core::domain::trip::TripInput;
use cartage_core::domain::vehicle::{LoadType, VehicleType};
use cartage_core::pricing::{estimate, RateTable};

use crate::connection::DbPool;
use crate::repositories::{
    BookingStore, DriverStore, RepositoryError, SqlBookingRepository, SqlDriverRepository,
};

struct SeedDriver {
    id: &'static str,
    display_name: &'static str,
    vehicle_type: VehicleType,
    approval: DriverApproval,
}

struct SeedBooking {
    id: &'static str,
    customer_id: &'static str,
    vehicle_type: VehicleType,
    load_type: LoadType,
    /// Tenths of a kilometre.
    distance_tenths_km: i64,
    helpers_count: u32,
    /// Pickup, UTC, on 2026-03-04 (a Wednesday).
    pickup_hour_utc: u32,
}

const SEED_DRIVERS: &[SeedDriver] = &[
    SeedDriver {
        id: "driver-moto-001",
        display_name: "Jun Reyes",
        vehicle_type: VehicleType::Motorcycle,
        approval: DriverApproval::Approved,
    },
    SeedDriver {
        id: "driver-pickup-001",
        display_name: "Ramon Cruz",
        vehicle_type: VehicleType::Pickup,
        approval: DriverApproval::Approved,
    },
    SeedDriver {
        id: "driver-pickup-002",
        display_name: "Ana Santos",
        vehicle_type: VehicleType::Pickup,
        approval: DriverApproval::Approved,
    },
    SeedDriver {
        id: "driver-van-001",
        display_name: "Lito Garcia",
        vehicle_type: VehicleType::Van,
        approval: DriverApproval::Approved,
    },
    SeedDriver {
        id: "driver-truck-001",
        display_name: "Bong Mendoza",
        vehicle_type: VehicleType::Truck,
        approval: DriverApproval::Pending,
    },
];

const SEED_BOOKINGS: &[SeedBooking] = &[
    SeedBooking {
        id: "booking-demo-001",
        customer_id: "customer-demo-001",
        vehicle_type: VehicleType::Pickup,
        load_type: LoadType::Furniture,
        distance_tenths_km: 100,
        helpers_count: 0,
        pickup_hour_utc: 6,
    },
    SeedBooking {
        id: "booking-demo-002",
        customer_id: "customer-demo-002",
        vehicle_type: VehicleType::Van,
        load_type: LoadType::Appliances,
        distance_tenths_km: 73,
        helpers_count: 1,
        pickup_hour_utc: 4,
    },
    SeedBooking {
        id: "booking-demo-003",
        customer_id: "customer-demo-001",
        vehicle_type: VehicleType::Motorcycle,
        load_type: LoadType::Documents,
        distance_tenths_km: 42,
        helpers_count: 0,
        pickup_hour_utc: 9,
    },
    SeedBooking {
        id: "booking-demo-004",
        customer_id: "customer-demo-003",
        vehicle_type: VehicleType::Pickup,
        load_type: LoadType::Fragile,
        distance_tenths_km: 185,
        helpers_count: 2,
        pickup_hour_utc: 10,
    },
];

/// Deterministic demo drivers and open bookings for local runs and CLI smoke checks.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let drivers = SqlDriverRepository::new(pool.clone());
        let bookings = SqlBookingRepository::new(pool.clone());
        let rates = RateTable::default();

        for seed in SEED_DRIVERS {
            drivers.save(&seed_driver(seed)).await?;
        }

        let mut bookings_inserted = 0;
        for seed in SEED_BOOKINGS {
            let booking = seed_booking(seed, &rates)?;
            match bookings.insert(&booking).await {
                Ok(()) => bookings_inserted += 1,
                Err(RepositoryError::Duplicate(_)) => {}
                Err(error) => return Err(error),
            }
        }

        tracing::info!(
            event_name = "db.seed.loaded",
            drivers = SEED_DRIVERS.len(),
            bookings_inserted,
            "demo dataset loaded"
        );
        Ok(SeedResult {
            drivers_seeded: SEED_DRIVERS.iter().map(|seed| seed.id).collect(),
            bookings_seeded: SEED_BOOKINGS.iter().map(|seed| seed.id).collect(),
            bookings_inserted,
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let drivers = SqlDriverRepository::new(pool.clone());
        let bookings = SqlBookingRepository::new(pool.clone());
        let mut checks = Vec::new();

        for seed in SEED_DRIVERS {
            let found = drivers.find_by_id(&DriverId(seed.id.to_owned())).await?;
            checks.push(VerificationCheck {
                name: format!("driver:{}", seed.id),
                passed: found.is_some_and(|driver| driver.vehicle_type == seed.vehicle_type),
            });
        }

        for seed in SEED_BOOKINGS {
            let found = bookings.find_by_id(&BookingId(seed.id.to_owned())).await?;
            checks.push(VerificationCheck {
                name: format!("booking:{}", seed.id),
                passed: found.is_some_and(|booking| booking.vehicle_type == seed.vehicle_type),
            });
        }

        let all_passed = checks.iter().all(|check| check.passed);
        Ok(VerificationResult { all_passed, checks })
    }

    /// Removes seeded rows. Bookings go first because they reference drivers.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for seed in SEED_BOOKINGS {
            sqlx::query("DELETE FROM booking WHERE id = ?").bind(seed.id).execute(&mut *tx).await?;
        }
        for seed in SEED_DRIVERS {
            sqlx::query("DELETE FROM driver WHERE id = ?").bind(seed.id).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn seed_driver(seed: &SeedDriver) -> Driver {
    Driver {
        id: DriverId(seed.id.to_owned()),
        display_name: seed.display_name.to_owned(),
        vehicle_type: seed.vehicle_type,
        approval: seed.approval,
        available: true,
    }
}

fn seed_booking(seed: &SeedBooking, rates: &RateTable) -> Result<Booking, RepositoryError> {
    let pickup_at = seed_time(seed.pickup_hour_utc)?;
    let trip = TripInput {
        vehicle_type: seed.vehicle_type,
        load_type: seed.load_type,
        distance_km: Decimal::new(seed.distance_tenths_km, 1),
        duration_minutes: Decimal::ZERO,
        pickup_at,
        helpers_count: seed.helpers_count,
    };
    let breakdown = estimate(&trip, rates)
        .map_err(|error| RepositoryError::Decode(format!("seed `{}`: {error}", seed.id)))?;

    Ok(Booking::new(
        BookingId(seed.id.to_owned()),
        CustomerId(seed.customer_id.to_owned()),
        seed.vehicle_type,
        breakdown,
        pickup_at,
        seed_time(0)?,
    ))
}

fn seed_time(hour: u32) -> Result<DateTime<Utc>, RepositoryError> {
    Utc.with_ymd_and_hms(2026, 3, 4, hour, 0, 0)
        .single()
        .ok_or_else(|| RepositoryError::Decode(format!("invalid seed hour {hour}")))
}

#[derive(Clone, Debug, Serialize)]
pub struct SeedResult {
    pub drivers_seeded: Vec<&'static str>,
    pub bookings_seeded: Vec<&'static str>,
    pub bookings_inserted: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerificationCheck {
    pub name: String,
    pub passed: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct VerificationResult {
    pub all_passed: bool,
    pub checks: Vec<VerificationCheck>,
}

#[cfg(test)]
mod tests {
    use cartage_core::domain::vehicle::VehicleType;

    use super::DemoSeedDataset;
    use crate::repositories::{BookingStore, SqlBookingRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn load_is_idempotent_and_verifiable() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let first = DemoSeedDataset::load(&pool).await.expect("first load");
        let second = DemoSeedDataset::load(&pool).await.expect("second load");
        assert_eq!(first.bookings_inserted, first.bookings_seeded.len());
        assert_eq!(second.bookings_inserted, 0);

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_passed);

        let feed = SqlBookingRepository::new(pool.clone())
            .list_open(VehicleType::Pickup)
            .await
            .expect("feed");
        assert_eq!(feed.len(), 2);

        DemoSeedDataset::clean(&pool).await.expect("clean");
        let verification = DemoSeedDataset::verify(&pool).await.expect("verify after clean");
        assert!(!verification.all_passed);
    }
}
