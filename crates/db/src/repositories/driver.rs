use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use cartage_core::domain::booking::DriverId;
use cartage_core::domain::driver::{Driver, DriverApproval};
use cartage_core::domain::vehicle::VehicleType;
use cartage_core::errors::ApplicationError;
use cartage_core::ports::DriverEligibility;

use super::{format_timestamp, DriverStore, RepositoryError};
use crate::DbPool;

pub struct SqlDriverRepository {
    pool: DbPool,
}

impl SqlDriverRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DriverStore for SqlDriverRepository {
    async fn find_by_id(&self, id: &DriverId) -> Result<Option<Driver>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, display_name, vehicle_type, approval, available
             FROM driver
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(driver_from_row).transpose()
    }

    async fn save(&self, driver: &Driver) -> Result<(), RepositoryError> {
        let now = format_timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO driver (
                id,
                display_name,
                vehicle_type,
                approval,
                available,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                vehicle_type = excluded.vehicle_type,
                approval = excluded.approval,
                available = excluded.available,
                updated_at = excluded.updated_at",
        )
        .bind(&driver.id.0)
        .bind(&driver.display_name)
        .bind(driver.vehicle_type.as_str())
        .bind(driver.approval.as_str())
        .bind(driver.available)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Driver>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, display_name, vehicle_type, approval, available
             FROM driver
             ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(driver_from_row).collect()
    }
}

#[async_trait]
impl DriverEligibility for SqlDriverRepository {
    async fn is_eligible(
        &self,
        driver_id: &DriverId,
        vehicle_type: VehicleType,
    ) -> Result<bool, ApplicationError> {
        let driver = self.find_by_id(driver_id).await?;
        Ok(driver.is_some_and(|driver| driver.can_take(vehicle_type)))
    }
}

fn driver_from_row(row: SqliteRow) -> Result<Driver, RepositoryError> {
    let vehicle_raw = row.try_get::<String, _>("vehicle_type")?;
    let vehicle_type = vehicle_raw
        .parse::<VehicleType>()
        .map_err(|_| RepositoryError::Decode(format!("unknown vehicle type `{vehicle_raw}`")))?;

    let approval_raw = row.try_get::<String, _>("approval")?;
    let approval = DriverApproval::parse(&approval_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown approval `{approval_raw}`")))?;

    Ok(Driver {
        id: DriverId(row.try_get("id")?),
        display_name: row.try_get("display_name")?,
        vehicle_type,
        approval,
        available: row.try_get("available")?,
    })
}

#[cfg(test)]
mod tests {
    use cartage_core::domain::booking::DriverId;
    use cartage_core::domain::driver::{Driver, DriverApproval};
    use cartage_core::domain::vehicle::VehicleType;
    use cartage_core::ports::DriverEligibility;

    use super::SqlDriverRepository;
    use crate::repositories::DriverStore;
    use crate::{connect_with_settings, migrations};

    async fn repo() -> SqlDriverRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlDriverRepository::new(pool)
    }

    fn driver(id: &str, approval: DriverApproval, available: bool) -> Driver {
        Driver {
            id: DriverId(id.to_owned()),
            display_name: format!("Driver {id}"),
            vehicle_type: VehicleType::Sedan,
            approval,
            available,
        }
    }

    #[tokio::test]
    async fn save_upserts_and_lists_in_id_order() {
        let repo = repo().await;
        repo.save(&driver("d-2", DriverApproval::Pending, true)).await.expect("save");
        repo.save(&driver("d-1", DriverApproval::Approved, true)).await.expect("save");
        repo.save(&driver("d-2", DriverApproval::Approved, false)).await.expect("update");

        let listed = repo.list().await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id.0, "d-1");
        assert_eq!(listed[1].approval, DriverApproval::Approved);
        assert!(!listed[1].available);
    }

    #[tokio::test]
    async fn eligibility_checks_approval_availability_and_vehicle() {
        let repo = repo().await;
        repo.save(&driver("ok", DriverApproval::Approved, true)).await.expect("save");
        repo.save(&driver("busy", DriverApproval::Approved, false)).await.expect("save");
        repo.save(&driver("new", DriverApproval::Pending, true)).await.expect("save");

        let ok = DriverId("ok".to_owned());
        assert!(repo.is_eligible(&ok, VehicleType::Sedan).await.expect("check"));
        assert!(!repo.is_eligible(&ok, VehicleType::Truck).await.expect("check"));
        assert!(!repo
            .is_eligible(&DriverId("busy".to_owned()), VehicleType::Sedan)
            .await
            .expect("check"));
        assert!(!repo
            .is_eligible(&DriverId("new".to_owned()), VehicleType::Sedan)
            .await
            .expect("check"));
        assert!(!repo
            .is_eligible(&DriverId("ghost".to_owned()), VehicleType::Sedan)
            .await
            .expect("check"));
    }
}
