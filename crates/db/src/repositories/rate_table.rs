use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use cartage_core::pricing::{RateTable, RateTableSnapshot};

use super::{format_timestamp, parse_timestamp, parse_u64, to_i64, RateTableStore, RepositoryError};
use crate::DbPool;

/// The singleton `rate_table` row (id 1). Absent until the first save.
pub struct SqlRateTableRepository {
    pool: DbPool,
}

impl SqlRateTableRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateTableStore for SqlRateTableRepository {
    async fn load(&self) -> Result<Option<RateTableSnapshot>, RepositoryError> {
        let row = sqlx::query("SELECT version, table_json, updated_at FROM rate_table WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.try_get("table_json")?;
        let table: RateTable = serde_json::from_str(&raw).map_err(|error| {
            RepositoryError::Decode(format!("invalid json in `table_json`: {error}"))
        })?;

        Ok(Some(RateTableSnapshot {
            version: parse_u64("version", row.try_get("version")?)?,
            table,
            updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
        }))
    }

    async fn save(&self, table: &RateTable) -> Result<RateTableSnapshot, RepositoryError> {
        let table = table.clone().with_neutral_defaults();
        let table_json = serde_json::to_string(&table).map_err(|error| {
            RepositoryError::Decode(format!("could not encode rate table: {error}"))
        })?;
        let updated_at = Utc::now();

        let mut tx = self.pool.begin().await?;
        let current: Option<i64> = sqlx::query("SELECT version FROM rate_table WHERE id = 1")
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row.try_get("version"))
            .transpose()?;
        let version = match current {
            Some(version) => parse_u64("version", version)? + 1,
            None => 1,
        };

        sqlx::query(
            "INSERT INTO rate_table (id, version, table_json, updated_at)
             VALUES (1, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                version = excluded.version,
                table_json = excluded.table_json,
                updated_at = excluded.updated_at",
        )
        .bind(to_i64("version", version)?)
        .bind(&table_json)
        .bind(format_timestamp(updated_at))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            event_name = "db.rate_table.saved",
            version,
            "rate table persisted"
        );
        Ok(RateTableSnapshot { version, table, updated_at })
    }

    async fn reset(&self) -> Result<RateTableSnapshot, RepositoryError> {
        self.save(&RateTable::default()).await
    }
}
