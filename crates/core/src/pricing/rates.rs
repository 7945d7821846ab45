use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::vehicle::{LoadType, VehicleType};
use crate::errors::DomainError;
use crate::pricing::windows::{TimeWindow, TimeWindowSchedule};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRate {
    pub base: Decimal,
    pub per_km: Decimal,
    #[serde(default)]
    pub per_minute: Decimal,
}

impl VehicleRate {
    pub fn new(base: i64, per_km: i64, per_minute: i64) -> Self {
        Self {
            base: Decimal::from(base),
            per_km: Decimal::from(per_km),
            per_minute: Decimal::from(per_minute),
        }
    }
}

/// Operator-maintained pricing parameters.
///
/// Lookups never fail: a vehicle without a rate prices at zero and a missing
/// multiplier is neutral (1.0).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    #[serde(default)]
    pub base_rates: BTreeMap<VehicleType, VehicleRate>,
    #[serde(default)]
    pub load_multipliers: BTreeMap<LoadType, Decimal>,
    #[serde(default)]
    pub time_multipliers: BTreeMap<TimeWindow, Decimal>,
    #[serde(default)]
    pub helper_rate: Decimal,
    #[serde(default)]
    pub minimum_charge: Decimal,
    #[serde(default)]
    pub schedule: TimeWindowSchedule,
}

impl Default for RateTable {
    fn default() -> Self {
        let base_rates = BTreeMap::from([
            (VehicleType::Motorcycle, VehicleRate::new(100, 15, 0)),
            (VehicleType::Sedan, VehicleRate::new(250, 30, 0)),
            (VehicleType::Pickup, VehicleRate::new(500, 50, 0)),
            (VehicleType::Van, VehicleRate::new(800, 65, 0)),
            (VehicleType::Truck, VehicleRate::new(1500, 90, 0)),
        ]);
        let load_multipliers = BTreeMap::from([
            (LoadType::Documents, Decimal::new(8, 1)),
            (LoadType::General, Decimal::ONE),
            (LoadType::Furniture, Decimal::ONE),
            (LoadType::Appliances, Decimal::new(12, 1)),
            (LoadType::Fragile, Decimal::new(15, 1)),
            (LoadType::Heavy, Decimal::new(18, 1)),
        ]);
        let time_multipliers = BTreeMap::from([
            (TimeWindow::PeakHours, Decimal::new(125, 2)),
            (TimeWindow::Weekend, Decimal::new(11, 1)),
            (TimeWindow::Night, Decimal::new(13, 1)),
        ]);

        Self {
            base_rates,
            load_multipliers,
            time_multipliers,
            helper_rate: Decimal::from(200),
            minimum_charge: Decimal::from(300),
            schedule: TimeWindowSchedule::default(),
        }
    }
}

impl RateTable {
    pub fn vehicle_rate(&self, vehicle_type: VehicleType) -> VehicleRate {
        self.base_rates.get(&vehicle_type).copied().unwrap_or_default()
    }

    pub fn load_multiplier(&self, load_type: LoadType) -> Decimal {
        self.load_multipliers.get(&load_type).copied().unwrap_or(Decimal::ONE)
    }

    pub fn time_multiplier(&self, window: TimeWindow) -> Decimal {
        self.time_multipliers.get(&window).copied().unwrap_or(Decimal::ONE)
    }

    /// Gives every vehicle, load type and time window an explicit entry.
    pub fn with_neutral_defaults(mut self) -> Self {
        for vehicle in VehicleType::ALL {
            self.base_rates.entry(vehicle).or_default();
        }
        for load in LoadType::ALL {
            self.load_multipliers.entry(load).or_insert(Decimal::ONE);
        }
        for window in TimeWindow::ALL {
            self.time_multipliers.entry(window).or_insert(Decimal::ONE);
        }
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        for (vehicle, rate) in &self.base_rates {
            for (name, value) in
                [("base", rate.base), ("per_km", rate.per_km), ("per_minute", rate.per_minute)]
            {
                ensure_non_negative(&format!("base_rates.{vehicle}.{name}"), value)?;
            }
        }

        let (load_min, load_max) = load_multiplier_domain();
        for (load, multiplier) in &self.load_multipliers {
            ensure_within(&format!("load_multipliers.{load}"), *multiplier, load_min, load_max)?;
        }

        let (time_min, time_max) = time_multiplier_domain();
        for (window, multiplier) in &self.time_multipliers {
            ensure_within(&format!("time_multipliers.{window}"), *multiplier, time_min, time_max)?;
        }

        ensure_non_negative("helper_rate", self.helper_rate)?;
        ensure_non_negative("minimum_charge", self.minimum_charge)?;
        self.schedule.validate()
    }
}

pub fn load_multiplier_domain() -> (Decimal, Decimal) {
    (Decimal::new(5, 1), Decimal::from(3))
}

pub fn time_multiplier_domain() -> (Decimal, Decimal) {
    (Decimal::ONE, Decimal::from(2))
}

fn ensure_non_negative(field: &str, value: Decimal) -> Result<(), DomainError> {
    if value < Decimal::ZERO {
        return Err(DomainError::invalid_input(field, "must be zero or greater"));
    }
    Ok(())
}

fn ensure_within(
    field: &str,
    value: Decimal,
    min: Decimal,
    max: Decimal,
) -> Result<(), DomainError> {
    if value < min || value > max {
        return Err(DomainError::invalid_input(field, format!("must be within [{min}, {max}]")));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTableSnapshot {
    pub version: u64,
    pub table: RateTable,
    pub updated_at: DateTime<Utc>,
}

/// The single current rate table, replaced wholesale on every update.
///
/// Readers hold an `Arc` to the snapshot they started with, so an update never
/// becomes visible halfway through an estimate.
#[derive(Clone, Debug)]
pub struct SharedRateTable {
    current: Arc<RwLock<Arc<RateTableSnapshot>>>,
}

impl Default for SharedRateTable {
    fn default() -> Self {
        Self::from_snapshot(RateTableSnapshot {
            version: 1,
            table: RateTable::default(),
            updated_at: Utc::now(),
        })
    }
}

impl SharedRateTable {
    pub fn new(table: RateTable) -> Result<Self, DomainError> {
        table.validate()?;
        Ok(Self::from_snapshot(RateTableSnapshot {
            version: 1,
            table: table.with_neutral_defaults(),
            updated_at: Utc::now(),
        }))
    }

    pub fn from_snapshot(snapshot: RateTableSnapshot) -> Self {
        Self { current: Arc::new(RwLock::new(Arc::new(snapshot))) }
    }

    pub fn current(&self) -> Arc<RateTableSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn update(&self, table: RateTable) -> Result<Arc<RateTableSnapshot>, DomainError> {
        table.validate()?;
        Ok(self.replace(table.with_neutral_defaults()))
    }

    pub fn reset(&self) -> Arc<RateTableSnapshot> {
        self.replace(RateTable::default())
    }

    fn replace(&self, table: RateTable) -> Arc<RateTableSnapshot> {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = Arc::new(RateTableSnapshot {
            version: guard.version + 1,
            table,
            updated_at: Utc::now(),
        });
        *guard = Arc::clone(&next);
        tracing::info!(
            event_name = "pricing.rate_table.replaced",
            version = next.version,
            "rate table snapshot replaced"
        );
        next
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{RateTable, SharedRateTable, VehicleRate};
    use crate::domain::vehicle::{LoadType, VehicleType};
    use crate::errors::DomainError;
    use crate::pricing::windows::TimeWindow;

    #[test]
    fn default_table_is_valid_and_complete() {
        let table = RateTable::default();
        table.validate().expect("defaults are valid");
        assert_eq!(table.base_rates.len(), VehicleType::ALL.len());
        assert_eq!(table.load_multipliers.len(), LoadType::ALL.len());
        assert_eq!(table.vehicle_rate(VehicleType::Pickup), VehicleRate::new(500, 50, 0));
        assert_eq!(table.load_multiplier(LoadType::Furniture), Decimal::ONE);
    }

    #[test]
    fn missing_entries_are_neutral() {
        let table = RateTable {
            base_rates: Default::default(),
            load_multipliers: Default::default(),
            time_multipliers: Default::default(),
            ..RateTable::default()
        };

        assert_eq!(table.vehicle_rate(VehicleType::Van), VehicleRate::default());
        assert_eq!(table.load_multiplier(LoadType::Fragile), Decimal::ONE);
        assert_eq!(table.time_multiplier(TimeWindow::Night), Decimal::ONE);

        let filled = table.with_neutral_defaults();
        assert_eq!(filled.time_multipliers.len(), TimeWindow::ALL.len());
        assert_eq!(filled.base_rates.len(), VehicleType::ALL.len());
    }

    #[test]
    fn out_of_domain_multipliers_are_rejected() {
        let mut table = RateTable::default();
        table.load_multipliers.insert(LoadType::Heavy, Decimal::new(35, 1));
        let error = table.validate().expect_err("load multiplier above 3.0");
        assert!(matches!(
            error,
            DomainError::InvalidInput { ref field, .. } if field == "load_multipliers.heavy"
        ));

        let mut table = RateTable::default();
        table.time_multipliers.insert(TimeWindow::Night, Decimal::new(9, 1));
        assert!(table.validate().is_err());
    }

    #[test]
    fn negative_rates_are_rejected() {
        let mut table = RateTable::default();
        table.minimum_charge = Decimal::from(-1);
        assert!(table.validate().is_err());

        let mut table = RateTable::default();
        table.base_rates.insert(VehicleType::Sedan, VehicleRate::new(100, -2, 0));
        let error = table.validate().expect_err("negative per_km");
        assert!(matches!(
            error,
            DomainError::InvalidInput { ref field, .. } if field == "base_rates.sedan.per_km"
        ));
    }

    #[test]
    fn update_bumps_version_and_keeps_old_readers_consistent() {
        let shared = SharedRateTable::default();
        let before = shared.current();

        let mut table = RateTable::default();
        table.minimum_charge = Decimal::from(450);
        let after = shared.update(table).expect("valid update");

        assert_eq!(after.version, before.version + 1);
        assert_eq!(before.table.minimum_charge, Decimal::from(300));
        assert_eq!(shared.current().table.minimum_charge, Decimal::from(450));
    }

    #[test]
    fn rejected_update_leaves_current_snapshot_untouched() {
        let shared = SharedRateTable::default();
        let mut table = RateTable::default();
        table.helper_rate = Decimal::from(-5);

        assert!(shared.update(table).is_err());

        let mut shifted = RateTable::default();
        shifted.schedule.utc_offset_minutes = 20 * 60;
        assert!(shared.update(shifted).is_err());

        assert_eq!(shared.current().version, 1);
        assert_eq!(shared.current().table, RateTable::default());
    }

    #[test]
    fn reset_restores_defaults_with_new_version() {
        let shared = SharedRateTable::default();
        let mut table = RateTable::default();
        table.helper_rate = Decimal::from(999);
        shared.update(table).expect("update");

        let reset = shared.reset();
        assert_eq!(reset.version, 3);
        assert_eq!(reset.table, RateTable::default());
    }

    #[test]
    fn table_deserializes_from_partial_toml() {
        let table: RateTable = toml::from_str(
            r#"
helper_rate = 150
minimum_charge = "275.50"

[base_rates.pickup]
base = 600
per_km = 55

[load_multipliers]
fragile = 1.75
"#,
        )
        .expect("parse toml");

        assert_eq!(table.vehicle_rate(VehicleType::Pickup), VehicleRate::new(600, 55, 0));
        assert_eq!(table.minimum_charge, Decimal::new(27_550, 2));
        assert_eq!(table.load_multiplier(LoadType::Fragile), Decimal::new(175, 2));
        table.validate().expect("partial table is valid");
    }
}
