use serde::{Deserialize, Serialize};

use crate::domain::booking::DriverId;
use crate::domain::vehicle::VehicleType;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverApproval {
    Pending,
    Approved,
    Suspended,
}

impl DriverApproval {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Suspended => "suspended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

impl std::str::FromStr for DriverApproval {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| {
            DomainError::invalid_input("approval", format!("unknown approval state `{value}`"))
        })
    }
}

/// A registered driver and the single vehicle they operate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub display_name: String,
    pub vehicle_type: VehicleType,
    pub approval: DriverApproval,
    pub available: bool,
}

impl Driver {
    /// Approved, currently available, and driving exactly the requested vehicle.
    pub fn can_take(&self, vehicle_type: VehicleType) -> bool {
        self.approval == DriverApproval::Approved
            && self.available
            && self.vehicle_type == vehicle_type
    }
}
