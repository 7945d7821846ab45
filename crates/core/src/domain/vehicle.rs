use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Motorcycle,
    Sedan,
    Pickup,
    Van,
    Truck,
}

impl VehicleType {
    pub const ALL: [VehicleType; 5] =
        [Self::Motorcycle, Self::Sedan, Self::Pickup, Self::Van, Self::Truck];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Motorcycle => "motorcycle",
            Self::Sedan => "sedan",
            Self::Pickup => "pickup",
            Self::Van => "van",
            Self::Truck => "truck",
        }
    }
}

impl FromStr for VehicleType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "motorcycle" => Ok(Self::Motorcycle),
            "sedan" => Ok(Self::Sedan),
            "pickup" => Ok(Self::Pickup),
            "van" => Ok(Self::Van),
            "truck" => Ok(Self::Truck),
            other => Err(DomainError::invalid_input(
                "vehicle_type",
                format!("unknown vehicle type `{other}`"),
            )),
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of goods being moved; drives the load multiplier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    Documents,
    General,
    Furniture,
    Appliances,
    Fragile,
    Heavy,
}

impl LoadType {
    pub const ALL: [LoadType; 6] = [
        Self::Documents,
        Self::General,
        Self::Furniture,
        Self::Appliances,
        Self::Fragile,
        Self::Heavy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::General => "general",
            Self::Furniture => "furniture",
            Self::Appliances => "appliances",
            Self::Fragile => "fragile",
            Self::Heavy => "heavy",
        }
    }
}

impl FromStr for LoadType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "documents" => Ok(Self::Documents),
            "general" => Ok(Self::General),
            "furniture" => Ok(Self::Furniture),
            "appliances" => Ok(Self::Appliances),
            "fragile" => Ok(Self::Fragile),
            "heavy" => Ok(Self::Heavy),
            other => Err(DomainError::invalid_input(
                "load_type",
                format!("unknown load type `{other}`"),
            )),
        }
    }
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{LoadType, VehicleType};
    use crate::errors::DomainError;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(" Pickup ".parse::<VehicleType>().expect("pickup"), VehicleType::Pickup);
        assert_eq!("FURNITURE".parse::<LoadType>().expect("furniture"), LoadType::Furniture);
    }

    #[test]
    fn unknown_values_name_the_field() {
        let error = "hovercraft".parse::<VehicleType>().expect_err("unknown vehicle");
        assert!(matches!(
            error,
            DomainError::InvalidInput { ref field, .. } if field == "vehicle_type"
        ));

        let error = "livestock".parse::<LoadType>().expect_err("unknown load");
        assert!(matches!(
            error,
            DomainError::InvalidInput { ref field, .. } if field == "load_type"
        ));
    }

    #[test]
    fn as_str_round_trips_through_parse() {
        for vehicle in VehicleType::ALL {
            assert_eq!(vehicle.as_str().parse::<VehicleType>().expect("parse"), vehicle);
        }
        for load in LoadType::ALL {
            assert_eq!(load.as_str().parse::<LoadType>().expect("parse"), load);
        }
    }
}
