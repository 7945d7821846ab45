use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::vehicle::{LoadType, VehicleType};
use crate::errors::DomainError;

/// Trip payload as it arrives from a booking form or admin preview, before validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    pub vehicle_type: String,
    pub load_type: String,
    pub distance_km: Decimal,
    pub duration_minutes: Decimal,
    pub pickup_at: DateTime<Utc>,
    #[serde(default)]
    pub helpers_count: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripInput {
    pub vehicle_type: VehicleType,
    pub load_type: LoadType,
    pub distance_km: Decimal,
    pub duration_minutes: Decimal,
    pub pickup_at: DateTime<Utc>,
    pub helpers_count: u32,
}

impl TripInput {
    pub fn from_request(request: &TripRequest) -> Result<Self, DomainError> {
        let vehicle_type = request.vehicle_type.parse::<VehicleType>()?;
        let load_type = request.load_type.parse::<LoadType>()?;

        if request.helpers_count < 0 {
            return Err(DomainError::invalid_input(
                "helpers_count",
                "helpers count must be zero or greater",
            ));
        }
        let helpers_count = u32::try_from(request.helpers_count).map_err(|_| {
            DomainError::invalid_input("helpers_count", "helpers count is out of range")
        })?;

        let input = Self {
            vehicle_type,
            load_type,
            distance_km: request.distance_km,
            duration_minutes: request.duration_minutes,
            pickup_at: request.pickup_at,
            helpers_count,
        };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.distance_km.is_sign_negative() && !self.distance_km.is_zero() {
            return Err(DomainError::invalid_input(
                "distance_km",
                "distance must be zero or greater",
            ));
        }
        if self.duration_minutes.is_sign_negative() && !self.duration_minutes.is_zero() {
            return Err(DomainError::invalid_input(
                "duration_minutes",
                "duration must be zero or greater",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::{TripInput, TripRequest};
    use crate::domain::vehicle::{LoadType, VehicleType};
    use crate::errors::DomainError;

    fn request() -> TripRequest {
        TripRequest {
            vehicle_type: "pickup".to_owned(),
            load_type: "furniture".to_owned(),
            distance_km: Decimal::new(125, 1),
            duration_minutes: Decimal::from(35),
            pickup_at: Utc.with_ymd_and_hms(2026, 3, 4, 6, 0, 0).single().expect("timestamp"),
            helpers_count: 2,
        }
    }

    fn rejected_field(error: DomainError) -> String {
        match error {
            DomainError::InvalidInput { field, .. } => field,
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[test]
    fn valid_request_becomes_strict_input() {
        let input = TripInput::from_request(&request()).expect("valid request");
        assert_eq!(input.vehicle_type, VehicleType::Pickup);
        assert_eq!(input.load_type, LoadType::Furniture);
        assert_eq!(input.helpers_count, 2);
        assert_eq!(input.distance_km, Decimal::new(125, 1));
    }

    #[test]
    fn negative_helpers_are_rejected() {
        let mut request = request();
        request.helpers_count = -1;
        let error = TripInput::from_request(&request).expect_err("negative helpers");
        assert_eq!(rejected_field(error), "helpers_count");
    }

    #[test]
    fn negative_distance_and_duration_are_rejected() {
        let mut negative_distance = request();
        negative_distance.distance_km = Decimal::new(-1, 0);
        let error = TripInput::from_request(&negative_distance).expect_err("negative distance");
        assert_eq!(rejected_field(error), "distance_km");

        let mut negative_duration = request();
        negative_duration.duration_minutes = Decimal::new(-5, 1);
        let error = TripInput::from_request(&negative_duration).expect_err("negative duration");
        assert_eq!(rejected_field(error), "duration_minutes");
    }

    #[test]
    fn unknown_enum_values_are_rejected() {
        let mut request = request();
        request.load_type = "livestock".to_owned();
        let error = TripInput::from_request(&request).expect_err("unknown load");
        assert_eq!(rejected_field(error), "load_type");
    }

    #[test]
    fn zero_distance_is_accepted() {
        let mut request = request();
        request.distance_km = Decimal::ZERO;
        request.duration_minutes = Decimal::ZERO;
        assert!(TripInput::from_request(&request).is_ok());
    }
}
