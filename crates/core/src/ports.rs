use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::domain::booking::{ActorId, Booking, BookingGuard, BookingId, DriverId};
use crate::domain::vehicle::VehicleType;
use crate::errors::ApplicationError;

/// Durable booking records. `compare_and_set` must be atomic per booking.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get(&self, id: &BookingId) -> Result<Option<Booking>, ApplicationError>;

    /// Replaces the stored booking with `update` only if it still matches `expected`.
    /// Returns `false` when another writer got there first.
    async fn compare_and_set(
        &self,
        id: &BookingId,
        expected: &BookingGuard,
        update: &Booking,
    ) -> Result<bool, ApplicationError>;
}

#[async_trait]
pub trait DriverEligibility: Send + Sync {
    async fn is_eligible(
        &self,
        driver_id: &DriverId,
        vehicle_type: VehicleType,
    ) -> Result<bool, ApplicationError>;
}

#[async_trait]
pub trait CancellationPolicy: Send + Sync {
    async fn can_cancel(
        &self,
        actor_id: &ActorId,
        booking: &Booking,
    ) -> Result<bool, ApplicationError>;
}

/// Lets the booking's customer, its assigned driver, and any configured operator cancel.
#[derive(Clone, Debug, Default)]
pub struct StandardCancellationPolicy {
    operator_ids: BTreeSet<String>,
}

impl StandardCancellationPolicy {
    pub fn new<I, S>(operator_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { operator_ids: operator_ids.into_iter().map(Into::into).collect() }
    }
}

#[async_trait]
impl CancellationPolicy for StandardCancellationPolicy {
    async fn can_cancel(
        &self,
        actor_id: &ActorId,
        booking: &Booking,
    ) -> Result<bool, ApplicationError> {
        Ok(booking.customer_id.0 == actor_id.0
            || booking.is_assigned_to(actor_id)
            || self.operator_ids.contains(&actor_id.0))
    }
}
