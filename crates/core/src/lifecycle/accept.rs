use chrono::Utc;

use crate::audit::AuditCategory;
use crate::domain::booking::{ActorId, Booking, BookingId, DriverId};
use crate::errors::{ApplicationError, DomainError};
use crate::lifecycle::machine;
use crate::lifecycle::JobLifecycle;
use crate::ports::{BookingRepository, CancellationPolicy, DriverEligibility};

impl<R, E, C> JobLifecycle<R, E, C>
where
    R: BookingRepository,
    E: DriverEligibility,
    C: CancellationPolicy,
{
    /// Assigns an open booking to `driver_id`.
    ///
    /// Of any number of concurrent calls for the same booking at most one
    /// succeeds; the rest get `JobAlreadyClaimed` carrying the winner's state.
    pub async fn accept_job(
        &self,
        booking_id: &BookingId,
        driver_id: &DriverId,
    ) -> Result<Booking, ApplicationError> {
        let now = Utc::now();
        let transition = |booking: &Booking| machine::claim(booking, driver_id, now);

        let result: Result<Booking, ApplicationError> = async {
            let current = self.load(booking_id).await?;
            let next = transition(&current)?;

            if !self.eligibility.is_eligible(driver_id, current.vehicle_type).await? {
                return Err(DomainError::DriverNotEligible {
                    booking_id: booking_id.clone(),
                    driver_id: driver_id.clone(),
                    vehicle_type: current.vehicle_type,
                }
                .into());
            }

            self.commit(&current, next, transition).await
        }
        .await;

        self.record(
            "booking.accept",
            AuditCategory::Dispatch,
            booking_id,
            &ActorId::from(driver_id),
            &result,
            &[("driver_id", driver_id.0.as_str())],
        );
        result
    }
}
