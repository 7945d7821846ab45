use std::sync::Arc;

use chrono::Utc;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink};
use crate::domain::booking::{ActorId, Booking, BookingId, BookingStatus};
use crate::errors::{ApplicationError, DomainError};
use crate::lifecycle::machine;
use crate::ports::{BookingRepository, CancellationPolicy, DriverEligibility};

/// Claims, advances and cancels bookings against a store with atomic compare-and-set.
///
/// Every mutation is one read, one validation and one conditional write. A
/// lost write is never retried: the booking is re-read once so the caller gets
/// the rejection that matches the state that won.
pub struct JobLifecycle<R, E, C> {
    pub(crate) bookings: R,
    pub(crate) eligibility: E,
    pub(crate) cancellation: C,
    pub(crate) audit: Arc<dyn AuditSink>,
}

impl<R, E, C> JobLifecycle<R, E, C>
where
    R: BookingRepository,
    E: DriverEligibility,
    C: CancellationPolicy,
{
    pub fn new(bookings: R, eligibility: E, cancellation: C) -> Self {
        Self { bookings, eligibility, cancellation, audit: Arc::new(NoopAuditSink) }
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn bookings(&self) -> &R {
        &self.bookings
    }

    pub async fn advance(
        &self,
        booking_id: &BookingId,
        requested: BookingStatus,
        actor_id: &ActorId,
    ) -> Result<Booking, ApplicationError> {
        let now = Utc::now();
        let transition =
            |booking: &Booking| machine::advance(booking, requested, actor_id, now);

        let result: Result<Booking, ApplicationError> = async {
            let current = self.load(booking_id).await?;
            let next = transition(&current)?;

            if requested == BookingStatus::Cancelled
                && !self.cancellation.can_cancel(actor_id, &current).await?
            {
                return Err(DomainError::CancellationNotPermitted {
                    booking_id: booking_id.clone(),
                    actor_id: actor_id.clone(),
                }
                .into());
            }

            self.commit(&current, next, transition).await
        }
        .await;

        self.record(
            "booking.advance",
            AuditCategory::Lifecycle,
            booking_id,
            actor_id,
            &result,
            &[("requested", requested.as_str())],
        );
        result
    }

    pub async fn cancel(
        &self,
        booking_id: &BookingId,
        actor_id: &ActorId,
        reason: &str,
    ) -> Result<Booking, ApplicationError> {
        let now = Utc::now();
        let transition = |booking: &Booking| machine::cancel(booking, reason, now);

        let result: Result<Booking, ApplicationError> = async {
            let current = self.load(booking_id).await?;
            let next = transition(&current)?;

            if !self.cancellation.can_cancel(actor_id, &current).await? {
                return Err(DomainError::CancellationNotPermitted {
                    booking_id: booking_id.clone(),
                    actor_id: actor_id.clone(),
                }
                .into());
            }

            self.commit(&current, next, transition).await
        }
        .await;

        self.record(
            "booking.cancel",
            AuditCategory::Lifecycle,
            booking_id,
            actor_id,
            &result,
            &[("reason", reason.trim())],
        );
        result
    }

    pub(crate) async fn load(&self, booking_id: &BookingId) -> Result<Booking, ApplicationError> {
        self.bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| DomainError::JobNotFound { booking_id: booking_id.clone() }.into())
    }

    /// Writes `next` if the stored booking still matches `current`. On a lost
    /// race the fresh record is run through `revalidate` to pick the rejection.
    pub(crate) async fn commit<F>(
        &self,
        current: &Booking,
        next: Booking,
        revalidate: F,
    ) -> Result<Booking, ApplicationError>
    where
        F: Fn(&Booking) -> Result<Booking, DomainError> + Send + Sync,
    {
        if self.bookings.compare_and_set(&current.id, &current.guard(), &next).await? {
            return Ok(next);
        }

        let fresh = self.load(&current.id).await?;
        revalidate(&fresh)?;
        Err(DomainError::ConcurrentUpdate { booking_id: current.id.clone() }.into())
    }

    pub(crate) fn record(
        &self,
        event_type: &str,
        category: AuditCategory,
        booking_id: &BookingId,
        actor_id: &ActorId,
        result: &Result<Booking, ApplicationError>,
        metadata: &[(&str, &str)],
    ) {
        let (outcome, event) = match result {
            Ok(booking) => {
                tracing::info!(
                    event_name = event_type,
                    booking_id = %booking_id,
                    actor_id = %actor_id,
                    status = %booking.status,
                    version = booking.version,
                    "booking updated"
                );
                (AuditOutcome::Success, format!("{event_type}.applied"))
            }
            Err(ApplicationError::Domain(error)) => {
                tracing::warn!(
                    event_name = event_type,
                    booking_id = %booking_id,
                    actor_id = %actor_id,
                    error_kind = error.kind(),
                    error = %error,
                    "booking update rejected"
                );
                (AuditOutcome::Rejected, format!("{event_type}.rejected"))
            }
            Err(error) => {
                tracing::error!(
                    event_name = event_type,
                    booking_id = %booking_id,
                    actor_id = %actor_id,
                    error = %error,
                    "booking update failed"
                );
                (AuditOutcome::Failed, format!("{event_type}.failed"))
            }
        };

        let mut audit_event =
            AuditEvent::new(Some(booking_id.clone()), event, category, actor_id, outcome);
        for (key, value) in metadata {
            audit_event = audit_event.with_metadata(*key, *value);
        }
        match result {
            Ok(booking) => {
                audit_event = audit_event.with_metadata("status", booking.status.as_str());
            }
            Err(ApplicationError::Domain(error)) => {
                audit_event = audit_event.with_metadata("error_kind", error.kind());
            }
            Err(error) => {
                audit_event = audit_event.with_metadata("error", error.to_string());
            }
        }
        self.audit.emit(audit_event);
    }
}
