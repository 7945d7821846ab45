//! Pure booking transitions. Each returns the next version of the booking and
//! leaves the input untouched, so the caller can compare-and-set it.

use chrono::{DateTime, Utc};

use crate::domain::booking::{ActorId, Booking, BookingStatus, DriverId, EarningsRecord};
use crate::errors::DomainError;

pub const DRIVER_CANCELLATION_REASON: &str = "cancelled by assigned driver";

pub fn claim(
    booking: &Booking,
    driver_id: &DriverId,
    now: DateTime<Utc>,
) -> Result<Booking, DomainError> {
    if !booking.status.is_open() || booking.assigned_driver_id.is_some() {
        return Err(DomainError::JobAlreadyClaimed {
            booking_id: booking.id.clone(),
            status: booking.status,
            assigned_driver_id: booking.assigned_driver_id.clone(),
        });
    }

    let mut next = stamp(booking, BookingStatus::Accepted, now);
    next.assigned_driver_id = Some(driver_id.clone());
    next.accepted_at = Some(now);
    Ok(next)
}

/// Moves a claimed booking one step along the job path, or sideways into `cancelled`.
pub fn advance(
    booking: &Booking,
    requested: BookingStatus,
    actor_id: &ActorId,
    now: DateTime<Utc>,
) -> Result<Booking, DomainError> {
    ensure_not_terminal(booking)?;

    if !booking.is_assigned_to(actor_id) {
        return Err(DomainError::NotAssignedDriver {
            booking_id: booking.id.clone(),
            actor_id: actor_id.clone(),
        });
    }

    if requested == BookingStatus::Cancelled {
        return cancel(booking, DRIVER_CANCELLATION_REASON, now);
    }

    if booking.status.successor() != Some(requested) {
        return Err(DomainError::InvalidTransition {
            booking_id: booking.id.clone(),
            from: booking.status,
            to: requested,
        });
    }

    let mut next = stamp(booking, requested, now);
    if requested == BookingStatus::Completed {
        next.earnings = Some(EarningsRecord::from_total(booking.price_breakdown.total_price)?);
    }
    Ok(next)
}

/// Cancels from any non-terminal status. Authorization is the caller's concern.
pub fn cancel(booking: &Booking, reason: &str, now: DateTime<Utc>) -> Result<Booking, DomainError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DomainError::EmptyReason { booking_id: booking.id.clone() });
    }
    ensure_not_terminal(booking)?;

    let mut next = stamp(booking, BookingStatus::Cancelled, now);
    next.cancellation_reason = Some(reason.to_owned());
    Ok(next)
}

fn ensure_not_terminal(booking: &Booking) -> Result<(), DomainError> {
    if booking.status.is_terminal() {
        return Err(DomainError::AlreadyTerminal {
            booking_id: booking.id.clone(),
            status: booking.status,
        });
    }
    Ok(())
}

fn stamp(booking: &Booking, status: BookingStatus, now: DateTime<Utc>) -> Booking {
    let mut next = booking.clone();
    next.status = status;
    next.status_timestamps.insert(status, now);
    next.version = booking.version + 1;
    next.updated_at = now;
    next
}
