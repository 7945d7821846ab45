use thiserror::Error;

use crate::domain::booking::{ActorId, BookingId, BookingStatus, DriverId};
use crate::domain::vehicle::VehicleType;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid input for `{field}`: {message}")]
    InvalidInput { field: String, message: String },
    #[error("booking {booking_id} was not found")]
    JobNotFound { booking_id: BookingId },
    #[error("booking {booking_id} is no longer open (status {status})")]
    JobAlreadyClaimed {
        booking_id: BookingId,
        status: BookingStatus,
        assigned_driver_id: Option<DriverId>,
    },
    #[error("driver {driver_id} is not eligible for {vehicle_type} booking {booking_id}")]
    DriverNotEligible { booking_id: BookingId, driver_id: DriverId, vehicle_type: VehicleType },
    #[error("invalid transition for booking {booking_id} from {from} to {to}")]
    InvalidTransition { booking_id: BookingId, from: BookingStatus, to: BookingStatus },
    #[error("booking {booking_id} is already {status}")]
    AlreadyTerminal { booking_id: BookingId, status: BookingStatus },
    #[error("actor {actor_id} is not the driver assigned to booking {booking_id}")]
    NotAssignedDriver { booking_id: BookingId, actor_id: ActorId },
    #[error("actor {actor_id} may not cancel booking {booking_id}")]
    CancellationNotPermitted { booking_id: BookingId, actor_id: ActorId },
    #[error("a cancellation reason is required for booking {booking_id}")]
    EmptyReason { booking_id: BookingId },
    /// The booking moved on between read and write, and the request would
    /// still be valid against its new state (for example a cancel that lost to
    /// an advance). Nothing was written; re-read before deciding to resubmit.
    #[error("booking {booking_id} changed while the request was in flight")]
    ConcurrentUpdate { booking_id: BookingId },
}

/// How a caller should react to a rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller input is wrong; fix it before resubmitting.
    Validation,
    /// The caller's view is out of date; refresh and retry at most once.
    StaleView,
    /// Lost a race or used the wrong order; refresh before any retry.
    Conflict,
    /// Permission failure; never retried.
    Authorization,
}

impl DomainError {
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput { field: field.into(), message: message.into() }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidInput { .. } | Self::EmptyReason { .. } => ErrorClass::Validation,
            Self::JobNotFound { .. }
            | Self::AlreadyTerminal { .. }
            | Self::ConcurrentUpdate { .. } => ErrorClass::StaleView,
            Self::JobAlreadyClaimed { .. } | Self::InvalidTransition { .. } => ErrorClass::Conflict,
            Self::DriverNotEligible { .. }
            | Self::NotAssignedDriver { .. }
            | Self::CancellationNotPermitted { .. } => ErrorClass::Authorization,
        }
    }

    /// Stable machine-readable kind, used in CLI payloads and audit metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::JobNotFound { .. } => "job_not_found",
            Self::JobAlreadyClaimed { .. } => "job_already_claimed",
            Self::DriverNotEligible { .. } => "driver_not_eligible",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::AlreadyTerminal { .. } => "already_terminal",
            Self::NotAssignedDriver { .. } => "not_assigned_driver",
            Self::CancellationNotPermitted { .. } => "cancellation_not_permitted",
            Self::EmptyReason { .. } => "empty_reason",
            Self::ConcurrentUpdate { .. } => "concurrent_update",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidInput { field, .. } => {
                format!("Unable to price this trip: check `{field}`.")
            }
            Self::JobAlreadyClaimed { .. } => {
                "This job was just taken. Refresh the job feed.".to_owned()
            }
            Self::JobNotFound { .. } => {
                "This job is no longer available. Refresh the job feed.".to_owned()
            }
            Self::InvalidTransition { .. }
            | Self::AlreadyTerminal { .. }
            | Self::ConcurrentUpdate { .. } => {
                "Action no longer valid for this job's current status.".to_owned()
            }
            Self::DriverNotEligible { .. }
            | Self::NotAssignedDriver { .. }
            | Self::CancellationNotPermitted { .. } => {
                "You do not have permission to perform this action.".to_owned()
            }
            Self::EmptyReason { .. } => "Please provide a reason for cancelling.".to_owned(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Conflict { .. } => "Action no longer valid for this job's current status.",
            Self::Forbidden { .. } => "You do not have permission to perform this action.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                let message = error.to_string();
                match error.class() {
                    ErrorClass::Validation => Self::BadRequest { message, correlation_id },
                    ErrorClass::StaleView | ErrorClass::Conflict => {
                        Self::Conflict { message, correlation_id }
                    }
                    ErrorClass::Authorization => Self::Forbidden { message, correlation_id },
                }
            }
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::booking::{ActorId, BookingId, BookingStatus};
    use crate::errors::{ApplicationError, DomainError, ErrorClass, InterfaceError};

    fn booking_id() -> BookingId {
        BookingId("BK-1".to_owned())
    }

    #[test]
    fn invalid_input_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DomainError::invalid_input(
            "distance_km",
            "distance must be zero or greater",
        ))
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
    }

    #[test]
    fn lost_race_maps_to_conflict() {
        let interface = ApplicationError::from(DomainError::JobAlreadyClaimed {
            booking_id: booking_id(),
            status: BookingStatus::Accepted,
            assigned_driver_id: None,
        })
        .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::Conflict { .. }));
    }

    #[test]
    fn wrong_actor_maps_to_forbidden() {
        let error = DomainError::NotAssignedDriver {
            booking_id: booking_id(),
            actor_id: ActorId("driver-9".to_owned()),
        };
        assert_eq!(error.class(), ErrorClass::Authorization);

        let interface = ApplicationError::from(error).into_interface("req-3");
        assert_eq!(
            interface.user_message(),
            "You do not have permission to perform this action."
        );
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let interface = ApplicationError::Persistence("database lock timeout".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn user_messages_follow_the_rejection_kind() {
        let claimed = DomainError::JobAlreadyClaimed {
            booking_id: booking_id(),
            status: BookingStatus::Loading,
            assigned_driver_id: None,
        };
        assert!(claimed.user_message().contains("just taken"));

        let transition = DomainError::InvalidTransition {
            booking_id: booking_id(),
            from: BookingStatus::Accepted,
            to: BookingStatus::InTransit,
        };
        assert!(transition.user_message().contains("no longer valid"));

        let input = DomainError::invalid_input("load_type", "unknown load type `x`");
        assert_eq!(input.user_message(), "Unable to price this trip: check `load_type`.");
    }
}
