pub mod audit;
pub mod config;
pub mod domain;
pub mod earnings;
pub mod errors;
pub mod lifecycle;
pub mod ports;
pub mod pricing;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use domain::booking::{
    ActorId, Booking, BookingGuard, BookingId, BookingStatus, CustomerId, DriverId,
    EarningsRecord,
};
pub use domain::driver::{Driver, DriverApproval};
pub use domain::trip::{TripInput, TripRequest};
pub use domain::vehicle::{LoadType, VehicleType};
pub use earnings::{aggregate, DailyEarnings, EarningsSummary, EarningsWindow};
pub use errors::{ApplicationError, DomainError, ErrorClass, InterfaceError};
pub use lifecycle::JobLifecycle;
pub use ports::{
    BookingRepository, CancellationPolicy, DriverEligibility, StandardCancellationPolicy,
};
pub use pricing::{
    estimate, PriceBreakdown, PriceQuote, PricingEngine, RateTable, RateTableEstimator,
    SharedRateTable,
};
