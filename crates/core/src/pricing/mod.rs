pub mod estimator;
pub mod quote;
pub mod rates;
pub mod windows;

pub use estimator::{estimate, PriceBreakdown, PricingEngine, RateTableEstimator};
pub use quote::{preview, quote, DisplayAmounts, PriceQuote};
pub use rates::{RateTable, RateTableSnapshot, SharedRateTable, VehicleRate};
pub use windows::{HourWindow, TimeWindow, TimeWindowSchedule};
