pub mod accept;
pub mod machine;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use machine::{advance, cancel, claim, DRIVER_CANCELLATION_REASON};
pub use service::JobLifecycle;
