pub mod booking;
pub mod driver;
pub mod trip;
pub mod vehicle;
