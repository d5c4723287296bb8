pub mod admin;
pub mod catalog;
pub mod delivery;
pub mod driver;
pub mod jobs;
pub mod payments;
pub mod tracking;
