pub mod db;
pub mod jobdb;
pub mod materialdb;
pub mod paymentdb;
pub mod trackingdb;
pub mod userdb;

#[cfg(test)]
pub mod memory;


pub use db::{DBClient, LogisticsStore};
