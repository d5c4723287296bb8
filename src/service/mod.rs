pub mod admin_service;
pub mod delivery_service;
pub mod error;
pub mod job_service;
pub mod job_state;
pub mod mpesa;
pub mod payment_service;
pub mod pricing_service;
pub mod storage;
pub mod tracking_service;
