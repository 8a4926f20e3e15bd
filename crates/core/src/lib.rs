//! Pure domain logic for the shipwatch equipment monitor.
//!
//! Nothing in this crate performs I/O. Database access lives in
//! `shipwatch-db`, delivery in `shipwatch-events` / `shipwatch-api`, and the
//! orchestration of both in `shipwatch-pipeline`.

pub mod alarm;
pub mod equipment;
pub mod error;
pub mod identity;
pub mod import_status;
pub mod reading;
pub mod roles;
pub mod rooms;
pub mod threshold;
pub mod types;
