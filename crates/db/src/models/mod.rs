//! Row models and DTOs, one module per table family.

pub mod alarm_record;
pub mod equipment;
pub mod import_record;
pub mod reading;
pub mod threshold_rule;
