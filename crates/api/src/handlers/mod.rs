pub mod alarms;
pub mod imports;
pub mod readings;
pub mod thresholds;
