//! Query code, one repository per table.

pub mod alarm_record_repo;
pub mod equipment_repo;
pub mod import_record_repo;
pub mod reading_repo;
pub mod threshold_rule_repo;

pub use alarm_record_repo::AlarmRecordRepo;
pub use equipment_repo::{EquipmentRepo, MonitoringPointRepo};
pub use import_record_repo::ImportRecordRepo;
pub use reading_repo::ReadingRepo;
pub use threshold_rule_repo::ThresholdRuleRepo;
