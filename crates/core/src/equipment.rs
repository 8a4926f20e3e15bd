//! Equipment and monitoring-point collaborator seams.
//!
//! Both collaborators are owned outside the alarm core. The core only needs
//! to resolve ids, check existence, and ask whether a named monitoring point
//! is known for a device.

use std::collections::HashSet;

use async_trait::async_trait;

/// Failure talking to a lookup collaborator.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Lookup backend unavailable: {0}")]
    Unavailable(String),
}

/// Resolves equipment identifiers.
///
/// Internal ids are what readings, rules, and alarms reference. External
/// device codes are what the live sensor feed and some dashboards use.
#[async_trait]
pub trait EquipmentLookup: Send + Sync {
    /// Map an external device code to the internal equipment id.
    async fn lookup_internal_id(&self, external_code: &str) -> Result<Option<String>, LookupError>;

    /// Map an internal equipment id to its external device code.
    async fn lookup_external_code(&self, internal_id: &str) -> Result<Option<String>, LookupError>;

    /// Return the subset of `internal_ids` that refer to existing equipment.
    async fn existing_ids(&self, internal_ids: &[String]) -> Result<HashSet<String>, LookupError>;
}

/// Outcome of validating a single monitoring point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointVerdict {
    Ok,
    Reject(String),
}

/// Catalog of named monitoring points per device.
///
/// Rejections are advisory: ingestion logs them and carries on.
#[async_trait]
pub trait MonitoringPointCatalog: Send + Sync {
    async fn validate(
        &self,
        equipment_id: &str,
        point_name: &str,
        metric_type: &str,
    ) -> Result<PointVerdict, LookupError>;

    /// Return the subset of `point_names` known for `equipment_id`.
    async fn validate_batch(
        &self,
        equipment_id: &str,
        point_names: &[String],
    ) -> Result<Vec<String>, LookupError>;
}
