//! Repository for the `threshold_rules` table (soft-deletable).

use sqlx::PgPool;
use shipwatch_core::types::DbId;

use crate::models::threshold_rule::{ThresholdRule, ThresholdRuleInput, RULE_STATUS_ENABLED};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, equipment_id, metric_type, monitoring_point, \
    upper_limit, lower_limit, duration_seconds, severity, status, \
    fault_name, recommended_action, created_by, updated_by, \
    created_at, updated_at, deleted_at";

/// Provides the narrow write API and evaluation lookups for threshold rules.
pub struct ThresholdRuleRepo;

impl ThresholdRuleRepo {
    /// Insert a new rule.
    pub async fn create(
        pool: &PgPool,
        input: &ThresholdRuleInput,
        actor: Option<DbId>,
    ) -> Result<ThresholdRule, sqlx::Error> {
        let query = format!(
            "INSERT INTO threshold_rules
                (equipment_id, metric_type, monitoring_point, upper_limit, lower_limit,
                 duration_seconds, severity, status, fault_name, recommended_action,
                 created_by, updated_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ThresholdRule>(&query)
            .bind(&input.equipment_id)
            .bind(&input.metric_type)
            .bind(&input.monitoring_point)
            .bind(input.upper_limit)
            .bind(input.lower_limit)
            .bind(input.duration_seconds)
            .bind(input.severity.as_str())
            .bind(&input.status)
            .bind(&input.fault_name)
            .bind(&input.recommended_action)
            .bind(actor)
            .fetch_one(pool)
            .await
    }

    /// Replace every authored field of a live rule.
    ///
    /// Returns `None` if the rule does not exist or has been deleted.
    /// Alarms already raised by the rule keep their copied context.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &ThresholdRuleInput,
        actor: Option<DbId>,
    ) -> Result<Option<ThresholdRule>, sqlx::Error> {
        let query = format!(
            "UPDATE threshold_rules SET
                equipment_id = $2, metric_type = $3, monitoring_point = $4,
                upper_limit = $5, lower_limit = $6, duration_seconds = $7,
                severity = $8, status = $9, fault_name = $10,
                recommended_action = $11, updated_by = $12, updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ThresholdRule>(&query)
            .bind(id)
            .bind(&input.equipment_id)
            .bind(&input.metric_type)
            .bind(&input.monitoring_point)
            .bind(input.upper_limit)
            .bind(input.lower_limit)
            .bind(input.duration_seconds)
            .bind(input.severity.as_str())
            .bind(&input.status)
            .bind(&input.fault_name)
            .bind(&input.recommended_action)
            .bind(actor)
            .fetch_optional(pool)
            .await
    }

    /// Mark a rule deleted. Returns `true` if a live row was affected.
    pub async fn soft_delete(
        pool: &PgPool,
        id: DbId,
        actor: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE threshold_rules
             SET deleted_at = NOW(), updated_by = $2, updated_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(actor)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a live rule by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ThresholdRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM threshold_rules WHERE id = $1 AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, ThresholdRule>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List live rules, optionally restricted to one piece of equipment.
    pub async fn list(
        pool: &PgPool,
        equipment_id: Option<&str>,
    ) -> Result<Vec<ThresholdRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM threshold_rules
             WHERE deleted_at IS NULL AND ($1::TEXT IS NULL OR equipment_id = $1)
             ORDER BY equipment_id, metric_type, id"
        );
        sqlx::query_as::<_, ThresholdRule>(&query)
            .bind(equipment_id)
            .fetch_all(pool)
            .await
    }

    /// Enabled, live rules covering exactly this coordinate.
    ///
    /// `IS NOT DISTINCT FROM` gives strict monitoring-point equality: a NULL
    /// point only matches NULL.
    pub async fn find_enabled_matching(
        pool: &PgPool,
        equipment_id: &str,
        metric_type: &str,
        monitoring_point: Option<&str>,
    ) -> Result<Vec<ThresholdRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM threshold_rules
             WHERE equipment_id = $1
               AND metric_type = $2
               AND monitoring_point IS NOT DISTINCT FROM $3
               AND status = $4
               AND deleted_at IS NULL
             ORDER BY id"
        );
        sqlx::query_as::<_, ThresholdRule>(&query)
            .bind(equipment_id)
            .bind(metric_type)
            .bind(monitoring_point)
            .bind(RULE_STATUS_ENABLED)
            .fetch_all(pool)
            .await
    }
}
