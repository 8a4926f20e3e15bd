//! Repository tests against a real PostgreSQL database.
//!
//! These need `DATABASE_URL` to point at a server `sqlx::test` can create
//! scratch databases on, so they are ignored by default:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/shipwatch cargo test -p shipwatch-db -- --ignored
//! ```

use chrono::{TimeZone, Utc};
use sqlx::PgPool;
use shipwatch_core::alarm::{AlarmStatus, Severity};
use shipwatch_core::reading::ReadingSource;
use shipwatch_db::models::alarm_record::NewAlarmRecord;
use shipwatch_db::models::reading::NewReading;
use shipwatch_db::models::threshold_rule::{ThresholdRuleInput, RULE_STATUS_DISABLED, RULE_STATUS_ENABLED};
use shipwatch_db::repositories::{
    AlarmRecordRepo, EquipmentRepo, ReadingRepo, ThresholdRuleRepo,
};

async fn seed_equipment(pool: &PgPool, id: &str, code: &str) {
    sqlx::query("INSERT INTO equipment (id, device_code, name) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(code)
        .bind(format!("Equipment {id}"))
        .execute(pool)
        .await
        .unwrap();
}

fn rule(point: Option<&str>, upper: f64, status: &str) -> ThresholdRuleInput {
    ThresholdRuleInput {
        equipment_id: "E1".into(),
        metric_type: "voltage".into(),
        monitoring_point: point.map(str::to_string),
        upper_limit: Some(upper),
        lower_limit: None,
        duration_seconds: 0,
        severity: Severity::High,
        status: status.into(),
        fault_name: Some("Overvoltage".into()),
        recommended_action: Some("Check rectifier".into()),
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn matching_uses_strict_monitoring_point_equality(pool: PgPool) {
    seed_equipment(&pool, "E1", "DEV-001").await;

    let with_point = ThresholdRuleRepo::create(&pool, &rule(Some("total"), 700.0, RULE_STATUS_ENABLED), Some(1))
        .await
        .unwrap();
    let without_point = ThresholdRuleRepo::create(&pool, &rule(None, 650.0, RULE_STATUS_ENABLED), Some(1))
        .await
        .unwrap();
    ThresholdRuleRepo::create(&pool, &rule(Some("total"), 10.0, RULE_STATUS_DISABLED), Some(1))
        .await
        .unwrap();

    let for_total = ThresholdRuleRepo::find_enabled_matching(&pool, "E1", "voltage", Some("total"))
        .await
        .unwrap();
    assert_eq!(for_total.iter().map(|r| r.id).collect::<Vec<_>>(), vec![with_point.id]);

    let for_none = ThresholdRuleRepo::find_enabled_matching(&pool, "E1", "voltage", None)
        .await
        .unwrap();
    assert_eq!(for_none.iter().map(|r| r.id).collect::<Vec<_>>(), vec![without_point.id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn soft_deleted_rules_stop_matching_but_alarms_keep_context(pool: PgPool) {
    seed_equipment(&pool, "E1", "DEV-001").await;
    let created = ThresholdRuleRepo::create(&pool, &rule(Some("total"), 700.0, RULE_STATUS_ENABLED), None)
        .await
        .unwrap();

    let alarm = AlarmRecordRepo::create(
        &pool,
        &NewAlarmRecord {
            equipment_id: "E1".into(),
            threshold_id: created.id,
            abnormal_metric_type: "voltage".into(),
            abnormal_value: 705.0,
            threshold_range: "> 700".into(),
            triggered_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
            severity: Severity::High,
            monitoring_point: created.monitoring_point.clone(),
            fault_name: created.fault_name.clone(),
            recommended_action: created.recommended_action.clone(),
        },
    )
    .await
    .unwrap();

    let mut edited = rule(Some("total"), 720.0, RULE_STATUS_ENABLED);
    edited.fault_name = Some("Renamed".into());
    ThresholdRuleRepo::update(&pool, created.id, &edited, None).await.unwrap();
    assert!(ThresholdRuleRepo::soft_delete(&pool, created.id, None).await.unwrap());
    assert!(!ThresholdRuleRepo::soft_delete(&pool, created.id, None).await.unwrap());

    let matching = ThresholdRuleRepo::find_enabled_matching(&pool, "E1", "voltage", Some("total"))
        .await
        .unwrap();
    assert!(matching.is_empty());

    let stored = AlarmRecordRepo::find_by_id(&pool, alarm.id).await.unwrap().unwrap();
    assert_eq!(stored.fault_name.as_deref(), Some("Overvoltage"));
    assert_eq!(stored.recommended_action.as_deref(), Some("Check rectifier"));
    assert_eq!(stored.status, AlarmStatus::Pending.as_str());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_reading_is_skipped(pool: PgPool) {
    seed_equipment(&pool, "E1", "DEV-001").await;
    let reading = NewReading {
        equipment_id: "E1".into(),
        recorded_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
        metric_type: "voltage".into(),
        monitoring_point: None,
        value: 230.0,
        unit: Some("V".into()),
        quality: None,
    };

    let first = ReadingRepo::insert(&pool, &reading, ReadingSource::Import, None).await.unwrap();
    let second = ReadingRepo::insert(&pool, &reading, ReadingSource::Import, None).await.unwrap();

    assert!(first.is_some());
    assert!(second.is_none(), "NULL monitoring points must still collide");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn alarm_transition_is_guarded_by_expected_status(pool: PgPool) {
    seed_equipment(&pool, "E1", "DEV-001").await;
    let created = ThresholdRuleRepo::create(&pool, &rule(None, 700.0, RULE_STATUS_ENABLED), None)
        .await
        .unwrap();
    let alarm = AlarmRecordRepo::create(
        &pool,
        &NewAlarmRecord {
            equipment_id: "E1".into(),
            threshold_id: created.id,
            abnormal_metric_type: "voltage".into(),
            abnormal_value: 705.0,
            threshold_range: "> 700".into(),
            triggered_at: Utc::now(),
            severity: Severity::Low,
            monitoring_point: None,
            fault_name: None,
            recommended_action: None,
        },
    )
    .await
    .unwrap();

    let processing = AlarmRecordRepo::update_status(
        &pool,
        alarm.id,
        AlarmStatus::Pending,
        AlarmStatus::Processing,
        "bosun",
        Some("on it"),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(processing.handler.as_deref(), Some("bosun"));
    assert!(processing.handled_at.is_some());

    let stale = AlarmRecordRepo::update_status(
        &pool,
        alarm.id,
        AlarmStatus::Pending,
        AlarmStatus::Ignored,
        "mate",
        None,
    )
    .await
    .unwrap();
    assert!(stale.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn existing_ids_filters_unknown_equipment(pool: PgPool) {
    seed_equipment(&pool, "E1", "DEV-001").await;
    let found = EquipmentRepo::existing_ids(&pool, &["E1".to_string(), "E404".to_string()])
        .await
        .unwrap();
    assert_eq!(found, vec!["E1".to_string()]);

    let by_code = EquipmentRepo::find_by_device_code(&pool, "DEV-001").await.unwrap().unwrap();
    assert_eq!(by_code.id, "E1");
}
