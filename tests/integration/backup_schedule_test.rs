use assert_json_diff::assert_json_eq;
use chrono::{Duration, TimeZone, Utc};
use kube::CustomResourceExt;
use serde_json::json;

use mysql_backup_operator::crd::*;
use mysql_backup_operator::schedule::{CronExpr, SchedulerClock};
use mysql_backup_operator::validation::{validate, TemplatePolicy};

fn sample_manifest() -> serde_json::Value {
    json!({
        "apiVersion": "mysql.oracle.com/v1alpha1",
        "kind": "MySQLBackupSchedule",
        "metadata": { "name": "nightly", "namespace": "databases" },
        "spec": {
            "schedule": "30 2 * * *",
            "backupTemplate": {
                "executor": { "mysqldump": { "databases": [{ "name": "orders" }] } },
                "storageProvider": {
                    "s3": {
                        "bucket": "mysql-backups",
                        "region": "eu-west-1",
                        "credentialsSecret": { "name": "s3-credentials" }
                    }
                },
                "cluster": { "name": "mysql-prod" }
            }
        }
    })
}

#[test]
fn test_schedule_manifest_deserializes() {
    let schedule: MySQLBackupSchedule = serde_json::from_value(sample_manifest()).unwrap();

    assert_eq!(schedule.spec.schedule, "30 2 * * *");
    assert_eq!(schedule.phase(), BackupSchedulePhase::New);
    assert_eq!(schedule.last_backup(), None);
    let template = &schedule.spec.backup_template;
    assert_eq!(template.cluster.as_ref().unwrap().name, "mysql-prod");
    let s3 = template
        .storage_provider
        .as_ref()
        .and_then(|p| p.s3.as_ref())
        .unwrap();
    assert_eq!(s3.bucket, "mysql-backups");
    assert_eq!(
        s3.credentials_secret.as_ref().map(|s| s.name.as_str()),
        Some("s3-credentials")
    );

    assert!(validate(&schedule.spec, TemplatePolicy::Strict).is_ok());
}

#[test]
fn test_status_serializes_contract_fields() {
    let status = ScheduleStatus {
        phase: BackupSchedulePhase::FailedValidation,
        last_backup: Some(Utc.with_ymd_and_hms(2024, 3, 10, 2, 30, 0).unwrap()),
        observed_generation: Some(3),
        conditions: vec![],
    };

    assert_json_eq!(
        serde_json::to_value(&status).unwrap(),
        json!({
            "phase": "FailedValidation",
            "lastBackup": "2024-03-10T02:30:00Z",
            "observedGeneration": 3
        })
    );
}

#[test]
fn test_empty_status_defaults_to_new() {
    let status: ScheduleStatus = serde_json::from_value(json!({})).unwrap();
    assert_eq!(status.phase, BackupSchedulePhase::New);
    assert_eq!(status.last_backup, None);
}

#[test]
fn test_crd_metadata() {
    let crd = MySQLBackupSchedule::crd();
    assert_eq!(crd.spec.group, "mysql.oracle.com");
    assert_eq!(crd.spec.names.kind, "MySQLBackupSchedule");
    assert_eq!(crd.spec.names.plural, "mysqlbackupschedules");
    assert_eq!(crd.spec.scope, "Namespaced");
    let version = &crd.spec.versions[0];
    assert_eq!(version.name, "v1alpha1");
    assert!(version.subresources.as_ref().unwrap().status.is_some());
}

#[test]
fn test_list_wrapper_holds_items_in_order() {
    let first: MySQLBackupSchedule = serde_json::from_value(sample_manifest()).unwrap();
    let mut second = first.clone();
    second.metadata.name = Some("weekly".to_string());

    let list: MySQLBackupScheduleList = serde_json::from_value(json!({
        "apiVersion": "mysql.oracle.com/v1alpha1",
        "kind": "MySQLBackupScheduleList",
        "metadata": {},
        "items": [first, second]
    }))
    .unwrap();

    let names: Vec<_> = list
        .items
        .iter()
        .filter_map(|s| s.metadata.name.clone())
        .collect();
    assert_eq!(names, vec!["nightly", "weekly"]);
}

#[test]
fn test_hourly_due_scenario() {
    let cron = CronExpr::parse("0 * * * *").unwrap();
    let created = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
    let now = created + Duration::minutes(61);

    let clock = SchedulerClock::new(&cron, None, created);
    assert!(clock.is_due(now));
    let fired = clock.latest_due(now).unwrap();
    assert_eq!(fired, created + Duration::minutes(60));

    let clock = SchedulerClock::new(&cron, Some(fired), created);
    assert!(!clock.is_due(now + Duration::seconds(1)));
}

#[test]
fn test_invalid_schedule_names_field() {
    let mut schedule: MySQLBackupSchedule = serde_json::from_value(sample_manifest()).unwrap();
    schedule.spec.schedule = "not-a-cron".to_string();

    let err = validate(&schedule.spec, TemplatePolicy::Strict).unwrap_err();
    assert_eq!(err.field(), "schedule");
}
