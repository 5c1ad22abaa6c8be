use assert_json_diff::assert_json_include;
use chrono::{TimeZone, Utc};
use serde_json::json;

use mysql_backup_operator::crd::*;
use mysql_backup_operator::jobs::scheduled_backup::{build_scheduled_backup, is_scheduled_by};
use mysql_backup_operator::reconcilers::{
    FIRE_TIME_ANNOTATION, SCHEDULE_ANNOTATION, SCHEDULE_LABEL,
};

fn sample_schedule() -> MySQLBackupSchedule {
    let spec = BackupScheduleSpec {
        schedule: "0 3 * * 0".to_string(),
        backup_template: BackupSpec {
            executor: Some(BackupExecutor {
                mysqldump: Some(MySqlDumpExecutor {
                    databases: vec![
                        Database {
                            name: "orders".to_string(),
                        },
                        Database {
                            name: "payments".to_string(),
                        },
                    ],
                }),
            }),
            storage_provider: Some(StorageProvider {
                s3: Some(S3StorageProvider {
                    bucket: "mysql-backups".to_string(),
                    endpoint: Some("http://minio.storage:9000".to_string()),
                    force_path_style: true,
                    ..Default::default()
                }),
            }),
            secret_ref: Some(LocalObjectReference {
                name: "mysql-root".to_string(),
            }),
            cluster: Some(LocalObjectReference {
                name: "mysql-prod".to_string(),
            }),
            scheduled_member: None,
        },
    };
    let mut schedule = MySQLBackupSchedule::new("weekly", spec);
    schedule.metadata.namespace = Some("databases".to_string());
    schedule.metadata.uid = Some("schedule-uid-1".to_string());
    schedule
}

#[test]
fn test_backup_copies_template() {
    let schedule = sample_schedule();
    let fire = Utc.with_ymd_and_hms(2024, 3, 10, 3, 0, 0).unwrap();

    let backup = build_scheduled_backup(&schedule, fire).unwrap();

    assert_eq!(backup.metadata.name.as_deref(), Some("weekly-202403100300"));
    assert_eq!(backup.spec, schedule.spec.backup_template);

    assert_json_include!(
        actual: serde_json::to_value(&backup).unwrap(),
        expected: json!({
            "apiVersion": "mysql.oracle.com/v1alpha1",
            "kind": "MySQLBackup",
            "metadata": {
                "namespace": "databases",
                "labels": {
                    "app.kubernetes.io/managed-by": "mysql-backup-operator",
                    "mysql.oracle.com/cluster": "mysql-prod"
                }
            },
            "spec": {
                "executor": { "mysqldump": { "databases": [{ "name": "orders" }, { "name": "payments" }] } },
                "storageProvider": {
                    "s3": {
                        "bucket": "mysql-backups",
                        "endpoint": "http://minio.storage:9000",
                        "forcePathStyle": true
                    }
                },
                "secretRef": { "name": "mysql-root" },
                "cluster": { "name": "mysql-prod" }
            }
        })
    );

    let labels = backup.metadata.labels.as_ref().unwrap();
    assert_eq!(labels.get(SCHEDULE_LABEL), Some(&"weekly".to_string()));
    assert!(backup
        .metadata
        .annotations
        .as_ref()
        .unwrap()
        .contains_key(FIRE_TIME_ANNOTATION));
}

#[test]
fn test_same_interval_yields_same_backup_name() {
    let schedule = sample_schedule();
    let fire = Utc.with_ymd_and_hms(2024, 3, 17, 3, 0, 0).unwrap();

    let first = build_scheduled_backup(&schedule, fire).unwrap();
    let second = build_scheduled_backup(&schedule, fire).unwrap();
    assert_eq!(first.metadata.name, second.metadata.name);

    let next_week = build_scheduled_backup(&schedule, fire + chrono::Duration::weeks(1)).unwrap();
    assert_ne!(first.metadata.name, next_week.metadata.name);
}

#[test]
fn test_long_schedule_names_never_share_a_backup() {
    let fire = Utc.with_ymd_and_hms(2024, 3, 10, 3, 0, 0).unwrap();
    let mut primary = sample_schedule();
    primary.metadata.name = Some(format!("{}-primary", "x".repeat(245)));
    let mut replica = sample_schedule();
    replica.metadata.name = Some(format!("{}-replica", "x".repeat(245)));

    let primary_backup = build_scheduled_backup(&primary, fire).unwrap();
    let replica_backup = build_scheduled_backup(&replica, fire).unwrap();

    assert_ne!(primary_backup.metadata.name, replica_backup.metadata.name);
    assert!(primary_backup.metadata.name.as_ref().unwrap().len() <= 253);
    assert_eq!(
        primary_backup.metadata.annotations.as_ref().unwrap()[SCHEDULE_ANNOTATION],
        primary.metadata.name.clone().unwrap()
    );
    assert!(primary_backup.metadata.labels.as_ref().unwrap()[SCHEDULE_LABEL].len() <= 63);

    // A same-named backup from another schedule is not ours to accept
    let mut foreign = primary_backup.clone();
    foreign.metadata.name = replica_backup.metadata.name.clone();
    assert!(is_scheduled_by(&primary_backup, &primary));
    assert!(!is_scheduled_by(&foreign, &replica));
}
