use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;

use crate::crd::{MySQLBackup, MySQLBackupSchedule};
use crate::error::{Error, Result};
use crate::reconcilers::{FIRE_TIME_ANNOTATION, SCHEDULE_ANNOTATION};

use super::templates::{build_labels, scheduled_backup_name};

/// Build the MySQLBackup requested by one fire of a schedule.
///
/// The template is copied as a value; later edits to the schedule do not
/// reach backups that were already created. Backups carry no owner reference
/// so they outlive the schedule that created them.
pub fn build_scheduled_backup(
    schedule: &MySQLBackupSchedule,
    fire_time: DateTime<Utc>,
) -> Result<MySQLBackup> {
    let schedule_name = schedule.name_any();
    let namespace = schedule
        .namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
    let template = schedule.spec.backup_template.clone();

    let labels = build_labels(
        &schedule_name,
        template.cluster.as_ref().map(|c| c.name.as_str()),
    );
    let annotations = [
        (SCHEDULE_ANNOTATION.to_string(), schedule_name.clone()),
        (FIRE_TIME_ANNOTATION.to_string(), fire_time.to_rfc3339()),
    ]
    .into_iter()
    .collect();

    Ok(MySQLBackup {
        metadata: ObjectMeta {
            name: Some(scheduled_backup_name(&schedule_name, fire_time)),
            namespace: Some(namespace),
            labels: Some(labels),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: template,
    })
}

/// Whether `backup` was created by `schedule`, as opposed to an unrelated
/// object that happens to share its name.
pub fn is_scheduled_by(backup: &MySQLBackup, schedule: &MySQLBackupSchedule) -> bool {
    backup.namespace() == schedule.namespace()
        && backup
            .annotations()
            .get(SCHEDULE_ANNOTATION)
            .is_some_and(|owner| *owner == schedule.name_any())
}
