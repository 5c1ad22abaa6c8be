use std::fmt;

use chrono::{DateTime, Utc};
use kube::api::ObjectList;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::Condition;
use super::mysql_backup::BackupSpec;

/// MySQLBackupSchedule triggers backups of a MySQL cluster on a cron schedule.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "mysql.oracle.com",
    version = "v1alpha1",
    kind = "MySQLBackupSchedule",
    plural = "mysqlbackupschedules",
    shortname = "mysqlbackupschedule",
    status = "ScheduleStatus",
    namespaced,
    printcolumn = r#"{"name":"Schedule","type":"string","jsonPath":".spec.schedule"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Last Backup","type":"date","jsonPath":".status.lastBackup"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BackupScheduleSpec {
    /// Cron expression used for backup scheduling (e.g., "0 2 * * *")
    pub schedule: String,

    /// Specification copied into every backup this schedule triggers
    #[serde(default)]
    pub backup_template: BackupSpec,
}

/// Lifecycle phase of a backup schedule
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum BackupSchedulePhase {
    /// Created but not yet processed by the controller
    #[default]
    New,
    /// Validated; backups are triggered according to the schedule
    Enabled,
    /// Rejected by validation; no backups are triggered
    FailedValidation,
}

impl fmt::Display for BackupSchedulePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackupSchedulePhase::New => "New",
            BackupSchedulePhase::Enabled => "Enabled",
            BackupSchedulePhase::FailedValidation => "FailedValidation",
        };
        f.write_str(s)
    }
}

/// Observed state of a backup schedule, owned by the controller
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStatus {
    /// Current phase
    #[serde(default)]
    pub phase: BackupSchedulePhase,

    /// Fire time of the most recently triggered backup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_backup: Option<DateTime<Utc>>,

    /// Generation of the spec that was last validated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

pub type MySQLBackupScheduleList = ObjectList<MySQLBackupSchedule>;

impl MySQLBackupSchedule {
    /// Current phase, `New` when no status has been written yet.
    pub fn phase(&self) -> BackupSchedulePhase {
        self.status.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    pub fn last_backup(&self) -> Option<DateTime<Utc>> {
        self.status.as_ref().and_then(|s| s.last_backup)
    }

    /// Whether the spec changed since it was last validated.
    pub fn spec_changed(&self) -> bool {
        let observed = self.status.as_ref().and_then(|s| s.observed_generation);
        match (self.metadata.generation, observed) {
            (Some(generation), Some(observed)) => generation != observed,
            (Some(_), None) => self.phase() != BackupSchedulePhase::New,
            (None, _) => false,
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.metadata.creation_timestamp.as_ref().map(|t| t.0)
    }
}
