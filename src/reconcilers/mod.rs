pub mod backup_schedule;

/// Field manager and `app.kubernetes.io/managed-by` value used by this operator
pub const MANAGED_BY: &str = "mysql-backup-operator";

/// Label linking a triggered backup to the schedule that created it
pub const SCHEDULE_LABEL: &str = "mysql.oracle.com/backup-schedule";

/// Annotation holding the full name of the schedule that created a backup
pub const SCHEDULE_ANNOTATION: &str = "mysql.oracle.com/backup-schedule";

/// Annotation recording the fire time a backup was triggered for
pub const FIRE_TIME_ANNOTATION: &str = "mysql.oracle.com/scheduled-fire-time";

/// Attempts at a status write before giving up until the next tick
pub const STATUS_UPDATE_ATTEMPTS: usize = 3;
