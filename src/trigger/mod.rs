//! Submission of single backup runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

use crate::crd::MySQLBackupSchedule;
use crate::error::Result;

pub mod kubernetes;

pub use self::kubernetes::KubeBackupTrigger;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackupTrigger: Send + Sync {
    /// Start one backup from `schedule`'s template for the interval that fired
    /// at `fire_time`. Returns the trigger time to record as `lastBackup`.
    ///
    /// Does not wait for the backup to run. Callers make sure one interval is
    /// submitted at most once.
    async fn submit(
        &self,
        schedule: &MySQLBackupSchedule,
        fire_time: DateTime<Utc>,
    ) -> Result<DateTime<Utc>>;
}
