//! Access to persisted MySQLBackupSchedule objects.
//!
//! The API server is the single source of truth. The reconciler reads through
//! this trait before every decision that depends on status and never caches
//! status across invocations. Change notifications come from the controller's
//! watcher, not from this trait.

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::crd::{MySQLBackupSchedule, MySQLBackupScheduleList, ScheduleStatus};
use crate::error::Result;

pub mod kubernetes;

pub use self::kubernetes::KubeScheduleStore;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Fetch a schedule, `None` when it no longer exists.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<MySQLBackupSchedule>>;

    /// List every schedule visible to the operator.
    async fn list(&self) -> Result<MySQLBackupScheduleList>;

    /// Replace the status of `schedule`.
    ///
    /// Fails with `Error::Conflict` when the object changed since `schedule`
    /// was read.
    async fn update_status(
        &self,
        schedule: &MySQLBackupSchedule,
        status: &ScheduleStatus,
    ) -> Result<()>;
}
