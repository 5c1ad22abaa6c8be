use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};
use tracing::{debug, info, warn};

use crate::crd::{MySQLBackup, MySQLBackupSchedule};
use crate::error::{Error, Result};
use crate::jobs::scheduled_backup::{build_scheduled_backup, is_scheduled_by};
use crate::reconcilers::MANAGED_BY;

use super::BackupTrigger;

/// Triggers backups by creating MySQLBackup objects for the backup controller
#[derive(Clone)]
pub struct KubeBackupTrigger {
    client: Client,
}

impl KubeBackupTrigger {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BackupTrigger for KubeBackupTrigger {
    async fn submit(
        &self,
        schedule: &MySQLBackupSchedule,
        fire_time: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        let backup = build_scheduled_backup(schedule, fire_time)?;
        let backup_name = backup.name_any();
        let namespace = backup
            .namespace()
            .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;

        let backups: Api<MySQLBackup> = Api::namespaced(self.client.clone(), &namespace);
        let pp = PostParams {
            field_manager: Some(MANAGED_BY.to_string()),
            ..Default::default()
        };

        match backups.create(&pp, &backup).await {
            Ok(_) => {
                info!(%backup_name, %namespace, %fire_time, "Created MySQLBackup");
                Ok(fire_time)
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                let existing = backups
                    .get_opt(&backup_name)
                    .await
                    .map_err(|e| Error::TriggerSubmission(e.to_string()))?;
                match existing {
                    // Same schedule, same fire time: this interval was already submitted
                    Some(existing) if is_scheduled_by(&existing, schedule) => {
                        debug!(%backup_name, %namespace, "MySQLBackup already exists for this interval");
                        Ok(fire_time)
                    }
                    Some(_) => {
                        warn!(%backup_name, %namespace, "MySQLBackup name is taken by another object");
                        Err(Error::TriggerSubmission(format!(
                            "MySQLBackup '{backup_name}' already exists and was not created by schedule '{}'",
                            schedule.name_any()
                        )))
                    }
                    None => Err(Error::TriggerSubmission(format!(
                        "MySQLBackup '{backup_name}' conflicted but is no longer present"
                    ))),
                }
            }
            Err(e) => Err(Error::TriggerSubmission(e.to_string())),
        }
    }
}
