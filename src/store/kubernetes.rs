use async_trait::async_trait;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use tracing::debug;

use crate::crd::{MySQLBackupSchedule, MySQLBackupScheduleList, ScheduleStatus};
use crate::error::{Error, Result};
use crate::reconcilers::MANAGED_BY;

use super::ScheduleStore;

/// Schedule store backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeScheduleStore {
    client: Client,
    /// Namespace to list in, all namespaces when `None`
    namespace: Option<String>,
}

impl KubeScheduleStore {
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self { client, namespace }
    }

    fn namespaced(&self, namespace: &str) -> Api<MySQLBackupSchedule> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ScheduleStore for KubeScheduleStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<MySQLBackupSchedule>> {
        Ok(self.namespaced(namespace).get_opt(name).await?)
    }

    async fn list(&self) -> Result<MySQLBackupScheduleList> {
        let api: Api<MySQLBackupSchedule> = match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        Ok(api.list(&ListParams::default()).await?)
    }

    async fn update_status(
        &self,
        schedule: &MySQLBackupSchedule,
        status: &ScheduleStatus,
    ) -> Result<()> {
        let name = schedule.name_any();
        let namespace = schedule
            .namespace()
            .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
        let resource_version = schedule
            .resource_version()
            .ok_or(Error::MissingObjectKey(".metadata.resourceVersion"))?;

        // Carrying resourceVersion makes the API server reject the patch with
        // 409 if anyone wrote the object after we read it.
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": resource_version },
            "status": status,
        });
        let result = self
            .namespaced(&namespace)
            .patch_status(&name, &PatchParams::apply(MANAGED_BY), &Patch::Merge(&patch))
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                debug!(%name, %namespace, "Status update conflicted");
                Err(Error::Conflict { name, namespace })
            }
            Err(e) => Err(Error::Kube(e)),
        }
    }
}
