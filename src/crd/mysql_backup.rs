use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{BackupExecutor, LocalObjectReference, StorageProvider};

/// MySQLBackup requests a single backup of a MySQL cluster.
/// Backup schedules create one of these per fire; another controller executes it.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "mysql.oracle.com",
    version = "v1alpha1",
    kind = "MySQLBackup",
    plural = "mysqlbackups",
    shortname = "mysqlbackup",
    namespaced,
    printcolumn = r#"{"name":"Cluster","type":"string","jsonPath":".spec.cluster.name"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    /// Backup executor configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executor: Option<BackupExecutor>,

    /// Storage destination configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_provider: Option<StorageProvider>,

    /// Secret holding the MySQL credentials used by the executor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<LocalObjectReference>,

    /// The MySQLCluster to back up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<LocalObjectReference>,

    /// Cluster member the backup runs against (chosen by the executor when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_member: Option<String>,
}
