use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::validation::TemplatePolicy;

/// Runtime configuration, from flags or environment
#[derive(Parser, Debug, Clone)]
#[command(name = "mysql-backup-operator")]
#[command(about = "Triggers MySQL backups from MySQLBackupSchedule resources", version)]
pub struct OperatorConfig {
    /// Namespace to watch (empty for all namespaces)
    #[arg(short, long, env = "WATCH_NAMESPACE", default_value = "")]
    pub namespace: String,

    /// Address for the health and metrics server
    #[arg(long, env = "METRICS_ADDR", default_value = "0.0.0.0:9090")]
    pub metrics_addr: SocketAddr,

    /// Upper bound between reconciles of an enabled schedule
    #[arg(long, env = "RESYNC_INTERVAL_SECS", default_value_t = 300)]
    pub resync_interval_secs: u64,

    /// Delay before retrying a failed reconcile
    #[arg(long, env = "ERROR_REQUEUE_SECS", default_value_t = 30)]
    pub error_requeue_secs: u64,

    /// How strictly backup templates are validated
    #[arg(long, env = "TEMPLATE_POLICY", value_enum, default_value_t = TemplatePolicy::Strict)]
    pub template_policy: TemplatePolicy,
}

impl OperatorConfig {
    pub fn watch_namespace(&self) -> Option<&str> {
        Some(self.namespace.as_str()).filter(|ns| !ns.is_empty())
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }
}
