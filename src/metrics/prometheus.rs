use chrono::{DateTime, Utc};
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

use crate::crd::{BackupSchedulePhase, MySQLBackupSchedule};

/// Prometheus metrics state for the operator
pub struct MetricsState {
    registry: Registry,
    pub reconciliations_total: IntCounterVec,
    pub reconcile_duration_seconds: Histogram,
    pub triggers_total: IntCounterVec,
    pub trigger_failures_total: IntCounterVec,
    pub validation_failures_total: IntCounterVec,
    pub last_backup_timestamp_seconds: GaugeVec,
    pub schedules: IntGaugeVec,
}

impl Default for MetricsState {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsState {
    pub fn new() -> Self {
        let registry = Registry::new();

        let reconciliations_total = IntCounterVec::new(
            Opts::new(
                "mysql_backup_schedule_reconciliations_total",
                "Total number of backup schedule reconciliations",
            ),
            &["result"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(reconciliations_total.clone()))
            .expect("metric registration");

        let reconcile_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "mysql_backup_schedule_reconcile_duration_seconds",
                "Duration of backup schedule reconciliations in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(reconcile_duration_seconds.clone()))
            .expect("metric registration");

        let triggers_total = IntCounterVec::new(
            Opts::new(
                "mysql_backup_schedule_triggers_total",
                "Total number of backups triggered by schedules",
            ),
            &["schedule", "namespace"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(triggers_total.clone()))
            .expect("metric registration");

        let trigger_failures_total = IntCounterVec::new(
            Opts::new(
                "mysql_backup_schedule_trigger_failures_total",
                "Total number of failed backup trigger submissions",
            ),
            &["schedule", "namespace"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(trigger_failures_total.clone()))
            .expect("metric registration");

        let validation_failures_total = IntCounterVec::new(
            Opts::new(
                "mysql_backup_schedule_validation_failures_total",
                "Total number of schedules that failed validation",
            ),
            &["schedule", "namespace"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(validation_failures_total.clone()))
            .expect("metric registration");

        let last_backup_timestamp_seconds = GaugeVec::new(
            Opts::new(
                "mysql_backup_schedule_last_backup_timestamp_seconds",
                "Fire time of the last triggered backup (unix epoch)",
            ),
            &["schedule", "namespace"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(last_backup_timestamp_seconds.clone()))
            .expect("metric registration");

        let schedules = IntGaugeVec::new(
            Opts::new(
                "mysql_backup_schedules",
                "Number of backup schedules by phase at startup",
            ),
            &["phase"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(schedules.clone()))
            .expect("metric registration");

        Self {
            registry,
            reconciliations_total,
            reconcile_duration_seconds,
            triggers_total,
            trigger_failures_total,
            validation_failures_total,
            last_backup_timestamp_seconds,
            schedules,
        }
    }

    /// Gather all metrics and encode as Prometheus text format
    pub fn gather(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    pub fn record_reconcile(&self, result: &str, duration_secs: f64) {
        self.reconciliations_total
            .with_label_values(&[result])
            .inc();
        self.reconcile_duration_seconds.observe(duration_secs);
    }

    pub fn record_trigger(&self, schedule: &str, namespace: &str, fire_time: DateTime<Utc>) {
        self.triggers_total
            .with_label_values(&[schedule, namespace])
            .inc();
        self.last_backup_timestamp_seconds
            .with_label_values(&[schedule, namespace])
            .set(fire_time.timestamp() as f64);
    }

    pub fn record_trigger_failure(&self, schedule: &str, namespace: &str) {
        self.trigger_failures_total
            .with_label_values(&[schedule, namespace])
            .inc();
    }

    pub fn record_validation_failure(&self, schedule: &str, namespace: &str) {
        self.validation_failures_total
            .with_label_values(&[schedule, namespace])
            .inc();
    }

    /// Set the per-phase schedule counts from a listing.
    pub fn record_inventory(&self, schedules: &[MySQLBackupSchedule]) {
        for phase in [
            BackupSchedulePhase::New,
            BackupSchedulePhase::Enabled,
            BackupSchedulePhase::FailedValidation,
        ] {
            let count = schedules.iter().filter(|s| s.phase() == phase).count();
            self.schedules
                .with_label_values(&[&phase.to_string()])
                .set(count as i64);
        }
    }
}
