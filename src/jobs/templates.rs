use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::reconcilers::{MANAGED_BY, SCHEDULE_LABEL};

/// Max length of a Kubernetes object name
const MAX_NAME_LEN: usize = 253;

/// Max length of a label value
const MAX_LABEL_VALUE_LEN: usize = 63;

const HASH_LEN: usize = 8;

/// Build standard labels for backups created by a schedule
pub fn build_labels(schedule_name: &str, cluster_name: Option<&str>) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(
        "app.kubernetes.io/name".to_string(),
        "mysql-backup".to_string(),
    );
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        MANAGED_BY.to_string(),
    );
    labels.insert(
        SCHEDULE_LABEL.to_string(),
        shorten(schedule_name, MAX_LABEL_VALUE_LEN),
    );
    if let Some(cluster) = cluster_name {
        labels.insert(
            "mysql.oracle.com/cluster".to_string(),
            shorten(cluster, MAX_LABEL_VALUE_LEN),
        );
    }
    labels
}

/// Name of the backup triggered for one fire of a schedule.
///
/// Derived from the fire time alone so a repeated submission for the same
/// interval collides with the first one.
pub fn scheduled_backup_name(schedule_name: &str, fire_time: DateTime<Utc>) -> String {
    let suffix = fire_time.format("%Y%m%d%H%M").to_string();
    let prefix = shorten(schedule_name, MAX_NAME_LEN - suffix.len() - 1);
    format!("{prefix}-{suffix}")
}

/// Fit `value` into `max` bytes. Values that are too long keep their head and
/// end in a hash of the whole value, so distinct inputs stay distinct.
/// Kubernetes names and label values are ASCII.
fn shorten(value: &str, max: usize) -> String {
    if value.len() <= max {
        return value.to_string();
    }
    let hash = blake3::hash(value.as_bytes()).to_hex();
    let head = value[..max - HASH_LEN - 1].trim_end_matches(['-', '.', '_']);
    format!("{head}-{}", &hash.as_str()[..HASH_LEN])
}
