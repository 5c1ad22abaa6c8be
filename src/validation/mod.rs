//! Validation of backup schedule specs.
//!
//! Runs whenever a schedule is `New` or its spec generation changed. Pure:
//! the result depends only on the spec and the configured template policy.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::crd::{BackupScheduleSpec, BackupSpec};
use crate::schedule::{CronExpr, CronParseError};

static DNS_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid DNS subdomain regex")
});

/// How strictly the backup template is checked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum TemplatePolicy {
    /// Require cluster, executor and storage provider in the template
    #[default]
    Strict,
    /// Only check the cron expression; leave the template to admission
    CronOnly,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("spec.schedule: {0}")]
    Schedule(#[source] CronParseError),

    #[error("spec.schedule: '{0}' never matches a calendar date")]
    ScheduleNeverFires(String),

    #[error("spec.backupTemplate.{field}: {reason}")]
    Template { field: &'static str, reason: String },
}

impl ValidationError {
    /// Path of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Schedule(_) | ValidationError::ScheduleNeverFires(_) => "schedule",
            ValidationError::Template { field, .. } => *field,
        }
    }

    fn missing(field: &'static str) -> Self {
        ValidationError::Template {
            field,
            reason: "required field is missing".to_string(),
        }
    }
}

/// Validate a schedule spec, returning the parsed cron expression on success.
pub fn validate(
    spec: &BackupScheduleSpec,
    policy: TemplatePolicy,
) -> Result<CronExpr, ValidationError> {
    let cron = CronExpr::parse(&spec.schedule).map_err(ValidationError::Schedule)?;
    if !cron.is_satisfiable() {
        return Err(ValidationError::ScheduleNeverFires(spec.schedule.clone()));
    }

    match policy {
        TemplatePolicy::Strict => validate_template(&spec.backup_template)?,
        TemplatePolicy::CronOnly => {}
    }

    Ok(cron)
}

fn validate_template(template: &BackupSpec) -> Result<(), ValidationError> {
    let cluster = template
        .cluster
        .as_ref()
        .filter(|c| !c.name.is_empty())
        .ok_or_else(|| ValidationError::missing("cluster.name"))?;
    if cluster.name.len() > 253 || !DNS_SUBDOMAIN.is_match(&cluster.name) {
        return Err(ValidationError::Template {
            field: "cluster.name",
            reason: format!("'{}' is not a valid resource name", cluster.name),
        });
    }

    let mysqldump = template
        .executor
        .as_ref()
        .ok_or_else(|| ValidationError::missing("executor"))?
        .mysqldump
        .as_ref()
        .ok_or_else(|| ValidationError::missing("executor.mysqldump"))?;
    if mysqldump.databases.is_empty() {
        return Err(ValidationError::Template {
            field: "executor.mysqldump.databases",
            reason: "at least one database is required".to_string(),
        });
    }
    if mysqldump.databases.iter().any(|db| db.name.trim().is_empty()) {
        return Err(ValidationError::Template {
            field: "executor.mysqldump.databases",
            reason: "database names must not be empty".to_string(),
        });
    }

    let s3 = template
        .storage_provider
        .as_ref()
        .ok_or_else(|| ValidationError::missing("storageProvider"))?
        .s3
        .as_ref()
        .ok_or_else(|| ValidationError::missing("storageProvider.s3"))?;
    if s3.bucket.is_empty() {
        return Err(ValidationError::missing("storageProvider.s3.bucket"));
    }

    Ok(())
}
