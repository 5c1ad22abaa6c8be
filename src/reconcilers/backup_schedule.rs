//! Phase state machine for MySQLBackupSchedule.
//!
//! ```text
//! New ──valid──▶ Enabled ──due──▶ trigger, advance lastBackup ─┐
//!  │                ▲   └────────────────────────────────────────┘
//!  └──invalid──▶ FailedValidation
//! ```
//!
//! A spec edit (new `metadata.generation`) sends Enabled and FailedValidation
//! schedules back through validation. Wall time is passed in by the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kube::ResourceExt;
use tracing::{debug, info, warn};

use crate::crd::{BackupSchedulePhase, MySQLBackupSchedule, ScheduleStatus};
use crate::error::{Error, Result};
use crate::schedule::{CronExpr, SchedulerClock};
use crate::status::conditions::{
    not_ready, ready, set_condition, REASON_BACKUP_TRIGGERED, REASON_FAILED_VALIDATION,
    REASON_SCHEDULE_VALID,
};
use crate::store::ScheduleStore;
use crate::trigger::BackupTrigger;
use crate::validation::{validate, TemplatePolicy};

use super::STATUS_UPDATE_ATTEMPTS;

/// What a single reconcile did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Validation ran and the schedule moved to this phase
    Transitioned(BackupSchedulePhase),
    /// Enabled, nothing due before `next_fire`, which is `wait` away
    NotDue {
        next_fire: DateTime<Utc>,
        wait: Duration,
    },
    /// A backup was submitted and `lastBackup` advanced to `fire_time`
    Triggered {
        fire_time: DateTime<Utc>,
        next_fire: Option<DateTime<Utc>>,
        wait: Option<Duration>,
    },
    /// Nothing to do until the object changes
    Idle,
    /// Deleted or being deleted; stop scheduling
    Gone,
}

pub struct ScheduleReconciler {
    store: Arc<dyn ScheduleStore>,
    trigger: Arc<dyn BackupTrigger>,
    policy: TemplatePolicy,
}

impl ScheduleReconciler {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        trigger: Arc<dyn BackupTrigger>,
        policy: TemplatePolicy,
    ) -> Self {
        Self {
            store,
            trigger,
            policy,
        }
    }

    /// Run one reconcile tick for `schedule` at wall time `now`.
    pub async fn reconcile(
        &self,
        schedule: &MySQLBackupSchedule,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome> {
        if schedule.metadata.deletion_timestamp.is_some() {
            debug!(name = %schedule.name_any(), "Schedule is being deleted, not scheduling");
            return Ok(ReconcileOutcome::Gone);
        }

        let phase = if schedule.spec_changed() {
            info!(
                name = %schedule.name_any(),
                generation = ?schedule.metadata.generation,
                "Spec changed, re-validating"
            );
            BackupSchedulePhase::New
        } else {
            schedule.phase()
        };

        match phase {
            BackupSchedulePhase::New => self.validate_schedule(schedule, now).await,
            BackupSchedulePhase::Enabled => self.tick(schedule, now).await,
            BackupSchedulePhase::FailedValidation => Ok(ReconcileOutcome::Idle),
        }
    }

    async fn validate_schedule(
        &self,
        schedule: &MySQLBackupSchedule,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome> {
        let name = schedule.name_any();
        let generation = schedule.metadata.generation;

        let (phase, condition) = match validate(&schedule.spec, self.policy) {
            Ok(cron) => {
                info!(%name, schedule = %cron, "Backup schedule validated");
                (
                    BackupSchedulePhase::Enabled,
                    ready(
                        REASON_SCHEDULE_VALID,
                        &format!("Backups scheduled with '{cron}'"),
                        now,
                    ),
                )
            }
            Err(e) => {
                warn!(%name, field = %e.field(), error = %e, "Backup schedule failed validation");
                (
                    BackupSchedulePhase::FailedValidation,
                    not_ready(REASON_FAILED_VALIDATION, &e.to_string(), now),
                )
            }
        };

        let written = self
            .write_status(schedule, |current, status| {
                // A newer spec than the one validated above gets its own pass
                if current.metadata.generation != generation {
                    return false;
                }
                status.phase = phase;
                status.observed_generation = generation;
                set_condition(&mut status.conditions, condition.clone());
                true
            })
            .await?;

        if written {
            Ok(ReconcileOutcome::Transitioned(phase))
        } else {
            Ok(ReconcileOutcome::Idle)
        }
    }

    async fn tick(
        &self,
        schedule: &MySQLBackupSchedule,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome> {
        let name = schedule.name_any();
        let namespace = schedule
            .namespace()
            .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;
        let created = schedule
            .created_at()
            .ok_or(Error::MissingObjectKey(".metadata.creationTimestamp"))?;
        let cron = CronExpr::parse(&schedule.spec.schedule)?;

        let clock = SchedulerClock::new(&cron, schedule.last_backup(), created);
        if !clock.is_due(now) {
            let outcome = not_due(&clock, &name, now)?;
            debug!(%name, ?outcome, "Backup not due");
            return Ok(outcome);
        }

        // Due-ness is decided against the persisted lastBackup, never the
        // watched copy, so a tick that races our own status write is a no-op.
        let Some(fresh) = self.store.get(&namespace, &name).await? else {
            return Ok(ReconcileOutcome::Gone);
        };
        if fresh.metadata.deletion_timestamp.is_some() {
            return Ok(ReconcileOutcome::Gone);
        }
        if fresh.spec_changed() || fresh.phase() != BackupSchedulePhase::Enabled {
            debug!(%name, "Schedule changed since it was observed, waiting for the next event");
            return Ok(ReconcileOutcome::Idle);
        }

        let clock = SchedulerClock::new(&cron, fresh.last_backup(), created);
        let Some(fire_time) = clock.latest_due(now) else {
            let outcome = not_due(&clock, &name, now)?;
            debug!(%name, ?outcome, "Backup already triggered for this interval");
            return Ok(outcome);
        };

        let trigger_time = self.trigger.submit(&fresh, fire_time).await?;
        info!(%name, %namespace, %fire_time, "Backup triggered");

        self.write_status(&fresh, |_, status| {
            if status.last_backup.is_some_and(|last| last >= trigger_time) {
                return false;
            }
            status.last_backup = Some(trigger_time);
            set_condition(
                &mut status.conditions,
                ready(
                    REASON_BACKUP_TRIGGERED,
                    &format!("Backup triggered for {}", trigger_time.to_rfc3339()),
                    now,
                ),
            );
            true
        })
        .await?;

        let clock = SchedulerClock::new(&cron, Some(trigger_time), created);
        Ok(ReconcileOutcome::Triggered {
            fire_time: trigger_time,
            next_fire: clock.next_fire(),
            wait: clock.until_next(now),
        })
    }

    /// Apply `mutate` to the persisted status and write it back, re-reading
    /// and retrying on conflict. `mutate` returns false to skip the write.
    async fn write_status<F>(&self, schedule: &MySQLBackupSchedule, mut mutate: F) -> Result<bool>
    where
        F: FnMut(&MySQLBackupSchedule, &mut ScheduleStatus) -> bool,
    {
        let name = schedule.name_any();
        let namespace = schedule
            .namespace()
            .ok_or(Error::MissingObjectKey(".metadata.namespace"))?;

        let mut current = schedule.clone();
        let mut attempt = 1;
        loop {
            let mut status = current.status.clone().unwrap_or_default();
            if !mutate(&current, &mut status) {
                return Ok(false);
            }

            match self.store.update_status(&current, &status).await {
                Ok(()) => return Ok(true),
                Err(Error::Conflict { .. }) if attempt < STATUS_UPDATE_ATTEMPTS => {
                    attempt += 1;
                    debug!(%name, attempt, "Retrying status update with a fresh read");
                    current = match self.store.get(&namespace, &name).await? {
                        Some(fresh) => fresh,
                        None => return Ok(false),
                    };
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn not_due(clock: &SchedulerClock<'_>, name: &str, now: DateTime<Utc>) -> Result<ReconcileOutcome> {
    match (clock.next_fire(), clock.until_next(now)) {
        (Some(next_fire), Some(wait)) => Ok(ReconcileOutcome::NotDue { next_fire, wait }),
        _ => Err(Error::NoUpcomingFire(name.to_string())),
    }
}
