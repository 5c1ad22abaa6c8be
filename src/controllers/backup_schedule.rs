use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::StreamExt;
use kube::{
    runtime::{
        controller::{Action, Controller},
        watcher::Config,
    },
    Api, Client, ResourceExt,
};
use tracing::{error, info, instrument, warn};

use crate::config::OperatorConfig;
use crate::crd::{BackupSchedulePhase, MySQLBackupSchedule};
use crate::error::Error;
use crate::metrics::prometheus::MetricsState;
use crate::reconcilers::backup_schedule::{ReconcileOutcome, ScheduleReconciler};
use crate::store::{KubeScheduleStore, ScheduleStore};
use crate::trigger::KubeBackupTrigger;

struct Context {
    reconciler: ScheduleReconciler,
    metrics: Arc<MetricsState>,
    resync_interval: Duration,
    error_requeue: Duration,
}

/// The controller's work queue is keyed by object reference, so no two
/// reconciles of the same schedule run at once.
#[instrument(skip(schedule, ctx), fields(name = %schedule.name_any(), namespace = ?schedule.namespace()))]
async fn reconcile(schedule: Arc<MySQLBackupSchedule>, ctx: Arc<Context>) -> Result<Action, Error> {
    let name = schedule.name_any();
    let namespace = schedule.namespace().unwrap_or_default();
    let start = Instant::now();

    let result = ctx.reconciler.reconcile(&schedule, Utc::now()).await;
    let duration = start.elapsed().as_secs_f64();

    match &result {
        Ok(outcome) => {
            ctx.metrics.record_reconcile("success", duration);
            match outcome {
                ReconcileOutcome::Triggered { fire_time, .. } => {
                    ctx.metrics.record_trigger(&name, &namespace, *fire_time)
                }
                ReconcileOutcome::Transitioned(BackupSchedulePhase::FailedValidation) => {
                    ctx.metrics.record_validation_failure(&name, &namespace)
                }
                _ => {}
            }
        }
        Err(e) => {
            ctx.metrics.record_reconcile("error", duration);
            if matches!(e, Error::TriggerSubmission(_)) {
                ctx.metrics.record_trigger_failure(&name, &namespace);
            }
        }
    }

    let outcome = result?;
    info!(?outcome, "Reconciled MySQLBackupSchedule");
    Ok(requeue_action(&outcome, ctx.resync_interval))
}

/// Map an outcome to the next wake-up. Enabled schedules wake at their next
/// fire time, capped by the resync interval.
pub fn requeue_action(outcome: &ReconcileOutcome, resync: Duration) -> Action {
    let clamp = |wait: Duration| wait.min(resync).max(Duration::from_secs(1));

    match outcome {
        ReconcileOutcome::Transitioned(BackupSchedulePhase::Enabled) => {
            Action::requeue(Duration::from_secs(1))
        }
        ReconcileOutcome::Transitioned(_) => Action::await_change(),
        ReconcileOutcome::NotDue { wait, .. } => Action::requeue(clamp(*wait)),
        ReconcileOutcome::Triggered { wait, .. } => match wait {
            Some(wait) => Action::requeue(clamp(*wait)),
            None => Action::requeue(resync),
        },
        ReconcileOutcome::Idle | ReconcileOutcome::Gone => Action::await_change(),
    }
}

fn error_policy(schedule: Arc<MySQLBackupSchedule>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = schedule.name_any();
    if error.is_transient_store() {
        warn!(%name, %error, reason = error.reason(), "Store error, retrying");
    } else {
        error!(%name, %error, reason = error.reason(), "Reconciliation error for MySQLBackupSchedule");
    }
    Action::requeue(ctx.error_requeue)
}

pub async fn run(client: Client, config: &OperatorConfig, metrics: Arc<MetricsState>) {
    let schedules: Api<MySQLBackupSchedule> = match config.watch_namespace() {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    };

    let store = Arc::new(KubeScheduleStore::new(
        client.clone(),
        config.watch_namespace().map(str::to_string),
    ));
    match store.list().await {
        Ok(existing) => {
            info!(count = existing.items.len(), "Found existing MySQLBackupSchedules");
            metrics.record_inventory(&existing.items);
        }
        Err(e) => warn!(error = %e, "Failed to list MySQLBackupSchedules"),
    }

    let context = Arc::new(Context {
        reconciler: ScheduleReconciler::new(
            store,
            Arc::new(KubeBackupTrigger::new(client)),
            config.template_policy,
        ),
        metrics,
        resync_interval: config.resync_interval(),
        error_requeue: config.error_requeue(),
    });

    info!("Starting MySQLBackupSchedule controller");

    Controller::new(schedules, Config::default().any_semantic())
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Reconcile failed: {:?}", e);
            }
        })
        .await;

    info!("MySQLBackupSchedule controller shut down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 15, 0).unwrap()
    }

    const RESYNC: Duration = Duration::from_secs(300);

    #[test]
    fn test_not_due_requeues_at_next_fire() {
        let outcome = ReconcileOutcome::NotDue {
            next_fire: now() + chrono::Duration::minutes(2),
            wait: Duration::from_secs(120),
        };
        assert_eq!(
            requeue_action(&outcome, RESYNC),
            Action::requeue(Duration::from_secs(120))
        );
    }

    #[test]
    fn test_requeue_capped_by_resync() {
        let outcome = ReconcileOutcome::Triggered {
            fire_time: now(),
            next_fire: Some(now() + chrono::Duration::hours(24)),
            wait: Some(Duration::from_secs(24 * 3600)),
        };
        assert_eq!(requeue_action(&outcome, RESYNC), Action::requeue(RESYNC));
    }

    #[test]
    fn test_overdue_wait_is_floored_to_one_second() {
        let outcome = ReconcileOutcome::NotDue {
            next_fire: now(),
            wait: Duration::ZERO,
        };
        assert_eq!(
            requeue_action(&outcome, RESYNC),
            Action::requeue(Duration::from_secs(1))
        );
    }

    #[test]
    fn test_terminal_outcomes_wait_for_change() {
        for outcome in [
            ReconcileOutcome::Idle,
            ReconcileOutcome::Gone,
            ReconcileOutcome::Transitioned(BackupSchedulePhase::FailedValidation),
        ] {
            assert_eq!(requeue_action(&outcome, RESYNC), Action::await_change());
        }
    }
}
