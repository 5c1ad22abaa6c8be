use chrono::{DateTime, Utc};

use super::cron::CronExpr;

/// Due-ness of a schedule relative to the last time it fired.
///
/// The clock never reads wall time; callers pass `now` in.
#[derive(Debug, Clone)]
pub struct SchedulerClock<'a> {
    cron: &'a CronExpr,
    reference: DateTime<Utc>,
}

impl<'a> SchedulerClock<'a> {
    /// `last_fired` is the persisted `lastBackup`; when absent the schedule's
    /// creation time is the reference instead.
    pub fn new(
        cron: &'a CronExpr,
        last_fired: Option<DateTime<Utc>>,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            cron,
            reference: last_fired.unwrap_or(created),
        }
    }

    /// First fire time strictly after the reference.
    pub fn next_fire(&self) -> Option<DateTime<Utc>> {
        self.cron.next_after(&self.reference)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_fire().is_some_and(|next| next <= now)
    }

    /// Most recent fire time at or before `now`. Intervals missed since the
    /// reference collapse into this one.
    pub fn latest_due(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cron
            .prev_at_or_before(&now)
            .filter(|fire| *fire > self.reference)
    }

    /// Time left until the next fire, zero when already due.
    pub fn until_next(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        let next = self.next_fire()?;
        Some((next - now).to_std().unwrap_or_default())
    }
}
