//! Cron parsing and next-fire computation for backup schedules.

pub mod clock;
pub mod cron;

pub use clock::SchedulerClock;
pub use cron::{CronExpr, CronField, CronParseError};
