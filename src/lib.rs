//! Controller for MySQLBackupSchedule resources.
//!
//! Watches schedule objects, validates their cron expression and backup
//! template, and creates a MySQLBackup each time a schedule comes due.

pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod reconcilers;
pub mod schedule;
pub mod status;
pub mod store;
pub mod trigger;
pub mod validation;
