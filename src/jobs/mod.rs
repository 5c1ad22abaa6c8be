pub mod scheduled_backup;
pub mod templates;
