mod backup_schedule_test;
mod scheduled_backup_test;
