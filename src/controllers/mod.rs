pub mod backup_schedule;
