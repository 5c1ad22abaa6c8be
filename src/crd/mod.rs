pub mod backup_schedule;
pub mod common;
pub mod mysql_backup;

pub use backup_schedule::*;
pub use common::*;
pub use mysql_backup::*;
