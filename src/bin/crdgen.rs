use kube::CustomResourceExt;
use std::fs;
use std::path::Path;

use mysql_backup_operator::crd::{MySQLBackup, MySQLBackupSchedule};

fn main() {
    let crds_dir = Path::new("deploy/crds");
    fs::create_dir_all(crds_dir).expect("Failed to create deploy/crds directory");

    let schedule_crd = serde_yaml::to_string(&MySQLBackupSchedule::crd())
        .expect("Failed to serialize MySQLBackupSchedule CRD");
    fs::write(crds_dir.join("mysqlbackupschedules.yaml"), schedule_crd)
        .expect("Failed to write MySQLBackupSchedule CRD");
    println!("Generated deploy/crds/mysqlbackupschedules.yaml");

    let backup_crd =
        serde_yaml::to_string(&MySQLBackup::crd()).expect("Failed to serialize MySQLBackup CRD");
    fs::write(crds_dir.join("mysqlbackups.yaml"), backup_crd)
        .expect("Failed to write MySQLBackup CRD");
    println!("Generated deploy/crds/mysqlbackups.yaml");
}
