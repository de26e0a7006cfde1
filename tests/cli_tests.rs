//! Tests of the `addrdesk` binary.

use addrdesk::config::ConnectionConfig;
use addrdesk::core::db::ReferenceKind;
use addrdesk::records::{PersonRecord, RecordService};
use assert_cmd::Command;
use tempfile::TempDir;

fn addrdesk(dir: &TempDir, db_name: &str) -> Command {
    let mut cmd = Command::cargo_bin("addrdesk").unwrap();
    cmd.env("ADDRDESK_CONFIG", dir.path().join("config.toml"))
        .env("ADDRDESK_DB_NAME", dir.path().join(db_name))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_init_then_list() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "[ui]\npage_size = 10\n").unwrap();

    addrdesk(&dir, "desk.db").arg("init").assert().success();
    assert!(dir.path().join("desk.db").exists());

    let output = addrdesk(&dir, "desk.db").arg("list").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Surname"));
    assert!(stdout.contains("(0 records)"));
}

#[test]
fn test_list_as_json() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "").unwrap();
    addrdesk(&dir, "desk.db").arg("init").assert().success();

    let service = RecordService::new(ConnectionConfig::for_path(dir.path().join("desk.db")));
    for (kind, value) in [
        (ReferenceKind::Surname, "Ivanov"),
        (ReferenceKind::Name, "Ivan"),
        (ReferenceKind::Street, "Lenina"),
    ] {
        assert!(service.insert_reference_value(kind, value).unwrap().success);
    }
    let record = PersonRecord {
        surname_id: Some(1),
        name_id: Some(1),
        street_id: Some(1),
        building: Some("10".to_string()),
        ..PersonRecord::default()
    };
    assert!(service.insert_record(&record).unwrap().success);

    let output = addrdesk(&dir, "desk.db").args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    let views: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let views = views.as_array().unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0]["surname"], "Ivanov");
    assert_eq!(views[0]["street"], "Lenina");
    assert_eq!(views[0]["record"]["building"], "10");
    assert!(views[0]["record"]["phone"].is_null());
}

#[test]
fn test_repl_session() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "").unwrap();
    addrdesk(&dir, "desk.db").arg("init").assert().success();

    let output = addrdesk(&dir, "desk.db")
        .arg("repl")
        .write_stdin(":ref street add Lenina\n:ref street\n:quit\n")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Saved."));
    assert!(stdout.contains("Lenina"));
}

#[test]
fn test_unreachable_database_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.toml"), "").unwrap();

    let output = addrdesk(&dir, "missing.db").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cannot reach the database"));
    assert!(!dir.path().join("missing.db").exists());
}

#[test]
fn test_bad_arguments_exit_with_usage() {
    let dir = tempfile::tempdir().unwrap();
    let output = addrdesk(&dir, "desk.db").arg("export").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage: addrdesk"));
}
