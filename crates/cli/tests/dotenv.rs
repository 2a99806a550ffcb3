use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn bench(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tilefw-bench"));
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("FW_SEED")
        .env_remove("FW_MAX_WEIGHT")
        .env_remove("FW_VALIDATE")
        .env_remove("FW_REPORT_FORMAT")
        .env_remove("FW_THREADS");
    cmd
}

#[test]
fn log_filter_is_read_from_dotenv() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "RUST_LOG=info\nFW_REPORT_FORMAT=csv\n").unwrap();

    let out = bench(&dir).args(["tasks", "8", "2", "2"]).output().unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Task engine started"), "{}", stderr);

    let stdout = String::from_utf8_lossy(&out.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("FINE_TASK,8,2,"), "{}", lines[0]);
    assert!(lines[1].starts_with("FINE_TASK_RECYCLED,8,2,"), "{}", lines[1]);
}

#[test]
fn quiet_without_dotenv() {
    let dir = TempDir::new().unwrap();

    let out = bench(&dir).args(["recursive", "8", "4", "1"]).output().unwrap();
    assert!(out.status.success());
    assert!(!String::from_utf8_lossy(&out.stderr).contains("Task engine started"));
    assert_eq!(String::from_utf8_lossy(&out.stdout).lines().count(), 2);
}

#[test]
fn wrong_argument_count_exits_with_usage() {
    let dir = TempDir::new().unwrap();

    let out = bench(&dir).args(["tasks", "64", "8"]).output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Usage"));
    assert!(out.stdout.is_empty());
}
