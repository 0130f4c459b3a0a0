#![forbid(unsafe_code)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const GUARD_DAY: &str = r#"{
    "window": {"start": "2025-10-01T00:00:00+00:00", "end": "2025-10-02T00:00:00+00:00"},
    "constraints": [{"role": "guard", "headcount": 1}],
    "quiet_hours": [{"start": "00:00", "end": "06:00"}]
}"#;

const OVERBOOKED: &str = r#"{
    "window": {"start": "2025-10-01T00:00:00+00:00", "end": "2025-10-02T00:00:00+00:00"},
    "constraints": [{"role": "guard", "headcount": 5, "pool_size": 3}]
}"#;

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("shiftplan-cli").unwrap();
    cmd.env("ENVIRONMENT", "test")
        .env_remove("SCHEDULER_DEFAULT_TIMEZONE")
        .env_remove("SCHEDULER_TIME_BUDGET_SECONDS")
        .env_remove("SCHEDULER_MAX_DECISIONS")
        .env_remove("SCHEDULER_MAX_VARIABLES");
    cmd
}

#[test]
fn propose_prints_and_exports_the_roster() {
    let dir = tempdir().unwrap();
    let request = write(dir.path(), "request.json", GUARD_DAY);
    let out = dir.path().join("response.json");
    let csv = dir.path().join("roster.csv");

    cli()
        .arg("propose")
        .arg("--request")
        .arg(&request)
        .arg("--out")
        .arg(&out)
        .arg("--csv")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("status=optimal"))
        .stdout(predicate::str::contains("quiet=00:00-06:00"));

    let json: serde_json::Value = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
    assert_eq!(json["solver"]["status"], "optimal");
    assert_eq!(json["roster"][0]["role"], "guard");

    let table = fs::read_to_string(&csv).unwrap();
    let mut lines = table.lines();
    assert_eq!(lines.next(), Some("role,workers,start,end,slots,headcount"));
    assert_eq!(
        lines.next(),
        Some("guard,0,2025-10-01T06:00:00+00:00,2025-10-02T00:00:00+00:00,18,1")
    );
    assert_eq!(lines.next(), None);
}

#[test]
fn infeasible_request_exits_with_code_2() {
    let dir = tempdir().unwrap();
    let request = write(dir.path(), "request.json", OVERBOOKED);

    cli()
        .args(["propose", "--request"])
        .arg(&request)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("status=infeasible"))
        .stdout(predicate::str::contains("unmet guard (headcount)"));
}

#[test]
fn batch_reports_one_line_per_request() {
    let dir = tempdir().unwrap();
    let ok = write(dir.path(), "ok.json", GUARD_DAY);
    let bad = write(dir.path(), "bad.json", OVERBOOKED);

    cli()
        .args(["batch", "--workers", "2", "--request"])
        .arg(&ok)
        .arg(&bad)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("ok.json | optimal | 1 span(s)"))
        .stdout(predicate::str::contains("bad.json | infeasible | 0 span(s)"));
}

#[test]
fn timeline_uses_the_default_timezone_from_env() {
    let dir = tempdir().unwrap();
    let request = write(dir.path(), "request.json", GUARD_DAY);

    cli()
        .env("SCHEDULER_DEFAULT_TIMEZONE", "Europe/Paris")
        .args(["timeline", "--request"])
        .arg(&request)
        .assert()
        .success()
        .stdout(predicate::str::contains("   0 | 2025-10-01T02:00:00+02:00"))
        .stdout(predicate::str::contains("quiet"));
}

#[test]
fn malformed_request_fails() {
    let dir = tempdir().unwrap();
    let request = write(dir.path(), "request.json", "{\"window\": 42}");

    cli()
        .args(["propose", "--request"])
        .arg(&request)
        .assert()
        .failure()
        .stderr(predicate::str::contains("parsing request"));
}

#[test]
fn huge_time_budget_is_rejected() {
    let dir = tempdir().unwrap();
    let request = write(dir.path(), "request.json", GUARD_DAY);

    cli()
        .args(["propose", "--time-budget-seconds", "1e20", "--request"])
        .arg(&request)
        .assert()
        .failure()
        .stderr(predicate::str::contains("time budget"));
}

#[test]
fn dotenv_is_loaded_when_environment_is_unset() {
    let dir = tempdir().unwrap();
    let request = write(dir.path(), "request.json", GUARD_DAY);
    write(dir.path(), ".env", "SCHEDULER_DEFAULT_TIMEZONE=Europe/Paris\n");

    cli()
        .current_dir(dir.path())
        .env_remove("ENVIRONMENT")
        .args(["timeline", "--request"])
        .arg(&request)
        .assert()
        .success()
        .stdout(predicate::str::contains("   0 | 2025-10-01T02:00:00+02:00"));

    cli()
        .current_dir(dir.path())
        .env("ENVIRONMENT", "Development")
        .args(["timeline", "--request"])
        .arg(&request)
        .assert()
        .success()
        .stdout(predicate::str::contains("+02:00"));

    cli()
        .current_dir(dir.path())
        .env("ENVIRONMENT", "production")
        .args(["timeline", "--request"])
        .arg(&request)
        .assert()
        .success()
        .stdout(predicate::str::contains("   0 | 2025-10-01T00:00:00+00:00"));
}
