use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn tracedeck(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tracedeck").unwrap();
    cmd.arg("--db").arg(db);
    cmd
}

fn write_payload(dir: &Path, name: &str, payload: &serde_json::Value) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(payload).unwrap()).unwrap();
    path
}

fn ingest(db: &Path, payload_path: &Path) -> String {
    let assert = tracedeck(db)
        .arg("ingest")
        .arg(payload_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created run "));
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    stdout
        .trim()
        .rsplit(' ')
        .next()
        .expect("run id in output")
        .to_string()
}

#[test]
fn test_ingest_show_log_delete_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("traces.db");
    let payload = serde_json::json!({
        "name": "Checkout investigation",
        "framework": "LANGCHAIN",
        "status": "SUCCESS",
        "startedAt": "2026-03-01T10:00:00Z",
        "endedAt": "2026-03-01T10:01:30Z",
        "tags": ["prod", "checkout"],
        "steps": [
            {"index": 0, "name": "Understand issue", "kind": "THOUGHT", "status": "SUCCESS"},
            {"index": 1, "name": "Call payments API", "kind": "TOOL", "status": "SUCCESS",
             "startedAt": "2026-03-01T10:00:10Z", "endedAt": "2026-03-01T10:00:30Z",
             "toolCalls": [
                {"name": "payments.lookup", "input": {"order": "ord_123"},
                 "output": {"status": "declined"}, "status": "SUCCESS",
                 "startedAt": "2026-03-01T10:00:10Z", "endedAt": "2026-03-01T10:00:14Z"}
             ]}
        ]
    });
    let payload_path = write_payload(dir.path(), "trace.json", &payload);

    let id = ingest(&db, &payload_path);

    tracedeck(&db)
        .args(["show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Checkout investigation"))
        .stdout(predicate::str::contains("Run duration: 90s"))
        .stdout(predicate::str::contains("Success rate: 100%"))
        .stdout(predicate::str::contains("payments.lookup"));

    tracedeck(&db)
        .args(["log", "--query", "checkout"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&id[..8]));

    tracedeck(&db)
        .args(["log", "--status", "FAILED"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No runs found."));

    tracedeck(&db)
        .args(["delete", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted run"));

    tracedeck(&db)
        .args(["show", &id])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run not found"));
}

#[test]
fn test_invalid_payload_is_rejected_entirely() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("traces.db");
    let payload = serde_json::json!({
        "name": "bad run",
        "status": "BOGUS",
        "steps": [{"index": 0}]
    });
    let payload_path = write_payload(dir.path(), "bad.json", &payload);

    tracedeck(&db)
        .arg("ingest")
        .arg(&payload_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("status: invalid enum value"));

    // Nothing from the rejected submission was persisted.
    tracedeck(&db)
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("No runs found."));
}

#[test]
fn test_ingest_from_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("traces.db");

    tracedeck(&db)
        .args(["ingest", "-"])
        .write_stdin(r#"{"name": "from stdin", "steps": []}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created run "));

    tracedeck(&db)
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("from stdin"));
}

#[test]
fn test_sample_and_stats() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("traces.db");

    tracedeck(&db)
        .arg("sample")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created sample run"));

    tracedeck(&db)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total runs:   1"))
        .stdout(predicate::str::contains("LANGGRAPH: 1"));
}

#[test]
fn test_sample_print_does_not_persist() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("traces.db");

    tracedeck(&db)
        .args(["sample", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Support bot troubleshooting"));

    tracedeck(&db)
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("No runs found."));
}

#[test]
fn test_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("traces.db");
    let payload = serde_json::json!({
        "name": "json check",
        "framework": "CREWAI",
        "steps": [{"index": 0, "toolCalls": [{"name": "t", "status": "SUCCESS"}]}]
    });
    let payload_path = write_payload(dir.path(), "trace.json", &payload);
    let id = ingest(&db, &payload_path);

    let assert = tracedeck(&db)
        .args(["--format", "json", "show", &id])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["run"]["framework"], "CREWAI");
    assert_eq!(value["analytics"]["totalToolCalls"], 1);
    assert_eq!(value["analytics"]["toolSuccessRatePct"], 100);
}
