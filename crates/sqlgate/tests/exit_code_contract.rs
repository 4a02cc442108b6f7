use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;
use serde_json::Value;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_VALIDATION_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{nanos}"));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn seed_db(path: &Path) {
    Connection::open(path)
        .expect("fixture db should open")
        .execute_batch(
            "CREATE TABLE leads (id INTEGER PRIMARY KEY, created_at TEXT, project_code TEXT);
             INSERT INTO leads VALUES (1, '2026-10-15', '[LR166]');
             INSERT INTO leads VALUES (2, '2026-10-15', '[LR166]');
             INSERT INTO leads VALUES (3, '2026-10-15', '[SR001]');
             CREATE TABLE projects (project_tag TEXT, project_code TEXT);
             INSERT INTO projects VALUES ('Lake Residence', '[LR166]');",
        )
        .expect("fixture rows should insert");
}

/// Runs the binary inside `dir` with a clean configuration environment.
fn sqlgate(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sqlgate"))
        .current_dir(dir)
        .env_remove("DB_PATH")
        .env_remove("SQLGATE_POLICY")
        .env_remove("SQLGATE_CACHE_TTL_SECS")
        .env_remove("LOG_LEVEL")
        .env_remove("RUST_LOG")
        .args(["--cwd"])
        .arg(dir)
        .args(args)
        .output()
        .expect("command should execute")
}

fn envelope(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .find(|line| line.starts_with('{'))
        .expect("stdout should contain a JSON envelope");
    serde_json::from_str(line).expect("envelope should be valid JSON")
}

#[test]
fn missing_required_args_exits_with_usage_code() {
    let status = Command::new(env!("CARGO_BIN_EXE_sqlgate"))
        .arg("check")
        .status()
        .expect("command should execute");

    assert_eq!(status.code(), Some(EXIT_USAGE_ERROR));
}

#[test]
fn accepted_check_exits_successfully() {
    let dir = unique_temp_dir("sqlgate-exit-check-ok");
    let output = sqlgate(&dir, &["check", "SELECT id FROM leads;"]);

    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    let envelope = envelope(&output);
    assert_eq!(envelope.pointer("/ok"), Some(&Value::Bool(true)));
    assert_eq!(
        envelope.pointer("/data/canonical_sql").and_then(Value::as_str),
        Some("SELECT id FROM leads")
    );
    assert_eq!(
        envelope.pointer("/data/referenced_tables"),
        Some(&serde_json::json!(["leads"]))
    );
}

#[test]
fn rejected_sql_exits_with_validation_code() {
    let dir = unique_temp_dir("sqlgate-exit-check-rejected");
    let output = sqlgate(&dir, &["check", "DELETE FROM leads"]);

    assert_eq!(output.status.code(), Some(EXIT_VALIDATION_FAILURE));
    assert_eq!(
        envelope(&output)
            .pointer("/error/code")
            .and_then(Value::as_str),
        Some("forbidden_keyword")
    );
}

#[test]
fn query_returns_rows_in_envelope() {
    let dir = unique_temp_dir("sqlgate-exit-query-ok");
    seed_db(&dir.join("leads.db"));
    let output = sqlgate(
        &dir,
        &[
            "query",
            "SELECT id FROM leads WHERE project_code = ? ORDER BY id",
            "--params",
            "[\"[LR166]\"]",
        ],
    );

    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    let envelope = envelope(&output);
    assert_eq!(
        envelope.pointer("/data/rows"),
        Some(&serde_json::json!([{"id": 1}, {"id": 2}]))
    );
    assert_eq!(
        envelope.pointer("/meta/row_count"),
        Some(&serde_json::json!(2))
    );
}

#[test]
fn missing_database_exits_with_runtime_code() {
    let dir = unique_temp_dir("sqlgate-exit-query-missing-db");
    let output = sqlgate(&dir, &["query", "SELECT id FROM leads"]);

    assert_eq!(output.status.code(), Some(EXIT_RUNTIME_FAILURE));
    assert_eq!(
        envelope(&output)
            .pointer("/error/code")
            .and_then(Value::as_str),
        Some("storage_unavailable")
    );
    assert!(!dir.join("leads.db").exists());
}

#[test]
fn invalid_params_exit_with_validation_code() {
    let dir = unique_temp_dir("sqlgate-exit-query-params");
    seed_db(&dir.join("leads.db"));
    let output = sqlgate(
        &dir,
        &["query", "SELECT id FROM leads", "--params", "{\"a\": 1}"],
    );

    assert_eq!(output.status.code(), Some(EXIT_VALIDATION_FAILURE));
}

#[test]
fn malformed_policy_file_exits_with_runtime_code() {
    let dir = unique_temp_dir("sqlgate-exit-policy");
    std::fs::write(dir.join("policy.json"), "{\"allowed_tabels\": []}")
        .expect("policy file should be writable");
    let output = sqlgate(&dir, &["--policy", "policy.json", "policy"]);

    assert_eq!(output.status.code(), Some(EXIT_RUNTIME_FAILURE));
}

#[test]
fn policy_with_unmatchable_denylist_entry_exits_with_runtime_code() {
    let dir = unique_temp_dir("sqlgate-exit-policy-keyword");
    std::fs::write(
        dir.join("policy.json"),
        "{\"forbidden_keywords\": [\"drop\", \"load_extension\"]}",
    )
    .expect("policy file should be writable");
    let output = sqlgate(&dir, &["--policy", "policy.json", "policy"]);

    assert_eq!(output.status.code(), Some(EXIT_RUNTIME_FAILURE));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("LOAD_EXTENSION"), "unexpected stderr: {stderr}");
}

#[test]
fn tag_lookup_uses_projects_table() {
    let dir = unique_temp_dir("sqlgate-exit-tag");
    seed_db(&dir.join("leads.db"));
    let output = sqlgate(&dir, &["tag", "LR166"]);

    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    assert_eq!(
        envelope(&output).pointer("/data/tag").and_then(Value::as_str),
        Some("Lake Residence")
    );
}
