//! Integration tests for `sc session`.

mod common;

use common::{TestEnv, parse_json};
use predicates::prelude::*;

fn load(env: &TestEnv) -> String {
    let csv = env.sample_csv();
    let output = env.sc().arg("load").arg(&csv).output().unwrap();
    assert!(output.status.success());
    parse_json(&output.stdout)["id"].as_str().unwrap().to_string()
}

#[test]
fn test_session_list_marks_current() {
    let env = TestEnv::new();
    let first = load(&env);
    let second = load(&env);

    let output = env.sc().args(["session", "list"]).output().unwrap();
    let json = parse_json(&output.stdout);
    assert_eq!(json["count"], 2);
    assert_eq!(json["current"], second.as_str());

    let ids: Vec<&str> = json["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&first.as_str()));
    assert!(ids.contains(&second.as_str()));
}

#[test]
fn test_session_rm_clears_current() {
    let env = TestEnv::new();
    let id = load(&env);

    env.sc()
        .args(["session", "rm", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"removed\":true"));

    env.sc()
        .args(["session", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No data loaded"));
}

#[test]
fn test_session_rm_unknown() {
    let env = TestEnv::new();
    env.sc()
        .args(["session", "rm", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session not found"));
}

#[test]
fn test_unknown_session_flag_fails() {
    let env = TestEnv::new();
    load(&env);
    env.sc()
        .args(["--session", "missing", "metrics"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session not found"));
}

#[test]
fn test_session_env_var() {
    let env = TestEnv::new();
    let first = load(&env);
    load(&env);

    env.sc()
        .env("SC_SESSION", &first)
        .args(["session", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("\"id\":\"{}\"", first)))
        .stdout(predicate::str::contains("\"current\":false"));
}

#[test]
fn test_prune_keeps_fresh_sessions() {
    let env = TestEnv::new();
    load(&env);
    let output = env.sc().args(["session", "prune"]).output().unwrap();
    let json = parse_json(&output.stdout);
    assert!(json["removed"].as_array().unwrap().is_empty());
    assert_eq!(json["ttl_hours"], 168);
}

#[test]
fn test_reports_survive_session_removal() {
    let env = TestEnv::new();
    let id = load(&env);
    let output = env.sc().args(["archive", "create"]).output().unwrap();
    let archive_id = parse_json(&output.stdout)["archive_id"]
        .as_str()
        .unwrap()
        .to_string();

    env.sc().args(["session", "rm", &id]).assert().success();
    env.sc()
        .args(["archive", "show", &archive_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sprint 3"));
}
