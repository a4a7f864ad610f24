//! Integration tests for `sc forecast`.

mod common;

use common::{TestEnv, parse_json};
use predicates::prelude::*;

#[test]
fn test_forecast_names_upcoming_sprints() {
    let env = TestEnv::loaded();
    let output = env.sc().arg("forecast").output().unwrap();
    assert!(output.status.success());
    let json = parse_json(&output.stdout);

    assert_eq!(json["current_sprint"]["sprint_name"], "Sprint 3");
    assert_eq!(json["current_sprint"]["allocated_hours"], 14.0);
    assert_eq!(json["next_sprint"]["sprint_name"], "Future Sprint 1");
    assert_eq!(json["next_next_sprint"]["sprint_name"], "Future Sprint 2");
    assert_eq!(json["next_sprint"]["allocated_hours"], 0.0);
}

#[test]
fn test_forecast_history_excludes_current_sprint() {
    let env = TestEnv::loaded();
    let output = env.sc().arg("forecast").output().unwrap();
    let historical = &parse_json(&output.stdout)["historical"];

    assert_eq!(historical["sprint_count"], 2);
    assert_eq!(historical["avg_velocity"], 11.0);
    assert!(
        historical["data_quality_warning"]
            .as_str()
            .unwrap()
            .contains("Only 2 completed sprints")
    );
}

#[test]
fn test_forecast_window_flag_clears_warning() {
    let env = TestEnv::loaded();
    let output = env.sc().args(["forecast", "--window", "2"]).output().unwrap();
    let historical = &parse_json(&output.stdout)["historical"];
    assert_eq!(historical["latest_moving_avg"], 11.0);
    assert!(historical["data_quality_warning"].is_null());
}

#[test]
fn test_forecast_capacity_flag() {
    let env = TestEnv::loaded();
    let output = env
        .sc()
        .args(["forecast", "--capacity", "100"])
        .output()
        .unwrap();
    let json = parse_json(&output.stdout);
    assert_eq!(json["current_sprint"]["team_capacity"], 100.0);
    assert_eq!(json["next_sprint"]["team_capacity"], 100.0);
}

#[test]
fn test_forecast_for_earlier_sprint() {
    let env = TestEnv::loaded();
    let output = env.sc().args(["forecast", "--sprint", "0"]).output().unwrap();
    let json = parse_json(&output.stdout);
    assert_eq!(json["current_sprint"]["sprint_name"], "Sprint 1");
    assert_eq!(json["next_sprint"]["sprint_name"], "Sprint 2");
    assert_eq!(json["next_next_sprint"]["sprint_name"], "Sprint 3");
}

#[test]
fn test_forecast_human_output() {
    let env = TestEnv::loaded();
    env.sc()
        .args(["-H", "forecast"])
        .assert()
        .success()
        .stdout(predicate::str::contains("This sprint - Sprint 3"))
        .stdout(predicate::str::contains("Next sprint - Future Sprint 1"))
        .stdout(predicate::str::contains("Warning: Only 2 completed sprints"));
}
