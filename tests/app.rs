#![cfg(feature = "cli")]
//! End-to-end runs of the fixture configurations under `tests/`.

use std::fs;

use rflow::app_logic;
use rflow::config::{load_config, Mode};

#[test]
fn matrix_run_writes_one_report_per_loadcase() {
    let reports = app_logic::run("tests/config.yaml").expect("run failed");
    assert_eq!(reports.len(), 3);

    let by_name = |name: &str| {
        reports
            .iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("no report for {name}"))
    };
    // history.csv holds the classic 9-point example: 1 full and 6 half cycles
    assert_eq!(by_name("history").cycles, 7);
    assert_eq!(by_name("triangle").cycles, 3);

    let written = fs::read_to_string(&by_name("history").output).unwrap();
    let json: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(json["total"], 7);
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 8);
    assert!(rows.iter().all(|r| r.as_array().map(Vec::len) == Some(4)));
}

#[test]
fn cycles_run_streams_csv() {
    let config = load_config("tests/config.toml").unwrap();
    assert_eq!(config.solution.mode, Mode::Cycles);
    config.validate().unwrap();

    let reports = app_logic::run_config(&config).unwrap();
    let triangle = reports.iter().find(|r| r.name == "triangle").unwrap();
    let csv = fs::read_to_string(&triangle.output).unwrap();
    assert_eq!(csv, "start,end\n1.0,0.0\n0.0,1.0\n1.0,0.0\n");

    let history = reports.iter().find(|r| r.name == "history").unwrap();
    let csv = fs::read_to_string(&history.output).unwrap();
    assert_eq!(csv.lines().count(), 1 + 7);
    assert_eq!(csv.lines().nth(1), Some("-1.0,3.0"));
}
