//! Integration tests for the `skilldex` binary.

mod common;

use common::corpus;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn skilldex(config_dir: &Path, args: &[&str]) -> Output {
    let config_path = config_dir.join("config.json");
    if !config_path.exists() {
        let config = serde_json::json!({ "artifact_dir": config_dir.join("indexes") });
        std::fs::write(&config_path, config.to_string()).unwrap();
    }

    Command::new(env!("CARGO_BIN_EXE_skilldex"))
        .arg("--no-color")
        .arg("--config")
        .arg(&config_path)
        .args(args)
        .output()
        .expect("Failed to run skilldex")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_index_reports_failures() {
    let dir = corpus();
    let config = TempDir::new().unwrap();
    let corpus_arg = dir.path().to_str().unwrap();

    let output = skilldex(config.path(), &["index", corpus_arg]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("4/5 files, 9 actions"), "{}", out);
    assert!(out.contains("broken.json"));
}

#[test]
fn test_query_text_output() {
    let dir = corpus();
    let config = TempDir::new().unwrap();
    let corpus_arg = dir.path().to_str().unwrap();

    let output = skilldex(
        config.path(),
        &["query", corpus_arg, "DamageAction", "where", "baseDamage", ">", "100"],
    );
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("frost/frostbolt.json:tracks[0].actions[1]"));
    assert!(out.contains("1 of 1 matches"));
}

#[test]
fn test_query_json_output() {
    let dir = corpus();
    let config = TempDir::new().unwrap();
    let corpus_arg = dir.path().to_str().unwrap();

    let output = skilldex(
        config.path(),
        &["query", corpus_arg, "DamageAction", "--limit", "2", "--json"],
    );
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["total_matches"], 3);
    assert_eq!(value["results"].as_array().unwrap().len(), 2);
    assert_eq!(value["cache_hit"], false);
}

#[test]
fn test_query_syntax_error_exit_code() {
    let dir = corpus();
    let config = TempDir::new().unwrap();
    let corpus_arg = dir.path().to_str().unwrap();

    let output = skilldex(config.path(), &["query", corpus_arg, "a == 1 or b == 2"]);
    assert_eq!(output.status.code(), Some(2));
    let err = String::from_utf8_lossy(&output.stderr);
    assert!(err.contains("`or` is not supported"), "{}", err);
}

#[test]
fn test_stats_json() {
    let dir = corpus();
    let config = TempDir::new().unwrap();
    let corpus_arg = dir.path().to_str().unwrap();

    let output = skilldex(config.path(), &["stats", corpus_arg, "--json"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let damage = &value["groups"]["DamageAction"];
    assert_eq!(damage["count"], 3);
    assert_eq!(damage["avg_baseDamage"], 100.0);
}

#[test]
fn test_detail_lookup() {
    let dir = corpus();
    let config = TempDir::new().unwrap();
    let corpus_arg = dir.path().to_str().unwrap();

    let output = skilldex(
        config.path(),
        &["detail", corpus_arg, "fireball.json", "tracks[1].actions[0]", "--json"],
    );
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["data"]["baseDamage"], 100);
    assert_eq!(value["context"]["track_name"], "Effects");

    let missing = skilldex(
        config.path(),
        &["detail", corpus_arg, "fireball.json", "tracks[9].actions[0]"],
    );
    assert!(!missing.status.success());
}
