use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn top_level_help_lists_commands() {
    let mut cmd = cargo_bin_cmd!("pacstrackctl");
    cmd.arg("--help").assert().success().stdout(
        predicate::str::contains("discover")
            .and(predicate::str::contains("search"))
            .and(predicate::str::contains("tasks"))
            .and(predicate::str::contains("cache")),
    );
}

#[test]
fn discover_help_documents_range_flags() {
    let mut cmd = cargo_bin_cmd!("pacstrackctl");
    let output = cmd
        .arg("discover")
        .arg("--help")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("--device"), "discover help missing --device");
    assert!(text.contains("--date"), "discover help missing --date");
    assert!(text.contains("--server"), "global --server missing");
}

#[test]
fn task_actions_are_enumerated() {
    let mut cmd = cargo_bin_cmd!("pacstrackctl");
    cmd.args(["tasks", "action", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rush").and(predicate::str::contains("--rows")));
}

#[test]
fn send_requires_rows() {
    let mut cmd = cargo_bin_cmd!("pacstrackctl");
    cmd.args(["send", "storage", "--to", "PACS"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--rows"));
}

#[test]
fn expand_destination_needs_series_rows() {
    let mut cmd = cargo_bin_cmd!("pacstrackctl");
    cmd.args(["expand", "0", "--to", "PACS"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--rows"));
}

#[test]
fn failed_command_still_prints_page_notices() {
    let cache = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("pacstrackctl");
    cmd.env_remove("PACSTRACK_CONFIG_PATH")
        .env_remove("PACSTRACK_SERVER_URL")
        .env("PACSTRACK_CONFIG_JSON", r#"{"server_url": "http://127.0.0.1:1"}"#)
        .arg("--cache-dir")
        .arg(cache.path())
        .args(["search", "--device", "PACS"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: Study search failed"));
}
