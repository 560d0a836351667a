use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    Command::cargo_bin("costforge").unwrap()
}

#[test]
fn test_help_command() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("costforge"))
        .stdout(predicate::str::contains("plugin"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_shows_help() {
    cli().assert().failure().stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_plugin_help() {
    cli()
        .args(["plugin", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("install"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("remove"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_plugin_alias() {
    cli()
        .args(["p", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("install"));
}

#[test]
fn test_plugin_list_empty_root() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .env("COSTFORGE_REGISTRY__ROOT", dir.path())
        .args(["plugin", "list"])
        .assert()
        .success();
}

#[test]
fn test_plugin_remove_missing_plugin_fails() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .env("COSTFORGE_REGISTRY__ROOT", dir.path())
        .args(["plugin", "remove", "does-not-exist"])
        .assert()
        .failure();
}

#[test]
fn test_config_show() {
    cli()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registry root"));
}

#[test]
fn test_config_validate_missing_file() {
    cli()
        .args(["config", "validate", "--config", "/nonexistent/costforge.toml"])
        .assert()
        .failure();
}

#[test]
fn test_completions_bash() {
    cli().args(["completions", "bash"]).assert().success();
}

#[test]
fn test_no_color_flag() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .env("COSTFORGE_REGISTRY__ROOT", dir.path())
        .args(["--no-color", "plugin", "list"])
        .assert()
        .success();
}
