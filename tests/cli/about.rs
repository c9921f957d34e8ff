//! Help, version, about and completions.

use predicates::prelude::*;

use crate::support::*;

#[test]
fn test_help_lists_commands() {
    let t = Test::new();
    t.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("encrypt"))
        .stdout(predicate::str::contains("add-recipient"))
        .stdout(predicate::str::contains("change-recipient"))
        .stdout(predicate::str::contains("identify"));
}

#[test]
fn test_version() {
    let t = Test::new();
    t.cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_about() {
    let t = Test::new();
    let output = t.run(&["about"]);
    assert_success(&output);
    assert_stdout_contains(&output, &format!("Version  : {}", env!("CARGO_PKG_VERSION")));
    assert_stdout_contains(&output, "License  :");
    assert_stdout_contains(&output, "Website  :");
    assert!(!stdout(&output).contains("Build Info"));
}

#[test]
fn test_about_build() {
    let t = Test::new();
    let output = t.run(&["about", "--build"]);
    assert_success(&output);
    assert_stdout_contains(&output, "Build Info:");
    assert_stdout_contains(&output, std::env::consts::OS);
}

#[test]
fn test_about_ignores_broken_config() {
    let t = Test::new();
    let config = t.config("this is not toml [");
    let output = t.run(&["--config", config.to_str().unwrap(), "about"]);
    assert_success(&output);
}

#[test]
fn test_completions() {
    let t = Test::new();
    for shell in ["bash", "zsh", "fish", "power-shell"] {
        t.cmd()
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::contains("gpghigh"));
    }
}
