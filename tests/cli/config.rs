//! Configuration loading through the binary.

use crate::support::*;

#[test]
fn test_explicit_missing_config() {
    let t = Test::new();
    let output = t.run(&["--config", "absent.toml", "identify", "x"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to read config");
}

#[test]
fn test_invalid_config_value() {
    let t = Test::new();
    let config = t.config("[engine]\nmin_version = \"two\"\n");
    t.write("x", "data");

    let output = t.run(&["--config", config.to_str().unwrap(), "identify", "x"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "invalid config value for engine.min_version");
}

#[test]
fn test_unknown_config_key() {
    let t = Test::new();
    let config = t.config("[files]\nbackup = \".bak\"\n");
    t.write("x", "data");

    let output = t.run(&["--config", config.to_str().unwrap(), "identify", "x"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to parse config");
}

#[test]
fn test_config_from_env() {
    let t = Test::new();
    let config = t.config("[engine]\nprogram = \"\"\n");
    t.write("x", "data");

    let output = t
        .cmd()
        .env("GPGHIGH_CONFIG", &config)
        .args(["identify", "x"])
        .output()
        .unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "invalid config value for engine.program");
}

#[test]
fn test_default_config_location() {
    let t = Test::new();
    let dir = t.home.path().join("gpghigh");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "[engine]\nprogram = \"\"\n").unwrap();
    t.write("x", "data");

    // dirs::config_dir honours XDG_CONFIG_HOME on Linux only
    if cfg!(target_os = "linux") {
        let output = t.run(&["identify", "x"]);
        assert_failure(&output);
        assert_stderr_contains(&output, "engine.program");
    }
}

#[test]
fn test_no_config_file_uses_defaults() {
    let t = Test::new();
    t.write("x", "data");
    let output = t.run(&["identify", "x"]);
    assert_success(&output);
}
