//! Assertions on binary output.
//!
//! Command data goes to stdout and everything meant for a person goes to
//! stderr, so most helpers name the stream they check.

use std::process::Output;

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Exit code zero; shows stderr otherwise.
pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "gpghigh exited with {}:\n{}",
        output.status,
        stderr(output)
    );
}

/// Non-zero exit, with the error on stderr and nothing on stdout.
pub fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "expected gpghigh to fail, stdout: {}",
        stdout(output)
    );
    assert_stdout_empty(output);
}

pub fn assert_stdout_contains(output: &Output, expected: &str) {
    let out = stdout(output);
    assert!(out.contains(expected), "stdout lacks {expected:?}:\n{out}");
}

pub fn assert_stderr_contains(output: &Output, expected: &str) {
    let err = stderr(output);
    assert!(err.contains(expected), "stderr lacks {expected:?}:\n{err}");
}

pub fn assert_stderr_excludes(output: &Output, unexpected: &str) {
    let err = stderr(output);
    assert!(!err.contains(unexpected), "stderr has {unexpected:?}:\n{err}");
}

/// Nothing was written to stdout.
pub fn assert_stdout_empty(output: &Output) {
    assert!(
        output.stdout.is_empty(),
        "expected empty stdout, got: {}",
        stdout(output)
    );
}
