//! Test support utilities for gpghigh integration tests.
//!
//! Provides isolated test environments and helper commands.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;
pub mod skip;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;

use std::path::PathBuf;

use tempfile::TempDir;

/// Test environment with isolated temp directories.
///
/// Each test gets its own working dir and its own config dir. Child
/// processes use `.current_dir()` and explicit env vars, so tests can run in
/// parallel.
pub struct Test {
    /// Working directory for the files under test
    pub dir: TempDir,
    /// Home for config files and, in gpg tests, the keyring
    pub home: TempDir,
}

impl Test {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let home = TempDir::new().expect("failed to create temp home");
        Self { dir, home }
    }

    /// Path of `name` in the working directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write a file in the working directory and return its path.
    pub fn write(&self, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("failed to write test file");
        path
    }

    /// Write `config.toml` in the home directory and return its path.
    pub fn config(&self, contents: &str) -> PathBuf {
        let path = self.home.path().join("config.toml");
        std::fs::write(&path, contents).expect("failed to write config");
        path
    }

    /// Names of the files in the working directory, sorted.
    pub fn files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .expect("failed to read temp dir")
            .map(|e| e.expect("bad dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
