//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a gpghigh command isolated from the user's environment.
    ///
    /// Returns a Command configured with:
    /// - HOME and the XDG config dir pointing at the temporary home
    /// - no inherited GPGHIGH_CONFIG or GPGHIGH_LOG
    /// - the working directory set to the test dir
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("gpghigh").expect("failed to find gpghigh binary");
        cmd.env("HOME", self.home.path());
        cmd.env("USERPROFILE", self.home.path());
        cmd.env("XDG_CONFIG_HOME", self.home.path());
        cmd.env_remove("GPGHIGH_CONFIG");
        cmd.env_remove("GPGHIGH_LOG");
        cmd.env("NO_COLOR", "1");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Run gpghigh with `args`.
    pub fn run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .expect("failed to run gpghigh")
    }

    /// Run gpghigh with `args` and `input` on stdin.
    pub fn run_with_stdin(&self, args: &[&str], input: &[u8]) -> Output {
        self.cmd()
            .args(args)
            .write_stdin(input.to_vec())
            .output()
            .expect("failed to run gpghigh")
    }
}
