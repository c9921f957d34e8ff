//! State of one file transformation.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::core::types::KeyPattern;
use crate::error::{Error, Operation};

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Init,
    /// Arguments and source checked, names planned.
    Validated,
    /// The engine finished successfully.
    EngineInvoked,
    /// Output is in its final place.
    Committed,
    Failed,
}

impl JobState {
    fn can_advance_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Init, JobState::Validated)
                | (JobState::Validated, JobState::EngineInvoked)
                | (JobState::EngineInvoked, JobState::Committed)
                | (
                    JobState::Init | JobState::Validated | JobState::EngineInvoked,
                    JobState::Failed
                )
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Committed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Init => "init",
            JobState::Validated => "validated",
            JobState::EngineInvoked => "engine-invoked",
            JobState::Committed => "committed",
            JobState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// One encrypt, decrypt or recipient change in flight.
#[derive(Debug)]
pub struct Job {
    op: Operation,
    source: PathBuf,
    destination: PathBuf,
    temp: Option<PathBuf>,
    backup: Option<PathBuf>,
    recipients: Vec<KeyPattern>,
    state: JobState,
    // destination did not exist before this job and is removed on failure
    owns_destination: bool,
    // the source was renamed or removed; the temp file is now the only copy
    source_moved: bool,
}

impl Job {
    pub fn new<S: AsRef<str>>(op: Operation, source: &Path, recipients: &[S]) -> Self {
        Self {
            op,
            source: source.to_path_buf(),
            destination: source.to_path_buf(),
            temp: None,
            backup: None,
            recipients: recipients.iter().map(|r| r.as_ref().to_string()).collect(),
            state: JobState::Init,
            owns_destination: false,
            source_moved: false,
        }
    }

    pub fn op(&self) -> Operation {
        self.op
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn temp(&self) -> Option<&Path> {
        self.temp.as_deref()
    }

    pub fn backup(&self) -> Option<&Path> {
        self.backup.as_deref()
    }

    pub fn recipients(&self) -> &[KeyPattern] {
        &self.recipients
    }

    pub(super) fn set_destination(&mut self, destination: PathBuf, owned: bool) {
        self.destination = destination;
        self.owns_destination = owned;
    }

    pub(super) fn set_temp(&mut self, temp: PathBuf) {
        self.temp = Some(temp);
    }

    pub(super) fn set_backup(&mut self, backup: Option<PathBuf>) {
        self.backup = backup;
    }

    pub(super) fn source_moved(&mut self) {
        self.source_moved = true;
    }

    pub(super) fn advance(&mut self, next: JobState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal job transition {} -> {}",
            self.state,
            next
        );
        debug!(
            op = %self.op,
            source = %self.source.display(),
            from = %self.state,
            to = %next,
            "job state"
        );
        self.state = next;
    }

    /// Enter `Failed` and remove output that must not survive.
    pub(super) fn fail(&mut self, err: &Error) {
        if self.state.is_terminal() {
            return;
        }
        debug!(op = %self.op, from = %self.state, error = %err, "job failed");

        if let Some(temp) = &self.temp {
            if self.source_moved {
                error!(
                    source = %self.source.display(),
                    temp = %temp.display(),
                    "source already moved away, new content left at temp path"
                );
            } else {
                discard(temp);
            }
        }
        if self.owns_destination {
            discard(&self.destination);
        }

        self.state = JobState::Failed;
    }
}

/// Best-effort removal.
fn discard(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "could not remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PreconditionError;
    use tempfile::TempDir;

    fn failure() -> Error {
        PreconditionError::NoRecipients {
            op: Operation::ModifyRecipients,
        }
        .into()
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut job = Job::new::<&str>(Operation::EncryptFile, Path::new("a"), &[]);
        assert_eq!(job.state(), JobState::Init);
        job.advance(JobState::Validated);
        job.advance(JobState::EngineInvoked);
        job.advance(JobState::Committed);
        assert!(job.state().is_terminal());
    }

    #[test]
    fn test_transition_table() {
        assert!(JobState::Init.can_advance_to(JobState::Failed));
        assert!(JobState::EngineInvoked.can_advance_to(JobState::Failed));
        assert!(!JobState::Init.can_advance_to(JobState::Committed));
        assert!(!JobState::Committed.can_advance_to(JobState::Failed));
        assert!(!JobState::Failed.can_advance_to(JobState::Validated));
    }

    #[test]
    fn test_fail_removes_temp() {
        let dir = TempDir::new().unwrap();
        let temp = dir.path().join("f.gpg.abcdefgh.tmp");
        std::fs::write(&temp, b"partial").unwrap();

        let mut job = Job::new(Operation::ModifyRecipients, &dir.path().join("f.gpg"), &["bob"]);
        job.set_temp(temp.clone());
        job.advance(JobState::Validated);
        job.fail(&failure());

        assert_eq!(job.state(), JobState::Failed);
        assert!(!temp.exists());
    }

    #[test]
    fn test_fail_keeps_temp_after_source_moved() {
        let dir = TempDir::new().unwrap();
        let temp = dir.path().join("f.gpg.abcdefgh.tmp");
        std::fs::write(&temp, b"new content").unwrap();

        let mut job = Job::new(Operation::ModifyRecipients, &dir.path().join("f.gpg"), &["bob"]);
        job.set_temp(temp.clone());
        job.advance(JobState::Validated);
        job.advance(JobState::EngineInvoked);
        job.source_moved();
        job.fail(&failure());

        assert!(temp.exists());
    }

    #[test]
    fn test_fail_removes_owned_destination_only() {
        let dir = TempDir::new().unwrap();
        let owned = dir.path().join("owned");
        let foreign = dir.path().join("foreign");
        std::fs::write(&owned, b"x").unwrap();
        std::fs::write(&foreign, b"x").unwrap();

        let mut job = Job::new::<&str>(Operation::DecryptFile, &dir.path().join("s.gpg"), &[]);
        job.set_destination(owned.clone(), true);
        job.fail(&failure());
        assert!(!owned.exists());

        let mut job = Job::new::<&str>(Operation::EncryptFile, &dir.path().join("s"), &[]);
        job.set_destination(foreign.clone(), false);
        job.fail(&failure());
        assert!(foreign.exists());
    }
}
