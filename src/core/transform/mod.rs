//! File encryption, decryption and recipient changes.
//!
//! Every operation runs as a [`Job`]:
//!
//! ```text
//! Init -> Validated -> EngineInvoked -> Committed
//!   \________\______________\__________> Failed
//! ```
//!
//! A recipient change writes the engine's output to `<source>.<suffix>.tmp`
//! and only touches the source once the engine has succeeded. The commit is
//! two renames (or a removal and a rename). There is no rollback between
//! them: if the second step fails, the new content stays at the temp path
//! and the error names the failed phase.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::engine::{Context, Data, EncryptFlags, Engine, KeyHandle};
use crate::core::model::{DecryptResult, VerifyResult};
use crate::core::naming;
use crate::error::{
    ConflictError, EngineError, Error, IoContext, LookupError, Operation, PreconditionError,
    Result,
};

mod job;

pub use job::{Job, JobState};

/// Non-fatal condition reported alongside a successful operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Warning {
    /// The input carried no OpenPGP data.
    NoData,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NoData => f.write_str("No data"),
        }
    }
}

/// Result of [`decrypt_file`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecryptOutcome {
    pub destination: PathBuf,
    pub decrypt: DecryptResult,
    pub verify: VerifyResult,
    pub warning: Option<Warning>,
}

/// Result of [`modify_recipients`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifyOutcome {
    /// The rewritten file; same path as the input.
    pub source: PathBuf,
    /// Where the original went, when a backup was requested.
    pub backup: Option<PathBuf>,
}

/// Encrypt `source` to `recipients`, optionally signing with the engine's
/// default key.
///
/// The destination is `destination` or `<source>.gpg`; the engine writes
/// it directly. Returns the destination path.
///
/// # Errors
///
/// - `PreconditionError` for a missing or directory source, or no recipients
/// - `LookupError::Recipient` naming the first recipient that did not resolve
/// - an engine failure if encryption fails
pub fn encrypt_file<E: Engine, S: AsRef<str>>(
    engine: &E,
    source: &Path,
    destination: Option<&Path>,
    recipients: &[S],
    sign: bool,
) -> Result<PathBuf> {
    let op = Operation::EncryptFile;
    let mut job = Job::new(op, source, recipients);

    run(&mut job, |job| {
        validate_source(op, source)?;
        if recipients.is_empty() {
            return Err(PreconditionError::NoRecipients { op }.into());
        }
        let dest = naming::encrypt_destination(source, destination);
        if dest == source {
            return Err(ConflictError::DestinationExists { op, path: dest }.into());
        }
        job.set_destination(dest.clone(), false);
        job.advance(JobState::Validated);

        let mut ctx = engine
            .new_context()
            .map_err(|e| e.during(op, "open context"))?;
        let keys = resolve_recipients(engine, op, recipients)?;

        let mut input = Data::from_path(source);
        let mut output = Data::from_path(&dest);
        let flags = EncryptFlags::ALWAYS_TRUST | EncryptFlags::FILE;
        debug!(recipients = keys.len(), sign, "encrypting file");
        let encrypted = if sign {
            ctx.encrypt_sign(&keys, flags, &mut input, &mut output)
        } else {
            ctx.encrypt(&keys, flags, &mut input, &mut output)
        };
        encrypted.map_err(|e| e.during(op, "encrypt"))?;
        job.advance(JobState::EngineInvoked);

        output.close().io_context(op, "close output", &dest)?;
        input.close().io_context(op, "close input", source)?;
        job.advance(JobState::Committed);
        Ok(dest)
    })
}

/// Decrypt `source` and verify any signatures in one pass.
///
/// The destination is `destination`, or `source` with its `.gpg`, `.pgp` or
/// `.asc` extension removed, and must not exist. Input without OpenPGP data
/// is not an error: the outcome carries [`Warning::NoData`] and whatever
/// results the engine reported.
///
/// # Errors
///
/// - `PreconditionError` for a missing or directory source, or a name that
///   gives no destination
/// - `ConflictError::DestinationExists` if the destination exists
/// - an engine failure for anything other than "no data"
pub fn decrypt_file<E: Engine>(
    engine: &E,
    source: &Path,
    destination: Option<&Path>,
) -> Result<DecryptOutcome> {
    let op = Operation::DecryptFile;
    let mut job = Job::new::<&str>(op, source, &[]);

    run(&mut job, |job| {
        validate_source(op, source)?;
        let dest = naming::infer_decrypt_destination(source, destination)?;
        if naming::exists(&dest) {
            return Err(ConflictError::DestinationExists { op, path: dest }.into());
        }
        job.set_destination(dest.clone(), true);
        job.advance(JobState::Validated);

        let mut ctx = engine
            .new_context()
            .map_err(|e| e.during(op, "open context"))?;
        let mut input = Data::from_path(source);
        let mut output = Data::from_path(&dest);

        let warning = match ctx.decrypt_verify(&mut input, &mut output) {
            Ok(()) => None,
            Err(EngineError::NoData) => {
                warn!(source = %source.display(), "no OpenPGP data found");
                Some(Warning::NoData)
            }
            Err(e) => return Err(e.during(op, "decrypt").into()),
        };
        job.advance(JobState::EngineInvoked);

        let decrypt = ctx
            .decrypt_result()
            .map_err(|e| e.during(op, "decrypt result"))?;
        let verify = ctx
            .verify_result()
            .map_err(|e| e.during(op, "verify result"))?;

        output.close().io_context(op, "close output", &dest)?;
        input.close().io_context(op, "close input", source)?;
        job.advance(JobState::Committed);

        debug!(
            destination = %dest.display(),
            recipients = decrypt.recipients.len(),
            signatures = verify.signatures.len(),
            "file decrypted"
        );
        Ok(DecryptOutcome {
            destination: dest,
            decrypt,
            verify,
            warning,
        })
    })
}

/// Add recipients to, or replace the recipients of, an encrypted file in
/// place.
///
/// `operation` must be exactly [`EncryptFlags::ADD_RECIPIENTS`] or
/// [`EncryptFlags::CHANGE_RECIPIENTS`]. With a non-empty
/// `backup_extension` the original is kept as
/// `<source>.<suffix><backup_extension>`; otherwise it is removed.
///
/// # Errors
///
/// - `PreconditionError::InvalidOperation` for any other flag value, before
///   the filesystem is touched
/// - `PreconditionError` for a missing or directory source, or no recipients
/// - `ConflictError::SuffixExhausted` if no free temp name was found
/// - `LookupError::Recipient` for a recipient that did not resolve
/// - an engine failure; the source is untouched and the temp file removed
/// - `IoError` from the commit, naming the phase that failed
pub fn modify_recipients<E: Engine, S: AsRef<str>>(
    engine: &E,
    operation: EncryptFlags,
    source: &Path,
    backup_extension: Option<&str>,
    recipients: &[S],
) -> Result<ModifyOutcome> {
    let op = Operation::ModifyRecipients;
    if operation != EncryptFlags::ADD_RECIPIENTS && operation != EncryptFlags::CHANGE_RECIPIENTS {
        return Err(PreconditionError::InvalidOperation {
            op,
            flags: operation.bits(),
        }
        .into());
    }

    let mut job = Job::new(op, source, recipients);

    run(&mut job, |job| {
        validate_source(op, source)?;
        if recipients.is_empty() {
            return Err(PreconditionError::NoRecipients { op }.into());
        }

        let backup_extension = backup_extension.filter(|ext| !ext.is_empty());
        let suffix = naming::plan_suffix(op, source, backup_extension)?;
        let temp = naming::temp_path(source, &suffix);
        let backup = backup_extension.map(|ext| naming::backup_path(source, &suffix, ext));
        job.set_temp(temp.clone());
        job.set_backup(backup.clone());
        job.advance(JobState::Validated);

        let mut ctx = engine
            .new_context()
            .map_err(|e| e.during(op, "open context"))?;
        let keys = resolve_recipients(engine, op, recipients)?;

        let mut input = Data::from_path(source);
        let mut output = Data::from_path(&temp);
        debug!(
            flags = %operation,
            recipients = keys.len(),
            temp = %temp.display(),
            "rewriting recipients"
        );
        ctx.encrypt(
            &keys,
            operation | EncryptFlags::FILE,
            &mut input,
            &mut output,
        )
        .map_err(|e| e.during(op, "modify recipients"))?;
        job.advance(JobState::EngineInvoked);

        output.close().io_context(op, "close output", &temp)?;
        input.close().io_context(op, "close input", source)?;

        match &backup {
            Some(backup) => fs::rename(source, backup).io_context(op, "rename backup", backup)?,
            None => fs::remove_file(source).io_context(op, "remove source", source)?,
        }
        job.source_moved();
        fs::rename(&temp, source).io_context(op, "rename temp", &temp)?;
        job.advance(JobState::Committed);

        debug!(source = %source.display(), backup = ?backup, "recipients committed");
        Ok(ModifyOutcome {
            source: source.to_path_buf(),
            backup,
        })
    })
}

/// Run a job body; on error, move the job to `Failed` after the body's
/// handles have been dropped.
fn run<T>(job: &mut Job, body: impl FnOnce(&mut Job) -> Result<T>) -> Result<T> {
    let result = body(job);
    if let Err(e) = &result {
        job.fail(e);
    }
    result
}

pub(crate) fn validate_source(op: Operation, source: &Path) -> Result<()> {
    let meta = match fs::metadata(source) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PreconditionError::SourceNotFound {
                op,
                path: source.to_path_buf(),
                source: e,
            }
            .into())
        }
        Err(e) => return Err(e).io_context(op, "stat source", source),
    };
    if meta.is_dir() {
        return Err(PreconditionError::SourceIsDirectory {
            op,
            path: source.to_path_buf(),
        }
        .into());
    }
    Ok(())
}

/// Resolve each recipient on its own, so a failure names it. A pattern
/// matching several keys adds all of them.
fn resolve_recipients<E: Engine, S: AsRef<str>>(
    engine: &E,
    op: Operation,
    recipients: &[S],
) -> Result<Vec<KeyHandle>> {
    let mut keys = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        let recipient = recipient.as_ref();
        let failed = |reason: String| -> Error {
            LookupError::Recipient {
                op,
                recipient: recipient.to_string(),
                reason,
            }
            .into()
        };

        if recipient.trim().is_empty() {
            return Err(failed("empty recipient".to_string()));
        }
        let found = engine
            .lookup_keys(recipient, false)
            .map_err(|e| failed(e.to_string()))?;
        if found.is_empty() {
            return Err(failed("no public key found".to_string()));
        }
        debug!(recipient, matches = found.len(), "recipient resolved");
        keys.extend(found);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::MemoryEngine;
    use crate::core::model::Status;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        engine: MemoryEngine,
    }

    impl Fixture {
        fn new() -> Self {
            let engine = MemoryEngine::new();
            engine.add_key("Alice <alice@example.com>", true);
            engine.add_key("Bob <bob@example.com>", false);
            Self {
                dir: TempDir::new().unwrap(),
                engine,
            }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn write(&self, name: &str, contents: &[u8]) -> PathBuf {
            let path = self.path(name);
            fs::write(&path, contents).unwrap();
            path
        }

        fn entries(&self) -> Vec<String> {
            let mut names: Vec<String> = fs::read_dir(self.dir.path())
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }

        /// A file encrypted to alice only.
        fn encrypted(&self, name: &str) -> PathBuf {
            let plain = self.write(&format!("{name}.plain"), b"quarterly numbers\n");
            let out = self.path(name);
            encrypt_file(&self.engine, &plain, Some(&out), &["alice"], false).unwrap();
            fs::remove_file(plain).unwrap();
            out
        }
    }

    /// An engine where bob holds the secret key and alice does not, with
    /// the same fingerprints as the fixture's.
    fn bob_engine() -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine.add_key("Alice <alice@example.com>", false);
        engine.add_key("Bob <bob@example.com>", true);
        engine
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let fx = Fixture::new();
        let source = fx.write("report.txt", b"hello\n");

        let encrypted = encrypt_file(&fx.engine, &source, None, &["alice"], true).unwrap();
        assert_eq!(encrypted, fx.path("report.txt.gpg"));

        fs::remove_file(&source).unwrap();
        let outcome = decrypt_file(&fx.engine, &encrypted, None).unwrap();
        assert_eq!(outcome.destination, source);
        assert_eq!(fs::read(&source).unwrap(), b"hello\n");
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.decrypt.file_name.as_deref(), Some("report.txt"));
        assert_eq!(outcome.verify.signatures.len(), 1);
        assert!(outcome.verify.signatures[0].is_valid());
    }

    #[test]
    fn test_pattern_matching_several_keys_adds_all() {
        let fx = Fixture::new();
        let source = fx.write("shared.txt", b"for both\n");

        let encrypted = encrypt_file(&fx.engine, &source, None, &["example.com"], false).unwrap();
        fs::remove_file(&source).unwrap();

        let outcome = decrypt_file(&fx.engine, &encrypted, None).unwrap();
        assert_eq!(outcome.decrypt.recipients.len(), 2);
        fs::remove_file(&source).unwrap();
        assert!(decrypt_file(&bob_engine(), &encrypted, None).is_ok());
    }

    #[test]
    fn test_encrypt_requires_recipients() {
        let fx = Fixture::new();
        let source = fx.write("a.txt", b"x");
        let err = encrypt_file::<_, &str>(&fx.engine, &source, None, &[], false).unwrap_err();
        assert!(matches!(
            err,
            Error::Precondition(PreconditionError::NoRecipients { .. })
        ));
        assert!(!fx.path("a.txt.gpg").exists());
    }

    #[test]
    fn test_encrypt_names_failing_recipient() {
        let fx = Fixture::new();
        let source = fx.write("a.txt", b"x");
        let err = encrypt_file(&fx.engine, &source, None, &["alice", "carol"], false).unwrap_err();
        match err {
            Error::Lookup(LookupError::Recipient { recipient, .. }) => assert_eq!(recipient, "carol"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_source_checks() {
        let fx = Fixture::new();
        let err = encrypt_file(&fx.engine, &fx.path("missing"), None, &["alice"], false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Precondition(PreconditionError::SourceNotFound { .. })
        ));

        fs::create_dir(fx.path("folder.gpg")).unwrap();
        let err = decrypt_file(&fx.engine, &fx.path("folder.gpg"), None).unwrap_err();
        assert!(matches!(
            err,
            Error::Precondition(PreconditionError::SourceIsDirectory { .. })
        ));
    }

    #[test]
    fn test_encrypt_onto_source_is_refused() {
        let fx = Fixture::new();
        let source = fx.write("a.txt", b"x");
        let err = encrypt_file(&fx.engine, &source, Some(&source), &["alice"], false).unwrap_err();
        assert!(matches!(
            err,
            Error::Conflict(ConflictError::DestinationExists { .. })
        ));
        assert_eq!(fs::read(&source).unwrap(), b"x");
    }

    #[test]
    fn test_decrypt_never_overwrites() {
        let fx = Fixture::new();
        let encrypted = fx.encrypted("notes.gpg");
        let existing = fx.write("notes", b"keep me");

        let err = decrypt_file(&fx.engine, &encrypted, None).unwrap_err();
        assert!(matches!(
            err,
            Error::Conflict(ConflictError::DestinationExists { .. })
        ));
        assert_eq!(fs::read(existing).unwrap(), b"keep me");
    }

    #[test]
    fn test_decrypt_unknown_extension() {
        let fx = Fixture::new();
        let source = fx.write("report.bin", b"x");
        let err = decrypt_file(&fx.engine, &source, None).unwrap_err();
        assert!(matches!(
            err,
            Error::Precondition(PreconditionError::UnknownExtension { .. })
        ));
    }

    #[test]
    fn test_decrypt_no_data_is_a_warning() {
        let fx = Fixture::new();
        let source = fx.write("plain.gpg", b"not openpgp at all");
        let outcome = decrypt_file(&fx.engine, &source, None).unwrap();
        assert_eq!(outcome.warning, Some(Warning::NoData));
        assert_eq!(outcome.warning.unwrap().to_string(), "No data");
        assert!(outcome.decrypt.recipients.is_empty());
        assert!(outcome.verify.signatures.is_empty());
    }

    #[test]
    fn test_decrypt_failure_leaves_no_output() {
        let fx = Fixture::new();
        let plain = fx.write("x.txt", b"x");
        let encrypted = encrypt_file(&fx.engine, &plain, None, &["bob"], false).unwrap();
        fs::remove_file(&plain).unwrap();

        let err = decrypt_file(&fx.engine, &encrypted, None).unwrap_err();
        assert!(matches!(err.engine_error(), Some(EngineError::Failed { .. })));
        assert!(!plain.exists());

        fx.engine.fail_next_call("decrypt");
        let alice_file = fx.encrypted("y.gpg");
        assert!(decrypt_file(&fx.engine, &alice_file, None).is_err());
        assert!(!fx.path("y").exists());
    }

    #[test]
    fn test_add_recipient_with_backup() {
        let fx = Fixture::new();
        let file = fx.encrypted("f.gpg");
        let before = fs::read(&file).unwrap();

        let outcome = modify_recipients(
            &fx.engine,
            EncryptFlags::ADD_RECIPIENTS,
            &file,
            Some(".bak"),
            &["bob"],
        )
        .unwrap();

        assert!(file.exists());
        let backup = outcome.backup.unwrap();
        assert_eq!(fs::read(&backup).unwrap(), before);

        let entries = fx.entries();
        let backups: Vec<&String> = entries
            .iter()
            .filter(|n| n.starts_with("f.gpg.") && n.ends_with(".bak"))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].len(), "f.gpg.".len() + 8 + ".bak".len());
        assert!(!entries.iter().any(|n| n.ends_with(".tmp")));

        // bob's key now opens it, and alice's still does
        let out = bob_engine();
        let decrypted = decrypt_file(&out, &file, Some(&fx.path("by-bob"))).unwrap();
        assert!(decrypted.warning.is_none());
        assert_eq!(fs::read(fx.path("by-bob")).unwrap(), b"quarterly numbers\n");
        decrypt_file(&fx.engine, &file, Some(&fx.path("by-alice"))).unwrap();
    }

    #[test]
    fn test_add_recipient_without_backup() {
        let fx = Fixture::new();
        let file = fx.encrypted("f.gpg");

        let outcome =
            modify_recipients(&fx.engine, EncryptFlags::ADD_RECIPIENTS, &file, None, &["bob"])
                .unwrap();
        assert!(outcome.backup.is_none());
        assert_eq!(fx.entries(), ["f.gpg"]);

        // an empty extension also means no backup
        modify_recipients(&fx.engine, EncryptFlags::ADD_RECIPIENTS, &file, Some(""), &["bob"])
            .unwrap();
        assert_eq!(fx.entries(), ["f.gpg"]);
    }

    #[test]
    fn test_change_recipients_replaces_set() {
        let fx = Fixture::new();
        let file = fx.encrypted("f.gpg");

        modify_recipients(&fx.engine, EncryptFlags::CHANGE_RECIPIENTS, &file, None, &["bob"])
            .unwrap();

        let err = decrypt_file(&fx.engine, &file, Some(&fx.path("out"))).unwrap_err();
        assert!(matches!(err.engine_error(), Some(EngineError::Failed { .. })));
        let outcome = decrypt_file(&bob_engine(), &file, Some(&fx.path("out"))).unwrap();
        assert_eq!(outcome.decrypt.recipients.len(), 1);
        assert!(outcome.decrypt.recipients[0].status.is_none());
    }

    #[test]
    fn test_invalid_operation_touches_nothing() {
        let fx = Fixture::new();
        let file = fx.encrypted("f.gpg");
        let before = fs::read(&file).unwrap();

        for flags in [
            EncryptFlags::NONE,
            EncryptFlags::ALWAYS_TRUST,
            EncryptFlags::ADD_RECIPIENTS | EncryptFlags::CHANGE_RECIPIENTS,
            EncryptFlags::ADD_RECIPIENTS | EncryptFlags::FILE,
        ] {
            let err = modify_recipients(&fx.engine, flags, &file, Some(".bak"), &["bob"])
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Precondition(PreconditionError::InvalidOperation { .. })
            ));
        }
        assert_eq!(fx.entries(), ["f.gpg"]);
        assert_eq!(fs::read(&file).unwrap(), before);

        // checked before the source is looked at
        let err = modify_recipients(
            &fx.engine,
            EncryptFlags::NONE,
            &fx.path("absent"),
            None,
            &["bob"],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Precondition(PreconditionError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_engine_failure_keeps_source_and_removes_temp() {
        let fx = Fixture::new();
        let file = fx.encrypted("f.gpg");
        let before = fs::read(&file).unwrap();

        fx.engine.fail_next_call("encrypt");
        let err = modify_recipients(
            &fx.engine,
            EncryptFlags::ADD_RECIPIENTS,
            &file,
            Some(".bak"),
            &["bob"],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
        assert_eq!(fx.entries(), ["f.gpg"]);
        assert_eq!(fs::read(&file).unwrap(), before);
        assert_eq!(fx.engine.open_contexts(), 0);
    }

    #[test]
    fn test_modify_without_secret_key_fails() {
        let fx = Fixture::new();
        let file = fx.encrypted("f.gpg");

        let err = modify_recipients(
            &bob_engine(),
            EncryptFlags::ADD_RECIPIENTS,
            &file,
            None,
            &["bob"],
        )
        .unwrap_err();
        assert!(matches!(err.engine_error(), Some(EngineError::Failed { .. })));
        assert_eq!(fx.entries(), ["f.gpg"]);
    }

    #[test]
    fn test_modify_unknown_recipient() {
        let fx = Fixture::new();
        let file = fx.encrypted("f.gpg");
        let err = modify_recipients(
            &fx.engine,
            EncryptFlags::ADD_RECIPIENTS,
            &file,
            None,
            &["mallory"],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Lookup(LookupError::Recipient { .. })));
        assert_eq!(fx.entries(), ["f.gpg"]);
    }

    #[test]
    fn test_recipient_without_secret_key_reported() {
        let fx = Fixture::new();
        let plain = fx.write("both.txt", b"x");
        let file = encrypt_file(&fx.engine, &plain, None, &["alice", "bob"], false).unwrap();
        fs::remove_file(plain).unwrap();

        let outcome = decrypt_file(&fx.engine, &file, None).unwrap();
        let statuses: Vec<Option<Status>> = outcome
            .decrypt
            .recipients
            .iter()
            .map(|r| r.status.clone())
            .collect();
        assert_eq!(statuses, [None, Some(Status::NoSecretKey)]);
    }
}
