//! Destination, temp and backup file names.
//!
//! Everything here is pure except [`random_suffix`], which draws from the
//! operating system's CSPRNG, and [`plan_suffix`], which checks candidate
//! names for existence.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use tracing::debug;

use crate::core::constants::{
    DECRYPT_EXTENSIONS, ENCRYPTED_EXTENSION, SUFFIX_ATTEMPTS, SUFFIX_LEN, TEMP_EXTENSION,
};
use crate::error::{ConflictError, Operation, PreconditionError, Result};

/// Where a decrypted file goes.
///
/// A non-empty `explicit` name is used verbatim. Otherwise one of `.gpg`,
/// `.pgp` or `.asc` must end the source name exactly, and is stripped.
pub fn infer_decrypt_destination(source: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(explicit) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(explicit.to_path_buf());
    }

    // extension() is None for a bare ".gpg", so the stem is never empty
    let known = source
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            DECRYPT_EXTENSIONS
                .iter()
                .any(|known| known.strip_prefix('.') == Some(ext))
        });

    if known {
        Ok(source.with_extension(""))
    } else {
        Err(PreconditionError::UnknownExtension {
            op: Operation::DecryptFile,
            path: source.to_path_buf(),
        }
        .into())
    }
}

/// Where an encrypted file goes: `explicit`, or the source with `.gpg`
/// appended.
pub fn encrypt_destination(source: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit.filter(|p| !p.as_os_str().is_empty()) {
        Some(explicit) => explicit.to_path_buf(),
        None => append(source, ENCRYPTED_EXTENSION),
    }
}

/// Eight characters from `[a-zA-Z0-9]`, from the OS random source.
pub fn random_suffix() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}

/// `<source>.<suffix>.tmp`
pub fn temp_path(source: &Path, suffix: &str) -> PathBuf {
    append(source, &format!(".{}{}", suffix, TEMP_EXTENSION))
}

/// `<source>.<suffix><extension>`
pub fn backup_path(source: &Path, suffix: &str, extension: &str) -> PathBuf {
    append(source, &format!(".{}{}", suffix, extension))
}

/// Draw a suffix whose temp name, and backup name when a backup extension
/// is given, do not exist yet.
pub fn plan_suffix(op: Operation, source: &Path, backup_extension: Option<&str>) -> Result<String> {
    for attempt in 1..=SUFFIX_ATTEMPTS {
        let suffix = random_suffix();
        let temp_free = !exists(&temp_path(source, &suffix));
        let backup_free = backup_extension
            .map(|ext| !exists(&backup_path(source, &suffix, ext)))
            .unwrap_or(true);
        if temp_free && backup_free {
            return Ok(suffix);
        }
        debug!(attempt, suffix = %suffix, "suffix collides with an existing file");
    }

    Err(ConflictError::SuffixExhausted {
        op,
        path: source.to_path_buf(),
        attempts: SUFFIX_ATTEMPTS,
    }
    .into())
}

/// Existence without following symlinks, so a dangling link counts.
pub(crate) fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

fn append(path: &Path, tail: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(tail);
    PathBuf::from(name)
}
