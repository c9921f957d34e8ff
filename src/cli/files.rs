//! File commands: encrypt, decrypt, add-recipient, change-recipient.

use std::path::Path;

use crate::cli::{output, RecipientArgs};
use crate::core::config::Config;
use crate::core::engine::{EncryptFlags, Engine};
use crate::core::model::MessageSignature;
use crate::core::transform::{self, DecryptOutcome};
use crate::error::Result;

/// Encrypt a file.
pub fn encrypt<E: Engine>(
    engine: &E,
    file: &Path,
    destination: Option<&Path>,
    recipients: &[String],
    sign: bool,
) -> Result<()> {
    let written = transform::encrypt_file(engine, file, destination, recipients, sign)?;
    output::success(&format!("encrypted {}", output::path(&written)));
    Ok(())
}

/// Decrypt a file and report what the engine found.
pub fn decrypt<E: Engine>(
    engine: &E,
    file: &Path,
    destination: Option<&Path>,
    json: bool,
) -> Result<()> {
    let outcome = transform::decrypt_file(engine, file, destination)?;

    if json {
        output::data(&serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    if let Some(warning) = outcome.warning {
        output::warn(&format!("{}: {}", file.display(), warning));
    }
    output::success(&format!("decrypted {}", output::path(&outcome.destination)));
    report_decryption(&outcome);
    Ok(())
}

fn report_decryption(outcome: &DecryptOutcome) {
    let decrypt = &outcome.decrypt;
    if !decrypt.recipients.is_empty() {
        output::section("Recipients");
        for r in &decrypt.recipients {
            let mark = r.status.as_ref().map(|s| format!(" ({})", s)).unwrap_or_default();
            output::list_item(format!("{} {}{}", output::key(&r.key_id), r.pubkey_algo, mark));
        }
    }
    if let Some(name) = &decrypt.file_name {
        output::kv("file name:", name);
    }
    if decrypt.wrong_key_usage {
        output::warn("key used against its usage flags");
    }
    if decrypt.legacy_cipher_no_mdc {
        output::warn("message has no integrity protection");
    }
    if let Some(session_key) = &decrypt.session_key {
        output::kv("session key:", session_key);
    }

    if !outcome.verify.signatures.is_empty() {
        output::section("Signatures");
        for sig in &outcome.verify.signatures {
            report_signature(sig);
        }
    }
}

/// One signature line: verdict, fingerprint, creation time.
pub(crate) fn report_signature(sig: &MessageSignature) {
    let label = match &sig.status {
        None => "good".to_string(),
        Some(status) => status.to_string(),
    };
    let verdict = output::verdict(sig.status.is_none(), &label);
    let created = sig
        .timestamp
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default();
    output::list_item(format!(
        "{} {} {} [{}] {}",
        verdict,
        output::key(&sig.fingerprint),
        created,
        sig.summary,
        sig.validity
    ));
}

/// Add or change recipients in place.
pub fn modify<E: Engine>(
    engine: &E,
    config: &Config,
    operation: EncryptFlags,
    args: &RecipientArgs,
) -> Result<()> {
    let backup_ext = if args.no_backup {
        None
    } else {
        args.backup_ext
            .as_deref()
            .or(config.files.backup_extension.as_deref())
    };

    let outcome =
        transform::modify_recipients(engine, operation, &args.file, backup_ext, &args.recipients)?;

    let verb = if operation == EncryptFlags::ADD_RECIPIENTS {
        "added recipients to"
    } else {
        "changed recipients of"
    };
    output::success(&format!("{} {}", verb, output::path(&outcome.source)));
    match &outcome.backup {
        Some(backup) => output::kv("backup:", output::path(backup)),
        None => output::dimmed("  original removed"),
    }
    Ok(())
}
