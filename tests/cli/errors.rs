//! Precondition failures reported by the binary.

use predicates::prelude::*;

use crate::support::*;

const MISSING_PROGRAM: &str = "[engine]\nprogram = \"gpghigh-no-such-program\"\n";

#[test]
fn test_decrypt_unknown_extension() {
    let t = Test::new();
    t.write("report.bin", "data");

    let output = t.run(&["decrypt", "report.bin"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "DecryptFile - no destination filename given");
    assert_stderr_contains(&output, "--output");
}

#[test]
fn test_decrypt_missing_source() {
    let t = Test::new();
    let output = t.run(&["decrypt", "absent.gpg"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "DecryptFile - file does not exist");
}

#[test]
fn test_decrypt_directory() {
    let t = Test::new();
    std::fs::create_dir(t.path("folder.gpg")).unwrap();
    let output = t.run(&["decrypt", "folder.gpg"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "file is a directory");
}

#[test]
fn test_decrypt_refuses_existing_destination() {
    let t = Test::new();
    t.write("report.txt.gpg", "ciphertext");
    t.write("report.txt", "keep me");

    let output = t.run(&["decrypt", "report.txt.gpg"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "destination file exists");
    assert_eq!(std::fs::read_to_string(t.path("report.txt")).unwrap(), "keep me");
}

#[test]
fn test_encrypt_requires_recipient() {
    let t = Test::new();
    t.write("notes.txt", "hello");
    t.cmd()
        .args(["encrypt", "notes.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--recipient"));
}

#[test]
fn test_encrypt_missing_source() {
    let t = Test::new();
    let output = t.run(&["encrypt", "absent.txt", "-r", "bob@example.com"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "EncryptFile - file does not exist");
    assert!(t.files().is_empty());
}

#[test]
fn test_add_recipient_missing_source() {
    let t = Test::new();
    let output = t.run(&["add-recipient", "absent.gpg", "-r", "bob@example.com"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "ModifyRecipients - file does not exist");
}

#[test]
fn test_backup_flags_conflict() {
    let t = Test::new();
    t.write("f.gpg", "x");
    t.cmd()
        .args(["change-recipient", "f.gpg", "-r", "bob", "-b", ".old", "--no-backup"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_missing_engine_program() {
    let t = Test::new();
    let config = t.config(MISSING_PROGRAM);

    let output = t.run(&["--config", config.to_str().unwrap(), "engine"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "EngineInfo - check version failed");
    assert_stderr_contains(&output, "engine program not found: gpghigh-no-such-program");
    assert_stderr_contains(&output, "install GnuPG");
}

#[test]
fn test_keys_with_missing_program() {
    let t = Test::new();
    let config = t.config(MISSING_PROGRAM);

    let output = t.run(&["--config", config.to_str().unwrap(), "keys"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "KeyList - key lookup failed");
}

#[test]
fn test_sign_with_missing_program_reads_stdin_first() {
    let t = Test::new();
    let config = t.config(MISSING_PROGRAM);

    let output = t.run_with_stdin(
        &["--config", config.to_str().unwrap(), "sign", "-u", "alice"],
        b"hello\n",
    );
    assert_failure(&output);
    assert_stderr_contains(&output, "SignBytes - open context failed");
}
