//! File identification through the binary.

use crate::support::*;

#[test]
fn test_identify_files() {
    let t = Test::new();
    t.write("key.asc", PUBLIC_KEY_BLOCK);
    t.write("msg.asc", "-----BEGIN PGP MESSAGE-----\n\nhQEMA\n-----END PGP MESSAGE-----\n");
    t.write("plain.txt", SAMPLE_TEXT);
    t.write("empty", "");

    let output = t.run(&["identify", "key.asc", "msg.asc", "plain.txt", "empty"]);
    assert_success(&output);
    let out = stdout(&output);
    assert!(out.contains("key.asc: PGP-key"), "{out}");
    assert!(out.contains("msg.asc: PGP-encrypted"), "{out}");
    assert!(out.contains("plain.txt: unknown"), "{out}");
    assert!(out.contains("empty: invalid"), "{out}");
}

#[test]
fn test_identify_binary_packet() {
    let t = Test::new();
    // new-format packet, tag 1 (public-key encrypted session key)
    t.write("msg.gpg", [0xc1u8, 0x0c, 0x03, 0x00]);

    let output = t.run(&["identify", "msg.gpg"]);
    assert_success(&output);
    assert_stdout_contains(&output, "msg.gpg: PGP-encrypted");
}

#[test]
fn test_identify_missing_file() {
    let t = Test::new();
    let output = t.run(&["identify", "absent"]);
    assert_failure(&output);
    assert_stderr_contains(&output, "IdentifyFile - file does not exist");
}
