//! Text commands: sign stdin, verify stdin.
//!
//! Signed text and recovered plaintext go to stdout; byte counts, signers
//! and signature verdicts go to stderr.

use std::io::{self, BufRead, Read};

use crate::cli::{files, output};
use crate::core::buffer;
use crate::core::engine::Engine;
use crate::core::text;
use crate::error::{IoContext, Operation, Result};

const STDIN: &str = "<stdin>";
const STDOUT: &str = "<stdout>";

/// Sign the lines read from stdin.
pub fn sign<E: Engine>(engine: &E, signer: &str, armored: bool) -> Result<()> {
    let op = Operation::SignBytes;
    let lines = io::stdin()
        .lock()
        .lines()
        .collect::<io::Result<Vec<String>>>()
        .io_context(op, "read stdin", STDIN)?;

    let signed = buffer::sign_bytes(engine, &text::lines_to_bytes(&lines), signer, armored)?;

    output::raw(&signed.signed).io_context(op, "write stdout", STDOUT)?;
    output::dimmed(&format!("Read last {} bytes", signed.last_chunk));
    output::dimmed(&format!("Result {} bytes", signed.signed.len()));
    for fingerprint in &signed.signers {
        output::kv("signer:", output::key(fingerprint));
    }
    Ok(())
}

/// Verify a signed message from stdin and print its text.
pub fn verify<E: Engine>(engine: &E, json: bool) -> Result<()> {
    let op = Operation::VerifyBytes;
    let mut signed = Vec::new();
    io::stdin()
        .lock()
        .read_to_end(&mut signed)
        .io_context(op, "read stdin", STDIN)?;

    let verified = buffer::verify_bytes(engine, &signed)?;

    for line in text::bytes_to_lines(&verified.plain) {
        output::data(&line);
    }

    if json {
        eprintln!("{}", serde_json::to_string_pretty(&verified.signatures)?);
        return Ok(());
    }
    if let Some(name) = &verified.file_name {
        output::kv("file name:", name);
    }
    if verified.signatures.is_empty() {
        output::warn("no signatures");
    }
    for sig in &verified.signatures {
        files::report_signature(sig);
    }
    Ok(())
}
