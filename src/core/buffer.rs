//! Sign and verify in-memory buffers.
//!
//! Neither operation touches the filesystem. Engine output is drained in
//! fixed-size chunks into one buffer.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::core::constants::CHUNK_SIZE;
use crate::core::engine::{Chunk, Context, Data, Engine, SignMode};
use crate::core::model::MessageSignature;
use crate::core::types::Fingerprint;
use crate::error::{EngineError, IoContext, LookupError, Operation, PreconditionError, Result};

/// Output of [`sign_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBytes {
    /// The signed message.
    pub signed: Vec<u8>,
    /// Size of the final non-empty chunk read from the engine.
    pub last_chunk: usize,
    /// Fingerprints of every key that signed.
    pub signers: Vec<Fingerprint>,
}

/// Output of [`verify_bytes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedBytes {
    pub plain: Vec<u8>,
    pub signatures: Vec<MessageSignature>,
    /// File name embedded in the signed message.
    pub file_name: Option<String>,
}

/// Sign `plain` with every secret key matching `identity`.
///
/// # Errors
///
/// - `EngineError::Init` (as an engine failure) if no context can be opened
/// - `LookupError::NoKeys` if `identity` matches no secret key
/// - an engine failure in phase `sign` if signing fails
/// - `IoError` if draining the output fails; partial output is dropped
pub fn sign_bytes<E: Engine>(
    engine: &E,
    plain: &[u8],
    identity: &str,
    armored: bool,
) -> Result<SignedBytes> {
    let op = Operation::SignBytes;
    debug!(identity, armored, plain_len = plain.len(), "signing buffer");

    if identity.trim().is_empty() {
        return Err(PreconditionError::EmptyPattern { op }.into());
    }

    let mut ctx = engine
        .new_context()
        .map_err(|e| e.during(op, "open context"))?;
    ctx.set_armor(armored);

    let mut input = Data::from_bytes(plain);
    let mut output = Data::new();

    let keys = engine
        .lookup_keys(identity, true)
        .map_err(|e| e.during(op, "key lookup"))?;
    if keys.is_empty() {
        return Err(LookupError::NoKeys {
            op,
            pattern: identity.to_string(),
        }
        .into());
    }
    let signers: Vec<Fingerprint> = keys.iter().map(|k| k.fingerprint.clone()).collect();

    ctx.sign(&keys, &mut input, &mut output, SignMode::Normal)
        .map_err(|e| e.during(op, "sign"))?;

    output.rewind().io_context(op, "rewind", data_label(&output))?;
    let (signed, last_chunk) = drain(op, &mut output)?;

    debug!(
        signed_len = signed.len(),
        signers = signers.len(),
        "buffer signed"
    );

    Ok(SignedBytes {
        signed,
        last_chunk,
        signers,
    })
}

/// Verify a signed message and extract its content.
///
/// # Errors
///
/// - an engine failure in phase `verify` if the engine rejects the input
/// - an engine failure wrapping `EngineError::EmptyResult` if no content
///   came out
/// - `IoError` if draining the output fails
pub fn verify_bytes<E: Engine>(engine: &E, signed: &[u8]) -> Result<VerifiedBytes> {
    let op = Operation::VerifyBytes;
    debug!(signed_len = signed.len(), "verifying buffer");

    let mut ctx = engine
        .new_context()
        .map_err(|e| e.during(op, "open context"))?;

    let mut input = Data::from_bytes(signed);
    let mut output = Data::new();

    let result = ctx
        .verify(&mut input, &mut output)
        .map_err(|e| e.during(op, "verify"))?;
    if result.signatures.is_empty() {
        return Err(EngineError::Failed {
            call: "verify",
            reason: "no signature found".to_string(),
        }
        .during(op, "verify")
        .into());
    }

    output.rewind().io_context(op, "rewind", data_label(&output))?;
    let (plain, _) = drain(op, &mut output)?;
    if plain.is_empty() {
        return Err(EngineError::EmptyResult.during(op, "read output").into());
    }

    debug!(
        plain_len = plain.len(),
        signatures = result.signatures.len(),
        "buffer verified"
    );

    Ok(VerifiedBytes {
        plain,
        signatures: result.signatures,
        file_name: result.file_name,
    })
}

/// Read `data` to its end in [`CHUNK_SIZE`] pieces.
///
/// Returns the accumulated bytes and the size of the last non-empty chunk.
pub fn drain(op: Operation, data: &mut Data) -> Result<(Vec<u8>, usize)> {
    let mut chunk = Zeroizing::new(vec![0u8; CHUNK_SIZE]);
    let mut out = Vec::new();
    let mut last = 0;

    loop {
        let read = data
            .read_chunk(&mut chunk[..])
            .io_context(op, "read output", data_label(data))?;
        match read {
            Chunk::Bytes(n) => {
                out.extend_from_slice(&chunk[..n]);
                if n > 0 {
                    last = n;
                }
            }
            Chunk::End => break,
        }
    }

    trace!(total = out.len(), last, "drained");
    Ok((out, last))
}

fn data_label(data: &Data) -> &Path {
    data.path().unwrap_or(Path::new("<memory>"))
}
