//! OpenPGP engine seam.
//!
//! Everything cryptographic is delegated to an [`Engine`]. The rest of the
//! crate only orchestrates: it hands the engine data handles, reads results
//! back, and turns them into owned records.
//!
//! ## Backends
//!
//! - **gpg**: [`GpgEngine`] drives the `gpg` program through its
//!   machine-readable interfaces.
//! - **memory**: [`MemoryEngine`] is an in-process engine with a toy
//!   message format. It is NOT cryptographically secure and exists so the
//!   file and buffer protocols can be exercised hermetically.
//!
//! ## Adding a New Backend
//!
//! 1. Implement [`Engine`] and its [`Context`]
//! 2. Produce [`KeyHandle`] chains from the backend's key listing
//! 3. Report "no OpenPGP data" as [`EngineError::NoData`]

use std::fmt;

use serde::Serialize;

use crate::core::model::{DataType, DecryptResult, KeyListMode, Protocol, Validity, VerifyResult};
use crate::core::types::{Fingerprint, KeyId};
use crate::error::EngineError;

mod data;
mod gpg;
mod memory;

pub use data::{Chunk, Data};
pub use gpg::GpgEngine;
pub use memory::MemoryEngine;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// An OpenPGP engine.
pub trait Engine {
    /// Per-operation state. Dropping it releases everything it holds.
    type Context: Context;

    /// Backend name for display.
    fn name(&self) -> &'static str;

    /// Open a fresh context.
    fn new_context(&self) -> EngineResult<Self::Context>;

    /// Keys matching `pattern`; only keys with a secret part when
    /// `secret_only` is set. An empty result is not an error here.
    fn lookup_keys(&self, pattern: &str, secret_only: bool) -> EngineResult<Vec<KeyHandle>>;

    /// Program location, home directory and versions.
    fn info(&self) -> EngineResult<EngineInfo>;

    /// Fail unless the engine meets the configured minimum version.
    fn check_version(&self) -> EngineResult<()>;

    /// Classify the data behind `data`.
    fn identify(&self, data: &mut Data) -> EngineResult<DataType> {
        let mut head = vec![0u8; 4096];
        let mut filled = 0;
        while filled < head.len() {
            match data.read_chunk(&mut head[filled..])? {
                Chunk::Bytes(n) => filled += n,
                Chunk::End => break,
            }
        }
        Ok(DataType::identify(&head[..filled]))
    }
}

/// One engine operation context.
pub trait Context {
    /// ASCII armor for produced output.
    fn set_armor(&mut self, armor: bool);

    /// Sign `input` with every key in `signers`.
    fn sign(
        &mut self,
        signers: &[KeyHandle],
        input: &mut Data,
        output: &mut Data,
        mode: SignMode,
    ) -> EngineResult<()>;

    /// Encrypt `input` to `recipients`. With `ADD_RECIPIENTS` or
    /// `CHANGE_RECIPIENTS`, `input` is an existing ciphertext whose
    /// recipient set is changed.
    fn encrypt(
        &mut self,
        recipients: &[KeyHandle],
        flags: EncryptFlags,
        input: &mut Data,
        output: &mut Data,
    ) -> EngineResult<()>;

    /// Encrypt and sign with the engine's default signing key.
    fn encrypt_sign(
        &mut self,
        recipients: &[KeyHandle],
        flags: EncryptFlags,
        input: &mut Data,
        output: &mut Data,
    ) -> EngineResult<()>;

    /// Decrypt and verify in one pass. Results are fetched afterwards with
    /// [`Context::decrypt_result`] and [`Context::verify_result`], which stay
    /// available even when this returns [`EngineError::NoData`].
    fn decrypt_verify(&mut self, input: &mut Data, output: &mut Data) -> EngineResult<()>;

    fn decrypt_result(&self) -> EngineResult<DecryptResult>;

    fn verify_result(&self) -> EngineResult<VerifyResult>;

    /// Verify an opaque signed message and extract the signed data.
    fn verify(&mut self, signed: &mut Data, plain: &mut Data) -> EngineResult<VerifyResult>;
}

/// Signature mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignMode {
    /// Opaque signed message.
    #[default]
    Normal,
    Detach,
    Clear,
}

/// Encryption flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EncryptFlags(u32);

impl EncryptFlags {
    pub const NONE: Self = Self(0);
    /// Do not require valid trust for recipients.
    pub const ALWAYS_TRUST: Self = Self(1);
    pub const NO_ENCRYPT_TO: Self = Self(2);
    pub const PREPARE: Self = Self(4);
    pub const EXPECT_SIGN: Self = Self(8);
    pub const NO_COMPRESS: Self = Self(16);
    pub const SYMMETRIC: Self = Self(32);
    pub const THROW_KEYIDS: Self = Self(64);
    pub const WRAP: Self = Self(128);
    pub const WANT_ADDRESS: Self = Self(256);
    pub const ARCHIVE: Self = Self(512);
    /// Data handles name files the engine reads and writes itself.
    pub const FILE: Self = Self(1024);
    /// Add recipients to an existing ciphertext.
    pub const ADD_RECIPIENTS: Self = Self(2048);
    /// Replace the recipients of an existing ciphertext.
    pub const CHANGE_RECIPIENTS: Self = Self(4096);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for EncryptFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for EncryptFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Engine location and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInfo {
    pub file_name: String,
    pub home_dir: Option<String>,
    pub required_version: String,
    pub version: String,
}

/// A key as the engine reports it: flat key fields plus a linked chain of
/// user IDs, each with a linked chain of certifications.
#[derive(Debug, Clone, Default)]
pub struct KeyHandle {
    pub fingerprint: Fingerprint,
    pub can_authenticate: bool,
    pub can_certify: bool,
    pub can_encrypt: bool,
    pub can_sign: bool,
    pub chain_id: String,
    pub disabled: bool,
    pub expired: bool,
    pub has_user_ids: bool,
    pub invalid: bool,
    pub is_qualified: bool,
    pub issuer_name: String,
    pub issuer_serial: String,
    pub key_list_mode: KeyListMode,
    pub owner_trust: Validity,
    pub protocol: Protocol,
    pub revoked: bool,
    pub secret: bool,
    pub user_ids: Option<Box<UserIdNode>>,
}

impl KeyHandle {
    /// Walk the user ID chain.
    pub fn user_ids(&self) -> impl Iterator<Item = &UserIdNode> {
        std::iter::successors(self.user_ids.as_deref(), |n| n.next.as_deref())
    }
}

/// One user ID in a [`KeyHandle`] chain.
#[derive(Debug, Clone, Default)]
pub struct UserIdNode {
    pub uid: String,
    pub name: String,
    pub address: String,
    pub invalid: bool,
    pub revoked: bool,
    pub validity: Validity,
    pub has_signatures: bool,
    pub signatures: Option<Box<SignatureNode>>,
    pub next: Option<Box<UserIdNode>>,
}

impl UserIdNode {
    /// Walk this user ID's certification chain.
    pub fn signatures(&self) -> impl Iterator<Item = &SignatureNode> {
        std::iter::successors(self.signatures.as_deref(), |n| n.next.as_deref())
    }

    /// Link nodes in order and return the head.
    pub fn chain(nodes: Vec<UserIdNode>) -> Option<Box<UserIdNode>> {
        nodes.into_iter().rev().fold(None, |next, mut node| {
            node.next = next;
            Some(Box::new(node))
        })
    }
}

/// One certification on a user ID. Times are seconds since the epoch;
/// `expires == 0` means no expiration.
#[derive(Debug, Clone, Default)]
pub struct SignatureNode {
    pub key_id: KeyId,
    pub created: i64,
    pub expires: i64,
    pub revoked: bool,
    pub expired: bool,
    pub invalid: bool,
    pub exportable: bool,
    pub uid: String,
    pub name: String,
    pub email: String,
    pub comment: String,
    pub trust_scope: String,
    pub has_notations: bool,
    pub next: Option<Box<SignatureNode>>,
}

impl SignatureNode {
    /// Link nodes in order and return the head.
    pub fn chain(nodes: Vec<SignatureNode>) -> Option<Box<SignatureNode>> {
        nodes.into_iter().rev().fold(None, |next, mut node| {
            node.next = next;
            Some(Box::new(node))
        })
    }
}

/// Split `Name (Comment) <email>` into its parts.
pub fn split_user_id(uid: &str) -> (String, String, String) {
    let uid = uid.trim();
    let (rest, email) = match (uid.rfind('<'), uid.ends_with('>')) {
        (Some(start), true) => (uid[..start].trim(), &uid[start + 1..uid.len() - 1]),
        _ if uid.contains('@') && !uid.contains(' ') => ("", uid),
        _ => (uid, ""),
    };
    let (name, comment) = match (rest.rfind('('), rest.ends_with(')')) {
        (Some(start), true) => (rest[..start].trim(), &rest[start + 1..rest.len() - 1]),
        _ => (rest, ""),
    };
    (name.to_string(), comment.to_string(), email.to_string())
}
