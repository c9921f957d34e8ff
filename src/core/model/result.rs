//! Decryption and verification results.
//!
//! These are already flat when the engine reports them; no building is
//! needed beyond copying the fields.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::validity::Validity;
use crate::core::types::{Fingerprint, KeyId};

/// Why a recipient or signature did not check out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Status {
    NoSecretKey,
    NoPublicKey,
    BadSignature,
    SignatureExpired,
    KeyExpired,
    CertificateRevoked,
    /// Engine-specific failure code or text.
    Other(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NoSecretKey => f.write_str("No secret key"),
            Status::NoPublicKey => f.write_str("No public key"),
            Status::BadSignature => f.write_str("Bad signature"),
            Status::SignatureExpired => f.write_str("Signature expired"),
            Status::KeyExpired => f.write_str("Key expired"),
            Status::CertificateRevoked => f.write_str("Certificate revoked"),
            Status::Other(text) => f.write_str(text),
        }
    }
}

/// Signature summary bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct SigSummary(u32);

impl SigSummary {
    pub const VALID: Self = Self(0x0001);
    pub const GREEN: Self = Self(0x0002);
    pub const RED: Self = Self(0x0004);
    pub const KEY_REVOKED: Self = Self(0x0010);
    pub const KEY_EXPIRED: Self = Self(0x0020);
    pub const SIG_EXPIRED: Self = Self(0x0040);
    pub const KEY_MISSING: Self = Self(0x0080);
    pub const CRL_MISSING: Self = Self(0x0100);
    pub const CRL_TOO_OLD: Self = Self(0x0200);
    pub const BAD_POLICY: Self = Self(0x0400);
    pub const SYS_ERROR: Self = Self(0x0800);
    pub const TOFU_CONFLICT: Self = Self(0x1000);

    const NAMES: [(Self, &'static str); 12] = [
        (Self::VALID, "valid"),
        (Self::GREEN, "green"),
        (Self::RED, "red"),
        (Self::KEY_REVOKED, "key-revoked"),
        (Self::KEY_EXPIRED, "key-expired"),
        (Self::SIG_EXPIRED, "sig-expired"),
        (Self::KEY_MISSING, "key-missing"),
        (Self::CRL_MISSING, "crl-missing"),
        (Self::CRL_TOO_OLD, "crl-too-old"),
        (Self::BAD_POLICY, "bad-policy"),
        (Self::SYS_ERROR, "sys-error"),
        (Self::TOFU_CONFLICT, "tofu-conflict"),
    ];

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for SigSummary {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for SigSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(" "))
        }
    }
}

/// One recipient of a decrypted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientInfo {
    pub key_id: KeyId,
    pub pubkey_algo: String,
    /// `None` when this recipient's key decrypted the message or was not
    /// tried.
    pub status: Option<Status>,
}

/// Outcome of a decryption.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DecryptResult {
    pub unsupported_algorithm: Option<String>,
    pub wrong_key_usage: bool,
    pub legacy_cipher_no_mdc: bool,
    pub is_mime: bool,
    pub is_de_vs: bool,
    pub recipients: Vec<RecipientInfo>,
    pub file_name: Option<String>,
    pub session_key: Option<String>,
    pub symmetric_algo: Option<String>,
}

/// One signature on a verified message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MessageSignature {
    pub summary: SigSummary,
    pub fingerprint: Fingerprint,
    /// `None` for a good signature.
    pub status: Option<Status>,
    pub timestamp: Option<DateTime<Utc>>,
    pub exp_timestamp: Option<DateTime<Utc>>,
    pub wrong_key_usage: bool,
    pub validity: Validity,
    pub validity_reason: Option<String>,
    pub pubkey_algo: String,
    pub hash_algo: String,
}

impl MessageSignature {
    /// Good signature from a key the engine considers valid.
    pub fn is_valid(&self) -> bool {
        self.status.is_none() && self.summary.contains(SigSummary::VALID)
    }
}

/// Outcome of a verification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct VerifyResult {
    pub file_name: Option<String>,
    pub signatures: Vec<MessageSignature>,
}

const PUBKEY_ALGOS: [(u32, &str); 9] = [
    (1, "RSA"),
    (2, "RSA-E"),
    (3, "RSA-S"),
    (16, "ELG-E"),
    (17, "DSA"),
    (18, "ECDH"),
    (19, "ECDSA"),
    (20, "ELG"),
    (22, "EdDSA"),
];

const HASH_ALGOS: [(u32, &str); 7] = [
    (1, "MD5"),
    (2, "SHA1"),
    (3, "RIPEMD160"),
    (8, "SHA256"),
    (9, "SHA384"),
    (10, "SHA512"),
    (11, "SHA224"),
];

const SYMMETRIC_ALGOS: [(u32, &str); 10] = [
    (1, "IDEA"),
    (2, "3DES"),
    (3, "CAST5"),
    (4, "BLOWFISH"),
    (7, "AES"),
    (8, "AES192"),
    (9, "AES256"),
    (10, "TWOFISH"),
    (11, "CAMELLIA128"),
    (13, "CAMELLIA256"),
];

fn algo_name(table: &[(u32, &str)], id: &str) -> String {
    id.parse::<u32>()
        .ok()
        .and_then(|n| table.iter().find(|(k, _)| *k == n))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("unknown({})", id))
}

/// Name of an OpenPGP public-key algorithm id.
pub fn pubkey_algo_name(id: &str) -> String {
    algo_name(&PUBKEY_ALGOS, id)
}

/// Name of an OpenPGP hash algorithm id.
pub fn hash_algo_name(id: &str) -> String {
    algo_name(&HASH_ALGOS, id)
}

/// Name of an OpenPGP symmetric cipher id.
pub fn symmetric_algo_name(id: &str) -> String {
    algo_name(&SYMMETRIC_ALGOS, id)
}
