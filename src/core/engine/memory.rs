//! In-process engine with a toy message format.
//!
//! Messages use OpenPGP armor lines so they classify like the real thing,
//! but the body is a header block plus the hex-encoded payload. Nothing is
//! encrypted. This engine exists to drive the file and buffer protocols
//! without a `gpg` installation.
//!
//! ```text
//! -----BEGIN PGP MESSAGE-----
//! Comment: gpghigh memory engine
//! Recipients: <fpr>,<fpr>
//! Signers: <fpr>
//! Created: 1700000000
//! Filename: notes.txt
//!
//! 68656c6c6f
//! -----END PGP MESSAGE-----
//! ```
//!
//! Clones of a [`MemoryEngine`] share one keyring.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::{
    split_user_id, Context, Data, EncryptFlags, Engine, EngineInfo, EngineResult, KeyHandle,
    SignMode, SignatureNode, UserIdNode,
};
use crate::core::model::{
    DecryptResult, KeyListMode, MessageSignature, Protocol, RecipientInfo, SigSummary, Status,
    Validity, VerifyResult,
};
use crate::core::types::{Fingerprint, KeyId};
use crate::error::EngineError;

const BEGIN: &str = "-----BEGIN PGP MESSAGE-----";
const END: &str = "-----END PGP MESSAGE-----";
const COMMENT: &str = "Comment: gpghigh memory engine";
const HEX_LINE: usize = 64;

#[derive(Debug, Default)]
struct Keyring {
    keys: Vec<MemoryKey>,
    open_contexts: usize,
    fail_context: bool,
    fail_call: Option<&'static str>,
}

impl Keyring {
    fn find(&self, fingerprint: &str) -> Option<&MemoryKey> {
        self.keys
            .iter()
            .find(|k| k.fingerprint.eq_ignore_ascii_case(fingerprint))
    }

    fn has_secret(&self, fingerprint: &str) -> bool {
        self.find(fingerprint).is_some_and(|k| k.secret)
    }

    fn by_key_id(&self, key_id: &str) -> Option<&MemoryKey> {
        self.keys
            .iter()
            .find(|k| k.key_id().eq_ignore_ascii_case(key_id))
    }
}

#[derive(Debug, Clone)]
struct MemoryKey {
    fingerprint: Fingerprint,
    secret: bool,
    user_ids: Vec<MemoryUid>,
}

#[derive(Debug, Clone)]
struct MemoryUid {
    uid: String,
    certifications: Vec<(KeyId, i64)>,
}

impl MemoryKey {
    fn key_id(&self) -> &str {
        &self.fingerprint[self.fingerprint.len().saturating_sub(16)..]
    }

    /// Fingerprint or key id (optionally `0x`-prefixed), else a
    /// case-insensitive substring of any user ID. Empty matches all.
    fn matches(&self, pattern: &str) -> bool {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return true;
        }
        let hex = pattern.trim_start_matches("0x");
        if self.fingerprint.eq_ignore_ascii_case(hex) || self.key_id().eq_ignore_ascii_case(hex) {
            return true;
        }
        let needle = pattern.to_lowercase();
        self.user_ids
            .iter()
            .any(|u| u.uid.to_lowercase().contains(&needle))
    }

    fn handle(&self, ring: &Keyring, secret_listing: bool) -> KeyHandle {
        let validity = if self.secret {
            Validity::Ultimate
        } else {
            Validity::Full
        };

        let nodes: Vec<UserIdNode> = self
            .user_ids
            .iter()
            .map(|u| {
                let sigs: Vec<SignatureNode> = u
                    .certifications
                    .iter()
                    .map(|(issuer, created)| {
                        let signer = ring
                            .by_key_id(issuer)
                            .and_then(|k| k.user_ids.first())
                            .map(|u| u.uid.clone())
                            .unwrap_or_default();
                        let (name, comment, email) = split_user_id(&signer);
                        SignatureNode {
                            key_id: issuer.clone(),
                            created: *created,
                            exportable: true,
                            uid: signer,
                            name,
                            email,
                            comment,
                            ..Default::default()
                        }
                    })
                    .collect();
                let (name, _, address) = split_user_id(&u.uid);
                UserIdNode {
                    uid: u.uid.clone(),
                    name,
                    address,
                    validity,
                    has_signatures: !sigs.is_empty(),
                    signatures: SignatureNode::chain(sigs),
                    ..Default::default()
                }
            })
            .collect();

        KeyHandle {
            fingerprint: self.fingerprint.clone(),
            can_certify: true,
            can_encrypt: true,
            can_sign: true,
            has_user_ids: !nodes.is_empty(),
            key_list_mode: KeyListMode::LOCAL | KeyListMode::SIGS,
            owner_trust: if self.secret {
                Validity::Ultimate
            } else {
                Validity::Unknown
            },
            protocol: Protocol::OpenPgp,
            secret: secret_listing && self.secret,
            user_ids: UserIdNode::chain(nodes),
            ..Default::default()
        }
    }
}

/// In-process engine. NOT cryptographically secure.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    ring: Arc<Mutex<Keyring>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn ring(&self) -> MutexGuard<'_, Keyring> {
        lock(&self.ring)
    }

    /// Add a key with one user ID and return its fingerprint.
    pub fn add_key(&self, uid: &str, secret: bool) -> Fingerprint {
        let mut ring = self.ring();
        let fingerprint = format!("{:040X}", 0xF00D_0000_u64 + ring.keys.len() as u64 + 1);
        ring.keys.push(MemoryKey {
            fingerprint: fingerprint.clone(),
            secret,
            user_ids: vec![MemoryUid {
                uid: uid.to_string(),
                certifications: Vec::new(),
            }],
        });
        debug!(fingerprint = %fingerprint, secret, "memory key added");
        fingerprint
    }

    /// Add another user ID to an existing key.
    pub fn add_user_id(&self, fingerprint: &str, uid: &str) -> bool {
        let mut ring = self.ring();
        match ring
            .keys
            .iter_mut()
            .find(|k| k.fingerprint.eq_ignore_ascii_case(fingerprint))
        {
            Some(key) => {
                key.user_ids.push(MemoryUid {
                    uid: uid.to_string(),
                    certifications: Vec::new(),
                });
                true
            }
            None => false,
        }
    }

    /// Record a certification by `issuer` (a key id) on `uid` of the key
    /// `fingerprint`, made at `created` seconds since the epoch.
    pub fn certify(&self, fingerprint: &str, uid: &str, issuer: &str, created: i64) -> bool {
        let mut ring = self.ring();
        let target = ring
            .keys
            .iter_mut()
            .find(|k| k.fingerprint.eq_ignore_ascii_case(fingerprint))
            .and_then(|k| k.user_ids.iter_mut().find(|u| u.uid == uid));
        match target {
            Some(u) => {
                u.certifications.push((issuer.to_string(), created));
                true
            }
            None => false,
        }
    }

    /// Number of live contexts.
    pub fn open_contexts(&self) -> usize {
        self.ring().open_contexts
    }

    /// Make the next [`Engine::new_context`] fail with `EngineError::Init`.
    pub fn fail_next_context(&self) {
        self.ring().fail_context = true;
    }

    /// Make the next context call named `call` ("sign", "encrypt",
    /// "decrypt", "verify") write partial output and then fail.
    pub fn fail_next_call(&self, call: &'static str) {
        self.ring().fail_call = Some(call);
    }
}

impl Engine for MemoryEngine {
    type Context = MemoryContext;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn new_context(&self) -> EngineResult<MemoryContext> {
        let mut ring = self.ring();
        if std::mem::take(&mut ring.fail_context) {
            return Err(EngineError::Init("context creation refused".to_string()));
        }
        ring.open_contexts += 1;
        trace!(open = ring.open_contexts, "memory context opened");
        Ok(MemoryContext {
            ring: Arc::clone(&self.ring),
            armor: false,
            decrypt: None,
            verify: None,
        })
    }

    fn lookup_keys(&self, pattern: &str, secret_only: bool) -> EngineResult<Vec<KeyHandle>> {
        let ring = self.ring();
        Ok(ring
            .keys
            .iter()
            .filter(|k| !secret_only || k.secret)
            .filter(|k| k.matches(pattern))
            .map(|k| k.handle(&ring, secret_only))
            .collect())
    }

    fn info(&self) -> EngineResult<EngineInfo> {
        Ok(EngineInfo {
            file_name: "memory".to_string(),
            home_dir: None,
            required_version: env!("CARGO_PKG_VERSION").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    fn check_version(&self) -> EngineResult<()> {
        Ok(())
    }
}

/// Context of a [`MemoryEngine`].
#[derive(Debug)]
pub struct MemoryContext {
    ring: Arc<Mutex<Keyring>>,
    armor: bool,
    decrypt: Option<DecryptResult>,
    verify: Option<VerifyResult>,
}

impl MemoryContext {
    /// Fail `call` if it was armed with [`MemoryEngine::fail_next_call`].
    fn injected(&self, call: &'static str, output: &mut Data) -> EngineResult<()> {
        let armed = {
            let mut ring = lock(&self.ring);
            if ring.fail_call == Some(call) {
                ring.fail_call = None;
                true
            } else {
                false
            }
        };
        if armed {
            output.write_all(b"partial output")?;
            return Err(EngineError::Failed {
                call,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn seal(
        &mut self,
        call: &'static str,
        recipients: &[KeyHandle],
        flags: EncryptFlags,
        signers: Vec<Fingerprint>,
        input: &mut Data,
        output: &mut Data,
    ) -> EngineResult<()> {
        self.injected(call, output)?;

        let modify = flags.contains(EncryptFlags::ADD_RECIPIENTS)
            || flags.contains(EncryptFlags::CHANGE_RECIPIENTS);
        let new: Vec<Fingerprint> = recipients.iter().map(|k| k.fingerprint.clone()).collect();

        let message = if modify {
            let mut message = Message::decode(&input.read_remaining()?)?;
            if message.recipients.is_empty() {
                return Err(EngineError::Failed {
                    call,
                    reason: "input is not encrypted".to_string(),
                });
            }
            if !message.recipients.iter().any(|r| lock(&self.ring).has_secret(r)) {
                return Err(EngineError::Failed {
                    call,
                    reason: "No secret key".to_string(),
                });
            }
            if flags.contains(EncryptFlags::CHANGE_RECIPIENTS) {
                message.recipients = new;
            } else {
                for fpr in new {
                    if !message.recipients.contains(&fpr) {
                        message.recipients.push(fpr);
                    }
                }
            }
            message
        } else {
            if new.is_empty() {
                return Err(EngineError::Failed {
                    call,
                    reason: "no recipients".to_string(),
                });
            }
            Message {
                recipients: new,
                signers,
                created: Utc::now().timestamp(),
                file_name: file_name_of(input),
                payload: input.read_remaining()?,
            }
        };

        debug!(
            recipients = message.recipients.len(),
            armor = self.armor,
            flags = %flags,
            "memory encrypt"
        );
        output.write_all(&message.encode())?;
        Ok(())
    }

    fn signatures(&self, message: &Message) -> Vec<MessageSignature> {
        let ring = lock(&self.ring);
        message
            .signers
            .iter()
            .map(|fpr| {
                let timestamp = DateTime::from_timestamp(message.created, 0);
                match ring.find(fpr) {
                    Some(_) => MessageSignature {
                        summary: SigSummary::VALID | SigSummary::GREEN,
                        fingerprint: fpr.clone(),
                        status: None,
                        timestamp,
                        validity: Validity::Full,
                        pubkey_algo: "EdDSA".to_string(),
                        hash_algo: "SHA256".to_string(),
                        ..Default::default()
                    },
                    None => MessageSignature {
                        summary: SigSummary::KEY_MISSING,
                        fingerprint: fpr.clone(),
                        status: Some(Status::NoPublicKey),
                        timestamp,
                        pubkey_algo: "EdDSA".to_string(),
                        hash_algo: "SHA256".to_string(),
                        ..Default::default()
                    },
                }
            })
            .collect()
    }
}

impl Context for MemoryContext {
    fn set_armor(&mut self, armor: bool) {
        // output is always text in this format
        self.armor = armor;
    }

    fn sign(
        &mut self,
        signers: &[KeyHandle],
        input: &mut Data,
        output: &mut Data,
        mode: SignMode,
    ) -> EngineResult<()> {
        self.injected("sign", output)?;

        if mode != SignMode::Normal {
            return Err(EngineError::Failed {
                call: "sign",
                reason: format!("{:?} signatures are not supported", mode),
            });
        }
        if signers.is_empty() {
            return Err(EngineError::Failed {
                call: "sign",
                reason: "no signers".to_string(),
            });
        }
        {
            let ring = lock(&self.ring);
            if let Some(missing) = signers.iter().find(|k| !ring.has_secret(&k.fingerprint)) {
                return Err(EngineError::Failed {
                    call: "sign",
                    reason: format!("secret key not available: {}", missing.fingerprint),
                });
            }
        }

        let message = Message {
            recipients: Vec::new(),
            signers: signers.iter().map(|k| k.fingerprint.clone()).collect(),
            created: Utc::now().timestamp(),
            file_name: file_name_of(input),
            payload: input.read_remaining()?,
        };
        trace!(bytes = message.payload.len(), "memory sign");
        output.write_all(&message.encode())?;
        Ok(())
    }

    fn encrypt(
        &mut self,
        recipients: &[KeyHandle],
        flags: EncryptFlags,
        input: &mut Data,
        output: &mut Data,
    ) -> EngineResult<()> {
        self.seal("encrypt", recipients, flags, Vec::new(), input, output)
    }

    fn encrypt_sign(
        &mut self,
        recipients: &[KeyHandle],
        flags: EncryptFlags,
        input: &mut Data,
        output: &mut Data,
    ) -> EngineResult<()> {
        let signer = lock(&self.ring)
            .keys
            .iter()
            .find(|k| k.secret)
            .map(|k| k.fingerprint.clone())
            .ok_or_else(|| EngineError::Failed {
                call: "encrypt",
                reason: "no default secret key".to_string(),
            })?;
        self.seal("encrypt", recipients, flags, vec![signer], input, output)
    }

    fn decrypt_verify(&mut self, input: &mut Data, output: &mut Data) -> EngineResult<()> {
        self.decrypt = Some(DecryptResult::default());
        self.verify = Some(VerifyResult::default());
        self.injected("decrypt", output)?;

        let message = Message::decode(&input.read_remaining()?)?;

        if !message.recipients.is_empty() {
            let ring = lock(&self.ring);
            let recipients: Vec<RecipientInfo> = message
                .recipients
                .iter()
                .map(|fpr| RecipientInfo {
                    key_id: fpr[fpr.len().saturating_sub(16)..].to_string(),
                    pubkey_algo: "ECDH".to_string(),
                    status: (!ring.has_secret(fpr)).then_some(Status::NoSecretKey),
                })
                .collect();
            let decryptable = recipients.iter().any(|r| r.status.is_none());
            drop(ring);

            self.decrypt = Some(DecryptResult {
                recipients,
                file_name: message.file_name.clone(),
                symmetric_algo: Some("AES256".to_string()),
                ..Default::default()
            });
            if !decryptable {
                return Err(EngineError::Failed {
                    call: "decrypt",
                    reason: "No secret key".to_string(),
                });
            }
        }

        self.verify = Some(VerifyResult {
            file_name: message.file_name.clone(),
            signatures: self.signatures(&message),
        });
        output.write_all(&message.payload)?;
        Ok(())
    }

    fn decrypt_result(&self) -> EngineResult<DecryptResult> {
        Ok(self.decrypt.clone().unwrap_or_default())
    }

    fn verify_result(&self) -> EngineResult<VerifyResult> {
        Ok(self.verify.clone().unwrap_or_default())
    }

    fn verify(&mut self, signed: &mut Data, plain: &mut Data) -> EngineResult<VerifyResult> {
        self.injected("verify", plain)?;

        let message = Message::decode(&signed.read_remaining()?)?;
        if !message.recipients.is_empty() {
            return Err(EngineError::Failed {
                call: "verify",
                reason: "message is encrypted".to_string(),
            });
        }
        let result = VerifyResult {
            file_name: message.file_name.clone(),
            signatures: self.signatures(&message),
        };
        plain.write_all(&message.payload)?;
        self.verify = Some(result.clone());
        Ok(result)
    }
}

impl Drop for MemoryContext {
    fn drop(&mut self) {
        let mut ring = lock(&self.ring);
        ring.open_contexts = ring.open_contexts.saturating_sub(1);
        trace!(open = ring.open_contexts, "memory context released");
    }
}

fn lock(ring: &Mutex<Keyring>) -> MutexGuard<'_, Keyring> {
    ring.lock().unwrap_or_else(PoisonError::into_inner)
}

fn file_name_of(data: &Data) -> Option<String> {
    data.path()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Message {
    recipients: Vec<Fingerprint>,
    signers: Vec<Fingerprint>,
    created: i64,
    file_name: Option<String>,
    payload: Vec<u8>,
}

impl Message {
    fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(BEGIN);
        out.push('\n');
        out.push_str(COMMENT);
        out.push('\n');
        if !self.recipients.is_empty() {
            out.push_str(&format!("Recipients: {}\n", self.recipients.join(",")));
        }
        if !self.signers.is_empty() {
            out.push_str(&format!("Signers: {}\n", self.signers.join(",")));
        }
        out.push_str(&format!("Created: {}\n", self.created));
        if let Some(name) = &self.file_name {
            out.push_str(&format!("Filename: {}\n", name));
        }
        out.push('\n');

        let hex: String = self.payload.iter().map(|b| format!("{:02x}", b)).collect();
        for line in hex.as_bytes().chunks(HEX_LINE) {
            out.push_str(&String::from_utf8_lossy(line));
            out.push('\n');
        }
        out.push_str(END);
        out.push('\n');
        out.into_bytes()
    }

    /// Input that is not a message in this format is `EngineError::NoData`.
    fn decode(bytes: &[u8]) -> EngineResult<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| EngineError::NoData)?;
        let mut lines = text.lines().map(str::trim_end);

        if lines.by_ref().find(|l| !l.trim().is_empty()) != Some(BEGIN) {
            return Err(EngineError::NoData);
        }

        let mut message = Message::default();
        for line in lines.by_ref() {
            if line.is_empty() {
                break;
            }
            let Some((name, value)) = line.split_once(": ") else {
                return Err(EngineError::Parse(format!("bad header line: {}", line)));
            };
            match name {
                "Recipients" => message.recipients = split_list(value),
                "Signers" => message.signers = split_list(value),
                "Created" => {
                    message.created = value
                        .parse()
                        .map_err(|_| EngineError::Parse(format!("bad timestamp: {}", value)))?
                }
                "Filename" => message.file_name = Some(value.to_string()),
                _ => {}
            }
        }

        let mut hex = String::new();
        let mut terminated = false;
        for line in lines {
            if line == END {
                terminated = true;
                break;
            }
            hex.push_str(line.trim());
        }
        if !terminated {
            return Err(EngineError::Parse("truncated message".to_string()));
        }
        message.payload = decode_hex(&hex)?;
        Ok(message)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn decode_hex(hex: &str) -> EngineResult<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(EngineError::Parse("odd-length payload".to_string()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            hex.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| EngineError::Parse("corrupt payload".to_string()))
        })
        .collect()
}
