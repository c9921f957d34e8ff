//! `--status-fd` output.
//!
//! gpg writes `[GNUPG:] KEYWORD args...` lines interleaved with its human
//! diagnostics. The status lines are collected in order and folded into
//! decrypt and verify results; the rest is kept for error messages.

use chrono::DateTime;

use super::colons::parse_time;
use crate::core::model::{
    hash_algo_name, pubkey_algo_name, symmetric_algo_name, DecryptResult, MessageSignature,
    RecipientInfo, SigSummary, Status, Validity, VerifyResult,
};

const PREFIX: &str = "[GNUPG:] ";

/// gpg error code for "No public key".
const GPG_ERR_NO_PUBKEY: &str = "9";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct StatusLine {
    pub keyword: String,
    pub args: Vec<String>,
}

impl StatusLine {
    fn arg(&self, index: usize) -> &str {
        self.args.get(index).map(String::as_str).unwrap_or_default()
    }
}

/// Everything gpg printed on its status channel.
#[derive(Debug, Clone, Default)]
pub(super) struct StatusLog {
    lines: Vec<StatusLine>,
    diagnostics: Vec<String>,
}

impl StatusLog {
    pub fn parse(text: &str) -> Self {
        let mut log = StatusLog::default();
        for line in text.lines() {
            match line.strip_prefix(PREFIX) {
                Some(status) => {
                    let mut parts = status.split(' ');
                    let keyword = parts.next().unwrap_or_default().to_string();
                    let args = parts.map(str::to_string).collect();
                    log.lines.push(StatusLine { keyword, args });
                }
                None if !line.trim().is_empty() => {
                    let text = line.strip_prefix("gpg: ").unwrap_or(line);
                    log.diagnostics.push(text.to_string());
                }
                None => {}
            }
        }
        log
    }

    pub fn has(&self, keyword: &str) -> bool {
        self.lines.iter().any(|l| l.keyword == keyword)
    }

    /// gpg found no OpenPGP data in its input.
    pub fn no_data(&self) -> bool {
        self.has("NODATA")
    }

    /// gpg decrypted the message, whatever became of its signatures.
    pub fn decryption_okay(&self) -> bool {
        self.has("DECRYPTION_OKAY") && !self.has("DECRYPTION_FAILED")
    }

    /// Human-readable reason for a failure.
    pub fn reason(&self) -> Option<String> {
        (!self.diagnostics.is_empty()).then(|| self.diagnostics.join("; "))
    }

    pub fn decrypt_result(&self) -> DecryptResult {
        let mut result = DecryptResult::default();

        for line in &self.lines {
            match line.keyword.as_str() {
                "ENC_TO" => result.recipients.push(RecipientInfo {
                    key_id: line.arg(0).to_string(),
                    pubkey_algo: pubkey_algo_name(line.arg(1)),
                    status: None,
                }),
                "NO_SECKEY" => {
                    if let Some(r) = result
                        .recipients
                        .iter_mut()
                        .find(|r| r.key_id.eq_ignore_ascii_case(line.arg(0)))
                    {
                        r.status = Some(Status::NoSecretKey);
                    }
                }
                "DECRYPTION_INFO" => {
                    result.symmetric_algo = Some(symmetric_algo_name(line.arg(1)));
                    let aead = line.arg(2);
                    result.legacy_cipher_no_mdc =
                        line.arg(0) == "0" && (aead.is_empty() || aead == "0");
                }
                "PLAINTEXT" => {
                    result.is_mime = line.arg(0) == "6d";
                    result.file_name = file_name(line);
                }
                "SESSION_KEY" => result.session_key = Some(line.arg(0).to_string()),
                "DECRYPTION_COMPLIANCE_MODE" => {
                    result.is_de_vs = line.args.iter().any(|m| m == "23");
                }
                _ => {}
            }
        }

        result
    }

    pub fn verify_result(&self) -> VerifyResult {
        let mut result = VerifyResult::default();
        let mut current: Option<MessageSignature> = None;
        // a result keyword was already seen for `current`
        let mut headed = false;

        for line in &self.lines {
            match line.keyword.as_str() {
                "NEWSIG" => {
                    result.signatures.extend(current.take());
                    current = Some(MessageSignature::default());
                    headed = false;
                }
                kw @ ("GOODSIG" | "EXPSIG" | "EXPKEYSIG" | "REVKEYSIG" | "BADSIG" | "ERRSIG") => {
                    if headed || current.is_none() {
                        result.signatures.extend(current.take());
                        current = Some(MessageSignature::default());
                    }
                    headed = true;
                    if let Some(sig) = current.as_mut() {
                        apply_result(sig, kw, line);
                    }
                }
                "VALIDSIG" => {
                    if let Some(sig) = current.as_mut() {
                        sig.fingerprint = line.arg(0).to_string();
                        sig.timestamp = timestamp(line.arg(2));
                        sig.exp_timestamp = timestamp(line.arg(3));
                        sig.pubkey_algo = pubkey_algo_name(line.arg(6));
                        sig.hash_algo = hash_algo_name(line.arg(7));
                    }
                }
                kw if kw.starts_with("TRUST_") => {
                    if let Some(sig) = current.as_mut() {
                        sig.validity = Validity::from_trust_status(kw);
                    }
                }
                "PLAINTEXT" => result.file_name = file_name(line),
                _ => {}
            }
        }
        result.signatures.extend(current.take());

        for sig in &mut result.signatures {
            if sig.status.is_none() {
                match sig.validity {
                    Validity::Full | Validity::Ultimate => {
                        sig.summary.insert(SigSummary::VALID | SigSummary::GREEN)
                    }
                    Validity::Marginal => sig.summary.insert(SigSummary::GREEN),
                    Validity::Never => sig.summary.insert(SigSummary::RED),
                    _ => {}
                }
            }
        }

        result
    }
}

fn apply_result(sig: &mut MessageSignature, keyword: &str, line: &StatusLine) {
    // key id until VALIDSIG supplies the fingerprint
    sig.fingerprint = line.arg(0).to_string();

    let (status, flag) = match keyword {
        "GOODSIG" => (None, None),
        "EXPSIG" => (Some(Status::SignatureExpired), Some(SigSummary::SIG_EXPIRED)),
        "EXPKEYSIG" => (Some(Status::KeyExpired), Some(SigSummary::KEY_EXPIRED)),
        "REVKEYSIG" => (Some(Status::CertificateRevoked), Some(SigSummary::KEY_REVOKED)),
        "BADSIG" => (Some(Status::BadSignature), Some(SigSummary::RED)),
        _ => {
            // ERRSIG <keyid> <pkalgo> <hashalgo> <class> <time> <rc> [<fpr>]
            sig.pubkey_algo = pubkey_algo_name(line.arg(1));
            sig.hash_algo = hash_algo_name(line.arg(2));
            sig.timestamp = timestamp(line.arg(4));
            let fpr = line.arg(6);
            if !fpr.is_empty() && fpr != "-" {
                sig.fingerprint = fpr.to_string();
            }
            match line.arg(5) {
                GPG_ERR_NO_PUBKEY => (Some(Status::NoPublicKey), Some(SigSummary::KEY_MISSING)),
                rc => (
                    Some(Status::Other(format!("error code {}", rc))),
                    Some(SigSummary::SYS_ERROR),
                ),
            }
        }
    };

    sig.status = status;
    if let Some(flag) = flag {
        sig.summary.insert(flag);
    }
}

fn timestamp(value: &str) -> Option<DateTime<chrono::Utc>> {
    match parse_time(value) {
        0 => None,
        secs => DateTime::from_timestamp(secs, 0),
    }
}

/// `PLAINTEXT <format> <time> <name>`; the name is percent-escaped.
fn file_name(line: &StatusLine) -> Option<String> {
    let raw = line.args.get(2..).map(|rest| rest.join(" "))?;
    let name = percent_decode(&raw);
    (!name.is_empty()).then_some(name)
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(byte) = value
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
