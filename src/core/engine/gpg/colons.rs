//! Parser for `gpg --with-colons --fixed-list-mode` key listings.
//!
//! Only the records that feed a [`KeyHandle`] are read: `pub`/`sec`, the
//! primary key's `fpr`, `uid`, and `sig`/`rev` under a user ID. Subkey
//! records close the current user ID; everything else is skipped.

use chrono::NaiveDateTime;

use crate::core::engine::{split_user_id, KeyHandle, SignatureNode, UserIdNode};
use crate::core::model::{KeyListMode, Protocol, Validity};

struct PendingUid {
    node: UserIdNode,
    sigs: Vec<SignatureNode>,
}

struct PendingKey {
    handle: KeyHandle,
    uids: Vec<PendingUid>,
    // the next fpr record belongs to the primary key
    want_fpr: bool,
    in_subkey: bool,
}

impl PendingKey {
    fn finish(self) -> KeyHandle {
        let mut handle = self.handle;
        let nodes: Vec<UserIdNode> = self
            .uids
            .into_iter()
            .map(|u| {
                let mut node = u.node;
                node.has_signatures = !u.sigs.is_empty();
                node.signatures = SignatureNode::chain(u.sigs);
                node
            })
            .collect();
        handle.has_user_ids = !nodes.is_empty();
        handle.user_ids = UserIdNode::chain(nodes);
        handle
    }
}

/// Parse a colon listing into key handles, in listing order.
pub(super) fn parse_keys(listing: &str, secret_listing: bool) -> Vec<KeyHandle> {
    let mode = if secret_listing {
        KeyListMode::LOCAL | KeyListMode::WITH_SECRET
    } else {
        KeyListMode::LOCAL | KeyListMode::SIGS
    };

    let mut keys = Vec::new();
    let mut current: Option<PendingKey> = None;

    for line in listing.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        let record = fields.first().copied().unwrap_or_default();

        match record {
            "pub" | "sec" => {
                if let Some(done) = current.take() {
                    keys.push(done.finish());
                }
                current = Some(PendingKey {
                    handle: primary_key(&fields, record == "sec", mode),
                    uids: Vec::new(),
                    want_fpr: true,
                    in_subkey: false,
                });
            }
            "fpr" => {
                if let Some(key) = current.as_mut().filter(|k| k.want_fpr) {
                    key.handle.fingerprint = field(&fields, 9).to_string();
                    key.want_fpr = false;
                }
            }
            "sub" | "ssb" => {
                if let Some(key) = current.as_mut() {
                    key.in_subkey = true;
                    key.want_fpr = false;
                }
            }
            "uid" => {
                if let Some(key) = current.as_mut() {
                    key.in_subkey = false;
                    key.uids.push(PendingUid {
                        node: user_id(&fields),
                        sigs: Vec::new(),
                    });
                }
            }
            "sig" | "rev" => {
                let Some(key) = current.as_mut().filter(|k| !k.in_subkey) else {
                    continue;
                };
                if let Some(uid) = key.uids.last_mut() {
                    uid.sigs.push(signature(&fields, record == "rev"));
                }
            }
            _ => {}
        }
    }

    if let Some(done) = current.take() {
        keys.push(done.finish());
    }
    keys
}

fn primary_key(fields: &[&str], secret: bool, mode: KeyListMode) -> KeyHandle {
    let validity = field(fields, 1);
    let caps = field(fields, 11);

    KeyHandle {
        // overwritten by the fpr record; the key id is a fallback
        fingerprint: field(fields, 4).to_string(),
        can_authenticate: caps.contains('A'),
        can_certify: caps.contains('C'),
        can_encrypt: caps.contains('E'),
        can_sign: caps.contains('S'),
        disabled: caps.contains('D'),
        expired: validity == "e",
        invalid: validity == "i",
        revoked: validity == "r",
        key_list_mode: mode,
        owner_trust: Validity::from_colon(field(fields, 8)),
        protocol: Protocol::OpenPgp,
        secret,
        ..Default::default()
    }
}

fn user_id(fields: &[&str]) -> UserIdNode {
    let validity = field(fields, 1);
    let uid = unescape(field(fields, 9));
    let (name, _, address) = split_user_id(&uid);

    UserIdNode {
        name,
        address,
        invalid: validity == "i",
        revoked: validity == "r",
        validity: Validity::from_colon(validity),
        uid,
        ..Default::default()
    }
}

fn signature(fields: &[&str], revocation: bool) -> SignatureNode {
    let uid = unescape(field(fields, 9));
    let (name, comment, email) = split_user_id(&uid);
    let class = field(fields, 10);
    let expires = parse_time(field(fields, 6));

    SignatureNode {
        key_id: field(fields, 4).to_string(),
        created: parse_time(field(fields, 5)),
        expires,
        revoked: revocation,
        expired: expires > 0 && expires <= chrono::Utc::now().timestamp(),
        invalid: field(fields, 1) == "-",
        exportable: class.ends_with('x'),
        uid,
        name,
        email,
        comment,
        // not reported by the colon listing
        trust_scope: String::new(),
        has_notations: false,
        next: None,
    }
}

fn field<'a>(fields: &[&'a str], index: usize) -> &'a str {
    fields.get(index).copied().unwrap_or_default()
}

/// Seconds since the epoch, or an ISO `YYYYMMDDTHHMMSS` stamp. Empty is 0.
pub(super) fn parse_time(value: &str) -> i64 {
    if value.is_empty() {
        return 0;
    }
    if let Ok(secs) = value.parse::<i64>() {
        return secs;
    }
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .map(|t| t.and_utc().timestamp())
        .unwrap_or(0)
}

/// Undo gpg's `\xHH` escaping of user ID strings.
pub(super) fn unescape(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'x') {
            if let Some(byte) = value
                .get(i + 2..i + 4)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
