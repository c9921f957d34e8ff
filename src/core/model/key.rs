//! Owned key records.
//!
//! [`Key::from_handle`] walks an engine [`KeyHandle`] once and copies
//! everything out of it. The result holds no references into the handle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::validity::{KeyListMode, Protocol, Validity};
use crate::core::engine::{KeyHandle, SignatureNode, UserIdNode};
use crate::core::types::{Fingerprint, KeyId};

/// Certifications on one user ID, grouped by issuer key id. Each group is
/// ordered most recent first.
pub type UidSignatures = BTreeMap<KeyId, Vec<KeySignature>>;

/// One cryptographic identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Key {
    pub fingerprint: Fingerprint,
    pub can_authenticate: bool,
    pub can_certify: bool,
    pub can_encrypt: bool,
    pub can_sign: bool,
    pub chain_id: String,
    pub disabled: bool,
    pub expired: bool,
    pub invalid: bool,
    pub is_qualified: bool,
    pub issuer_name: String,
    pub issuer_serial: String,
    #[serde(skip)]
    pub key_list_mode: KeyListMode,
    pub owner_trust: Validity,
    pub protocol: Protocol,
    pub revoked: bool,
    pub secret: bool,
    pub user_ids: Vec<UserId>,
}

impl Key {
    /// Build an owned record from an engine handle.
    pub fn from_handle(handle: &KeyHandle) -> Self {
        let user_ids: Vec<UserId> = handle.user_ids().map(UserId::from_node).collect();

        if handle.has_user_ids == user_ids.is_empty() {
            warn!(
                fingerprint = %handle.fingerprint,
                flagged = handle.has_user_ids,
                found = user_ids.len(),
                "user id flag disagrees with listing, using listing"
            );
        }

        Self {
            fingerprint: handle.fingerprint.clone(),
            can_authenticate: handle.can_authenticate,
            can_certify: handle.can_certify,
            can_encrypt: handle.can_encrypt,
            can_sign: handle.can_sign,
            chain_id: handle.chain_id.clone(),
            disabled: handle.disabled,
            expired: handle.expired,
            invalid: handle.invalid,
            is_qualified: handle.is_qualified,
            issuer_name: handle.issuer_name.clone(),
            issuer_serial: handle.issuer_serial.clone(),
            key_list_mode: handle.key_list_mode,
            owner_trust: handle.owner_trust,
            protocol: handle.protocol,
            revoked: handle.revoked,
            secret: handle.secret,
            user_ids,
        }
    }

    /// Whether the key carries any user ID.
    pub fn has_user_ids(&self) -> bool {
        !self.user_ids.is_empty()
    }

    /// First user ID string, if any.
    pub fn primary_uid(&self) -> Option<&str> {
        self.user_ids.first().map(|u| u.uid.as_str())
    }
}

/// A user ID of a [`Key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserId {
    pub uid: String,
    pub name: String,
    pub address: String,
    pub invalid: bool,
    pub revoked: bool,
    pub validity: Validity,
    pub signatures: UidSignatures,
}

impl UserId {
    fn from_node(node: &UserIdNode) -> Self {
        let signatures = group_signatures(node);

        if node.has_signatures == signatures.is_empty() {
            warn!(
                uid = %node.uid,
                flagged = node.has_signatures,
                found = signatures.len(),
                "signature flag disagrees with listing, using listing"
            );
        }

        Self {
            uid: node.uid.clone(),
            name: node.name.clone(),
            address: node.address.clone(),
            invalid: node.invalid,
            revoked: node.revoked,
            validity: node.validity,
            signatures,
        }
    }

    /// Whether any certification was listed.
    pub fn has_signatures(&self) -> bool {
        !self.signatures.is_empty()
    }

    /// Most recent certification by `issuer`.
    pub fn latest_from(&self, issuer: &str) -> Option<&KeySignature> {
        self.signatures.get(issuer).and_then(|sigs| sigs.first())
    }
}

/// A certification on a user ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySignature {
    pub created: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires: bool,
    pub issuer_key_id: KeyId,
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
}

impl KeySignature {
    fn from_node(node: &SignatureNode) -> Self {
        let expires_at = (node.expires > 0)
            .then(|| DateTime::from_timestamp(node.expires, 0))
            .flatten();

        Self {
            created: DateTime::from_timestamp(node.created, 0).unwrap_or_default(),
            expires: expires_at.is_some(),
            expires_at,
            issuer_key_id: node.key_id.clone(),
            revoked: node.revoked,
            expired: node.expired,
            invalid: node.invalid,
            exportable: node.exportable,
            uid: node.uid.clone(),
            name: node.name.clone(),
            email: node.email.clone(),
            comment: node.comment.clone(),
            trust_scope: node.trust_scope.clone(),
            has_notations: node.has_notations,
        }
    }
}

/// Group a user ID's certifications by issuer, most recent first.
fn group_signatures(node: &UserIdNode) -> UidSignatures {
    let mut groups = UidSignatures::new();
    for sig in node.signatures() {
        groups
            .entry(sig.key_id.clone())
            .or_default()
            .push(KeySignature::from_node(sig));
    }
    for sigs in groups.values_mut() {
        // b before a: newest first
        sigs.sort_by(|a, b| b.created.cmp(&a.created));
    }
    groups
}
