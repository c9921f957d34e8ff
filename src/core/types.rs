//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

/// A full key fingerprint (40 hex digits for v4 keys).
pub type Fingerprint = String;

/// A key id as reported by the engine (usually the 16-digit long id).
pub type KeyId = String;

/// A pattern selecting keys: fingerprint, key id, email, or name fragment.
pub type KeyPattern = String;
