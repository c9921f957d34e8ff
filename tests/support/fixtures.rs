//! Test fixtures and constants.

use gpghigh::MemoryEngine;

pub const ALICE: &str = "Alice Example <alice@example.com>";
pub const BOB: &str = "Bob Example <bob@example.com>";
pub const CAROL: &str = "Carol Example <carol@example.com>";

/// Plaintext used across file tests.
pub const SAMPLE_TEXT: &str = "line one\nline two\n\nline four\n";

/// An armored block that is not a message, for identification tests.
pub const PUBLIC_KEY_BLOCK: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nmQENBF\n-----END PGP PUBLIC KEY BLOCK-----\n";

/// In-memory keyring with Alice (secret), Bob (public only) and Carol
/// (public only).
pub fn memory_engine() -> MemoryEngine {
    let engine = MemoryEngine::new();
    engine.add_key(ALICE, true);
    engine.add_key(BOB, false);
    engine.add_key(CAROL, false);
    engine
}

/// The same keyring as [`memory_engine`], seen from Bob's side: same
/// fingerprints, but only Bob holds a secret key.
pub fn bob_engine() -> MemoryEngine {
    let engine = MemoryEngine::new();
    engine.add_key(ALICE, false);
    engine.add_key(BOB, true);
    engine.add_key(CAROL, false);
    engine
}
