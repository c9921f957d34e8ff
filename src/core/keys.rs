//! Key listing.

use tracing::debug;

use crate::core::engine::Engine;
use crate::core::model::Key;
use crate::error::{Operation, Result};

/// List public keys matching `pattern`, with their user IDs and
/// certifications.
///
/// An empty pattern lists every key. No match is an empty list, not an
/// error.
///
/// # Errors
///
/// Returns an engine failure in phase `key lookup` if the engine cannot
/// produce a listing.
pub fn key_list<E: Engine>(engine: &E, pattern: &str) -> Result<Vec<Key>> {
    let op = Operation::KeyList;
    debug!(pattern, engine = engine.name(), "listing keys");

    let handles = engine
        .lookup_keys(pattern, false)
        .map_err(|e| e.during(op, "key lookup"))?;
    let keys: Vec<Key> = handles.iter().map(Key::from_handle).collect();

    debug!(count = keys.len(), "keys listed");
    Ok(keys)
}
