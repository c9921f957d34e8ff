//! Keys command.
//!
//! Lists keys with their user IDs, and the certifications on each user ID
//! grouped by issuer.

use crate::cli::output;
use crate::core::engine::Engine;
use crate::core::keys;
use crate::core::model::Key;
use crate::error::Result;

/// List keys matching `pattern`.
pub fn list<E: Engine>(engine: &E, pattern: &str, json: bool) -> Result<()> {
    let keys = keys::key_list(engine, pattern)?;

    if json {
        let result = serde_json::json!({
            "keys": keys,
            "count": keys.len(),
        });
        output::data(&serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if keys.is_empty() {
        output::dimmed("no keys found");
        return Ok(());
    }

    output::blank();
    output::header(&format!("{} keys", output::count(keys.len())));
    for key in &keys {
        print_key(key);
    }
    Ok(())
}

fn print_key(key: &Key) {
    output::rule();
    output::kv("fingerprint:", output::key(&key.fingerprint));
    output::kv("capabilities:", capabilities(key));
    output::kv("owner trust:", key.owner_trust);

    let mut flags = Vec::new();
    for (set, name) in [
        (key.secret, "secret"),
        (key.revoked, "revoked"),
        (key.expired, "expired"),
        (key.disabled, "disabled"),
        (key.invalid, "invalid"),
    ] {
        if set {
            flags.push(name);
        }
    }
    if !flags.is_empty() {
        output::kv("flags:", flags.join(" "));
    }

    for uid in &key.user_ids {
        output::list_item(format!("{} [{}]", uid.uid, uid.validity));
        for (issuer, sigs) in &uid.signatures {
            let dates: Vec<String> = sigs
                .iter()
                .map(|s| s.created.format("%Y-%m-%d").to_string())
                .collect();
            output::dimmed(&format!("      sig {}  {}", issuer, dates.join(", ")));
        }
    }
}

fn capabilities(key: &Key) -> String {
    let caps: String = [
        (key.can_encrypt, 'E'),
        (key.can_sign, 'S'),
        (key.can_certify, 'C'),
        (key.can_authenticate, 'A'),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .map(|(_, c)| *c)
    .collect();
    if caps.is_empty() {
        "-".to_string()
    } else {
        caps
    }
}
