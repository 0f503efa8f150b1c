//! Cache Key Derivation
//!
//! Turns an arbitrary serializable request into a stable cache key.
//!
//! The request is converted to a JSON value and written out in canonical form
//! (object keys sorted at every level, arrays in order), then hashed with
//! SHA-256. Requests that carry a user id get a `user:<id>:` prefix so every
//! entry for a user can be invalidated by substring match.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::cache::entry::current_timestamp_ms;
use crate::error::Result;

/// Field names recognised as a user id.
const USER_ID_FIELDS: [&str; 3] = ["userId", "user_id", "uid"];

/// Nested objects that may carry the user id.
const PROFILE_FIELDS: [&str; 4] = ["profile", "userProfile", "user_profile", "user"];

/// Field names recognised as an id inside a profile object.
const PROFILE_ID_FIELDS: [&str; 3] = ["id", "userId", "user_id"];

// == Derive Key ==
/// Derives the cache key for a request.
///
/// Never fails: if the request cannot be canonicalized a unique fallback key is
/// returned, which guarantees a cache miss instead of an error.
pub fn derive_key<R: Serialize + ?Sized>(request: &R) -> String {
    match try_derive_key(request) {
        Ok(key) => key,
        Err(err) => {
            let key = fallback_key();
            warn!(error = %err, key = %key, "Key derivation failed, using fallback key");
            key
        }
    }
}

/// Fallible form of [`derive_key`].
pub fn try_derive_key<R: Serialize + ?Sized>(request: &R) -> Result<String> {
    let value = serde_json::to_value(request)?;
    let canonical = canonicalize(&value)?;
    let hash = hex::encode(Sha256::digest(canonical.as_bytes()));

    Ok(match extract_user_id(&value) {
        Some(user_id) => format!("{}{}", user_prefix(&user_id), hash),
        None => hash,
    })
}

// == Canonicalize ==
/// Writes a JSON value in canonical form.
pub fn canonicalize(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => out.push_str(&serde_json::to_string(s)?),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, field)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(name)?);
                out.push(':');
                write_canonical(field, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

// == User Namespace ==
/// Returns the key prefix shared by every entry belonging to `user_id`.
///
/// `%` and `:` in the id are percent-escaped, so one user's prefix is never a
/// prefix of another's.
pub fn user_prefix(user_id: &str) -> String {
    format!("user:{}:", user_id.replace('%', "%25").replace(':', "%3A"))
}

/// Finds a user id at the top level or inside a profile-like object.
pub fn extract_user_id(value: &Value) -> Option<String> {
    let map = value.as_object()?;

    USER_ID_FIELDS
        .iter()
        .find_map(|field| map.get(*field).and_then(id_to_string))
        .or_else(|| {
            PROFILE_FIELDS.iter().find_map(|field| {
                let profile = map.get(*field)?.as_object()?;
                PROFILE_ID_FIELDS
                    .iter()
                    .find_map(|id_field| profile.get(*id_field).and_then(id_to_string))
            })
        })
}

fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn fallback_key() -> String {
    format!("fallback:{}:{}", current_timestamp_ms(), uuid::Uuid::new_v4().simple())
}
