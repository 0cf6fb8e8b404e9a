//! Masking of sensitive values for display
//!
//! Nothing here touches the values handed to the chart. [`redact`] works on a
//! clone and [`redact_text`] on rendered output.

use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};

use crate::values::Values;

/// Placeholder written over sensitive leaves
pub const SENSITIVE_VALUE: &str = "(sensitive value)";

/// Bytes of the digest kept in a hashed token
const HASH_BYTES: usize = 8;

/// Clone `values` and overwrite every sensitive path with [`SENSITIVE_VALUE`]
///
/// Paths are split on `.` with no escaping. A path whose parent does not
/// resolve to a mapping is skipped.
pub fn redact<S: AsRef<str>>(values: &Values, sensitive_paths: &[S]) -> Values {
    let mut masked = values.clone();
    for path in sensitive_paths {
        redact_path(masked.inner_mut(), path.as_ref());
    }
    masked
}

fn redact_path(root: &mut JsonValue, path: &str) {
    let mut keys: Vec<&str> = path.split('.').collect();
    let Some(leaf) = keys.pop() else {
        return;
    };

    let mut current = root;
    for key in keys {
        match current.get_mut(key) {
            Some(next @ JsonValue::Object(_)) => current = next,
            _ => {
                tracing::trace!(path, "sensitive path does not resolve, not masked");
                return;
            }
        }
    }

    if let JsonValue::Object(map) = current {
        map.insert(leaf.to_string(), JsonValue::String(SENSITIVE_VALUE.to_string()));
    }
}

/// Stable token for a sensitive value: `(sensitive value <16 hex chars>)`
///
/// The same input always yields the same token, so an unchanged secret
/// renders identically across plans.
pub fn hash_sensitive_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    format!("(sensitive value {})", hex::encode(&digest[..HASH_BYTES]))
}

/// Replace every occurrence of each sensitive value in `text` with its token
///
/// Empty values are ignored. The text is scanned once, trying longer values
/// first, so a secret that contains another one is masked whole and tokens
/// already written are never rescanned.
pub fn redact_text<S: AsRef<str>>(text: &str, sensitive_values: &[S]) -> String {
    let mut secrets: Vec<&str> = sensitive_values
        .iter()
        .map(AsRef::as_ref)
        .filter(|v| !v.is_empty())
        .collect();
    if secrets.is_empty() {
        return text.to_string();
    }
    secrets.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    secrets.dedup();

    let mut masked = String::with_capacity(text.len());
    let mut rest = text;
    'scan: while let Some(c) = rest.chars().next() {
        for secret in &secrets {
            if let Some(after) = rest.strip_prefix(secret) {
                masked.push_str(&hash_sensitive_value(secret));
                rest = after;
                continue 'scan;
            }
        }
        masked.push(c);
        rest = &rest[c.len_utf8()..];
    }
    masked
}

/// Log the values at debug level with sensitive paths masked
pub fn log_values<S: AsRef<str>>(values: &Values, sensitive_paths: &[S]) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    match redact(values, sensitive_paths).to_yaml() {
        Ok(yaml) => tracing::debug!("---[ values.yaml ]---\n{yaml}"),
        Err(e) => tracing::warn!(error = %e, "could not render values for logging"),
    }
}
