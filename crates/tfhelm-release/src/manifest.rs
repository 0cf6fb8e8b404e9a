//! Rendered manifest handling
//!
//! With the manifest experiment enabled the rendered manifest is stored in
//! state. It is stored as a JSON object of resources keyed by
//! `apiversion/kind/[namespace/]name`, with Secret payloads hashed and
//! sensitive values masked.

use k8s_openapi::Resource;
use k8s_openapi::api::core::v1::Secret;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tfhelm_core::{hash_sensitive_value, redact_text};

use crate::error::{ReleaseError, Result};

/// Secret fields whose entries are replaced by hashes
const SECRET_PAYLOAD_FIELDS: [&str; 2] = ["data", "stringData"];

/// Split a multi-document YAML stream into its non-empty documents
pub fn split_manifest(manifest: &str) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current = String::new();

    for line in manifest.lines() {
        match separator_remainder(line) {
            Some(rest) => {
                push_document(&mut documents, &mut current);
                if !rest.is_empty() {
                    current.push_str(rest);
                    current.push('\n');
                }
            }
            None => {
                current.push_str(line);
                current.push('\n');
            }
        }
    }
    push_document(&mut documents, &mut current);

    documents
}

/// For a `---` marker line, whatever follows the marker on that line
fn separator_remainder(line: &str) -> Option<&str> {
    let rest = line.trim_end().strip_prefix("---")?;
    if rest.is_empty() {
        return Some(rest);
    }
    rest.starts_with([' ', '\t']).then(|| rest.trim_start())
}

fn push_document(documents: &mut Vec<String>, current: &mut String) {
    let has_content = current.lines().any(|line| {
        let line = line.trim();
        !line.is_empty() && !line.starts_with('#')
    });
    if has_content {
        documents.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

/// Parse a manifest into resources keyed by their identity
///
/// Documents that are empty or `null` are skipped. A document that is not
/// a mapping, or lacks `apiVersion`, `kind` or `metadata.name`, is an error.
pub fn parse_resources(manifest: &str) -> Result<BTreeMap<String, JsonValue>> {
    let mut resources = BTreeMap::new();

    for (index, document) in split_manifest(manifest).iter().enumerate() {
        let object: JsonValue = serde_yaml::from_str(document).map_err(|e| {
            ReleaseError::InvalidManifest(format!("document {}: {}", index + 1, e))
        })?;
        if object.is_null() {
            continue;
        }
        let key = resource_key(&object)
            .ok_or_else(|| {
                ReleaseError::InvalidManifest(format!(
                    "document {} is missing apiVersion, kind or metadata.name",
                    index + 1
                ))
            })?;
        resources.insert(key, object);
    }

    Ok(resources)
}

/// `apiversion/kind/[namespace/]name`, with apiVersion and kind lower-cased
pub fn resource_key(object: &JsonValue) -> Option<String> {
    let api_version = object.get("apiVersion")?.as_str()?;
    let kind = object.get("kind")?.as_str()?;
    let metadata = object.get("metadata")?;
    let name = metadata.get("name")?.as_str()?;

    let mut key = format!("{}/{}/", api_version.to_lowercase(), kind.to_lowercase());
    if let Some(namespace) = metadata.get("namespace").and_then(JsonValue::as_str) {
        key.push_str(namespace);
        key.push('/');
    }
    key.push_str(name);
    Some(key)
}

/// Convert a rendered manifest to the redacted JSON stored in state
///
/// Sensitive values are masked wherever they occur: resource keys, mapping
/// keys and every scalar. A number or boolean that gets masked becomes a string.
pub fn redact_manifest<S: AsRef<str>>(manifest: &str, sensitive_values: &[S]) -> Result<String> {
    let resources: BTreeMap<String, JsonValue> = parse_resources(manifest)?
        .into_iter()
        .map(|(key, mut object)| {
            if object.get("kind").and_then(JsonValue::as_str) == Some(Secret::KIND) {
                hash_secret_payload(&mut object);
            }
            (
                redact_text(&key, sensitive_values),
                redact_value(object, sensitive_values),
            )
        })
        .collect();

    tracing::trace!(resources = resources.len(), "redacted manifest");
    Ok(serde_json::to_string(&resources)?)
}

fn hash_secret_payload(secret: &mut JsonValue) {
    for field in SECRET_PAYLOAD_FIELDS {
        if let Some(JsonValue::Object(entries)) = secret.get_mut(field) {
            for value in entries.values_mut() {
                if let JsonValue::String(s) = value {
                    *value = JsonValue::String(hash_sensitive_value(s));
                }
            }
        }
    }
}

fn redact_value<S: AsRef<str>>(value: JsonValue, sensitive_values: &[S]) -> JsonValue {
    match value {
        JsonValue::String(s) => JsonValue::String(redact_text(&s, sensitive_values)),
        JsonValue::Number(_) | JsonValue::Bool(_) => {
            let text = value.to_string();
            let masked = redact_text(&text, sensitive_values);
            if masked == text {
                value
            } else {
                JsonValue::String(masked)
            }
        }
        JsonValue::Array(items) => JsonValue::Array(
            items
                .into_iter()
                .map(|item| redact_value(item, sensitive_values))
                .collect(),
        ),
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(key, item)| {
                    (
                        redact_text(&key, sensitive_values),
                        redact_value(item, sensitive_values),
                    )
                })
                .collect(),
        ),
        JsonValue::Null => JsonValue::Null,
    }
}
