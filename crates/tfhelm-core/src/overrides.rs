//! Layered value overrides and the merge that combines them
//!
//! A release's values come from five attributes, applied in this order:
//!
//! 1. `values`: raw YAML documents, deep merged in sequence
//! 2. `set`, `set_sensitive`, `set_wo`: single assignments at a dotted path
//! 3. `set_list`: sequences assigned at a dotted path
//!
//! Later layers win over earlier ones at the same path.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::redact::{hash_sensitive_value, redact_text};
use crate::strvals;
use crate::values::{Values, is_blank_document, set_nested};

/// How the value of a [`ScalarOverride`] is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Infer numbers, booleans and `{a,b}` lists
    #[default]
    Auto,
    /// Always a string
    String,
    /// Parse the whole value as YAML, allowing mappings and sequences
    Literal,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::String => write!(f, "string"),
            Self::Literal => write!(f, "literal"),
        }
    }
}

impl FromStr for ValueKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "auto" => Ok(Self::Auto),
            "string" => Ok(Self::String),
            "literal" => Ok(Self::Literal),
            other => Err(CoreError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// A single value assigned at a dotted path
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarOverride {
    pub path: String,
    /// `None` assigns null
    pub value: Option<String>,
    pub kind: ValueKind,
}

impl ScalarOverride {
    pub fn new(path: impl Into<String>, value: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            path: path.into(),
            value: Some(value.into()),
            kind,
        }
    }

    /// Write this override into `dest`
    pub fn apply(&self, dest: &mut Values) -> Result<()> {
        let value = self.value.as_deref().unwrap_or_default();
        self.apply_inner(dest)
            .map_err(|e| e.for_override(&self.path, value))
    }

    fn apply_inner(&self, dest: &mut Values) -> Result<()> {
        let Some(value) = self.value.as_deref() else {
            let segments = strvals::split_key(&self.path)?;
            return set_segments(dest, &segments, JsonValue::Null);
        };

        match self.kind {
            ValueKind::Auto => strvals::parse_into(&format!("{}={}", self.path, value), dest),
            ValueKind::String => {
                strvals::parse_into_string(&format!("{}={}", self.path, value), dest)
            }
            ValueKind::Literal => {
                let segments = strvals::split_key(&self.path)?;
                let leaf = segments.last().map(String::as_str).unwrap_or_default();
                let literal = parse_literal(leaf, value)?;
                set_segments(dest, &segments, literal)
            }
        }
    }
}

/// Assign at a path already split the way `key=value` keys are split
fn set_segments(dest: &mut Values, segments: &[String], value: JsonValue) -> Result<()> {
    let parts: Vec<&str> = segments.iter().map(String::as_str).collect();
    set_nested(dest.inner_mut(), &parts, &segments.join("."), value)
}

/// Parse a literal override. A single-key mapping named after the last path
/// segment is unwrapped, so `name: {a: 1}` and `{a: 1}` assign the same value.
fn parse_literal(leaf: &str, value: &str) -> Result<JsonValue> {
    if is_blank_document(value) {
        return Ok(JsonValue::String(String::new()));
    }

    let literal: JsonValue = serde_yaml::from_str(value)?;
    match literal {
        JsonValue::Object(mut map) if map.len() == 1 && map.contains_key(leaf) => {
            Ok(map.remove(leaf).unwrap_or(JsonValue::Null))
        }
        other => Ok(other),
    }
}

/// A sequence assigned at a dotted path
#[derive(Debug, Clone, PartialEq)]
pub struct ListOverride {
    pub path: String,
    pub values: Vec<String>,
}

impl ListOverride {
    pub fn new<I, S>(path: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Write this override into `dest`; empty entries are dropped
    pub fn apply(&self, dest: &mut Values) -> Result<()> {
        let joined = self
            .values
            .iter()
            .filter(|v| !v.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");

        strvals::parse_into(&format!("{}={{{}}}", self.path, joined), dest)
            .map_err(|e| e.for_override(&self.path, &joined))
    }
}

/// Merge value documents, scalar overrides and list overrides into one tree
///
/// Blank documents are skipped. The first failure aborts the merge.
pub fn merge<D: AsRef<str>>(
    documents: &[D],
    scalars: &[ScalarOverride],
    lists: &[ListOverride],
) -> Result<Values> {
    let mut base = Values::new();

    for (i, doc) in documents.iter().enumerate() {
        let doc = doc.as_ref();
        if is_blank_document(doc) {
            continue;
        }
        let layer = Values::from_yaml(doc).map_err(|e| CoreError::ValuesParse {
            index: i + 1,
            message: match e {
                CoreError::ValuesParse { message, .. } => message,
                other => other.to_string(),
            },
        })?;
        base.merge(&layer);
    }

    for scalar in scalars {
        scalar.apply(&mut base)?;
    }

    for list in lists {
        list.apply(&mut base)?;
    }

    tracing::debug!(
        documents = documents.len(),
        scalars = scalars.len(),
        lists = lists.len(),
        "merged chart values"
    );

    Ok(base)
}

/// One `set`, `set_sensitive` or `set_wo` block as configured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetValue {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    /// Kept as text so an unknown kind is reported by the merge, with the path
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl SetValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn to_override(&self) -> Result<ScalarOverride> {
        let kind = self
            .kind
            .as_deref()
            .unwrap_or_default()
            .parse::<ValueKind>()
            .map_err(|e| e.for_override(&self.name, self.value.as_deref().unwrap_or_default()))?;
        Ok(ScalarOverride {
            path: self.name.clone(),
            value: self.value.clone(),
            kind,
        })
    }
}

/// One `set_list` block as configured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetListValue {
    pub name: String,
    #[serde(default)]
    pub value: Vec<String>,
}

impl From<&SetListValue> for ListOverride {
    fn from(set: &SetListValue) -> Self {
        ListOverride::new(&set.name, set.value.iter().cloned())
    }
}

/// The value attributes of a release, in the shape they are configured
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSources {
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub set: Vec<SetValue>,
    #[serde(default)]
    pub set_list: Vec<SetListValue>,
    #[serde(default)]
    pub set_sensitive: Vec<SetValue>,
    /// Write-only: never persisted in state
    #[serde(default)]
    pub set_wo: Vec<SetValue>,
}

impl ValueSources {
    /// `set`, then `set_sensitive`, then `set_wo`
    pub fn scalar_overrides(&self) -> Result<Vec<ScalarOverride>> {
        self.set
            .iter()
            .chain(&self.set_sensitive)
            .chain(&self.set_wo)
            .map(SetValue::to_override)
            .collect()
    }

    pub fn list_overrides(&self) -> Vec<ListOverride> {
        self.set_list.iter().map(ListOverride::from).collect()
    }

    /// Paths whose values must be masked wherever values are displayed
    pub fn sensitive_paths(&self) -> Vec<&str> {
        self.set_sensitive
            .iter()
            .chain(&self.set_wo)
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Raw sensitive values, for masking rendered text
    pub fn sensitive_values(&self) -> Vec<&str> {
        self.set_sensitive
            .iter()
            .chain(&self.set_wo)
            .filter_map(|s| s.value.as_deref())
            .collect()
    }

    /// Check every override kind without merging
    pub fn validate(&self) -> Result<()> {
        self.scalar_overrides().map(|_| ())
    }

    /// Merge all sources into the tree handed to the chart
    ///
    /// Errors name the failing override; sensitive values in them are hashed.
    pub fn merge(&self) -> Result<Values> {
        let scalars = self.scalar_overrides().map_err(|e| self.mask_error(e))?;
        merge(self.values.as_slice(), &scalars, &self.list_overrides()).map_err(|e| self.mask_error(e))
    }

    fn mask_error(&self, err: CoreError) -> CoreError {
        match err {
            CoreError::Override {
                path,
                value,
                source,
            } if self.sensitive_values().contains(&value.as_str()) => CoreError::Override {
                path,
                source: Box::new(mask_source(*source, &value)),
                value: hash_sensitive_value(&value),
            },
            other => other,
        }
    }
}

/// Strip a sensitive value out of the error an override failed with
///
/// Parser messages quote pieces of the value they choked on, so for a
/// sensitive value only the masked input is kept.
fn mask_source(err: CoreError, secret: &str) -> CoreError {
    let secrets = [secret];
    match err {
        CoreError::KeyValueSyntax { input, .. } => CoreError::KeyValueSyntax {
            input: redact_text(&input, &secrets),
            message: "sensitive value is not a valid override".to_string(),
        },
        CoreError::TypeConflict { path, segment } => CoreError::TypeConflict {
            path: redact_text(&path, &secrets),
            segment: redact_text(&segment, &secrets),
        },
        CoreError::YamlParse(_) => CoreError::KeyValueSyntax {
            input: hash_sensitive_value(secret),
            message: "sensitive value is not valid YAML".to_string(),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_end_to_end_merge() {
        let docs = ["foo: bar\nbaz: corge", "first: present\nbaz: grault"];
        let scalars = [ScalarOverride::new("foo", "qux", ValueKind::Auto)];

        let values = merge(&docs, &scalars, &[]).unwrap();

        assert_eq!(
            values.inner(),
            &json!({"foo": "qux", "baz": "grault", "first": "present"})
        );
    }

    #[test]
    fn test_last_document_wins() {
        let docs = ["a:\n  b: 1", "a:\n  b: 2", "a:\n  b: 3"];
        let values = merge(&docs, &[], &[]).unwrap();

        assert_eq!(values.get("a.b").unwrap(), 3);
    }

    #[test]
    fn test_disjoint_documents_are_order_independent() {
        let forward = merge(&["a: 1", "b:\n  c: 2"], &[], &[]).unwrap();
        let backward = merge(&["b:\n  c: 2", "a: 1"], &[], &[]).unwrap();

        assert_eq!(forward, backward);
    }

    #[test]
    fn test_blank_documents_are_skipped() {
        let values = merge(&["", "   \n", "a: 1"], &[], &[]).unwrap();
        assert_eq!(values.inner(), &json!({"a": 1}));
    }

    #[test]
    fn test_malformed_document_reports_index() {
        let err = merge(&["a: 1", "a: [unclosed"], &[], &[]).unwrap_err();

        match err {
            CoreError::ValuesParse { index, .. } => assert_eq!(index, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_string_kind_keeps_string() {
        let as_string = merge::<&str>(&[], &[ScalarOverride::new("count", "42", ValueKind::String)], &[]).unwrap();
        let as_auto = merge::<&str>(&[], &[ScalarOverride::new("count", "42", ValueKind::Auto)], &[]).unwrap();

        assert_eq!(as_string.inner(), &json!({"count": "42"}));
        assert_eq!(as_auto.inner(), &json!({"count": 42}));
    }

    #[test]
    fn test_literal_kind_structured_value() {
        let scalars = [ScalarOverride::new("nested", "{a: 1, b: 2}", ValueKind::Literal)];
        let values = merge::<&str>(&[], &scalars, &[]).unwrap();

        assert_eq!(values.inner(), &json!({"nested": {"a": 1, "b": 2}}));
    }

    #[test]
    fn test_literal_kind_unwraps_matching_key() {
        let scalars = [ScalarOverride::new("config.nested", "nested: [1, 2]", ValueKind::Literal)];
        let values = merge::<&str>(&[], &scalars, &[]).unwrap();

        assert_eq!(values.inner(), &json!({"config": {"nested": [1, 2]}}));
    }

    #[test]
    fn test_literal_kind_keeps_commas() {
        let scalars = [ScalarOverride::new("args", "a,b,c", ValueKind::Literal)];
        let values = merge::<&str>(&[], &scalars, &[]).unwrap();

        assert_eq!(values.get("args").unwrap(), "a,b,c");
    }

    #[test]
    fn test_list_override_preserves_order() {
        let lists = [ListOverride::new("items", ["3", "1", "2"])];
        let values = merge::<&str>(&[], &[], &lists).unwrap();

        assert_eq!(values.inner(), &json!({"items": [3, 1, 2]}));
    }

    #[test]
    fn test_list_override_drops_empty_entries() {
        let lists = [ListOverride::new("items", ["a", "", "b"])];
        let values = merge::<&str>(&[], &[], &lists).unwrap();

        assert_eq!(values.get("items").unwrap(), &json!(["a", "b"]));
    }

    #[test]
    fn test_lists_apply_after_scalars() {
        let scalars = [ScalarOverride::new("items", "single", ValueKind::Auto)];
        let lists = [ListOverride::new("items", ["x", "y"])];
        let values = merge::<&str>(&[], &scalars, &lists).unwrap();

        assert_eq!(values.get("items").unwrap(), &json!(["x", "y"]));
    }

    #[test]
    fn test_override_error_names_path_and_value() {
        let docs = ["image: nginx"];
        let scalars = [ScalarOverride::new("image.tag", "v1", ValueKind::Auto)];
        let err = merge(&docs, &scalars, &[]).unwrap_err();

        let message = err.to_string();
        assert!(message.contains("image.tag"), "{message}");
        assert!(message.contains("v1"), "{message}");
        assert!(matches!(err.root_cause(), CoreError::TypeConflict { .. }));
    }

    #[test]
    fn test_unknown_kind() {
        assert!(matches!(
            "yaml".parse::<ValueKind>(),
            Err(CoreError::UnknownKind { .. })
        ));
        assert_eq!("".parse::<ValueKind>().unwrap(), ValueKind::Auto);

        let sources = ValueSources {
            set: vec![SetValue::new("a", "1").with_kind("yaml")],
            ..Default::default()
        };
        let err = sources.merge().unwrap_err();
        assert!(err.to_string().contains("yaml"));
        assert!(matches!(err.root_cause(), CoreError::UnknownKind { .. }));
    }

    #[test]
    fn test_null_value_sets_null() {
        let sources = ValueSources {
            values: vec!["a: 1".into()],
            set: vec![SetValue {
                name: "a".into(),
                value: None,
                kind: None,
            }],
            ..Default::default()
        };

        assert_eq!(sources.merge().unwrap().inner(), &json!({"a": null}));
    }

    #[test]
    fn test_value_sources_order() {
        let sources = ValueSources {
            values: vec!["password: from-values\nreplicas: 1".into()],
            set: vec![SetValue::new("password", "from-set")],
            set_sensitive: vec![SetValue::new("password", "from-sensitive")],
            set_wo: vec![SetValue::new("token", "write-only")],
            set_list: vec![SetListValue {
                name: "hosts".into(),
                value: vec!["a".into(), "b".into()],
            }],
        };

        let values = sources.merge().unwrap();
        assert_eq!(values.get("password").unwrap(), "from-sensitive");
        assert_eq!(values.get("token").unwrap(), "write-only");
        assert_eq!(values.get("hosts").unwrap(), &json!(["a", "b"]));
        assert_eq!(values.get("replicas").unwrap(), 1);

        assert_eq!(sources.sensitive_paths(), vec!["password", "token"]);
        assert_eq!(sources.sensitive_values(), vec!["from-sensitive", "write-only"]);
    }

    #[test]
    fn test_sensitive_value_hashed_in_errors() {
        let sources = ValueSources {
            values: vec!["db: postgres".into()],
            set_sensitive: vec![SetValue::new("db.password", "hunter2")],
            ..Default::default()
        };

        let message = sources.merge().unwrap_err().to_string();
        assert!(message.contains("db.password"), "{message}");
        assert!(!message.contains("hunter2"), "{message}");
        assert!(message.contains("(sensitive value "), "{message}");
    }

    #[test]
    fn test_sensitive_syntax_errors_are_masked() {
        for secret in ["hunter2,oops", "{hunter2", "{hunter2}x"] {
            let sources = ValueSources {
                set_sensitive: vec![SetValue::new("db.password", secret)],
                ..Default::default()
            };

            let err = sources.merge().unwrap_err();
            assert!(matches!(err.root_cause(), CoreError::KeyValueSyntax { .. }));

            let message = err.to_string();
            assert!(message.contains("db.password"), "{message}");
            assert!(!message.contains("hunter2"), "{message}");
            assert!(!message.contains("oops"), "{message}");
            assert!(message.contains(&hash_sensitive_value(secret)), "{message}");
        }
    }

    #[test]
    fn test_sensitive_literal_errors_are_masked() {
        let sources = ValueSources {
            set_wo: vec![SetValue::new("token", "[hunter2").with_kind("literal")],
            ..Default::default()
        };

        let message = sources.merge().unwrap_err().to_string();
        assert!(message.contains("token"), "{message}");
        assert!(!message.contains("hunter2"), "{message}");
    }

    #[test]
    fn test_plain_syntax_errors_keep_detail() {
        let sources = ValueSources {
            set: vec![SetValue::new("db.host", "primary,oops")],
            ..Default::default()
        };

        let message = sources.merge().unwrap_err().to_string();
        assert!(message.contains("primary,oops"), "{message}");
        assert!(message.contains("\"oops\" has no value"), "{message}");
    }

    #[test]
    fn test_escaped_dots_in_every_kind() {
        let path = r"labels.app\.kubernetes\.io/name";
        let scalars = [
            ScalarOverride::new(path, "web", ValueKind::Auto),
            ScalarOverride::new(format!("{path}-string"), "web", ValueKind::String),
            ScalarOverride::new(format!("{path}-literal"), "web", ValueKind::Literal),
        ];
        let values = merge::<&str>(&[], &scalars, &[]).unwrap();

        assert_eq!(
            values.inner(),
            &json!({"labels": {
                "app.kubernetes.io/name": "web",
                "app.kubernetes.io/name-string": "web",
                "app.kubernetes.io/name-literal": "web",
            }})
        );
    }

    #[test]
    fn test_sources_deserialize_from_yaml() {
        let sources: ValueSources = serde_yaml::from_str(
            r#"
values:
  - "replicas: 2"
set:
  - name: image.tag
    value: "1.0"
    type: string
set_list:
  - name: args
    value: ["--a", "--b"]
"#,
        )
        .unwrap();

        let values = sources.merge().unwrap();
        assert_eq!(values.get("image.tag").unwrap(), "1.0");
        assert_eq!(values.get("args").unwrap(), &json!(["--a", "--b"]));
        assert_eq!(values.get("replicas").unwrap(), 2);
    }
}
