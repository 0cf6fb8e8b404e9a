//! Per-resource diffs between two manifests
//!
//! Inputs are expected to be redacted already; the diff engine never sees
//! values it would have to mask.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use similar::{ChangeTag, TextDiff};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ReleaseError, Result};
use crate::manifest::parse_resources;

/// Compares manifests resource by resource
pub struct DiffEngine {
    /// Unchanged lines kept around each change
    pub context_lines: usize,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self { context_lines: 3 }
    }

    pub fn with_context(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    /// Compare two multi-document YAML manifests
    pub fn diff_manifests(&self, old: &str, new: &str) -> Result<DiffResult> {
        Ok(self.diff_resources(&parse_resources(old)?, &parse_resources(new)?))
    }

    /// Compare two manifests in their stored JSON form
    pub fn diff_stored(&self, old: &str, new: &str) -> Result<DiffResult> {
        Ok(self.diff_resources(&parse_stored(old)?, &parse_stored(new)?))
    }

    fn diff_resources(
        &self,
        old: &BTreeMap<String, JsonValue>,
        new: &BTreeMap<String, JsonValue>,
    ) -> DiffResult {
        let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

        let changes = keys
            .into_iter()
            .filter_map(|key| {
                let (change_type, diff) = match (old.get(key), new.get(key)) {
                    (Some(before), Some(after)) if before == after => return None,
                    (Some(before), Some(after)) => (
                        ChangeType::Modified,
                        self.line_diff(&render(before), &render(after)),
                    ),
                    (None, Some(after)) => (
                        ChangeType::Added,
                        DiffContent::whole(&render(after), LineType::Added),
                    ),
                    (Some(before), None) => (
                        ChangeType::Removed,
                        DiffContent::whole(&render(before), LineType::Removed),
                    ),
                    (None, None) => return None,
                };
                Some(ResourceChange {
                    key: key.clone(),
                    change_type,
                    diff,
                })
            })
            .collect();

        DiffResult { changes }
    }

    fn line_diff(&self, old: &str, new: &str) -> DiffContent {
        let diff = TextDiff::from_lines(old, new);

        let lines = diff
            .grouped_ops(self.context_lines)
            .iter()
            .flatten()
            .flat_map(|op| diff.iter_changes(op))
            .map(|change| DiffLine {
                line_type: match change.tag() {
                    ChangeTag::Delete => LineType::Removed,
                    ChangeTag::Insert => LineType::Added,
                    ChangeTag::Equal => LineType::Context,
                },
                content: change.value().trim_end().to_string(),
                old_line_no: change.old_index(),
                new_line_no: change.new_index(),
            })
            .collect();

        DiffContent { lines }
    }

    /// One-line summary such as `1 added, 2 modified`
    pub fn summary(&self, result: &DiffResult) -> String {
        let parts: Vec<String> = [ChangeType::Added, ChangeType::Modified, ChangeType::Removed]
            .into_iter()
            .filter_map(|change_type| match result.changes_by_type(change_type).len() {
                0 => None,
                n => Some(format!("{} {}", n, change_type)),
            })
            .collect();

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_stored(json: &str) -> Result<BTreeMap<String, JsonValue>> {
    if json.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(json)
        .map_err(|e| ReleaseError::InvalidManifest(format!("stored manifest: {}", e)))
}

fn render(object: &JsonValue) -> String {
    serde_yaml::to_string(object).unwrap_or_else(|_| object.to_string())
}

/// Per-resource changes, sorted by resource key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffResult {
    pub changes: Vec<ResourceChange>,
}

impl DiffResult {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn changes_by_type(&self, change_type: ChangeType) -> Vec<&ResourceChange> {
        self.changes
            .iter()
            .filter(|c| c.change_type == change_type)
            .collect()
    }
}

/// A change to a single Kubernetes resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceChange {
    /// Resource key (`apiversion/kind/[namespace/]name`)
    pub key: String,
    pub change_type: ChangeType,
    pub diff: DiffContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Modified => "modified",
            ChangeType::Removed => "removed",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line diff of one resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiffContent {
    pub lines: Vec<DiffLine>,
}

impl DiffContent {
    /// Every line of `content` as a single kind of line
    fn whole(content: &str, line_type: LineType) -> Self {
        let lines = content
            .lines()
            .enumerate()
            .map(|(i, line)| DiffLine {
                line_type,
                content: line.to_string(),
                old_line_no: (line_type == LineType::Removed).then_some(i),
                new_line_no: (line_type == LineType::Added).then_some(i),
            })
            .collect();

        Self { lines }
    }

    /// Counts of added and removed lines
    pub fn stats(&self) -> (usize, usize) {
        self.lines.iter().fold((0, 0), |(added, removed), line| match line.line_type {
            LineType::Added => (added + 1, removed),
            LineType::Removed => (added, removed + 1),
            LineType::Context => (added, removed),
        })
    }

    /// Render as unified diff body lines (`+`, `-` or space prefixed)
    pub fn to_unified_diff(&self) -> String {
        self.lines
            .iter()
            .map(|line| format!("{}{}\n", line.line_type.marker(), line.content))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffLine {
    pub line_type: LineType,
    pub content: String,
    pub old_line_no: Option<usize>,
    pub new_line_no: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Added,
    Removed,
    Context,
}

impl LineType {
    pub fn marker(&self) -> char {
        match self {
            LineType::Added => '+',
            LineType::Removed => '-',
            LineType::Context => ' ',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::redact_manifest;

    const OLD: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: cm1
  namespace: default
data:
  replicas: "1"
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: legacy
  namespace: default
"#;

    const NEW: &str = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: cm1
  namespace: default
data:
  replicas: "2"
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: cm2
  namespace: default
"#;

    #[test]
    fn test_diff_manifests() {
        let engine = DiffEngine::new();
        let result = engine.diff_manifests(OLD, NEW).unwrap();

        assert!(result.has_changes());
        assert_eq!(result.changes.len(), 3);
        assert_eq!(result.changes[0].key, "v1/configmap/default/cm1");
        assert_eq!(result.changes[0].change_type, ChangeType::Modified);
        assert_eq!(result.changes[1].change_type, ChangeType::Added);
        assert_eq!(result.changes[2].key, "v1/configmap/default/legacy");
        assert_eq!(result.changes[2].change_type, ChangeType::Removed);

        assert_eq!(result.changes[0].diff.stats(), (1, 1));
        let unified = result.changes[0].diff.to_unified_diff();
        assert!(unified.contains("-  replicas: '1'"));
        assert!(unified.contains("+  replicas: '2'"));
    }

    #[test]
    fn test_change_listing() {
        let result = DiffEngine::new().diff_manifests(OLD, NEW).unwrap();
        let listing = result
            .changes
            .iter()
            .map(|c| format!("{} {}", c.change_type, c.key))
            .collect::<Vec<_>>()
            .join("\n");

        insta::assert_snapshot!(listing, @r"
        modified v1/configmap/default/cm1
        added v1/configmap/default/cm2
        removed v1/configmap/default/legacy
        ");
    }

    #[test]
    fn test_identical_manifests() {
        let engine = DiffEngine::new();
        let result = engine.diff_manifests(OLD, OLD).unwrap();

        assert!(!result.has_changes());
        assert_eq!(engine.summary(&result), "No changes");
    }

    #[test]
    fn test_diff_stored_manifests() {
        let engine = DiffEngine::new();
        let old = redact_manifest(OLD, &[] as &[&str]).unwrap();
        let new = redact_manifest(NEW, &[] as &[&str]).unwrap();

        let result = engine.diff_stored(&old, &new).unwrap();
        assert_eq!(engine.summary(&result), "1 added, 1 modified, 1 removed");
        assert_eq!(result.changes_by_type(ChangeType::Added)[0].key, "v1/configmap/default/cm2");

        let from_nothing = engine.diff_stored("", &new).unwrap();
        assert_eq!(engine.summary(&from_nothing), "2 added");
    }

    #[test]
    fn test_context_lines_limit_output() {
        let old = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: big\ndata:\n  a: '1'\n  b: '2'\n  c: '3'\n  d: '4'\n  e: '5'\n  f: '6'\n";
        let new = old.replace("f: '6'", "f: '7'");

        let result = DiffEngine::new().with_context(1).diff_manifests(old, &new).unwrap();
        let lines = &result.changes[0].diff.lines;
        assert!(lines.iter().all(|l| !l.content.contains("a: '1'")));
        assert!(lines.iter().any(|l| l.line_type == LineType::Added));
    }

    #[test]
    fn test_invalid_stored_manifest() {
        let err = DiffEngine::new().diff_stored("not json", "{}").unwrap_err();
        assert!(matches!(err, ReleaseError::InvalidManifest(_)));
    }
}
