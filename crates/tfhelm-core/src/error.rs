//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to parse values document #{index}: {message}")]
    ValuesParse { index: usize, message: String },

    #[error("Failed parsing key {path:?} with value {value:?}: {source}")]
    Override {
        path: String,
        value: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("Failed parsing {input:?}: {message}")]
    KeyValueSyntax { input: String, message: String },

    #[error("Cannot set {path:?}: segment {segment:?} already holds a non-mapping value")]
    TypeConflict { path: String, segment: String },

    #[error("Unexpected value type {kind:?}. Valid types: auto, string, literal")]
    UnknownKind { kind: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Attach the override that failed to a lower level error
    pub(crate) fn for_override(self, path: &str, value: &str) -> Self {
        match self {
            err @ CoreError::Override { .. } => err,
            other => CoreError::Override {
                path: path.to_string(),
                value: value.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, unwrapping override context
    pub fn root_cause(&self) -> &CoreError {
        match self {
            CoreError::Override { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// True for errors caused by caller input rather than the environment
    pub fn is_validation(&self) -> bool {
        !matches!(self.root_cause(), CoreError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
