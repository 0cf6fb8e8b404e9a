//! Error types for tfhelm-release

use thiserror::Error;

/// Result type for tfhelm-release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Errors that can occur while managing a release
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReleaseError {
    /// Values could not be merged
    #[error("{0}")]
    Values(#[from] tfhelm_core::CoreError),

    /// Invalid resource or provider configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Release not found
    #[error("release '{name}' not found in namespace '{namespace}'")]
    ReleaseNotFound { name: String, namespace: String },

    /// Release already exists
    #[error("release '{name}' already exists in namespace '{namespace}'\nHint: Set `replace = true` to reuse the name of a failed or uninstalled release")]
    ReleaseAlreadyExists { name: String, namespace: String },

    /// Chart could not be loaded
    #[error("chart error: {0}")]
    Chart(String),

    /// Install, upgrade or uninstall failed
    #[error("release operation failed: {0}")]
    Runner(String),

    /// Kubernetes client configuration could not be built
    #[error("cluster configuration error: {0}")]
    ClusterConfig(String),

    /// Invalid manifest
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ReleaseError {
    fn from(e: serde_json::Error) -> Self {
        ReleaseError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for ReleaseError {
    fn from(e: serde_yaml::Error) -> Self {
        ReleaseError::Serialization(e.to_string())
    }
}

impl From<kube::config::KubeconfigError> for ReleaseError {
    fn from(e: kube::config::KubeconfigError) -> Self {
        ReleaseError::ClusterConfig(e.to_string())
    }
}

impl From<kube::config::InferConfigError> for ReleaseError {
    fn from(e: kube::config::InferConfigError) -> Self {
        ReleaseError::ClusterConfig(e.to_string())
    }
}

impl ReleaseError {
    /// Check if this is a release-not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReleaseError::ReleaseNotFound { .. })
    }

    /// Errors caused by configuration rather than the cluster; never worth retrying
    pub fn is_validation(&self) -> bool {
        match self {
            ReleaseError::Values(e) => e.is_validation(),
            ReleaseError::InvalidConfig(_) => true,
            _ => false,
        }
    }
}
