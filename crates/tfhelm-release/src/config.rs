//! Resource and provider configuration
//!
//! `ReleaseConfig` mirrors the attributes of a `helm_release` resource and
//! `ProviderSettings` the provider block. Defaults live on these structs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tfhelm_core::ValueSources;

use crate::chart::ChartRef;
use crate::error::{ReleaseError, Result};

/// Default timeout for release operations, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Helm rejects longer release names
pub const MAX_RELEASE_NAME_LEN: usize = 53;

/// Namespace used when neither the resource nor the provider sets one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Configuration of one release resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Release name
    pub name: String,

    /// Target namespace (provider namespace when unset)
    pub namespace: Option<String>,

    /// Chart name, path or URL
    pub chart: String,

    /// Repository URL the chart is fetched from
    pub repository: Option<String>,

    /// Chart version constraint
    pub version: Option<String>,

    /// Description for the release revision
    pub description: Option<String>,

    /// `values`, `set`, `set_list`, `set_sensitive` and `set_wo`
    #[serde(flatten)]
    pub sources: ValueSources,

    /// Bumped to re-apply `set_wo` values, which are not stored in state
    pub set_wo_revision: Option<i64>,

    /// Operation timeout in seconds
    pub timeout: u64,

    pub wait: bool,
    pub wait_for_jobs: bool,
    pub atomic: bool,
    pub create_namespace: bool,
    pub skip_crds: bool,
    pub disable_hooks: bool,
    pub disable_openapi_validation: bool,
    pub force_update: bool,
    pub recreate_pods: bool,
    pub cleanup_on_fail: bool,
    pub reset_values: bool,
    pub reuse_values: bool,
    pub replace: bool,
    pub dependency_update: bool,
    pub render_subchart_notes: bool,
    pub lint: bool,

    /// Revisions kept per release (0 = unlimited)
    pub max_history: u32,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            namespace: None,
            chart: String::new(),
            repository: None,
            version: None,
            description: None,
            sources: ValueSources::default(),
            set_wo_revision: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            wait: true,
            wait_for_jobs: false,
            atomic: false,
            create_namespace: false,
            skip_crds: false,
            disable_hooks: false,
            disable_openapi_validation: false,
            force_update: false,
            recreate_pods: false,
            cleanup_on_fail: false,
            reset_values: false,
            reuse_values: false,
            replace: false,
            dependency_update: false,
            render_subchart_notes: true,
            lint: false,
            max_history: 0,
        }
    }
}

impl ReleaseConfig {
    /// Create a config with defaults for the given release and chart
    pub fn new(name: impl Into<String>, chart: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chart: chart.into(),
            ..Default::default()
        }
    }

    /// Parse a config from YAML (JSON is accepted too)
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// The namespace the release lives in
    pub fn namespace<'a>(&'a self, settings: &'a ProviderSettings) -> &'a str {
        self.namespace
            .as_deref()
            .unwrap_or_else(|| settings.default_namespace())
    }

    pub fn chart_ref(&self) -> ChartRef {
        ChartRef {
            chart: self.chart.clone(),
            repository: self.repository.clone(),
            version: self.version.clone(),
        }
    }

    /// The config as persisted in state: write-only values are dropped
    pub fn persisted(&self) -> Self {
        let mut config = self.clone();
        config.sources.set_wo.clear();
        config
    }

    /// Reject configurations that can never succeed
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ReleaseError::InvalidConfig("release name must not be empty".into()));
        }
        if self.name.len() > MAX_RELEASE_NAME_LEN {
            return Err(ReleaseError::InvalidConfig(format!(
                "release name '{}' is longer than {} characters",
                self.name, MAX_RELEASE_NAME_LEN
            )));
        }
        if self.chart.is_empty() {
            return Err(ReleaseError::InvalidConfig("chart must not be empty".into()));
        }
        if self.reset_values && self.reuse_values {
            return Err(ReleaseError::InvalidConfig(
                "reset_values and reuse_values cannot both be set".into(),
            ));
        }
        if self.timeout == 0 {
            return Err(ReleaseError::InvalidConfig("timeout must be greater than zero".into()));
        }
        self.sources.validate()?;
        Ok(())
    }
}

/// Connection settings of the `kubernetes` provider block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesSettings {
    pub config_path: Option<PathBuf>,
    pub config_context: Option<String>,
    pub insecure: bool,
}

/// Opt-in provider behaviour
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experiments {
    /// Store the redacted rendered manifest in state and diff it on plan
    pub manifest: bool,
}

/// Provider-level settings shared by every release
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub kubernetes: KubernetesSettings,
    pub namespace: Option<String>,
    pub experiments: Experiments,
}

impl ProviderSettings {
    /// Settings filled from the process environment
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Fill unset fields from the process environment
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Fill unset fields from `KUBE_CONFIG_PATH`, `KUBE_CTX` and `HELM_NAMESPACE`
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if self.kubernetes.config_path.is_none() {
            self.kubernetes.config_path = non_empty("KUBE_CONFIG_PATH").map(PathBuf::from);
        }
        if self.kubernetes.config_context.is_none() {
            self.kubernetes.config_context = non_empty("KUBE_CTX");
        }
        if self.namespace.is_none() {
            self.namespace = non_empty("HELM_NAMESPACE");
        }
        self
    }

    pub fn default_namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfhelm_core::SetValue;

    #[test]
    fn test_defaults() {
        let config = ReleaseConfig::new("web", "nginx");

        assert_eq!(config.timeout, DEFAULT_TIMEOUT_SECS);
        assert!(config.wait);
        assert!(config.render_subchart_notes);
        assert!(!config.atomic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_with_sources() {
        let config = ReleaseConfig::from_yaml(
            r#"
name: web
chart: nginx
repository: https://charts.example.com
version: 1.2.3
values:
  - "replicaCount: 2"
set:
  - name: image.tag
    value: "1.25"
set_sensitive:
  - name: auth.password
    value: hunter2
atomic: true
"#,
        )
        .unwrap();

        assert_eq!(config.name, "web");
        assert!(config.atomic);
        assert!(config.wait);
        assert_eq!(config.sources.values.len(), 1);
        assert_eq!(config.sources.set[0].name, "image.tag");
        assert_eq!(config.sources.sensitive_paths(), vec!["auth.password"]);
        assert_eq!(config.chart_ref().version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn test_namespace_resolution() {
        let settings = ProviderSettings::default();
        let mut config = ReleaseConfig::new("web", "nginx");
        assert_eq!(config.namespace(&settings), "default");

        let settings = ProviderSettings {
            namespace: Some("platform".into()),
            ..Default::default()
        };
        assert_eq!(config.namespace(&settings), "platform");

        config.namespace = Some("apps".into());
        assert_eq!(config.namespace(&settings), "apps");
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        assert!(ReleaseConfig::new("", "nginx").validate().is_err());
        assert!(ReleaseConfig::new("web", "").validate().is_err());
        assert!(ReleaseConfig::new("x".repeat(54), "nginx").validate().is_err());

        let mut config = ReleaseConfig::new("web", "nginx");
        config.reset_values = true;
        config.reuse_values = true;
        assert!(config.validate().is_err());

        let mut config = ReleaseConfig::new("web", "nginx");
        config.sources.set.push(SetValue::new("a", "1").with_kind("json"));
        let err = config.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("json"));
    }

    #[test]
    fn test_persisted_drops_write_only() {
        let mut config = ReleaseConfig::new("web", "nginx");
        config.sources.set_wo.push(SetValue::new("token", "abc"));
        config.sources.set_sensitive.push(SetValue::new("password", "p"));

        let persisted = config.persisted();
        assert!(persisted.sources.set_wo.is_empty());
        assert_eq!(persisted.sources.set_sensitive.len(), 1);
    }

    #[test]
    fn test_settings_from_env() {
        let settings = ProviderSettings::default().with_env_from(|key| match key {
            "KUBE_CONFIG_PATH" => Some("/tmp/kubeconfig".into()),
            "HELM_NAMESPACE" => Some("platform".into()),
            "KUBE_CTX" => Some(String::new()),
            _ => None,
        });

        assert_eq!(
            settings.kubernetes.config_path,
            Some(PathBuf::from("/tmp/kubeconfig"))
        );
        assert_eq!(settings.kubernetes.config_context, None);
        assert_eq!(settings.default_namespace(), "platform");
    }

    #[test]
    fn test_explicit_settings_win_over_env() {
        let settings = ProviderSettings {
            namespace: Some("explicit".into()),
            ..Default::default()
        }
        .with_env_from(|_| Some("from-env".into()));

        assert_eq!(settings.default_namespace(), "explicit");
        assert_eq!(settings.kubernetes.config_context.as_deref(), Some("from-env"));
    }
}
