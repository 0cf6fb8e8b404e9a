//! Action options for install, upgrade and uninstall operations

use std::time::Duration;

use crate::config::{ProviderSettings, ReleaseConfig};

/// Options for install operation
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Wait for resources to be ready
    pub wait: bool,

    /// Also wait for Jobs to complete
    pub wait_for_jobs: bool,

    /// Timeout for the whole operation
    pub timeout: Duration,

    /// Uninstall on failure
    pub atomic: bool,

    /// Create namespace if it doesn't exist
    pub create_namespace: bool,

    /// Skip the chart's crds/ directory
    pub skip_crds: bool,

    /// Skip hooks
    pub disable_hooks: bool,

    /// Skip OpenAPI schema validation of rendered resources
    pub disable_openapi_validation: bool,

    /// Reuse the name of a failed or uninstalled release
    pub replace: bool,

    /// Update chart dependencies before installing
    pub dependency_update: bool,

    /// Render subchart NOTES.txt too
    pub render_subchart_notes: bool,

    /// Dry run mode (don't actually apply)
    pub dry_run: bool,
    /// Description for this release
    pub description: Option<String>,
}

impl InstallOptions {
    /// Options for installing a configured release
    pub fn from_config(config: &ReleaseConfig, settings: &ProviderSettings) -> Self {
        Self {
            name: config.name.clone(),
            namespace: config.namespace(settings).to_string(),
            wait: config.wait,
            wait_for_jobs: config.wait_for_jobs,
            timeout: Duration::from_secs(config.timeout),
            atomic: config.atomic,
            create_namespace: config.create_namespace,
            skip_crds: config.skip_crds,
            disable_hooks: config.disable_hooks,
            disable_openapi_validation: config.disable_openapi_validation,
            replace: config.replace,
            dependency_update: config.dependency_update,
            render_subchart_notes: config.render_subchart_notes,
            dry_run: false,
            description: config.description.clone(),
        }
    }

    /// Enable dry-run mode
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Options for upgrade operation
#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    /// Release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Wait for resources to be ready
    pub wait: bool,

    /// Also wait for Jobs to complete
    pub wait_for_jobs: bool,

    /// Timeout for the whole operation
    pub timeout: Duration,

    /// Roll back on failure
    pub atomic: bool,

    /// Force resource updates through delete/recreate
    pub force: bool,

    /// Restart pods of the release
    pub recreate_pods: bool,

    /// Delete resources created by a failed upgrade
    pub cleanup_on_fail: bool,

    /// Reset values to the chart's defaults
    pub reset_values: bool,

    /// Reuse values from the previous release
    pub reuse_values: bool,

    /// Maximum history to keep (0 = unlimited)
    pub max_history: u32,

    /// Skip the chart's crds/ directory
    pub skip_crds: bool,

    /// Skip hooks
    pub disable_hooks: bool,

    /// Skip OpenAPI schema validation of rendered resources
    pub disable_openapi_validation: bool,

    /// Update chart dependencies before upgrading
    pub dependency_update: bool,

    /// Render subchart NOTES.txt too
    pub render_subchart_notes: bool,

    /// Dry run mode
    pub dry_run: bool,
    /// Description for this revision
    pub description: Option<String>,
}

impl UpgradeOptions {
    /// Options for upgrading a configured release
    pub fn from_config(config: &ReleaseConfig, settings: &ProviderSettings) -> Self {
        Self {
            name: config.name.clone(),
            namespace: config.namespace(settings).to_string(),
            wait: config.wait,
            wait_for_jobs: config.wait_for_jobs,
            timeout: Duration::from_secs(config.timeout),
            atomic: config.atomic,
            force: config.force_update,
            recreate_pods: config.recreate_pods,
            cleanup_on_fail: config.cleanup_on_fail,
            reset_values: config.reset_values,
            reuse_values: config.reuse_values,
            max_history: config.max_history,
            skip_crds: config.skip_crds,
            disable_hooks: config.disable_hooks,
            disable_openapi_validation: config.disable_openapi_validation,
            dependency_update: config.dependency_update,
            render_subchart_notes: config.render_subchart_notes,
            dry_run: false,
            description: config.description.clone(),
        }
    }

    /// Enable dry-run mode
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Options for uninstall operation
#[derive(Debug, Clone)]
pub struct UninstallOptions {
    /// Release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Wait for resources to be deleted
    pub wait: bool,

    /// Timeout for the whole operation
    pub timeout: Duration,

    /// Skip pre/post-delete hooks
    pub disable_hooks: bool,

    /// Description for the uninstall
    pub description: Option<String>,
}

impl UninstallOptions {
    /// Options for uninstalling a configured release
    pub fn from_config(config: &ReleaseConfig, settings: &ProviderSettings) -> Self {
        Self {
            name: config.name.clone(),
            namespace: config.namespace(settings).to_string(),
            wait: config.wait,
            timeout: Duration::from_secs(config.timeout),
            disable_hooks: config.disable_hooks,
            description: config.description.clone(),
        }
    }
}
