//! Release operations delegated to the Helm SDK

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tfhelm_core::Values;

use crate::actions::{InstallOptions, UninstallOptions, UpgradeOptions};
use crate::chart::{ChartMetadata, LoadedChart};
use crate::error::Result;
use crate::release::ReleaseStatus;

/// A release as reported by the runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerRelease {
    pub name: String,
    pub namespace: String,
    pub revision: u32,
    pub status: ReleaseStatus,
    pub chart: ChartMetadata,

    /// User-supplied values of this revision (chart defaults excluded)
    pub values: Values,

    /// Rendered manifest, multi-document YAML
    pub manifest: String,

    #[serde(default)]
    pub notes: Option<String>,

    pub first_deployed: DateTime<Utc>,
    pub last_deployed: DateTime<Utc>,
}

/// Performs install, upgrade and uninstall against the cluster
///
/// `dry_run` in the options asks for a rendered release without touching
/// the cluster.
#[async_trait]
pub trait ReleaseRunner: Send + Sync {
    /// Install a chart as a new release
    async fn install(
        &self,
        chart: &LoadedChart,
        values: &Values,
        options: &InstallOptions,
    ) -> Result<RunnerRelease>;

    /// Upgrade an existing release to a chart and values
    async fn upgrade(
        &self,
        chart: &LoadedChart,
        values: &Values,
        options: &UpgradeOptions,
    ) -> Result<RunnerRelease>;

    /// Uninstall a release
    async fn uninstall(&self, options: &UninstallOptions) -> Result<()>;

    /// Get the latest revision of a release, if any
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<RunnerRelease>>;
}
