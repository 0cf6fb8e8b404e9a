//! tfhelm Release - lifecycle of a single Helm release
//!
//! This crate provides:
//! - **Configuration**: Release attributes and provider settings with environment fallback
//! - **Collaborators**: Traits for chart loading, release operations and cluster access
//! - **Release Management**: Plan, create, read, update and delete with redacted state
//! - **Manifests**: Rendered manifests stored as redacted JSON
//! - **Diff Engine**: Per-resource manifest diffs

pub mod actions;
pub mod chart;
pub mod cluster;
pub mod config;
pub mod diff;
pub mod error;
pub mod manager;
pub mod manifest;
pub mod mock;
pub mod release;
pub mod runner;

pub use actions::{InstallOptions, UninstallOptions, UpgradeOptions};
pub use chart::{ChartMetadata, ChartRef, ChartSource, LoadedChart, SerializedChartSource};
pub use cluster::{ClusterConfigProvider, KubeconfigProvider};
pub use config::{Experiments, KubernetesSettings, ProviderSettings, ReleaseConfig};
pub use diff::{ChangeType, DiffEngine, DiffResult, ResourceChange};
pub use error::{ReleaseError, Result};
pub use manager::{PlanAction, ReleaseManager, ReleasePlan};
pub use manifest::{redact_manifest, split_manifest};
pub use release::{ReleaseMetadata, ReleaseState, ReleaseStatus};
pub use runner::{ReleaseRunner, RunnerRelease};
