//! Release state as recorded between operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tfhelm_core::redact;

use crate::config::ReleaseConfig;
use crate::error::Result;
use crate::runner::RunnerRelease;

/// Release status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ReleaseStatus {
    #[default]
    Unknown,
    Deployed,
    Uninstalled,
    Superseded,
    Failed,
    Uninstalling,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
}

impl ReleaseStatus {
    /// The release is mid-operation
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::PendingInstall | Self::PendingUpgrade | Self::PendingRollback | Self::Uninstalling
        )
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Deployed => "deployed",
            Self::Uninstalled => "uninstalled",
            Self::Superseded => "superseded",
            Self::Failed => "failed",
            Self::Uninstalling => "uninstalling",
            Self::PendingInstall => "pending-install",
            Self::PendingUpgrade => "pending-upgrade",
            Self::PendingRollback => "pending-rollback",
        };
        write!(f, "{}", s)
    }
}

/// The computed `metadata` attribute of a release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseMetadata {
    pub name: String,
    pub revision: u32,
    pub namespace: String,

    /// Chart name
    pub chart: String,

    /// Chart version
    pub version: String,

    pub app_version: Option<String>,

    /// Values of the release as JSON, with sensitive paths masked
    pub values: String,

    pub first_deployed: DateTime<Utc>,
    pub last_deployed: DateTime<Utc>,
    pub notes: Option<String>,
}

impl ReleaseMetadata {
    /// Build metadata from a runner release, masking `sensitive_paths`
    pub fn from_release<S: AsRef<str>>(release: &RunnerRelease, sensitive_paths: &[S]) -> Result<Self> {
        let values = redact(&release.values, sensitive_paths).to_json()?;

        Ok(Self {
            name: release.name.clone(),
            revision: release.revision,
            namespace: release.namespace.clone(),
            chart: release.chart.name.clone(),
            version: release.chart.version.clone(),
            app_version: release.chart.app_version.clone(),
            values,
            first_deployed: release.first_deployed,
            last_deployed: release.last_deployed,
            notes: release.notes.clone(),
        })
    }
}

/// Everything recorded about a release after an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseState {
    /// Configuration as applied, write-only values removed
    pub config: ReleaseConfig,

    pub status: ReleaseStatus,
    pub metadata: ReleaseMetadata,

    /// Redacted manifest JSON, kept only with the manifest experiment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

impl ReleaseState {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartMetadata;
    use tfhelm_core::{SENSITIVE_VALUE, Values};

    fn runner_release() -> RunnerRelease {
        let now = Utc::now();
        RunnerRelease {
            name: "web".into(),
            namespace: "default".into(),
            revision: 3,
            status: ReleaseStatus::Deployed,
            chart: ChartMetadata {
                name: "nginx".into(),
                version: "1.2.3".into(),
                app_version: Some("1.25".into()),
            },
            values: Values::from_yaml("auth:\n  password: hunter2\nreplicaCount: 2\n").unwrap(),
            manifest: String::new(),
            notes: Some("visit http://web".into()),
            first_deployed: now,
            last_deployed: now,
        }
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(ReleaseStatus::PendingInstall.to_string(), "pending-install");
        assert_eq!(
            serde_json::to_string(&ReleaseStatus::PendingUpgrade).unwrap(),
            "\"pending-upgrade\""
        );
        assert!(ReleaseStatus::Uninstalling.is_pending());
        assert!(!ReleaseStatus::Deployed.is_pending());
    }

    #[test]
    fn test_metadata_masks_sensitive_paths() {
        let metadata = ReleaseMetadata::from_release(&runner_release(), &["auth.password"]).unwrap();

        assert_eq!(metadata.chart, "nginx");
        assert_eq!(metadata.version, "1.2.3");
        assert_eq!(metadata.revision, 3);
        assert!(!metadata.values.contains("hunter2"));

        let values: serde_json::Value = serde_json::from_str(&metadata.values).unwrap();
        assert_eq!(values["auth"]["password"], SENSITIVE_VALUE);
        assert_eq!(values["replicaCount"], 2);
    }

    #[test]
    fn test_state_json() {
        let release = runner_release();
        let state = ReleaseState {
            config: ReleaseConfig::new("web", "nginx"),
            status: release.status,
            metadata: ReleaseMetadata::from_release(&release, &[] as &[&str]).unwrap(),
            manifest: None,
        };

        let json = state.to_json().unwrap();
        assert!(!json.contains("\"manifest\""));
        assert_eq!(ReleaseState::from_json(&json).unwrap(), state);
    }
}
