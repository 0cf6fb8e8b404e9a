//! Release lifecycle: plan, create, read, update, delete
//!
//! Values are always merged before any chart load or runner call, so a bad
//! override aborts the operation with nothing applied.

use serde::{Deserialize, Serialize};
use tfhelm_core::{Values, log_values, redact, redact_text};

use crate::actions::{InstallOptions, UninstallOptions, UpgradeOptions};
use crate::chart::{ChartMetadata, ChartSource};
use crate::config::{ProviderSettings, ReleaseConfig};
use crate::diff::{DiffEngine, DiffResult};
use crate::error::{ReleaseError, Result};
use crate::manifest::{parse_resources, redact_manifest};
use crate::release::{ReleaseMetadata, ReleaseState};
use crate::runner::{ReleaseRunner, RunnerRelease};

/// What applying a configuration would do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Create,
    Update,
    NoOp,
}

impl std::fmt::Display for PlanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanAction::Create => write!(f, "create"),
            PlanAction::Update => write!(f, "update"),
            PlanAction::NoOp => write!(f, "no-op"),
        }
    }
}

/// Outcome of planning a configuration against prior state
#[derive(Debug, Clone)]
pub struct ReleasePlan {
    pub action: PlanAction,

    /// Chart that would be installed
    pub chart: ChartMetadata,

    /// Merged values with sensitive paths masked
    pub values: Values,

    /// Redacted manifest of a dry run (manifest experiment only)
    pub manifest: Option<String>,

    /// Manifest changes against prior state (manifest experiment only)
    pub diff: Option<DiffResult>,
}

/// Drives releases through a chart source and a runner
pub struct ReleaseManager<C, R> {
    charts: C,
    runner: R,
    settings: ProviderSettings,
    diff_engine: DiffEngine,
}

impl<C: ChartSource, R: ReleaseRunner> ReleaseManager<C, R> {
    pub fn new(charts: C, runner: R, settings: ProviderSettings) -> Self {
        Self {
            charts,
            runner,
            settings,
            diff_engine: DiffEngine::new(),
        }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn charts(&self) -> &C {
        &self.charts
    }

    /// Work out what applying `config` over `prior` would do
    pub async fn plan(&self, config: &ReleaseConfig, prior: Option<&ReleaseState>) -> Result<ReleasePlan> {
        let values = self.merged_values(config)?;
        let chart = self.charts.load(&config.chart_ref()).await?;
        let redacted = redact(&values, &config.sources.sensitive_paths());

        let mut action = match prior {
            None => PlanAction::Create,
            Some(prior) if needs_update(config, prior, &chart.metadata, &redacted)? => PlanAction::Update,
            Some(_) => PlanAction::NoOp,
        };

        let (manifest, diff) = if self.settings.experiments.manifest {
            let rendered = match action {
                PlanAction::Create => {
                    let options = InstallOptions::from_config(config, &self.settings).dry_run();
                    self.runner.install(&chart, &values, &options).await?
                }
                PlanAction::Update | PlanAction::NoOp => {
                    let options = UpgradeOptions::from_config(config, &self.settings).dry_run();
                    self.runner.upgrade(&chart, &values, &options).await?
                }
            };
            let manifest = redact_manifest(&rendered.manifest, &config.sources.sensitive_values())?;
            let old = prior.and_then(|p| p.manifest.as_deref()).unwrap_or_default();
            let diff = self.diff_engine.diff_stored(old, &manifest)?;

            if action == PlanAction::NoOp && diff.has_changes() {
                action = PlanAction::Update;
            }
            (Some(manifest), Some(diff))
        } else {
            (None, None)
        };

        tracing::info!(
            release = %config.name,
            namespace = %config.namespace(&self.settings),
            action = %action,
            "planned release"
        );

        Ok(ReleasePlan {
            action,
            chart: chart.metadata,
            values: redacted,
            manifest,
            diff,
        })
    }

    /// Install a new release
    pub async fn create(&self, config: &ReleaseConfig) -> Result<ReleaseState> {
        let values = self.merged_values(config)?;
        let namespace = config.namespace(&self.settings);

        if !config.replace && self.runner.get(namespace, &config.name).await?.is_some() {
            return Err(ReleaseError::ReleaseAlreadyExists {
                name: config.name.clone(),
                namespace: namespace.to_string(),
            });
        }

        let chart = self.charts.load(&config.chart_ref()).await?;
        let options = InstallOptions::from_config(config, &self.settings);
        if config.lint {
            let rendered = self.runner.install(&chart, &values, &options.clone().dry_run()).await?;
            lint_manifest(config, &rendered)?;
        }
        let release = self.runner.install(&chart, &values, &options).await?;

        tracing::info!(
            release = %release.name,
            namespace = %release.namespace,
            revision = release.revision,
            "installed release"
        );
        self.state_for(config, &release)
    }

    /// Refresh state from the cluster; `None` when the release is gone
    pub async fn read(&self, state: &ReleaseState) -> Result<Option<ReleaseState>> {
        let config = &state.config;
        let namespace = config.namespace(&self.settings);

        match self.runner.get(namespace, &config.name).await? {
            Some(release) => self.state_for(config, &release).map(Some),
            None => {
                tracing::warn!(
                    release = %config.name,
                    namespace = %namespace,
                    "release not found, removing from state"
                );
                Ok(None)
            }
        }
    }

    /// Upgrade an existing release to `config`
    pub async fn update(&self, config: &ReleaseConfig) -> Result<ReleaseState> {
        let values = self.merged_values(config)?;
        let namespace = config.namespace(&self.settings);

        if self.runner.get(namespace, &config.name).await?.is_none() {
            return Err(ReleaseError::ReleaseNotFound {
                name: config.name.clone(),
                namespace: namespace.to_string(),
            });
        }

        let chart = self.charts.load(&config.chart_ref()).await?;
        let options = UpgradeOptions::from_config(config, &self.settings);
        if config.lint {
            let rendered = self.runner.upgrade(&chart, &values, &options.clone().dry_run()).await?;
            lint_manifest(config, &rendered)?;
        }
        let release = self.runner.upgrade(&chart, &values, &options).await?;

        tracing::info!(
            release = %release.name,
            namespace = %release.namespace,
            revision = release.revision,
            "upgraded release"
        );
        self.state_for(config, &release)
    }

    /// Uninstall a release; a release that is already gone is not an error
    pub async fn delete(&self, config: &ReleaseConfig) -> Result<()> {
        let namespace = config.namespace(&self.settings);

        if self.runner.get(namespace, &config.name).await?.is_none() {
            tracing::warn!(release = %config.name, namespace = %namespace, "release already gone");
            return Ok(());
        }

        let options = UninstallOptions::from_config(config, &self.settings);
        self.runner.uninstall(&options).await?;
        tracing::info!(release = %config.name, namespace = %namespace, "uninstalled release");
        Ok(())
    }

    fn merged_values(&self, config: &ReleaseConfig) -> Result<Values> {
        config.validate()?;
        let values = config.sources.merge()?;
        log_values(&values, &config.sources.sensitive_paths());
        Ok(values)
    }

    fn state_for(&self, config: &ReleaseConfig, release: &RunnerRelease) -> Result<ReleaseState> {
        let sources = &config.sources;
        let metadata = ReleaseMetadata::from_release(release, &sources.sensitive_paths())?;
        let manifest = if self.settings.experiments.manifest {
            Some(redact_manifest(&release.manifest, &sources.sensitive_values())?)
        } else {
            None
        };

        Ok(ReleaseState {
            config: config.persisted(),
            status: release.status,
            metadata,
            manifest,
        })
    }
}

/// Every rendered document must be a resource with apiVersion, kind and name
fn lint_manifest(config: &ReleaseConfig, rendered: &RunnerRelease) -> Result<()> {
    let resources = parse_resources(&rendered.manifest).map_err(|e| match e {
        ReleaseError::InvalidManifest(message) => ReleaseError::InvalidManifest(redact_text(
            &message,
            &config.sources.sensitive_values(),
        )),
        other => other,
    })?;
    tracing::debug!(release = %config.name, resources = resources.len(), "lint passed");
    Ok(())
}

fn needs_update(
    config: &ReleaseConfig,
    prior: &ReleaseState,
    chart: &ChartMetadata,
    redacted: &Values,
) -> Result<bool> {
    if config.persisted() != prior.config {
        return Ok(true);
    }
    if chart.version != prior.metadata.version {
        return Ok(true);
    }
    // Reused values come from the cluster and never match the configured tree
    if !config.reuse_values {
        let recorded = Values::from_json(&prior.metadata.values)?;
        if &recorded != redacted {
            return Ok(true);
        }
    }
    Ok(false)
}
