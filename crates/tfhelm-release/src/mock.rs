//! In-memory collaborators for testing
//!
//! These stand in for the Helm SDK and the cluster so release logic can be
//! tested without either.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tfhelm_core::Values;

use crate::actions::{InstallOptions, UninstallOptions, UpgradeOptions};
use crate::chart::{ChartMetadata, ChartRef, ChartSource, LoadedChart};
use crate::error::{ReleaseError, Result};
use crate::release::ReleaseStatus;
use crate::runner::{ReleaseRunner, RunnerRelease};

/// Chart source serving charts registered up front
#[derive(Default)]
pub struct MockChartSource {
    /// chart name -> versions, latest last
    charts: HashMap<String, Vec<String>>,
    load_delay: Option<Duration>,
    loads: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockChartSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chart version
    pub fn with_chart(mut self, name: &str, version: &str) -> Self {
        self.charts
            .entry(name.to_string())
            .or_default()
            .push(version.to_string());
        self
    }

    /// Make every load take at least `delay`
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Number of completed loads
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Highest number of loads that were running at once
    pub fn max_concurrent_loads(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn resolve(&self, chart: &ChartRef) -> Result<LoadedChart> {
        let versions = self
            .charts
            .get(&chart.chart)
            .ok_or_else(|| ReleaseError::Chart(format!("chart '{}' not found", chart.chart)))?;

        let version = match &chart.version {
            Some(wanted) => versions.iter().find(|v| *v == wanted),
            None => versions.last(),
        }
        .ok_or_else(|| ReleaseError::Chart(format!("no matching version for chart '{}'", chart)))?;

        Ok(LoadedChart {
            metadata: ChartMetadata {
                name: chart.chart.clone(),
                version: version.clone(),
                app_version: None,
            },
            dependencies: Vec::new(),
        })
    }
}

#[async_trait]
impl ChartSource for MockChartSource {
    async fn load(&self, chart: &ChartRef) -> Result<LoadedChart> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.resolve(chart)
    }
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub installs: usize,
    pub upgrades: usize,
    pub uninstalls: usize,
    pub gets: usize,
    pub dry_runs: usize,
}

/// Release runner keeping releases in memory
///
/// The rendered manifest is a single ConfigMap carrying the values YAML, so
/// tests can observe what reached the "cluster".
#[derive(Clone, Default)]
pub struct MockRunner {
    /// (namespace, name) -> latest release
    releases: Arc<RwLock<HashMap<(String, String), RunnerRelease>>>,
    operations: Arc<RwLock<OperationCounts>>,
    failure: Arc<RwLock<Option<String>>>,
    invalid_manifests: Arc<AtomicBool>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated releases
    pub fn with_releases(releases: Vec<RunnerRelease>) -> Self {
        let runner = Self::new();
        {
            let mut store = runner.releases.write().unwrap();
            for release in releases {
                store.insert((release.namespace.clone(), release.name.clone()), release);
            }
        }
        runner
    }

    /// Make every following install, upgrade and uninstall fail
    pub fn fail_with(&self, message: &str) {
        *self.failure.write().unwrap() = Some(message.to_string());
    }

    /// Render manifests whose documents lack `metadata.name`
    pub fn render_invalid_manifests(&self) {
        self.invalid_manifests.store(true, Ordering::SeqCst);
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Remove a release behind the manager's back
    pub fn forget(&self, namespace: &str, name: &str) {
        self.releases
            .write()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
    }

    pub fn release_count(&self) -> usize {
        self.releases.read().unwrap().len()
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.read().unwrap().as_ref() {
            Some(message) => Err(ReleaseError::Runner(message.clone())),
            None => Ok(()),
        }
    }

    fn existing(&self, namespace: &str, name: &str) -> Option<RunnerRelease> {
        self.releases
            .read()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    fn render(&self, name: &str, namespace: &str, values: &Values) -> Result<String> {
        if self.invalid_manifests.load(Ordering::SeqCst) {
            return Ok("---\napiVersion: v1\nkind: ConfigMap\n".to_string());
        }
        render_manifest(name, namespace, values)
    }

    fn store(&self, release: &RunnerRelease) {
        self.releases.write().unwrap().insert(
            (release.namespace.clone(), release.name.clone()),
            release.clone(),
        );
    }
}

/// A ConfigMap named after the release, holding its values
pub fn render_manifest(name: &str, namespace: &str, values: &Values) -> Result<String> {
    let values_yaml = values.to_yaml()?;
    let configmap = serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": format!("{}-values", name), "namespace": namespace },
        "data": { "values.yaml": values_yaml },
    });
    Ok(format!("---\n{}", serde_yaml::to_string(&configmap)?))
}

#[async_trait]
impl ReleaseRunner for MockRunner {
    async fn install(
        &self,
        chart: &LoadedChart,
        values: &Values,
        options: &InstallOptions,
    ) -> Result<RunnerRelease> {
        self.check_failure()?;

        let previous = self.existing(&options.namespace, &options.name);
        if let Some(existing) = &previous {
            let reusable = matches!(
                existing.status,
                ReleaseStatus::Failed | ReleaseStatus::Uninstalled
            );
            if !(options.replace && reusable) {
                return Err(ReleaseError::Runner(format!(
                    "cannot re-use a name that is still in use: {}",
                    options.name
                )));
            }
        }

        let now = Utc::now();
        let release = RunnerRelease {
            name: options.name.clone(),
            namespace: options.namespace.clone(),
            revision: previous.as_ref().map_or(1, |r| r.revision + 1),
            status: ReleaseStatus::Deployed,
            chart: chart.metadata.clone(),
            values: values.clone(),
            manifest: self.render(&options.name, &options.namespace, values)?,
            notes: None,
            first_deployed: now,
            last_deployed: now,
        };

        let mut ops = self.operations.write().unwrap();
        if options.dry_run {
            ops.dry_runs += 1;
        } else {
            ops.installs += 1;
            self.store(&release);
        }
        Ok(release)
    }

    async fn upgrade(
        &self,
        chart: &LoadedChart,
        values: &Values,
        options: &UpgradeOptions,
    ) -> Result<RunnerRelease> {
        self.check_failure()?;

        let existing = self
            .existing(&options.namespace, &options.name)
            .ok_or_else(|| ReleaseError::ReleaseNotFound {
                name: options.name.clone(),
                namespace: options.namespace.clone(),
            })?;

        let values = if options.reuse_values {
            let mut merged = existing.values.clone();
            merged.merge(values);
            merged
        } else {
            values.clone()
        };

        let release = RunnerRelease {
            revision: existing.revision + 1,
            status: ReleaseStatus::Deployed,
            chart: chart.metadata.clone(),
            manifest: self.render(&options.name, &options.namespace, &values)?,
            values,
            last_deployed: Utc::now(),
            ..existing
        };

        let mut ops = self.operations.write().unwrap();
        if options.dry_run {
            ops.dry_runs += 1;
        } else {
            ops.upgrades += 1;
            self.store(&release);
        }
        Ok(release)
    }

    async fn uninstall(&self, options: &UninstallOptions) -> Result<()> {
        self.check_failure()?;
        self.operations.write().unwrap().uninstalls += 1;

        self.releases
            .write()
            .unwrap()
            .remove(&(options.namespace.clone(), options.name.clone()));
        Ok(())
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<Option<RunnerRelease>> {
        self.operations.write().unwrap().gets += 1;
        Ok(self
            .existing(namespace, name)
            .filter(|r| r.status != ReleaseStatus::Uninstalled))
    }
}
