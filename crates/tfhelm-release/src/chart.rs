//! Chart loading
//!
//! Fetching, unpacking and dependency resolution belong to the Helm SDK. This
//! module only defines what the rest of the crate needs from it, plus the lock
//! that serializes loads for SDKs that are not safe to call concurrently.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;

/// Where a chart comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartRef {
    /// Chart name, local path or URL
    pub chart: String,

    /// Repository URL
    pub repository: Option<String>,

    /// Version constraint (latest when unset)
    pub version: Option<String>,
}

impl std::fmt::Display for ChartRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(repo) = &self.repository {
            write!(f, "{}/", repo.trim_end_matches('/'))?;
        }
        write!(f, "{}", self.chart)?;
        if let Some(version) = &self.version {
            write!(f, "@{}", version)?;
        }
        Ok(())
    }
}

/// Chart metadata at load time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub app_version: Option<String>,
}

/// A chart ready to be installed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedChart {
    pub metadata: ChartMetadata,

    /// Names of the chart's dependencies
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Loads charts for install and upgrade
#[async_trait]
pub trait ChartSource: Send + Sync {
    /// Resolve and load a chart
    async fn load(&self, chart: &ChartRef) -> Result<LoadedChart>;
}

/// Serializes every load through one lock owned by this value
pub struct SerializedChartSource<C> {
    inner: C,
    lock: Mutex<()>,
}

impl<C: ChartSource> SerializedChartSource<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            lock: Mutex::new(()),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: ChartSource> ChartSource for SerializedChartSource<C> {
    async fn load(&self, chart: &ChartRef) -> Result<LoadedChart> {
        let _guard = self.lock.lock().await;
        tracing::debug!(chart = %chart, "loading chart");
        self.inner.load(chart).await
    }
}
