/*!
 * Durable storage for batch reports.
 *
 * The orchestrator hands every finished report to a `ReportStore`. Stores
 * provided here write a JSON file or keep reports in memory; the SQLite
 * store lives in `crate::database`.
 */

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

use super::report::BatchReport;
use crate::file_utils::FileManager;

/// Persistence contract for terminal batch reports
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist a finished report
    async fn save(&self, report: &BatchReport) -> Result<()>;

    /// Load a report by batch id
    async fn load(&self, batch_id: &str) -> Result<Option<BatchReport>>;
}

/// Writes the report as pretty JSON to a single file, replacing it atomically
#[derive(Debug, Clone)]
pub struct JsonFileReportStore {
    path: PathBuf,
}

impl JsonFileReportStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store writing `<dir>/<file_name>`
    pub fn in_dir<P: AsRef<Path>>(dir: P, file_name: &str) -> Self {
        Self::new(dir.as_ref().join(file_name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read whatever report the file currently holds
    pub fn read(&self) -> Result<BatchReport> {
        let content = FileManager::read_to_string(&self.path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse batch report: {:?}", self.path))
    }
}

#[async_trait]
impl ReportStore for JsonFileReportStore {
    async fn save(&self, report: &BatchReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report).context("Failed to serialize batch report")?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || FileManager::write_atomic(&path, &json))
            .await
            .context("Report writer task panicked")??;

        debug!("Batch report {} written to {:?}", report.batch_id, self.path);
        Ok(())
    }

    async fn load(&self, batch_id: &str) -> Result<Option<BatchReport>> {
        if !FileManager::file_exists(&self.path) {
            return Ok(None);
        }

        let report = self.read()?;
        Ok((report.batch_id == batch_id).then_some(report))
    }
}

/// Keeps reports in memory, for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: RwLock<Vec<BatchReport>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports saved so far, oldest first
    pub fn reports(&self) -> Vec<BatchReport> {
        self.reports.read().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.read().is_empty()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn save(&self, report: &BatchReport) -> Result<()> {
        self.reports.write().push(report.clone());
        Ok(())
    }

    async fn load(&self, batch_id: &str) -> Result<Option<BatchReport>> {
        Ok(self
            .reports
            .read()
            .iter()
            .find(|report| report.batch_id == batch_id)
            .cloned())
    }
}
