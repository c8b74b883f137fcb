/*!
 * The contract between the orchestrator and a transformation stage.
 */

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::progress::StageProgress;

/// The thing a stage consumes and produces: a file path or a source URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub location: String,
}

impl Artifact {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self::new(path.as_ref().to_string_lossy())
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.location)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.location)
    }
}

/// What a successful stage run yielded
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// A new primary artifact, input of the next stage
    Produced(Artifact),

    /// A by-product (thumbnail, metadata); the input passes through unchanged
    SideOutput { output_ref: String },

    /// Nothing to do for this item; the input passes through unchanged
    Skipped { reason: String },
}

/// Per-item context handed to every stage
#[derive(Debug, Clone)]
pub struct StageContext {
    /// Batch item identifier
    pub item_id: String,

    /// 0-based index of the item in the batch
    pub item_index: usize,

    /// Scratch/output directory reserved for this item
    pub work_dir: PathBuf,

    progress: StageProgress,
}

impl StageContext {
    pub fn new(item_id: impl Into<String>, item_index: usize, work_dir: PathBuf, progress: StageProgress) -> Self {
        Self {
            item_id: item_id.into(),
            item_index,
            work_dir,
            progress,
        }
    }

    /// Context whose progress goes nowhere, for running a stage on its own
    pub fn detached(item_id: impl Into<String>, work_dir: PathBuf) -> Self {
        Self::new(item_id, 0, work_dir, StageProgress::detached())
    }

    /// Report this stage's own progress in [0, 100]
    pub fn report(&self, percent: f64, message: &str) {
        self.progress.report(percent, message);
    }
}

/// One named transformation step of the per-item pipeline.
///
/// `execute` is called at most once per item per run, with the previous
/// stage's artifact as input. `setup` and `teardown` bracket the whole
/// run and are where heavy shared resources are acquired and released.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stable stage name used in results and logs
    fn name(&self) -> &str;

    /// Acquire resources before the first item; a failure aborts the batch
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    /// Transform one item's artifact
    async fn execute(&self, input: Artifact, ctx: &StageContext) -> Result<StageOutcome>;

    /// Release resources after the last item, also after cancellation
    async fn teardown(&self) -> Result<()> {
        Ok(())
    }
}
