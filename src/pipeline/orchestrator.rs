/*!
 * Batch orchestrator: runs the enabled stages over every item.
 *
 * Within an item, stages run strictly in order and each consumes the
 * previous stage's artifact. Independent items run concurrently up to
 * the configured worker count. A failing stage ends its item only; the
 * batch always completes with a report.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::errors::{BatchError, StageError};

use super::cancel::CancellationFlag;
use super::progress::{self, ProgressAggregator, ProgressEvent, ProgressSink, StageProgress};
use super::registry::StageRegistry;
use super::report::{BatchItemResult, BatchReport, StageResult};
use super::report_store::ReportStore;
use super::stage::{Artifact, Stage, StageContext, StageOutcome};

/// One unit of work: a source file path or URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub id: String,
    pub source: String,
}

impl BatchItem {
    pub fn new(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
        }
    }

    /// Number sources as `item_001`, `item_002`, ...
    pub fn from_sources<I, S>(sources: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| Self::new(format!("item_{:03}", index + 1), source))
            .collect()
    }
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Items processed at the same time
    pub max_workers: usize,

    /// Parent of the per-item work directories
    pub work_root: PathBuf,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_workers: 1,
            work_root: PathBuf::from("output"),
        }
    }
}

impl OrchestratorConfig {
    pub fn new<P: Into<PathBuf>>(work_root: P) -> Self {
        Self {
            work_root: work_root.into(),
            ..Default::default()
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }
}

/// Drives a stage registry over batches of items
pub struct BatchOrchestrator {
    config: OrchestratorConfig,
    report_store: Option<Arc<dyn ReportStore>>,
}

impl BatchOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            report_store: None,
        }
    }

    /// Persist every finished report to `store`
    pub fn with_report_store(mut self, store: Arc<dyn ReportStore>) -> Self {
        self.report_store = Some(store);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run all items through the enabled stages.
    ///
    /// Errors only for setup problems detected before any item starts.
    /// Stage failures are captured in the item's result; cancellation
    /// marks the items that did not start as cancelled.
    pub async fn run_batch(
        &self,
        items: Vec<BatchItem>,
        registry: &StageRegistry,
        sink: &dyn ProgressSink,
        cancel: &CancellationFlag,
    ) -> Result<BatchReport, BatchError> {
        if self.config.max_workers == 0 {
            return Err(BatchError::InvalidWorkerCount(0));
        }

        let stages = registry.enabled_stages();
        if stages.is_empty() {
            return Err(BatchError::EmptyStageList);
        }

        setup_stages(&stages).await?;

        let total_items = items.len();
        info!(
            "Starting batch of {} items with stages [{}] ({} worker(s))",
            total_items,
            registry.enabled_names().join(", "),
            self.config.max_workers
        );
        let start_time = Instant::now();

        let (sender, receiver) = mpsc::unbounded_channel();
        let aggregator = ProgressAggregator::new(total_items, stages.len());

        // The sender moves into the processing future so the drain ends with it
        let stage_list = &stages;
        let processing = async move {
            stream::iter(items.into_iter().enumerate())
                .map(|(index, item)| self.process_item(index, item, stage_list, sender.clone(), cancel))
                .buffer_unordered(self.config.max_workers)
                .collect::<Vec<_>>()
                .await
        };
        let draining = progress::drain(receiver, aggregator, sink);

        let (results, final_percent) = tokio::join!(processing, draining);
        debug!("Progress finished at {:.1}%", final_percent);

        teardown_stages(&stages).await;

        let report = BatchReport::from_results(results);
        info!(
            "Batch {} finished in {:.1}s: {}",
            report.batch_id,
            start_time.elapsed().as_secs_f64(),
            report.summary()
        );
        if report.was_cancelled() {
            warn!("Batch was cancelled, {} item(s) not started", report.cancelled);
        }

        self.persist(&report).await;

        Ok(report)
    }

    async fn persist(&self, report: &BatchReport) {
        let Some(store) = &self.report_store else {
            return;
        };

        match store.save(report).await {
            Ok(()) => info!("Batch report {} saved", report.batch_id),
            Err(e) => error!("Failed to save batch report {}: {:#}", report.batch_id, e),
        }
    }

    /// Run the stage sequence for one item
    async fn process_item(
        &self,
        index: usize,
        item: BatchItem,
        stages: &[Arc<dyn Stage>],
        sender: UnboundedSender<ProgressEvent>,
        cancel: &CancellationFlag,
    ) -> BatchItemResult {
        if cancel.is_cancelled() {
            debug!("Cancellation requested, not starting {}", item.id);
            let _ = sender.send(ProgressEvent::ItemFinished {
                item_index: index,
                message: format!("{}: cancelled", item.id),
            });
            return BatchItemResult::cancelled(item.id, index, item.source);
        }

        info!("Processing {} ({})", item.id, item.source);
        let work_dir = self.config.work_root.join(&item.id);
        let mut artifact = Artifact::new(item.source.clone());
        let mut per_stage = Vec::with_capacity(stages.len());

        for (stage_index, stage) in stages.iter().enumerate() {
            let name = stage.name().to_string();
            let ctx = StageContext::new(
                item.id.clone(),
                index,
                work_dir.clone(),
                StageProgress::new(sender.clone(), index, stage_index),
            );

            ctx.report(0.0, &format!("{}: {}", item.id, name));
            debug!("{}: running stage '{}' on {}", item.id, name, artifact);

            match stage.execute(artifact.clone(), &ctx).await {
                Ok(StageOutcome::Produced(next)) => {
                    per_stage.push(StageResult::ok(&name, Some(next.location.clone())));
                    artifact = next;
                }
                Ok(StageOutcome::SideOutput { output_ref }) => {
                    per_stage.push(StageResult::ok(&name, Some(output_ref)));
                }
                Ok(StageOutcome::Skipped { reason }) => {
                    debug!("{}: stage '{}' skipped: {}", item.id, name, reason);
                    per_stage.push(StageResult::skipped(&name, reason));
                }
                Err(e) => {
                    let stage_error = match e.downcast_ref::<StageError>() {
                        Some(stage_error) => stage_error.clone(),
                        None => StageError::execution(&name, &e),
                    };
                    error!("{}: {}", item.id, stage_error);

                    per_stage.push(StageResult::failed(&name, format!("{:#}", e)));
                    let _ = sender.send(ProgressEvent::ItemFinished {
                        item_index: index,
                        message: format!("{}: failed at {}", item.id, name),
                    });
                    return BatchItemResult::error(item.id, index, item.source, per_stage, stage_error.to_string());
                }
            }

            ctx.report(100.0, &format!("{}: {} done", item.id, name));
        }

        info!("{} completed: {}", item.id, artifact);
        let _ = sender.send(ProgressEvent::ItemFinished {
            item_index: index,
            message: format!("{}: done", item.id),
        });

        BatchItemResult::success(item.id, index, item.source, per_stage, artifact.location)
    }
}

/// Call every stage's setup hook; on failure release the ones already set up
async fn setup_stages(stages: &[Arc<dyn Stage>]) -> Result<(), BatchError> {
    for (position, stage) in stages.iter().enumerate() {
        if let Err(e) = stage.setup().await {
            teardown_stages(&stages[..position]).await;
            return Err(BatchError::Setup(StageError::Setup {
                stage: stage.name().to_string(),
                message: format!("{:#}", e),
            }));
        }
    }
    Ok(())
}

/// Call every stage's teardown hook, in reverse order; failures are logged
async fn teardown_stages(stages: &[Arc<dyn Stage>]) {
    for stage in stages.iter().rev() {
        if let Err(e) = stage.teardown().await {
            warn!("Teardown of stage '{}' failed: {:#}", stage.name(), e);
        }
    }
}
