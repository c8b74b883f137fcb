/*!
 * Progress reporting for batch runs.
 *
 * Stages report their own 0-100 percent. The orchestrator maps it twice:
 * stage percent to item percent over the enabled stages, then item percent
 * to a batch-wide percent over all items. Every worker sends its events
 * into one channel; a single aggregator task turns them into calls on the
 * caller's `ProgressSink`, so the sink is never called concurrently.
 */

use log::trace;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Receiver of batch-wide progress.
///
/// `item_index` is 0-based; `percent` is batch-wide in [0, 100] and never
/// decreases during a run.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, item_index: usize, total_items: usize, percent: f64, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize, f64, &str) + Send + Sync,
{
    fn on_progress(&self, item_index: usize, total_items: usize, percent: f64, message: &str) {
        self(item_index, total_items, percent, message)
    }
}

/// Sink that discards all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _item_index: usize, _total_items: usize, _percent: f64, _message: &str) {}
}

fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

/// Item-level percent for a stage's own percent: `(stage_index + stage_percent/100) / total_stages`
pub fn stage_to_item_percent(stage_index: usize, stage_percent: f64, total_stages: usize) -> f64 {
    if total_stages == 0 {
        return 100.0;
    }
    let fraction = (stage_index as f64 + clamp_percent(stage_percent) / 100.0) / total_stages as f64;
    clamp_percent(fraction * 100.0)
}

/// Batch-level percent for an item's percent: `(item_index + item_percent/100) / total_items`
pub fn item_to_batch_percent(item_index: usize, item_percent: f64, total_items: usize) -> f64 {
    if total_items == 0 {
        return 100.0;
    }
    let fraction = (item_index as f64 + clamp_percent(item_percent) / 100.0) / total_items as f64;
    clamp_percent(fraction * 100.0)
}

/// Event sent from item workers to the aggregator
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ProgressEvent {
    Stage {
        item_index: usize,
        stage_index: usize,
        percent: f64,
        message: String,
    },
    ItemFinished {
        item_index: usize,
        message: String,
    },
}

/// Progress handle given to a stage through its context
#[derive(Debug, Clone)]
pub struct StageProgress {
    sender: Option<UnboundedSender<ProgressEvent>>,
    item_index: usize,
    stage_index: usize,
}

impl StageProgress {
    pub(crate) fn new(sender: UnboundedSender<ProgressEvent>, item_index: usize, stage_index: usize) -> Self {
        Self {
            sender: Some(sender),
            item_index,
            stage_index,
        }
    }

    /// A handle that reports nowhere, for running a stage outside a batch
    pub fn detached() -> Self {
        Self {
            sender: None,
            item_index: 0,
            stage_index: 0,
        }
    }

    /// Report the stage's own percent in [0, 100]
    pub fn report(&self, percent: f64, message: &str) {
        if let Some(sender) = &self.sender {
            // The aggregator is gone only after the run is over
            let _ = sender.send(ProgressEvent::Stage {
                item_index: self.item_index,
                stage_index: self.stage_index,
                percent,
                message: message.to_string(),
            });
        }
    }
}

/// Folds worker events into one monotonic batch-wide percent.
///
/// The batch percent is the mean of per-item completion fractions, which
/// equals `item_to_batch_percent` when items run one after another.
#[derive(Debug)]
pub(crate) struct ProgressAggregator {
    total_items: usize,
    total_stages: usize,
    item_fractions: Vec<f64>,
    last_percent: f64,
}

impl ProgressAggregator {
    pub(crate) fn new(total_items: usize, total_stages: usize) -> Self {
        Self {
            total_items,
            total_stages,
            item_fractions: vec![0.0; total_items],
            last_percent: 0.0,
        }
    }

    /// Apply one event, returning `(item_index, batch_percent, message)`
    pub(crate) fn apply(&mut self, event: ProgressEvent) -> (usize, f64, String) {
        let (item_index, fraction, message) = match event {
            ProgressEvent::Stage {
                item_index,
                stage_index,
                percent,
                message,
            } => (
                item_index,
                stage_to_item_percent(stage_index, percent, self.total_stages) / 100.0,
                message,
            ),
            ProgressEvent::ItemFinished { item_index, message } => (item_index, 1.0, message),
        };

        if let Some(slot) = self.item_fractions.get_mut(item_index) {
            *slot = slot.max(fraction);
        }

        let percent = if self.total_items == 0 {
            100.0
        } else {
            self.item_fractions.iter().sum::<f64>() / self.total_items as f64 * 100.0
        };
        self.last_percent = clamp_percent(percent).max(self.last_percent);

        (item_index, self.last_percent, message)
    }

    pub(crate) fn percent(&self) -> f64 {
        self.last_percent
    }
}

/// Forward events to the sink until every sender is dropped
pub(crate) async fn drain(
    mut receiver: UnboundedReceiver<ProgressEvent>,
    mut aggregator: ProgressAggregator,
    sink: &dyn ProgressSink,
) -> f64 {
    while let Some(event) = receiver.recv().await {
        let (item_index, percent, message) = aggregator.apply(event);
        trace!("Progress {:.1}% (item {}): {}", percent, item_index, message);
        sink.on_progress(item_index, aggregator.total_items, percent, &message);
    }

    aggregator.percent()
}
