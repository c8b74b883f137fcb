/*!
 * Per-stage, per-item and per-batch results of a run.
 *
 * A `BatchReport` is the terminal record of a batch; it is assembled once
 * all items reached a final state and is not modified afterwards.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Outcome of one stage for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Ok,
    Skipped,
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Ok => "ok",
            StageStatus::Skipped => "skipped",
            StageStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ok" => Some(StageStatus::Ok),
            "skipped" => Some(StageStatus::Skipped),
            "failed" => Some(StageStatus::Failed),
            _ => None,
        }
    }
}

/// Terminal state of a batch item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Error,
    Cancelled,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Success => "success",
            ItemStatus::Error => "error",
            ItemStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(ItemStatus::Success),
            "error" => Some(ItemStatus::Error),
            "cancelled" => Some(ItemStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one stage on one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage_name: String,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_ref: Option<String>,
}

impl StageResult {
    pub fn ok(stage_name: impl Into<String>, output_ref: Option<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            status: StageStatus::Ok,
            error: None,
            output_ref,
        }
    }

    /// Skipped by the stage itself; the reason is kept in `error`
    pub fn skipped(stage_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            status: StageStatus::Skipped,
            error: Some(reason.into()),
            output_ref: None,
        }
    }

    pub fn failed(stage_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            stage_name: stage_name.into(),
            status: StageStatus::Failed,
            error: Some(error.into()),
            output_ref: None,
        }
    }
}

/// Result of the whole stage sequence for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub item_id: String,
    /// 0-based position in the submitted batch
    pub index: usize,
    pub source: String,
    pub overall_status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub per_stage: Vec<StageResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<String>,
}

impl BatchItemResult {
    pub fn success(
        item_id: impl Into<String>,
        index: usize,
        source: impl Into<String>,
        per_stage: Vec<StageResult>,
        final_output: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            index,
            source: source.into(),
            overall_status: ItemStatus::Success,
            error: None,
            per_stage,
            final_output: Some(final_output.into()),
        }
    }

    pub fn error(
        item_id: impl Into<String>,
        index: usize,
        source: impl Into<String>,
        per_stage: Vec<StageResult>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            index,
            source: source.into(),
            overall_status: ItemStatus::Error,
            error: Some(error.into()),
            per_stage,
            final_output: None,
        }
    }

    /// An item that never started because cancellation was requested
    pub fn cancelled(item_id: impl Into<String>, index: usize, source: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            index,
            source: source.into(),
            overall_status: ItemStatus::Cancelled,
            error: None,
            per_stage: Vec::new(),
            final_output: None,
        }
    }

    /// The stage result that failed the item, if any
    pub fn failed_stage(&self) -> Option<&StageResult> {
        self.per_stage
            .iter()
            .find(|result| result.status == StageStatus::Failed)
    }
}

/// Terminal record of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub timestamp: DateTime<Utc>,
    pub total_items: usize,
    pub successful: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub items: Vec<BatchItemResult>,
}

impl BatchReport {
    /// Assemble a report, ordering items by batch index and counting statuses
    pub fn from_results(mut items: Vec<BatchItemResult>) -> Self {
        items.sort_by_key(|item| item.index);

        let count = |status: ItemStatus| {
            items
                .iter()
                .filter(|item| item.overall_status == status)
                .count()
        };
        let (successful, failed, cancelled) = (
            count(ItemStatus::Success),
            count(ItemStatus::Error),
            count(ItemStatus::Cancelled),
        );

        Self {
            batch_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            total_items: items.len(),
            successful,
            failed,
            cancelled,
            items,
        }
    }

    /// Whether cancellation kept at least one item from starting
    pub fn was_cancelled(&self) -> bool {
        self.cancelled > 0
    }

    pub fn item(&self, item_id: &str) -> Option<&BatchItemResult> {
        self.items.iter().find(|item| item.item_id == item_id)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} items: {} successful, {} failed, {} cancelled",
            self.total_items, self.successful, self.failed, self.cancelled
        )
    }
}
