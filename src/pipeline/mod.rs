/*!
 * Batch pipeline: ordered optional stages over independent items.
 *
 * - `stage`: the stage contract and the artifacts it passes along
 * - `registry`: declarative stage list built from options
 * - `orchestrator`: runs a batch with failure isolation and cancellation
 * - `progress`: two-level progress mapping and the single-writer sink
 * - `cancel`: cooperative cancellation flag
 * - `report`, `report_store`: terminal batch records and their persistence
 * - `command_stage`: stage backed by an external program
 * - `silence_stage`: built-in silence removal driven by the interval planner
 */

pub mod cancel;
pub mod command_stage;
pub mod orchestrator;
pub mod progress;
pub mod registry;
pub mod report;
pub mod report_store;
pub mod silence_stage;
pub mod stage;

pub use cancel::CancellationFlag;
pub use command_stage::{CommandStage, CommandTemplate};
pub use orchestrator::{BatchItem, BatchOrchestrator, OrchestratorConfig};
pub use progress::{NoProgress, ProgressSink, StageProgress, item_to_batch_percent, stage_to_item_percent};
pub use registry::{StageEntry, StageKind, StageOptions, StageRegistry, StageSetting};
pub use report::{BatchItemResult, BatchReport, ItemStatus, StageResult, StageStatus};
pub use report_store::{JsonFileReportStore, MemoryReportStore, ReportStore};
pub use silence_stage::{SilenceRemovalSettings, SilenceRemovalStage, build_concat_filter};
pub use stage::{Artifact, Stage, StageContext, StageOutcome};
