/*!
 * # vidopt - video optimization pipeline
 *
 * A Rust library for planning edits to talking-head videos and running
 * them over batches of items.
 *
 * ## Features
 *
 * - Turn detected silences into an ordered keep plan with context padding
 *   and a minimum segment length
 * - Promote a hook segment to the front of the timeline
 * - Synthesize YouTube chapter markers from a timestamped transcript
 *   (Indonesian and English cue tables)
 * - Run configurable stages over many items with failure isolation,
 *   cooperative cancellation and monotonic progress
 * - Persist batch reports as JSON or in SQLite
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `timeline`: interval types, the keep planner and hook promotion
 * - `chapters`: chapter synthesis and timestamp output
 * - `transcript`: transcript segments from SRT or JSON
 * - `pipeline`: stage contract, registry, orchestrator, progress and reports
 * - `database`: SQLite report storage
 * - `app_config`: Configuration management
 * - `app_controller`: Main application controller
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod chapters;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod pipeline;
pub mod timeline;
pub mod transcript;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use chapters::{ChapterLanguage, ChapterMarker, ChapterSynthesizer, synthesize_chapters};
pub use errors::{AppError, BatchError, ChapterError, PlanError, StageError};
pub use language_utils::normalize_to_part1;
pub use pipeline::{
    Artifact, BatchItem, BatchOrchestrator, BatchReport, CancellationFlag, ProgressSink, Stage, StageContext,
    StageOutcome, StageRegistry,
};
pub use timeline::{CutInterval, IntervalPlanner, KeepPlan, KeepSegment, TimeInterval, plan_keep_intervals, promote_segment};
pub use transcript::{Transcript, TranscriptSegment};
