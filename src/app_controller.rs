use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;

use crate::app_config::Config;
use crate::chapters::{ChapterMarker, save_chapters};
use crate::database::ReportRepository;
use crate::errors::ChapterError;
use crate::file_utils::{FileManager, FileType};
use crate::pipeline::{
    BatchItem, BatchOrchestrator, BatchReport, CancellationFlag, CommandStage, JsonFileReportStore, ProgressSink,
    ReportStore, SilenceRemovalStage, Stage, StageKind, StageRegistry, StageSetting,
};
use crate::timeline::{CutInterval, IntervalPlanner, KeepPlan, parse_silencedetect, promote_range, promote_segment};
use crate::transcript::Transcript;

// @module: Application controller wiring configuration to the core operations

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read cuts from a JSON array of `{start, end}` or from silence detector output
    pub fn load_cuts<P: AsRef<Path>>(path: P) -> Result<Vec<CutInterval>> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content).with_context(|| format!("Failed to parse cuts JSON: {:?}", path))
        } else {
            Ok(parse_silencedetect(&content))
        }
    }

    /// Plan keep intervals for the cuts in `cuts_path`
    pub fn plan<P: AsRef<Path>>(&self, cuts_path: P, total_duration: f64) -> Result<KeepPlan> {
        let cuts = Self::load_cuts(&cuts_path)?;
        let planner = IntervalPlanner::new(self.config.planner.planner_config());
        let plan = planner.plan(&cuts, total_duration)?;

        info!(
            "Kept {} segments, {:.2}s of {:.2}s ({:.2}s removed)",
            plan.len(),
            plan.output_duration(),
            total_duration,
            plan.removed_duration()
        );
        if plan.is_empty() {
            warn!("Every part of the timeline was cut");
        }

        Ok(plan)
    }

    /// Promote a hook, over a planned timeline when `base` is given.
    ///
    /// Without a base plan the source duration is required.
    pub fn hook(&self, base: Option<&KeepPlan>, total_duration: Option<f64>, start: f64, end: f64) -> Result<KeepPlan> {
        let plan = match (base, total_duration) {
            (Some(plan), _) => promote_segment(plan, start, end)?,
            (None, Some(total_duration)) => promote_range(total_duration, start, end)?,
            (None, None) => return Err(anyhow!("A source duration is required without a keep plan")),
        };
        Ok(plan)
    }

    /// Synthesize chapters for a transcript file, optionally saving them
    pub fn chapters<P: AsRef<Path>>(&self, transcript_path: P, output: Option<&Path>) -> Result<Vec<ChapterMarker>> {
        let transcript = Transcript::load(&transcript_path)?;
        if transcript.segments.is_empty() {
            warn!("{}", ChapterError::EmptyInput);
        }

        let settings = &self.config.chapters;
        let markers = settings.synthesizer().synthesize(
            &transcript.segments,
            settings.min_spacing_secs,
            settings.max_chapters,
        );
        info!("Generated {} chapters", markers.len());

        if let Some(output) = output {
            save_chapters(&markers, output)?;
            info!("Chapters saved to {:?}", output);
        }

        Ok(markers)
    }

    /// Batch items from a directory of media files or a list file
    pub fn load_batch_items<P: AsRef<Path>>(input: P) -> Result<Vec<BatchItem>> {
        let input = input.as_ref();

        let sources: Vec<String> = match FileManager::detect_file_type(input)? {
            FileType::Directory => FileManager::find_media_files(input)?
                .into_iter()
                .map(|path| path.to_string_lossy().to_string())
                .collect(),
            FileType::Video => vec![input.to_string_lossy().to_string()],
            _ => FileManager::read_item_list(input)?,
        };

        if sources.is_empty() {
            return Err(anyhow!("No batch items found in {:?}", input));
        }

        Ok(BatchItem::from_sources(sources))
    }

    /// Stage for one enabled kind: its command template, or the built-in silence removal
    fn create_stage(&self, kind: StageKind, setting: &StageSetting) -> Result<Arc<dyn Stage>> {
        let timeout = self.config.batch.stage_timeout();

        if let Some(template) = self.config.command_for(kind) {
            let mut template = template.clone();
            template.side_output |= kind.is_side_output();
            let stage = CommandStage::new(kind.name(), template)
                .with_option(setting.option.clone())
                .with_timeout(timeout);
            return Ok(Arc::new(stage));
        }

        match kind {
            StageKind::RemoveSilence => Ok(Arc::new(
                SilenceRemovalStage::new(
                    self.config.planner.silence_settings(),
                    self.config.planner.planner_config(),
                )
                .with_timeout(timeout),
            )),
            _ => Err(anyhow!("Stage '{}' is enabled but has no command template", kind)),
        }
    }

    /// Registry for the configured stages
    pub fn build_registry(&self) -> Result<StageRegistry> {
        let registry = StageRegistry::from_options(&self.config.stages, |kind, setting| {
            self.create_stage(kind, setting)
        })?;
        debug!("Enabled stages: {}", registry.enabled_names().join(", "));
        Ok(registry)
    }

    /// Report store for the configured persistence
    pub fn report_store(&self) -> Result<Arc<dyn ReportStore>> {
        let batch = &self.config.batch;
        match &batch.database_path {
            Some(path) => {
                let repository = ReportRepository::new(crate::database::DatabaseConnection::new(path)?);
                Ok(Arc::new(repository))
            }
            None => Ok(Arc::new(JsonFileReportStore::in_dir(&batch.output_dir, &batch.report_file_name))),
        }
    }

    /// Run all configured stages over the items found at `input`
    pub async fn run_batch<P: AsRef<Path>>(&self, input: P, cancel: &CancellationFlag) -> Result<BatchReport> {
        let start_time = std::time::Instant::now();

        let items = Self::load_batch_items(&input)?;
        let registry = self.build_registry()?;
        let orchestrator =
            BatchOrchestrator::new(self.config.batch.orchestrator_config()).with_report_store(self.report_store()?);

        info!(
            "Processing {} items through {} stages with {} worker(s)",
            items.len(),
            registry.enabled_names().len(),
            self.config.batch.max_workers
        );

        let multi_progress = MultiProgress::new();
        let sink = ProgressBarSink::new(&multi_progress, items.len());

        let report = orchestrator.run_batch(items, &registry, &sink, cancel).await?;
        sink.finish(&report);

        info!("{} in {:.1}s", report.summary(), start_time.elapsed().as_secs_f64());
        for item in report.items.iter().filter(|item| item.error.is_some()) {
            warn!(
                "{} ({}): {}",
                item.item_id,
                item.source,
                item.error.as_deref().unwrap_or_default()
            );
        }

        Ok(report)
    }
}

/// Drives one overall bar from batch progress
struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    fn new(multi_progress: &MultiProgress, total_items: usize) -> Self {
        let bar = multi_progress.add(ProgressBar::new(100));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}% {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        bar.set_message(format!("0/{} items", total_items));
        Self { bar }
    }

    fn finish(&self, report: &BatchReport) {
        self.bar.finish_with_message(report.summary());
    }
}

impl ProgressSink for ProgressBarSink {
    fn on_progress(&self, item_index: usize, total_items: usize, percent: f64, message: &str) {
        self.bar.set_position(percent.round() as u64);
        self.bar
            .set_message(format!("[{}/{}] {}", item_index + 1, total_items, message));
    }
}
