/*!
 * Built-in silence removal stage.
 *
 * Runs the silence detector over the item, plans the keep intervals and
 * re-encodes only the kept spans, concatenated in playback order.
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use crate::file_utils::FileManager;
use crate::timeline::{IntervalPlanner, KeepPlan, PlannerConfig, parse_media_duration, parse_silencedetect};

use super::command_stage::{filter_stderr, run_program};
use super::stage::{Artifact, Stage, StageContext, StageOutcome};

/// Detector and encoder settings for silence removal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SilenceRemovalSettings {
    /// Encoder executable
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    /// Detector noise floor, e.g. `-30dB`
    #[serde(default = "default_noise_threshold")]
    pub noise_threshold: String,

    /// Shortest silence the detector reports, in seconds
    #[serde(default = "default_min_silence")]
    pub min_silence_secs: f64,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_noise_threshold() -> String {
    "-30dB".to_string()
}

fn default_min_silence() -> f64 {
    2.0
}

impl Default for SilenceRemovalSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            noise_threshold: default_noise_threshold(),
            min_silence_secs: default_min_silence(),
        }
    }
}

/// Removes silent stretches using the interval planner
#[derive(Debug, Clone)]
pub struct SilenceRemovalStage {
    settings: SilenceRemovalSettings,
    planner: IntervalPlanner,
    timeout: Option<Duration>,
}

impl SilenceRemovalStage {
    pub fn new(settings: SilenceRemovalSettings, planner: PlannerConfig) -> Self {
        Self {
            settings,
            planner: IntervalPlanner::new(planner),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the detector; returns its log
    async fn detect(&self, input: &str) -> Result<String> {
        let args = vec![
            "-hide_banner".to_string(),
            "-i".to_string(),
            input.to_string(),
            "-af".to_string(),
            format!(
                "silencedetect=noise={}:d={}",
                self.settings.noise_threshold, self.settings.min_silence_secs
            ),
            "-f".to_string(),
            "null".to_string(),
            "-".to_string(),
        ];

        let result = run_program(self.name(), &self.settings.ffmpeg, &args, self.timeout).await?;
        let log = String::from_utf8_lossy(&result.stderr).to_string();
        if !result.status.success() {
            return Err(anyhow!(
                "Silence detection exited with {}: {}",
                result.status,
                filter_stderr(&log)
            ));
        }

        Ok(log)
    }

    async fn encode(&self, input: &str, output: &str, plan: &KeepPlan) -> Result<()> {
        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.to_string(),
            "-filter_complex".to_string(),
            build_concat_filter(plan),
            "-map".to_string(),
            "[outv]".to_string(),
            "-map".to_string(),
            "[outa]".to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-crf".to_string(),
            "18".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-b:a".to_string(),
            "192k".to_string(),
            output.to_string(),
        ];

        let result = run_program(self.name(), &self.settings.ffmpeg, &args, self.timeout).await?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(anyhow!(
                "Silence removal encode exited with {}: {}",
                result.status,
                filter_stderr(&stderr)
            ));
        }

        Ok(())
    }
}

#[async_trait]
impl Stage for SilenceRemovalStage {
    fn name(&self) -> &str {
        "remove_silence"
    }

    async fn execute(&self, input: Artifact, ctx: &StageContext) -> Result<StageOutcome> {
        FileManager::ensure_dir(&ctx.work_dir)?;

        ctx.report(0.0, &format!("{}: detecting silence", ctx.item_id));
        let log = self.detect(&input.location).await?;

        let duration = parse_media_duration(&log)
            .ok_or_else(|| anyhow!("Could not read the duration of {}", input))?;
        let cuts = parse_silencedetect(&log);
        if cuts.is_empty() {
            debug!("{}: no silence found", ctx.item_id);
            return Ok(StageOutcome::Skipped {
                reason: "no silence detected".to_string(),
            });
        }

        let plan = self.planner.plan(&cuts, duration)?;
        if plan.is_empty() {
            warn!("{}: every second of {} is silent", ctx.item_id, input);
            return Ok(StageOutcome::Skipped {
                reason: "nothing would remain after removing silence".to_string(),
            });
        }
        if plan.removed.is_empty() {
            return Ok(StageOutcome::Skipped {
                reason: "silences too short to remove".to_string(),
            });
        }

        info!(
            "{}: removing {:.1}s of silence in {} cuts",
            ctx.item_id,
            plan.removed_duration(),
            plan.removed.len()
        );
        ctx.report(40.0, &format!("{}: re-encoding {} segments", ctx.item_id, plan.len()));

        let output_path = FileManager::generate_output_path(input.path(), &ctx.work_dir, "no_silence", None);
        let output = output_path.to_string_lossy().to_string();
        self.encode(&input.location, &output, &plan).await?;

        if !Path::new(&output).exists() {
            return Err(anyhow!("Silence removal did not produce {}", output));
        }

        ctx.report(100.0, &format!("{}: silence removed", ctx.item_id));
        Ok(StageOutcome::Produced(Artifact::new(output)))
    }
}

/// Filter graph trimming every kept span and concatenating them in order
pub fn build_concat_filter(plan: &KeepPlan) -> String {
    let mut graph = String::new();
    let mut pads = String::new();

    for (i, segment) in plan.segments.iter().enumerate() {
        let source = segment.source_interval();
        let _ = write!(
            graph,
            "[0:v]trim=start={start:.3}:end={end:.3},setpts=PTS-STARTPTS[v{i}];\
             [0:a]atrim=start={start:.3}:end={end:.3},asetpts=PTS-STARTPTS[a{i}];",
            start = source.start,
            end = source.end,
        );
        let _ = write!(pads, "[v{i}][a{i}]");
    }

    let _ = write!(
        graph,
        "{pads}concat=n={}:v=1:a=1[outv][outa]",
        plan.segments.len()
    );
    graph
}
