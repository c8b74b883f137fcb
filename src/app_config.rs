use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chapters::{ChapterLanguage, ChapterSynthesizer};
use crate::database::DatabaseConnection;
use crate::file_utils::FileManager;
use crate::pipeline::{CommandTemplate, OrchestratorConfig, SilenceRemovalSettings, StageKind, StageOptions};
use crate::timeline::PlannerConfig;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Keep-interval planning and silence detection
    #[serde(default)]
    pub planner: PlannerSettings,

    /// Chapter synthesis
    #[serde(default)]
    pub chapters: ChapterSettings,

    /// Batch execution
    #[serde(default)]
    pub batch: BatchSettings,

    /// Which stages run, and their values
    #[serde(default)]
    pub stages: StageOptions,

    /// External program behind each stage, keyed by stage name
    #[serde(default = "default_commands")]
    pub commands: BTreeMap<String, CommandTemplate>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Planner and silence detector settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlannerSettings {
    // @field: Context kept on each side of a cut, seconds
    #[serde(default = "default_padding_secs")]
    pub padding_secs: f64,

    // @field: Shortest keep interval, seconds
    #[serde(default = "default_min_keep_secs")]
    pub min_keep_secs: f64,

    // @field: Detector noise floor
    #[serde(default = "default_noise_threshold")]
    pub noise_threshold: String,

    // @field: Shortest silence the detector reports, seconds
    #[serde(default = "default_min_silence_secs")]
    pub min_silence_secs: f64,

    // @field: Encoder used for detection and silence removal
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            padding_secs: default_padding_secs(),
            min_keep_secs: default_min_keep_secs(),
            noise_threshold: default_noise_threshold(),
            min_silence_secs: default_min_silence_secs(),
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

impl PlannerSettings {
    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            padding: self.padding_secs,
            min_keep_length: self.min_keep_secs,
        }
    }

    pub fn silence_settings(&self) -> SilenceRemovalSettings {
        SilenceRemovalSettings {
            ffmpeg: self.ffmpeg_path.clone(),
            noise_threshold: self.noise_threshold.clone(),
            min_silence_secs: self.min_silence_secs,
        }
    }
}

/// Chapter synthesis settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChapterSettings {
    // @field: ISO 639 code of the transcript language
    #[serde(default = "default_chapter_language")]
    pub language: String,

    // @field: Minimum distance between chapters, seconds
    #[serde(default = "default_min_spacing_secs")]
    pub min_spacing_secs: f64,

    // @field: Upper bound on emitted chapters
    #[serde(default = "default_max_chapters")]
    pub max_chapters: usize,

    // @field: Gap between segments that counts as a scene change, seconds
    #[serde(default = "default_pause_threshold_secs")]
    pub pause_threshold_secs: f64,
}

impl Default for ChapterSettings {
    fn default() -> Self {
        Self {
            language: default_chapter_language(),
            min_spacing_secs: default_min_spacing_secs(),
            max_chapters: default_max_chapters(),
            pause_threshold_secs: default_pause_threshold_secs(),
        }
    }
}

impl ChapterSettings {
    pub fn synthesizer(&self) -> ChapterSynthesizer {
        ChapterSynthesizer::new(ChapterLanguage::from_code(&self.language))
            .with_pause_threshold(self.pause_threshold_secs)
    }
}

/// Batch execution settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchSettings {
    // @field: Parent of the per-item work directories
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    // @field: Items processed at the same time
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    // @field: Report file written into output_dir
    #[serde(default = "default_report_file_name")]
    pub report_file_name: String,

    // @field: SQLite report database; JSON file when unset
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    // @field: Per-stage timeout for external programs, seconds
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_workers: default_max_workers(),
            report_file_name: default_report_file_name(),
            database_path: None,
            stage_timeout_secs: None,
        }
    }
}

impl BatchSettings {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::new(&self.output_dir).with_max_workers(self.max_workers)
    }

    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_secs.map(Duration::from_secs)
    }

    /// Store reports in SQLite at `path`, or at the default database location
    pub fn use_database(&mut self, path: Option<PathBuf>) -> Result<()> {
        let path = match path {
            Some(path) => path,
            None => DatabaseConnection::default_database_path()?,
        };
        self.database_path = Some(path);
        Ok(())
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_padding_secs() -> f64 {
    0.3
}

fn default_min_keep_secs() -> f64 {
    1.0
}

fn default_noise_threshold() -> String {
    "-30dB".to_string()
}

fn default_min_silence_secs() -> f64 {
    2.0
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_chapter_language() -> String {
    "id".to_string()
}

fn default_min_spacing_secs() -> f64 {
    60.0
}

fn default_max_chapters() -> usize {
    8
}

fn default_pause_threshold_secs() -> f64 {
    crate::chapters::DEFAULT_PAUSE_THRESHOLD
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_max_workers() -> usize {
    1
}

fn default_report_file_name() -> String {
    "batch_report.json".to_string()
}

fn ffmpeg(args: &[&str]) -> CommandTemplate {
    CommandTemplate::new("ffmpeg", args)
}

/// Templates for every stage that has no built-in implementation.
///
/// `seo` has no default; it needs a tool of the user's choosing.
pub fn default_commands() -> BTreeMap<String, CommandTemplate> {
    let templates = [
        (
            StageKind::Download,
            CommandTemplate::new(
                "yt-dlp",
                &[
                    "-f",
                    "bestvideo[height<=1080]+bestaudio/best",
                    "--merge-output-format",
                    "mp4",
                    "-o",
                    "{output}",
                    "{input}",
                ],
            )
            .with_suffix("source")
            .with_extension("mp4")
            .passing_local_files(),
        ),
        (
            StageKind::AudioEnhance,
            ffmpeg(&[
                "-y",
                "-i",
                "{input}",
                "-af",
                "afftdn=nf=-25,loudnorm=I=-16:TP=-1.5:LRA=11",
                "-c:v",
                "copy",
                "{output}",
            ])
            .with_suffix("enhanced"),
        ),
        (
            StageKind::AdjustSpeed,
            ffmpeg(&[
                "-y",
                "-i",
                "{input}",
                "-filter_complex",
                "[0:v]setpts=PTS/{option}[v];[0:a]atempo={option}[a]",
                "-map",
                "[v]",
                "-map",
                "[a]",
                "{output}",
            ])
            .with_suffix("speed"),
        ),
        (
            StageKind::ColorGrade,
            ffmpeg(&["-y", "-i", "{input}", "-vf", "{option}", "-c:a", "copy", "{output}"]).with_suffix("graded"),
        ),
        (
            StageKind::Subtitle,
            ffmpeg(&[
                "-y",
                "-i",
                "{input}",
                "-vf",
                "subtitles={work_dir}/{item_id}.srt",
                "-c:a",
                "copy",
                "{output}",
            ])
            .with_suffix("subtitled"),
        ),
        (
            StageKind::Watermark,
            ffmpeg(&[
                "-y",
                "-i",
                "{input}",
                "-i",
                "{option}",
                "-filter_complex",
                "overlay=W-w-20:H-h-20",
                "-c:a",
                "copy",
                "{output}",
            ])
            .with_suffix("watermarked"),
        ),
        (
            StageKind::YoutubeExport,
            ffmpeg(&[
                "-y",
                "-i",
                "{input}",
                "-c:v",
                "libx264",
                "-preset",
                "slow",
                "-crf",
                "18",
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "-movflags",
                "+faststart",
                "{output}",
            ])
            .with_suffix("youtube")
            .with_extension("mp4"),
        ),
        (
            StageKind::Thumbnail,
            ffmpeg(&["-y", "-ss", "5", "-i", "{input}", "-frames:v", "1", "{output}"])
                .with_suffix("thumbnail")
                .with_extension("jpg")
                .as_side_output(),
        ),
        (
            StageKind::Shorts,
            ffmpeg(&[
                "-y",
                "-i",
                "{input}",
                "-t",
                "60",
                "-vf",
                "crop=ih*9/16:ih,scale=1080:1920",
                "{output}",
            ])
            .with_suffix("short")
            .with_extension("mp4")
            .as_side_output(),
        ),
    ];

    templates
        .into_iter()
        .map(|(kind, template)| (kind.name().to_string(), template))
        .collect()
}

impl Config {
    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        FileManager::write_to_file(path, &json)
            .with_context(|| format!("Failed to write config to file: {:?}", path))
    }

    /// Load `path`, or write a default configuration there when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if FileManager::file_exists(path) {
            return Self::from_file(path);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    /// Template for a stage kind, if one is configured
    pub fn command_for(&self, kind: StageKind) -> Option<&CommandTemplate> {
        self.commands.get(kind.name())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let planner = &self.planner;
        if !planner.padding_secs.is_finite() || planner.padding_secs < 0.0 {
            return Err(anyhow!("planner.padding_secs must be >= 0, got {}", planner.padding_secs));
        }
        if !planner.min_keep_secs.is_finite() || planner.min_keep_secs < 0.0 {
            return Err(anyhow!("planner.min_keep_secs must be >= 0, got {}", planner.min_keep_secs));
        }
        if !planner.min_silence_secs.is_finite() || planner.min_silence_secs <= 0.0 {
            return Err(anyhow!("planner.min_silence_secs must be > 0, got {}", planner.min_silence_secs));
        }

        let chapters = &self.chapters;
        if !chapters.min_spacing_secs.is_finite() || chapters.min_spacing_secs <= 0.0 {
            return Err(anyhow!("chapters.min_spacing_secs must be > 0, got {}", chapters.min_spacing_secs));
        }
        if chapters.max_chapters == 0 {
            return Err(anyhow!("chapters.max_chapters must be at least 1"));
        }
        if ChapterLanguage::try_from_code(&chapters.language).is_none() {
            return Err(anyhow!("Unsupported chapter language: {}", chapters.language));
        }

        if self.batch.max_workers == 0 {
            return Err(anyhow!("batch.max_workers must be at least 1"));
        }
        if self.batch.report_file_name.trim().is_empty() {
            return Err(anyhow!("batch.report_file_name must not be empty"));
        }
        if self.batch.stage_timeout_secs == Some(0) {
            return Err(anyhow!("batch.stage_timeout_secs must be > 0 when set"));
        }

        if let Some(factor) = self.stages.adjust_speed {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(anyhow!("stages.adjust_speed must be > 0, got {}", factor));
            }
        }

        for kind in self.stages.enabled_kinds() {
            if kind != StageKind::RemoveSilence && self.command_for(kind).is_none() {
                return Err(anyhow!("Stage '{}' is enabled but has no command template", kind));
            }
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Self {
            planner: PlannerSettings::default(),
            chapters: ChapterSettings::default(),
            batch: BatchSettings::default(),
            stages: StageOptions::default(),
            commands: default_commands(),
            log_level: LogLevel::default(),
        }
    }
}
