/*!
 * Declarative, ordered list of the stages a run executes.
 *
 * The list is built once per run from `StageOptions`: each known stage
 * kind appears in canonical order with its enablement, and only enabled
 * stages are instantiated and executed.
 */

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::stage::Stage;

/// Every stage kind the tool knows, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Download,
    AudioEnhance,
    RemoveSilence,
    AdjustSpeed,
    ColorGrade,
    Subtitle,
    Watermark,
    YoutubeExport,
    Thumbnail,
    Seo,
    Shorts,
}

impl StageKind {
    pub const ALL: [StageKind; 11] = [
        StageKind::Download,
        StageKind::AudioEnhance,
        StageKind::RemoveSilence,
        StageKind::AdjustSpeed,
        StageKind::ColorGrade,
        StageKind::Subtitle,
        StageKind::Watermark,
        StageKind::YoutubeExport,
        StageKind::Thumbnail,
        StageKind::Seo,
        StageKind::Shorts,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Download => "download",
            StageKind::AudioEnhance => "audio_enhance",
            StageKind::RemoveSilence => "remove_silence",
            StageKind::AdjustSpeed => "adjust_speed",
            StageKind::ColorGrade => "color_grade",
            StageKind::Subtitle => "subtitle",
            StageKind::Watermark => "watermark",
            StageKind::YoutubeExport => "youtube_export",
            StageKind::Thumbnail => "thumbnail",
            StageKind::Seo => "seo",
            StageKind::Shorts => "shorts",
        }
    }

    /// Stages whose product is recorded but not fed to the next stage
    pub fn is_side_output(&self) -> bool {
        matches!(self, StageKind::Thumbnail | StageKind::Seo | StageKind::Shorts)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether a stage kind runs, and the value it is configured with
#[derive(Debug, Clone, PartialEq)]
pub struct StageSetting {
    pub enabled: bool,
    pub option: Option<String>,
}

impl StageSetting {
    fn flag(enabled: bool) -> Self {
        Self { enabled, option: None }
    }

    fn value(option: Option<String>) -> Self {
        Self {
            enabled: option.is_some(),
            option,
        }
    }
}

/// Per-stage toggles and settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageOptions {
    /// Fetch remote sources into the work directory
    #[serde(default = "default_true")]
    pub download: bool,

    /// Denoise and normalize the audio track
    #[serde(default)]
    pub audio_enhance: bool,

    /// Cut silent spans using the interval planner
    #[serde(default)]
    pub remove_silence: bool,

    /// Playback speed factor; `None` leaves speed unchanged
    #[serde(default)]
    pub adjust_speed: Option<f64>,

    /// Color grading filter expression, e.g. `eq=contrast=1.1:saturation=1.2`
    #[serde(default)]
    pub color_grade: Option<String>,

    /// Burn generated subtitles into the video
    #[serde(default)]
    pub subtitle: bool,

    /// Logo image to overlay
    #[serde(default)]
    pub watermark_logo: Option<PathBuf>,

    /// Re-encode with upload-friendly settings
    #[serde(default)]
    pub youtube_export: bool,

    /// Produce a thumbnail image
    #[serde(default)]
    pub thumbnail: bool,

    /// Produce title/description/tag metadata
    #[serde(default)]
    pub seo: bool,

    /// Produce vertical short clips
    #[serde(default)]
    pub shorts: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StageOptions {
    fn default() -> Self {
        Self {
            download: true,
            audio_enhance: false,
            remove_silence: false,
            adjust_speed: None,
            color_grade: None,
            subtitle: false,
            watermark_logo: None,
            youtube_export: false,
            thumbnail: false,
            seo: false,
            shorts: false,
        }
    }
}

impl StageOptions {
    pub fn setting(&self, kind: StageKind) -> StageSetting {
        match kind {
            StageKind::Download => StageSetting::flag(self.download),
            StageKind::AudioEnhance => StageSetting::flag(self.audio_enhance),
            StageKind::RemoveSilence => StageSetting::flag(self.remove_silence),
            StageKind::AdjustSpeed => {
                // 1.0 is a no-op
                let factor = self.adjust_speed.filter(|factor| (factor - 1.0).abs() > f64::EPSILON);
                StageSetting::value(factor.map(|factor| factor.to_string()))
            }
            StageKind::ColorGrade => StageSetting::value(self.color_grade.clone()),
            StageKind::Subtitle => StageSetting::flag(self.subtitle),
            StageKind::Watermark => {
                StageSetting::value(self.watermark_logo.as_ref().map(|p| p.to_string_lossy().to_string()))
            }
            StageKind::YoutubeExport => StageSetting::flag(self.youtube_export),
            StageKind::Thumbnail => StageSetting::flag(self.thumbnail),
            StageKind::Seo => StageSetting::flag(self.seo),
            StageKind::Shorts => StageSetting::flag(self.shorts),
        }
    }

    /// Enabled stage kinds in execution order
    pub fn enabled_kinds(&self) -> Vec<StageKind> {
        StageKind::ALL
            .into_iter()
            .filter(|kind| self.setting(*kind).enabled)
            .collect()
    }
}

/// One declared stage
#[derive(Clone)]
pub struct StageEntry {
    pub name: String,
    pub enabled: bool,
    pub stage: Arc<dyn Stage>,
}

impl fmt::Debug for StageEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StageEntry")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Ordered stage declarations for one run
#[derive(Debug, Clone, Default)]
pub struct StageRegistry {
    entries: Vec<StageEntry>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage at the end of the order
    pub fn register(&mut self, stage: Arc<dyn Stage>, enabled: bool) -> &mut Self {
        self.entries.push(StageEntry {
            name: stage.name().to_string(),
            enabled,
            stage,
        });
        self
    }

    /// Builder form of `register`
    pub fn with_stage(mut self, stage: Arc<dyn Stage>, enabled: bool) -> Self {
        self.register(stage, enabled);
        self
    }

    /// Build the registry from options; `factory` is called only for enabled kinds
    pub fn from_options<F>(options: &StageOptions, mut factory: F) -> Result<Self>
    where
        F: FnMut(StageKind, &StageSetting) -> Result<Arc<dyn Stage>>,
    {
        let mut registry = Self::new();

        for kind in StageKind::ALL {
            let setting = options.setting(kind);
            if !setting.enabled {
                debug!("Stage '{}' disabled", kind);
                continue;
            }
            let stage = factory(kind, &setting)?;
            registry.register(stage, true);
        }

        Ok(registry)
    }

    /// Stages to execute, in order
    pub fn enabled_stages(&self) -> Vec<Arc<dyn Stage>> {
        self.entries
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.stage.clone())
            .collect()
    }

    pub fn enabled_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
