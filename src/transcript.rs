use anyhow::{Context, Result};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::file_utils::FileManager;

// @module: Transcript segments and their on-disk formats

// @const: SRT timestamp regex, comma or dot before milliseconds
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{1,3})").unwrap()
});

/// A timestamped piece of transcribed speech
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,

    /// End time in seconds
    pub end: f64,

    /// Spoken text
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

impl fmt::Display for TranscriptSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{:.3} - {:.3}] {}", self.start, self.end, self.text)
    }
}

/// Transcription result as written by the transcription provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Load a transcript from an `.srt` file or a JSON `{ "segments": [...] }` file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)?;

        let is_srt = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("srt"));

        if is_srt {
            Ok(Self {
                segments: parse_srt_string(&content),
            })
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse transcript JSON: {:?}", path))
        }
    }

    /// Duration covered by the transcript, taken from the last segment
    pub fn duration(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }
}

/// Parse SRT content into transcript segments.
///
/// Blocks without a valid timestamp line or without text are skipped;
/// multi-line text is joined with spaces.
pub fn parse_srt_string(content: &str) -> Vec<TranscriptSegment> {
    let normalized = content.replace("\r\n", "\n");
    let mut segments = Vec::new();

    for (block_index, block) in normalized.split("\n\n").enumerate() {
        let lines: Vec<&str> = block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let Some(time_line) = lines.iter().position(|line| TIMESTAMP_REGEX.is_match(line)) else {
            if !lines.is_empty() {
                warn!("Skipping SRT block {} without a timestamp line", block_index + 1);
            }
            continue;
        };

        let Some(caps) = TIMESTAMP_REGEX.captures(lines[time_line]) else {
            continue;
        };
        let start = timestamp_seconds(&caps, 1);
        let end = timestamp_seconds(&caps, 5);

        let text = lines[time_line + 1..].join(" ");
        if text.is_empty() {
            warn!("Skipping empty SRT block {}", block_index + 1);
            continue;
        }

        if end < start {
            warn!("Skipping SRT block {} with inverted timestamps", block_index + 1);
            continue;
        }

        segments.push(TranscriptSegment::new(start, end, text));
    }

    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    segments
}

/// Timestamp captured at `start_idx` converted to seconds
fn timestamp_seconds(caps: &regex::Captures, start_idx: usize) -> f64 {
    let part = |offset: usize| -> u64 {
        caps.get(start_idx + offset)
            .map_or(0, |m| m.as_str().parse().unwrap_or(0))
    };

    // "5" after the separator means 500ms, pad to three digits
    let millis_digits = caps.get(start_idx + 3).map_or("0", |m| m.as_str());
    let millis = format!("{:0<3}", millis_digits).parse::<u64>().unwrap_or(0);

    (part(0) * 3600 + part(1) * 60 + part(2)) as f64 + millis as f64 / 1000.0
}
