/*!
 * Chapter marker synthesis from transcript segments.
 *
 * Three independent detectors propose candidates over the same segments:
 *
 * - lexical: cue words at the start of a segment (confidence 0.7)
 * - structural: a dramatic-structure template banded by duration (0.5)
 * - pause: long silences between consecutive segments (0.6)
 *
 * Candidates are merged by time with a minimum spacing, pruned to the
 * requested count by confidence, and the result always starts at 0.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use super::keywords::{self, ChapterLabel, ChapterLanguage};
use crate::transcript::TranscriptSegment;

// @const: detector confidences
const LEXICAL_CONFIDENCE: f64 = 0.7;
const PAUSE_CONFIDENCE: f64 = 0.6;
const STRUCTURAL_CONFIDENCE: f64 = 0.5;

// @const: a first marker this close to the start is treated as the opening
const START_SNAP_SECS: f64 = 1.0;

// @const: default silence gap that marks a scene change
pub const DEFAULT_PAUSE_THRESHOLD: f64 = 2.0;

// @const: structural templates as (fraction of duration, label)
const SHORT_STRUCTURE: &[(f64, ChapterLabel)] = &[
    (0.0, ChapterLabel::Intro),
    (0.3, ChapterLabel::ConflictStart),
    (0.75, ChapterLabel::Resolution),
];

const MEDIUM_STRUCTURE: &[(f64, ChapterLabel)] = &[
    (0.0, ChapterLabel::Intro),
    (0.15, ChapterLabel::ConflictStart),
    (0.4, ChapterLabel::RisingAction),
    (0.65, ChapterLabel::TurningPoint),
    (0.85, ChapterLabel::Resolution),
];

const LONG_STRUCTURE: &[(f64, ChapterLabel)] = &[
    (0.0, ChapterLabel::Intro),
    (0.1, ChapterLabel::ConflictStart),
    (0.25, ChapterLabel::RisingAction),
    (0.45, ChapterLabel::TurningPoint),
    (0.6, ChapterLabel::Climax),
    (0.78, ChapterLabel::Resolution),
    (0.92, ChapterLabel::Ending),
];

/// A finalized chapter boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterMarker {
    /// Position in seconds
    pub time: f64,

    /// Display label
    pub label: String,
}

impl ChapterMarker {
    pub fn new(time: f64, label: impl Into<String>) -> Self {
        Self {
            time,
            label: label.into(),
        }
    }
}

/// A proposed marker that still carries its ranking confidence
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChapterCandidate {
    pub time: f64,
    pub label: String,
    pub confidence: f64,
}

impl ChapterCandidate {
    fn new(time: f64, label: impl Into<String>, confidence: f64) -> Self {
        Self {
            time,
            label: label.into(),
            confidence,
        }
    }
}

/// Chapter synthesizer for one language
#[derive(Debug, Clone)]
pub struct ChapterSynthesizer {
    language: ChapterLanguage,
    pause_threshold: f64,
}

impl Default for ChapterSynthesizer {
    fn default() -> Self {
        Self::new(ChapterLanguage::default())
    }
}

impl ChapterSynthesizer {
    pub fn new(language: ChapterLanguage) -> Self {
        Self {
            language,
            pause_threshold: DEFAULT_PAUSE_THRESHOLD,
        }
    }

    /// Override the gap (seconds) between segments that counts as a scene change
    pub fn with_pause_threshold(mut self, seconds: f64) -> Self {
        self.pause_threshold = seconds;
        self
    }

    pub fn language(&self) -> ChapterLanguage {
        self.language
    }

    /// Derive chapter markers from transcript segments.
    ///
    /// Returns an empty list for empty input or `max_chapters == 0`. Otherwise
    /// the first marker is at time 0, times strictly increase and at most
    /// `max_chapters` markers are returned.
    pub fn synthesize(
        &self,
        segments: &[TranscriptSegment],
        min_spacing: f64,
        max_chapters: usize,
    ) -> Vec<ChapterMarker> {
        if segments.is_empty() || max_chapters == 0 {
            return Vec::new();
        }

        let mut ordered: Vec<&TranscriptSegment> = segments.iter().collect();
        ordered.sort_by(|a, b| a.start.total_cmp(&b.start));

        let total_duration = ordered
            .iter()
            .map(|segment| segment.end)
            .filter(|end| end.is_finite())
            .fold(0.0_f64, f64::max);

        let mut candidates = self.lexical_candidates(&ordered);
        candidates.extend(self.structural_candidates(total_duration));
        candidates.extend(self.pause_candidates(&ordered));
        candidates.retain(|candidate| candidate.time.is_finite());
        for candidate in &mut candidates {
            candidate.time = candidate.time.max(0.0);
        }

        debug!(
            "Synthesizing chapters from {} candidates over {:.1}s",
            candidates.len(),
            total_duration
        );

        let mut merged = merge_candidates(candidates, min_spacing, max_chapters);
        self.ensure_opening(&mut merged, max_chapters);

        merged
            .into_iter()
            .map(|candidate| ChapterMarker::new(candidate.time, candidate.label))
            .collect()
    }

    /// First cue word per segment, placed at the segment start
    fn lexical_candidates(&self, segments: &[&TranscriptSegment]) -> Vec<ChapterCandidate> {
        let cues = keywords::cues(self.language);

        segments
            .iter()
            .filter_map(|segment| {
                cues.iter().find(|cue| cue.matches(&segment.text)).map(|cue| {
                    let label = keywords::label_text(self.language, cue.category.into());
                    ChapterCandidate::new(segment.start, label, LEXICAL_CONFIDENCE)
                })
            })
            .collect()
    }

    fn structural_candidates(&self, total_duration: f64) -> Vec<ChapterCandidate> {
        let template = if total_duration < 120.0 {
            SHORT_STRUCTURE
        } else if total_duration < 600.0 {
            MEDIUM_STRUCTURE
        } else {
            LONG_STRUCTURE
        };

        template
            .iter()
            .map(|(fraction, label)| {
                ChapterCandidate::new(
                    total_duration * fraction,
                    keywords::label_text(self.language, *label),
                    STRUCTURAL_CONFIDENCE,
                )
            })
            .collect()
    }

    /// Scene changes where consecutive segments are separated by a long gap
    fn pause_candidates(&self, segments: &[&TranscriptSegment]) -> Vec<ChapterCandidate> {
        let mut candidates = Vec::new();

        for pair in segments.windows(2) {
            let gap = pair[1].start - pair[0].end;
            if gap >= self.pause_threshold {
                // Scene 1 is the opening
                let label = format!("Scene {}", candidates.len() + 2);
                candidates.push(ChapterCandidate::new(pair[1].start, label, PAUSE_CONFIDENCE));
            }
        }

        candidates
    }

    /// Make the first marker sit at time 0
    fn ensure_opening(&self, merged: &mut Vec<ChapterCandidate>, max_chapters: usize) {
        match merged.first_mut() {
            Some(first) if first.time <= START_SNAP_SECS => {
                first.time = 0.0;
                return;
            }
            _ => {}
        }

        let intro = keywords::label_text(self.language, ChapterLabel::Intro);
        merged.insert(0, ChapterCandidate::new(0.0, intro, 1.0));

        if merged.len() > max_chapters {
            let weakest = merged
                .iter()
                .enumerate()
                .skip(1)
                .min_by(|(_, a), (_, b)| a.confidence.total_cmp(&b.confidence))
                .map(|(index, _)| index);
            if let Some(index) = weakest {
                merged.remove(index);
            }
        }
    }
}

/// Reduce time-sorted candidates to a spaced, confidence-pruned list.
///
/// A candidate closer than `min_spacing` to the last accepted one replaces it
/// only on strictly greater confidence.
pub(crate) fn merge_candidates(
    mut candidates: Vec<ChapterCandidate>,
    min_spacing: f64,
    max_chapters: usize,
) -> Vec<ChapterCandidate> {
    candidates.sort_by(|a, b| a.time.total_cmp(&b.time));

    let mut accepted: Vec<ChapterCandidate> = Vec::new();
    for candidate in candidates {
        match accepted.last_mut() {
            Some(last) => {
                if candidate.time - last.time >= min_spacing && candidate.time > last.time {
                    accepted.push(candidate);
                } else if candidate.confidence > last.confidence {
                    *last = candidate;
                }
            }
            None => accepted.push(candidate),
        }
    }

    if accepted.len() > max_chapters {
        accepted.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        accepted.truncate(max_chapters);
        accepted.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    accepted
}

/// Synthesize chapters with the default language and pause threshold
pub fn synthesize_chapters(
    segments: &[TranscriptSegment],
    min_spacing: f64,
    max_chapters: usize,
) -> Vec<ChapterMarker> {
    ChapterSynthesizer::default().synthesize(segments, min_spacing, max_chapters)
}
