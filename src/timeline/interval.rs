/*!
 * Interval types shared by the planner and hook promotion.
 *
 * All times are seconds as `f64`. A timeline is a list of intervals
 * over `[0, total_duration)`, sorted by start and non-overlapping.
 */

use serde::{Deserialize, Serialize};

use crate::errors::PlanError;

/// Tolerance for floating point comparisons on time values
pub const EPSILON: f64 = 1e-6;

/// A half-open span of time `[start, end)` in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: f64,
    pub end: f64,
}

impl TimeInterval {
    /// Create an interval without validation
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Create an interval, rejecting inverted, negative or non-finite bounds
    pub fn try_new(start: f64, end: f64) -> Result<Self, PlanError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(PlanError::invalid_range(start, end, "bounds must be finite"));
        }
        if start < 0.0 {
            return Err(PlanError::invalid_range(start, end, "start must not be negative"));
        }
        if start >= end {
            return Err(PlanError::invalid_range(start, end, "start must be before end"));
        }
        Ok(Self { start, end })
    }

    /// Length of the interval in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the interval is too short to matter
    pub fn is_empty(&self) -> bool {
        self.duration() <= EPSILON
    }

    /// Intersection with another interval, if any
    pub fn intersect(&self, other: &TimeInterval) -> Option<TimeInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        let clipped = TimeInterval::new(start, end);
        (!clipped.is_empty()).then_some(clipped)
    }
}

impl From<(f64, f64)> for TimeInterval {
    fn from((start, end): (f64, f64)) -> Self {
        Self::new(start, end)
    }
}

/// A span flagged for removal, e.g. a detected silence.
///
/// Cut intervals come straight from an external detector: they may be
/// unsorted, overlapping, or reach past the end of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutInterval {
    pub start: f64,
    pub end: f64,
}

impl CutInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

impl From<(f64, f64)> for CutInterval {
    fn from((start, end): (f64, f64)) -> Self {
        Self::new(start, end)
    }
}

/// One surviving piece of the source timeline.
///
/// `start`/`end` locate the segment in the edited output timeline while
/// `original_offset` is where it begins in the source, which is what a
/// trim/concat step needs to extract it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeepSegment {
    pub start: f64,
    pub end: f64,
    pub original_offset: f64,
}

impl KeepSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Span covered in the source timeline
    pub fn source_interval(&self) -> TimeInterval {
        TimeInterval::new(self.original_offset, self.original_offset + self.duration())
    }

    /// Span covered in the output timeline
    pub fn output_interval(&self) -> TimeInterval {
        TimeInterval::new(self.start, self.end)
    }
}

/// Ordered list of keep segments forming a continuous output timeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeepPlan {
    /// Segments in playback order
    pub segments: Vec<KeepSegment>,

    /// Regions of the source that were actually removed
    #[serde(default)]
    pub removed: Vec<TimeInterval>,

    /// Duration of the source timeline the plan was computed over
    pub source_duration: f64,
}

impl KeepPlan {
    /// Build a plan that lays the given source spans end to end
    pub fn from_source_intervals(
        intervals: &[TimeInterval],
        removed: Vec<TimeInterval>,
        source_duration: f64,
    ) -> Self {
        let mut cursor = 0.0;
        let segments = intervals
            .iter()
            .filter(|interval| !interval.is_empty())
            .map(|interval| {
                let segment = KeepSegment {
                    start: cursor,
                    end: cursor + interval.duration(),
                    original_offset: interval.start,
                };
                cursor = segment.end;
                segment
            })
            .collect();

        Self {
            segments,
            removed,
            source_duration,
        }
    }

    /// Identity plan: the whole source kept as a single segment
    pub fn full(source_duration: f64) -> Self {
        Self::from_source_intervals(
            &[TimeInterval::new(0.0, source_duration)],
            Vec::new(),
            source_duration,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Total duration of the edited output
    pub fn output_duration(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }

    /// Total duration removed from the source
    pub fn removed_duration(&self) -> f64 {
        self.removed.iter().map(TimeInterval::duration).sum()
    }

    /// Source spans in playback order
    pub fn source_intervals(&self) -> Vec<TimeInterval> {
        self.segments.iter().map(KeepSegment::source_interval).collect()
    }
}
