/*!
 * Keep-interval planning.
 *
 * Turns detected dead time (cut intervals) into the complementary list of
 * intervals to keep. Cuts are merged, shrunk inward by a padding so a little
 * context survives around each cut boundary, and keep intervals shorter than
 * a minimum length are folded into a neighbour so a downstream trim/concat
 * step never receives micro-segments.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::PlanError;

use super::interval::{CutInterval, EPSILON, KeepPlan, TimeInterval};

/// Configuration for keep-interval planning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Context kept on each side of a cut, in seconds
    pub padding: f64,

    /// Keep intervals shorter than this are merged into a neighbour
    pub min_keep_length: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            padding: 0.3,
            min_keep_length: 1.0,
        }
    }
}

impl PlannerConfig {
    /// Tight cuts for fast-paced short-form content.
    pub fn tight() -> Self {
        Self {
            padding: 0.1,
            min_keep_length: 0.5,
        }
    }

    /// Generous context for talking-head content.
    pub fn relaxed() -> Self {
        Self {
            padding: 0.5,
            min_keep_length: 2.0,
        }
    }

    fn validate(&self) -> Result<(), PlanError> {
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(PlanError::InvalidParameter {
                name: "padding",
                value: self.padding,
            });
        }
        if !self.min_keep_length.is_finite() || self.min_keep_length < 0.0 {
            return Err(PlanError::InvalidParameter {
                name: "min_keep_length",
                value: self.min_keep_length,
            });
        }
        Ok(())
    }
}

/// Planner producing keep plans from cut intervals.
#[derive(Debug, Clone, Default)]
pub struct IntervalPlanner {
    config: PlannerConfig,
}

impl IntervalPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Compute the keep plan for `cuts` over `[0, total_duration)`.
    ///
    /// Returns an empty plan when everything is cut; the caller decides
    /// whether that is an error.
    pub fn plan(&self, cuts: &[CutInterval], total_duration: f64) -> Result<KeepPlan, PlanError> {
        if !total_duration.is_finite() || total_duration <= 0.0 {
            return Err(PlanError::InvalidParameter {
                name: "total_duration",
                value: total_duration,
            });
        }
        self.config.validate()?;

        let regions = merge_cuts(clamp_cuts(cuts, total_duration)?, self.config.padding);
        let removed: Vec<TimeInterval> = regions
            .iter()
            .filter_map(|region| shrink(region, self.config.padding))
            .collect();

        let candidates = gaps_between(&removed, total_duration);
        let keeps = enforce_min_length(candidates, self.config.min_keep_length);
        let removed = gaps_between(&keeps, total_duration);

        debug!(
            "Planned {} keep intervals from {} cuts ({:.2}s removed of {:.2}s)",
            keeps.len(),
            cuts.len(),
            removed.iter().map(TimeInterval::duration).sum::<f64>(),
            total_duration
        );

        Ok(KeepPlan::from_source_intervals(&keeps, removed, total_duration))
    }
}

/// Plan keep intervals with explicit parameters.
pub fn plan_keep_intervals(
    cuts: &[CutInterval],
    total_duration: f64,
    padding: f64,
    min_keep_length: f64,
) -> Result<KeepPlan, PlanError> {
    IntervalPlanner::new(PlannerConfig {
        padding,
        min_keep_length,
    })
    .plan(cuts, total_duration)
}

/// Validate cut bounds and clamp them to the timeline; empty cuts are dropped.
fn clamp_cuts(cuts: &[CutInterval], total_duration: f64) -> Result<Vec<TimeInterval>, PlanError> {
    let mut clamped = Vec::with_capacity(cuts.len());

    for cut in cuts {
        if !cut.start.is_finite() || !cut.end.is_finite() {
            return Err(PlanError::invalid_range(cut.start, cut.end, "cut bounds must be finite"));
        }
        if cut.start > cut.end {
            return Err(PlanError::invalid_range(cut.start, cut.end, "cut starts after it ends"));
        }

        let interval = TimeInterval::new(cut.start.max(0.0), cut.end.min(total_duration));
        if !interval.is_empty() {
            clamped.push(interval);
        }
    }

    Ok(clamped)
}

/// Sort and merge cuts that overlap or sit within `2 * padding` of each other.
///
/// A gap that narrow would be consumed entirely by the context both cuts
/// preserve, so the two cuts behave as one region.
fn merge_cuts(mut cuts: Vec<TimeInterval>, padding: f64) -> Vec<TimeInterval> {
    cuts.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.end.total_cmp(&b.end)));

    let adjacency = 2.0 * padding + EPSILON;
    let mut merged: Vec<TimeInterval> = Vec::with_capacity(cuts.len());

    for cut in cuts {
        match merged.last_mut() {
            Some(last) if cut.start - last.end <= adjacency => {
                last.end = last.end.max(cut.end);
            }
            _ => merged.push(cut),
        }
    }

    merged
}

/// Shrink a cut region inward by `padding`; regions that would invert are not cut.
fn shrink(region: &TimeInterval, padding: f64) -> Option<TimeInterval> {
    let shrunk = TimeInterval::new(region.start + padding, region.end - padding);
    (!shrunk.is_empty()).then_some(shrunk)
}

/// Non-empty gaps between sorted, disjoint intervals over `[0, total_duration)`.
fn gaps_between(intervals: &[TimeInterval], total_duration: f64) -> Vec<TimeInterval> {
    let mut gaps = Vec::with_capacity(intervals.len() + 1);
    let mut cursor = 0.0;

    for interval in intervals {
        let gap = TimeInterval::new(cursor, interval.start);
        if !gap.is_empty() {
            gaps.push(gap);
        }
        cursor = interval.end;
    }

    let tail = TimeInterval::new(cursor, total_duration);
    if !tail.is_empty() {
        gaps.push(tail);
    }

    gaps
}

/// Fold keep intervals shorter than `min_length` into a neighbour.
///
/// A short interval extends the previous keep over the cut between them. A
/// short leading interval is carried forward and merged into the next one.
fn enforce_min_length(candidates: Vec<TimeInterval>, min_length: f64) -> Vec<TimeInterval> {
    let mut keeps: Vec<TimeInterval> = Vec::with_capacity(candidates.len());
    let mut pending_head: Option<TimeInterval> = None;

    for candidate in candidates {
        let candidate = match pending_head.take() {
            Some(head) => TimeInterval::new(head.start, candidate.end),
            None => candidate,
        };

        if candidate.duration() + EPSILON >= min_length {
            keeps.push(candidate);
            continue;
        }

        match keeps.last_mut() {
            Some(previous) => previous.end = candidate.end,
            None => pending_head = Some(candidate),
        }
    }

    // Nothing followed a short head, keep it rather than lose it
    if let Some(head) = pending_head {
        keeps.push(head);
    }

    keeps
}
