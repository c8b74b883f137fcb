/*!
 * Hook promotion: move a chosen sub-interval to the front of a timeline.
 *
 * The timeline is reordered into three parts, the hook itself, everything
 * before it, then everything after it. Ordering inside each part is kept.
 */

use log::debug;

use crate::errors::PlanError;

use super::interval::{EPSILON, KeepPlan, TimeInterval};

/// Reorder an existing plan so `[hook_start, hook_end)` plays first.
///
/// Hook bounds are positions in the plan's output timeline, i.e. what a
/// viewer of the edited video sees. Segments straddling a bound are split.
pub fn promote_segment(plan: &KeepPlan, hook_start: f64, hook_end: f64) -> Result<KeepPlan, PlanError> {
    let total = plan.output_duration();
    validate_hook(hook_start, hook_end, total)?;

    let parts = [
        TimeInterval::new(hook_start, hook_end),
        TimeInterval::new(0.0, hook_start),
        TimeInterval::new(hook_end, total),
    ];

    let mut source_spans = Vec::with_capacity(plan.len() + 2);
    for part in &parts {
        for segment in &plan.segments {
            if let Some(clip) = segment.output_interval().intersect(part) {
                let offset = segment.original_offset + (clip.start - segment.start);
                source_spans.push(TimeInterval::new(offset, offset + clip.duration()));
            }
        }
    }

    debug!(
        "Promoted hook [{:.2}, {:.2}) to the front ({} segments)",
        hook_start,
        hook_end,
        source_spans.len()
    );

    Ok(KeepPlan::from_source_intervals(
        &source_spans,
        plan.removed.clone(),
        plan.source_duration,
    ))
}

/// Reorder an untouched timeline of `total_duration` seconds.
pub fn promote_range(total_duration: f64, hook_start: f64, hook_end: f64) -> Result<KeepPlan, PlanError> {
    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Err(PlanError::InvalidParameter {
            name: "total_duration",
            value: total_duration,
        });
    }
    promote_segment(&KeepPlan::full(total_duration), hook_start, hook_end)
}

fn validate_hook(hook_start: f64, hook_end: f64, total: f64) -> Result<(), PlanError> {
    if !hook_start.is_finite() || !hook_end.is_finite() {
        return Err(PlanError::invalid_range(hook_start, hook_end, "hook bounds must be finite"));
    }
    if hook_start >= hook_end {
        return Err(PlanError::invalid_range(hook_start, hook_end, "hook must start before it ends"));
    }
    if hook_start < 0.0 || hook_end > total + EPSILON {
        return Err(PlanError::invalid_range(
            hook_start,
            hook_end,
            format!("hook must lie within [0, {:.3}]", total),
        ));
    }
    Ok(())
}
