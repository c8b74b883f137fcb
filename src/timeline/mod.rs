/*!
 * Timeline planning: where to cut and in which order to play what remains.
 *
 * - `interval`: time interval, cut and keep-plan types
 * - `planner`: converts cut intervals into a keep plan
 * - `hook`: moves a chosen sub-interval to the front
 * - `silence`: parses silence detector output into cuts
 */

pub mod hook;
pub mod interval;
pub mod planner;
pub mod silence;

pub use hook::{promote_range, promote_segment};
pub use interval::{CutInterval, EPSILON, KeepPlan, KeepSegment, TimeInterval};
pub use planner::{IntervalPlanner, PlannerConfig, plan_keep_intervals};
pub use silence::{parse_media_duration, parse_silencedetect};
