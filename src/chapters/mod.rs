/*!
 * Chapter markers derived from transcript segments.
 *
 * - `keywords`: per-language cue words and labels
 * - `synthesizer`: candidate detectors and the merge into final markers
 * - `format`: description-ready timestamp text
 */

pub mod format;
pub mod keywords;
pub mod synthesizer;

pub use format::{format_timestamps, save_chapters};
pub use keywords::ChapterLanguage;
pub use synthesizer::{ChapterMarker, ChapterSynthesizer, DEFAULT_PAUSE_THRESHOLD, synthesize_chapters};
