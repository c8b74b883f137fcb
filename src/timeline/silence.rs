/*!
 * Parsing of silence detector output into cut intervals.
 *
 * The external detector logs `silence_start: X` and `silence_end: Y`
 * lines; each matched start/end pair becomes one cut. The same log carries
 * the container duration as `Duration: HH:MM:SS.ss`.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use super::interval::CutInterval;

// @const: silence marker regex
static SILENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"silence_(start|end):\s*(-?[0-9]+(?:\.[0-9]+)?(?:[eE][-+]?[0-9]+)?)").unwrap()
});

// @const: container duration regex
static DURATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration:\s*(\d+):(\d{2}):(\d{2}(?:\.\d+)?)").unwrap()
});

/// Container duration in seconds from the detector's input banner
pub fn parse_media_duration(output: &str) -> Option<f64> {
    let caps = DURATION_REGEX.captures(output)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;

    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Extract cut intervals from silence detector log output.
///
/// Malformed values and starts without a matching end are skipped.
pub fn parse_silencedetect(output: &str) -> Vec<CutInterval> {
    let mut cuts = Vec::new();
    let mut current_start: Option<f64> = None;

    for caps in SILENCE_REGEX.captures_iter(output) {
        let Ok(value) = caps[2].parse::<f64>() else {
            continue;
        };

        match &caps[1] {
            "start" => current_start = Some(value.max(0.0)),
            _ => {
                if let Some(start) = current_start.take() {
                    if value > start {
                        cuts.push(CutInterval::new(start, value));
                    }
                }
            }
        }
    }

    debug!("Parsed {} silence intervals from detector output", cuts.len());
    cuts
}
