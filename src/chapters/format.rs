/*!
 * Text rendering of chapter markers for video descriptions.
 */

use anyhow::Result;
use std::path::Path;

use super::synthesizer::ChapterMarker;
use crate::file_utils::FileManager;

/// Render one `MM:SS - Label` line per marker, `H:MM:SS - Label` from one hour on
pub fn format_timestamps(markers: &[ChapterMarker]) -> String {
    markers
        .iter()
        .map(|marker| format!("{} - {}", format_time(marker.time), marker.label))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Write the chapter list with a copy-paste header and the platform's chapter rules
pub fn save_chapters<P: AsRef<Path>>(markers: &[ChapterMarker], output_path: P) -> Result<()> {
    let rule = "=".repeat(40);
    let content = format!(
        "YOUTUBE CHAPTERS / TIMESTAMPS\n{rule}\nCopy-paste into the video description:\n\n{}\n\n{rule}\nNote: the first chapter MUST start at 00:00\nMinimum 3 chapters, minimum 10 seconds per chapter\n",
        format_timestamps(markers),
    );

    FileManager::write_to_file(output_path, &content)
}
