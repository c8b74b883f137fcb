/*!
 * Tests for chapter synthesis
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vidopt::chapters::{ChapterLanguage, ChapterMarker, ChapterSynthesizer, format_timestamps, synthesize_chapters};
use vidopt::transcript::{TranscriptSegment, parse_srt_string};

use crate::common;

const PHRASES: &[&str] = &[
    "halo semuanya",
    "kita lanjut ke bagian berikut",
    "tapi ini tidak mudah",
    "kemudian kita coba lagi",
    "ternyata berhasil",
    "akhirnya selesai",
    "terima kasih sudah menonton",
    "ini cuma penjelasan biasa",
    "lihat contoh berikut",
];

fn random_transcript(rng: &mut StdRng) -> Vec<TranscriptSegment> {
    let count = rng.random_range(1..60);
    let mut cursor = rng.random_range(0.0..30.0);

    (0..count)
        .map(|_| {
            let length = rng.random_range(1.0..20.0);
            let segment = TranscriptSegment::new(cursor, cursor + length, PHRASES[rng.random_range(0..PHRASES.len())]);
            cursor += length + rng.random_range(0.0..8.0);
            segment
        })
        .collect()
}

fn assert_invariants(markers: &[ChapterMarker], min_spacing: f64, max_chapters: usize) {
    assert!(!markers.is_empty());
    assert!(markers.len() <= max_chapters, "{} markers > {}", markers.len(), max_chapters);
    assert_eq!(markers[0].time, 0.0, "first marker must open the video: {:?}", markers);

    for pair in markers.windows(2) {
        assert!(pair[1].time > pair[0].time, "times must strictly increase: {:?}", markers);
    }
    // The opening marker may be closer than the spacing; all later ones are not
    for pair in markers[1..].windows(2) {
        assert!(pair[1].time - pair[0].time >= min_spacing - 1e-9, "spacing violated: {:?}", markers);
    }
}

#[test]
fn test_synthesize_withRandomTranscripts_shouldHoldInvariants() {
    common::init_logging();
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..400 {
        let segments = random_transcript(&mut rng);
        let min_spacing = rng.random_range(5.0..120.0);
        let max_chapters = rng.random_range(1..10);

        let markers = synthesize_chapters(&segments, min_spacing, max_chapters);

        assert_invariants(&markers, min_spacing, max_chapters);
    }
}

#[test]
fn test_synthesize_withShuffledInput_shouldMatchSortedInput() {
    let segments = common::sample_transcript();
    let mut shuffled = segments.clone();
    shuffled.reverse();

    assert_eq!(
        synthesize_chapters(&segments, 60.0, 8),
        synthesize_chapters(&shuffled, 60.0, 8)
    );
}

#[test]
fn test_synthesize_withSampleTalk_shouldFindNarrativeCues() {
    let markers = synthesize_chapters(&common::sample_transcript(), 60.0, 8);

    assert_invariants(&markers, 60.0, 8);
    assert_eq!(markers[0].label, "Pembuka");
    assert!(markers.len() >= 4, "expected several chapters, got {:?}", markers);
}

#[test]
fn test_synthesize_withEmptyTranscript_shouldReturnNothing() {
    assert!(synthesize_chapters(&[], 60.0, 8).is_empty());
}

#[test]
fn test_synthesize_withMaxChaptersZero_shouldReturnNothing() {
    assert!(synthesize_chapters(&common::sample_transcript(), 60.0, 0).is_empty());
}

#[test]
fn test_synthesize_withMaxChaptersOne_shouldOnlyOpen() {
    let markers = synthesize_chapters(&common::sample_transcript(), 60.0, 1);

    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].time, 0.0);
}

#[test]
fn test_synthesize_withEnglishSynthesizer_shouldUseEnglishLabels() {
    let segments = vec![
        TranscriptSegment::new(0.0, 5.0, "Hello and welcome"),
        TranscriptSegment::new(200.0, 210.0, "However things went wrong"),
        TranscriptSegment::new(400.0, 410.0, "Thank you for watching"),
    ];

    let markers = ChapterSynthesizer::new(ChapterLanguage::English).synthesize(&segments, 60.0, 8);

    assert_eq!(markers[0].time, 0.0);
    assert!(markers.iter().all(|marker| marker.label.is_ascii()));
    assert!(markers.iter().any(|marker| marker.time == 200.0));
}

#[test]
fn test_synthesize_withLongPause_shouldAddSceneMarker() {
    let segments = vec![
        TranscriptSegment::new(0.0, 10.0, "ini cuma penjelasan biasa"),
        TranscriptSegment::new(10.0, 50.0, "ini cuma penjelasan biasa"),
        TranscriptSegment::new(90.0, 100.0, "ini cuma penjelasan biasa"),
    ];

    let markers = ChapterSynthesizer::default()
        .with_pause_threshold(30.0)
        .synthesize(&segments, 20.0, 8);

    assert!(markers.iter().any(|marker| marker.time == 90.0 && marker.label.starts_with("Scene")));
}

#[test]
fn test_formatTimestamps_fromSrt_shouldRenderDescriptionLines() {
    let srt = "1\n00:00:00,500 --> 00:00:04,000\nHalo semuanya\n\n2\n01:02:03,000 --> 01:02:10,000\nAkhirnya selesai\n";
    let segments = parse_srt_string(srt);

    let text = format_timestamps(&synthesize_chapters(&segments, 60.0, 8));

    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("00:00 - "));
    assert!(lines.iter().any(|line| line.starts_with("1:02:03 - ")));
}
