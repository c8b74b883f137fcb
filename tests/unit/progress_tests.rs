/*!
 * Tests for the two-level progress mapping
 */

use vidopt::pipeline::{NoProgress, ProgressSink, item_to_batch_percent, stage_to_item_percent};

#[test]
fn test_stageToItemPercent_withThreeStages_shouldSplitEvenly() {
    assert!((stage_to_item_percent(0, 100.0, 3) - 100.0 / 3.0).abs() < 1e-9);
    assert!((stage_to_item_percent(1, 50.0, 3) - 50.0).abs() < 1e-9);
    assert_eq!(stage_to_item_percent(2, 100.0, 3), 100.0);
}

#[test]
fn test_stageToItemPercent_withOutOfRangePercent_shouldClamp() {
    assert_eq!(stage_to_item_percent(0, -20.0, 2), 0.0);
    assert_eq!(stage_to_item_percent(1, 400.0, 2), 100.0);
    assert_eq!(stage_to_item_percent(0, f64::NAN, 2), 0.0);
}

#[test]
fn test_stageToItemPercent_withNoStages_shouldBeComplete() {
    assert_eq!(stage_to_item_percent(0, 0.0, 0), 100.0);
}

#[test]
fn test_itemToBatchPercent_shouldComposeWithStageMapping() {
    // Second of four items, halfway through its second of two stages
    let item = stage_to_item_percent(1, 50.0, 2);
    let batch = item_to_batch_percent(1, item, 4);

    assert_eq!(item, 75.0);
    assert!((batch - 43.75).abs() < 1e-9);
}

#[test]
fn test_itemToBatchPercent_sequentialSweep_shouldNeverDecrease() {
    let (items, stages) = (5, 3);
    let mut last = 0.0;

    for item_index in 0..items {
        for stage_index in 0..stages {
            for step in 0..=10 {
                let item = stage_to_item_percent(stage_index, step as f64 * 10.0, stages);
                let batch = item_to_batch_percent(item_index, item, items);
                assert!(batch + 1e-9 >= last, "{} after {}", batch, last);
                last = batch;
            }
        }
    }

    assert!((last - 100.0).abs() < 1e-9);
}

#[test]
fn test_closure_asProgressSink_shouldReceiveCalls() {
    let calls = parking_lot::Mutex::new(Vec::new());
    let sink = |item_index: usize, total: usize, percent: f64, message: &str| {
        calls.lock().push((item_index, total, percent, message.to_string()));
    };

    sink.on_progress(0, 2, 25.0, "item_001: download");
    NoProgress.on_progress(0, 2, 25.0, "ignored");

    assert_eq!(calls.lock().as_slice(), &[(0, 2, 25.0, "item_001: download".to_string())]);
}
