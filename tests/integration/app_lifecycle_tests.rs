/*!
 * Integration tests driving the controller end to end
 */

use anyhow::Result;
use std::path::Path;

use vidopt::app_config::Config;
use vidopt::app_controller::Controller;
use vidopt::pipeline::{CancellationFlag, CommandTemplate, ItemStatus, JsonFileReportStore, StageStatus};
use vidopt::timeline::TimeInterval;

use crate::common;

fn config_with_output(output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.batch.output_dir = output_dir.to_path_buf();
    config
}

#[test]
fn test_controller_plan_shouldMergeNearbyCutsAndPad() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let cuts = common::create_test_file(
        temp_dir.path(),
        "cuts.json",
        r#"[{"start": 10.0, "end": 12.0}, {"start": 12.5, "end": 14.0}]"#,
    )?;
    let controller = Controller::with_config(Config::default())?;

    let plan = controller.plan(&cuts, 100.0)?;

    let keeps = plan.source_intervals();
    assert_eq!(keeps.len(), 2);
    assert!((keeps[0].end - 10.3).abs() < 1e-9);
    assert!((keeps[1].start - 13.7).abs() < 1e-9);
    assert_eq!(keeps[1].end, 100.0);
    Ok(())
}

#[test]
fn test_controller_plan_fromDetectorLog_thenHook_shouldReorder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let log = common::create_test_file(
        temp_dir.path(),
        "silence.log",
        "[silencedetect @ 0x1] silence_start: 20\n[silencedetect @ 0x1] silence_end: 30 | silence_duration: 10\n",
    )?;
    let controller = Controller::with_config(Config::default())?;

    let plan = controller.plan(&log, 60.0)?;
    let promoted = controller.hook(Some(&plan), None, 40.0, 45.0)?;

    assert!((promoted.output_duration() - plan.output_duration()).abs() < 1e-9);
    assert_eq!(promoted.segments[0].start, 0.0);
    assert!((promoted.segments[0].duration() - 5.0).abs() < 1e-9);

    let standalone = controller.hook(None, Some(60.0), 40.0, 45.0)?;
    assert_eq!(standalone.source_intervals()[0], TimeInterval::new(40.0, 45.0));
    Ok(())
}

#[test]
fn test_controller_hook_withoutPlanOrDuration_shouldFail() -> Result<()> {
    let controller = Controller::with_config(Config::default())?;

    assert!(controller.hook(None, None, 40.0, 45.0).is_err());
    Ok(())
}

#[test]
fn test_controller_chapters_shouldWriteDescriptionFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let transcript = common::create_test_file(
        temp_dir.path(),
        "talk.srt",
        "1\n00:00:00,500 --> 00:00:04,000\nHalo semuanya\n\n2\n00:05:00,000 --> 00:05:10,000\nTapi ada masalah\n\n3\n00:09:50,000 --> 00:10:00,000\nTerima kasih sudah menonton\n",
    )?;
    let output = temp_dir.path().join("chapters.txt");
    let controller = Controller::with_config(Config::default())?;

    let markers = controller.chapters(&transcript, Some(&output))?;

    assert!(!markers.is_empty());
    assert_eq!(markers[0].time, 0.0);
    let content = std::fs::read_to_string(&output)?;
    assert!(content.contains("00:00 - Pembuka"));
    Ok(())
}

#[test]
fn test_controller_loadBatchItems_fromListFile_shouldNumberItems() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let list = common::create_test_file(temp_dir.path(), "batch.txt", "https://example.com/v/1\n# skip\n/videos/2.mp4\n")?;

    let items = Controller::load_batch_items(&list)?;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, "item_001");
    assert_eq!(items[1].source, "/videos/2.mp4");

    let empty = common::create_test_file(temp_dir.path(), "empty.txt", "# nothing yet\n")?;
    assert!(Controller::load_batch_items(&empty).is_err());
    Ok(())
}

#[tokio::test]
async fn test_controller_runBatch_withDefaultConfig_shouldPassLocalFilesThrough() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_file(temp_dir.path(), "talk.mp4", "frames")?;
    let output_dir = temp_dir.path().join("out");
    let controller = Controller::with_config(config_with_output(&output_dir))?;

    let report = controller.run_batch(&video, &CancellationFlag::new()).await?;

    let item = &report.items[0];
    assert_eq!(item.overall_status, ItemStatus::Success);
    assert_eq!(item.per_stage[0].status, StageStatus::Skipped);
    assert_eq!(item.final_output.as_deref(), Some(video.to_string_lossy().as_ref()));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_controller_runBatch_withCopyCommands_shouldProduceOutputsAndReport() -> Result<()> {
    common::init_logging();
    let temp_dir = common::create_temp_dir()?;
    let input_dir = temp_dir.path().join("videos");
    std::fs::create_dir_all(&input_dir)?;
    common::create_test_file(&input_dir, "a.mp4", "first")?;
    common::create_test_file(&input_dir, "b.mp4", "second")?;
    let output_dir = temp_dir.path().join("out");

    let mut config = config_with_output(&output_dir);
    config.batch.max_workers = 2;
    config.stages.thumbnail = true;
    config.commands.insert(
        "download".to_string(),
        CommandTemplate::new("cp", &["{input}", "{output}"]).with_suffix("copy"),
    );
    config.commands.insert(
        "thumbnail".to_string(),
        CommandTemplate::new("cp", &["{input}", "{output}"])
            .with_suffix("thumb")
            .with_extension("jpg"),
    );
    let controller = Controller::with_config(config)?;

    let report = controller.run_batch(&input_dir, &CancellationFlag::new()).await?;

    assert_eq!(report.successful, 2);
    let first = report.item("item_001").unwrap();
    let final_output = first.final_output.clone().unwrap_or_default();
    assert!(final_output.ends_with("a_copy.mp4"));
    assert_eq!(std::fs::read_to_string(&final_output)?, "first");

    // The thumbnail is recorded but does not replace the video
    let thumbnail = first.per_stage[1].output_ref.clone().unwrap_or_default();
    assert!(thumbnail.ends_with("a_copy_thumb.jpg"));
    assert!(Path::new(&thumbnail).exists());

    let stored = JsonFileReportStore::in_dir(&output_dir, "batch_report.json").read()?;
    assert_eq!(stored, report);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_controller_runBatch_withFailingCommand_shouldRecordErrors() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let list = common::create_test_file(temp_dir.path(), "batch.txt", "one.mp4\ntwo.mp4\n")?;
    let output_dir = temp_dir.path().join("out");

    let mut config = config_with_output(&output_dir);
    config.commands.insert("download".to_string(), CommandTemplate::new("false", &[]));
    let controller = Controller::with_config(config)?;

    let report = controller.run_batch(&list, &CancellationFlag::new()).await?;

    assert_eq!(report.failed, 2);
    for item in &report.items {
        assert!(item.error.as_deref().unwrap_or_default().contains("download"));
    }
    assert!(output_dir.join("batch_report.json").exists());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_controller_runBatch_withDatabase_shouldStoreReportInSqlite() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let video = common::create_test_file(temp_dir.path(), "talk.mp4", "frames")?;
    let database_path = temp_dir.path().join("reports.db");

    let mut config = config_with_output(&temp_dir.path().join("out"));
    config.batch.database_path = Some(database_path.clone());
    config.commands.insert(
        "download".to_string(),
        CommandTemplate::new("cp", &["{input}", "{output}"]).with_suffix("copy"),
    );
    let controller = Controller::with_config(config)?;

    let report = controller.run_batch(&video, &CancellationFlag::new()).await?;

    let repository = vidopt::database::ReportRepository::new(vidopt::database::DatabaseConnection::new(&database_path)?);
    assert_eq!(repository.get_report(&report.batch_id).await?, Some(report));
    Ok(())
}
