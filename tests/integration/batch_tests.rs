/*!
 * Integration tests for batch orchestration: failure isolation,
 * cancellation, concurrency, stage lifecycle and progress
 */

use std::time::Duration;

use vidopt::errors::{BatchError, StageError};
use vidopt::pipeline::{
    BatchItem, BatchOrchestrator, CancellationFlag, ItemStatus, NoProgress, OrchestratorConfig, StageRegistry,
    StageStatus,
};

use crate::common::{self, ExecutionLog, RecordingSink, ScriptedStage};

fn orchestrator(dir: &tempfile::TempDir, workers: usize) -> BatchOrchestrator {
    BatchOrchestrator::new(OrchestratorConfig::new(dir.path()).with_max_workers(workers))
}

fn sources(count: usize) -> Vec<BatchItem> {
    BatchItem::from_sources((1..=count).map(|n| format!("/videos/talk_{}.mp4", n)))
}

#[tokio::test]
async fn test_runBatch_withFailingStage_shouldIsolateTheItem() -> anyhow::Result<()> {
    common::init_logging();
    let dir = common::create_temp_dir()?;
    let log = ExecutionLog::new();
    let registry = StageRegistry::new()
        .with_stage(ScriptedStage::new("extract", &log).into_arc(), true)
        .with_stage(ScriptedStage::new("edit", &log).failing_on("item_002").into_arc(), true)
        .with_stage(ScriptedStage::new("publish", &log).into_arc(), true);

    let report = orchestrator(&dir, 1)
        .run_batch(sources(3), &registry, &NoProgress, &CancellationFlag::new())
        .await?;

    assert_eq!(report.total_items, 3);
    assert_eq!(report.successful, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.cancelled, 0);

    let failed = report.item("item_002").unwrap();
    assert_eq!(failed.overall_status, ItemStatus::Error);
    assert_eq!(failed.per_stage.len(), 2);
    assert_eq!(failed.per_stage[1].status, StageStatus::Failed);
    assert_eq!(failed.failed_stage().map(|stage| stage.stage_name.as_str()), Some("edit"));
    assert!(failed.error.as_deref().unwrap_or_default().contains("edit"));
    assert!(failed.final_output.is_none());

    assert_eq!(log.executions_for("item_002"), vec!["extract", "edit"]);
    assert_eq!(log.executions_for("item_003"), vec!["extract", "edit", "publish"]);
    Ok(())
}

#[tokio::test]
async fn test_runBatch_shouldChainArtifactsBetweenStages() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ExecutionLog::new();
    let registry = StageRegistry::new()
        .with_stage(ScriptedStage::new("download", &log).into_arc(), true)
        .with_stage(ScriptedStage::new("audio_enhance", &log).into_arc(), false)
        .with_stage(ScriptedStage::new("remove_silence", &log).into_arc(), true);

    let report = orchestrator(&dir, 1)
        .run_batch(sources(1), &registry, &NoProgress, &CancellationFlag::new())
        .await?;

    let inputs: Vec<String> = log.executions().into_iter().map(|execution| execution.input).collect();
    assert_eq!(inputs, vec!["/videos/talk_1.mp4", "/videos/talk_1.mp4+download"]);
    assert_eq!(
        report.items[0].final_output.as_deref(),
        Some("/videos/talk_1.mp4+download+remove_silence")
    );
    // Disabled stages leave no trace in the report
    assert!(report.items[0].per_stage.iter().all(|stage| stage.stage_name != "audio_enhance"));
    Ok(())
}

#[tokio::test]
async fn test_runBatch_withEveryItemFailing_shouldStillReport() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ExecutionLog::new();
    let registry = StageRegistry::new()
        .with_stage(ScriptedStage::new("download", &log).failing_on("item_002").into_arc(), true)
        .with_stage(ScriptedStage::new("encode", &log).failing_on("item_001").into_arc(), true);

    let report = orchestrator(&dir, 2)
        .run_batch(sources(2), &registry, &NoProgress, &CancellationFlag::new())
        .await?;

    assert_eq!(report.failed, 2);
    assert_eq!(report.successful, 0);
    assert_eq!(report.item("item_001").unwrap().failed_stage().unwrap().stage_name, "encode");
    assert_eq!(report.item("item_002").unwrap().failed_stage().unwrap().stage_name, "download");
    Ok(())
}

#[tokio::test]
async fn test_runBatch_withCancellationDuringFirstItem_shouldCancelTheRest() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ExecutionLog::new();
    let cancel = CancellationFlag::new();
    let registry = StageRegistry::new()
        .with_stage(ScriptedStage::new("download", &log).cancelling_on("item_001", &cancel).into_arc(), true)
        .with_stage(ScriptedStage::new("encode", &log).into_arc(), true);

    let report = orchestrator(&dir, 1)
        .run_batch(sources(5), &registry, &NoProgress, &cancel)
        .await?;

    // The running item finishes all its stages
    let first = report.item("item_001").unwrap();
    assert_eq!(first.overall_status, ItemStatus::Success);
    assert_eq!(first.per_stage.len(), 2);

    assert_eq!(report.cancelled, 4);
    assert!(report.was_cancelled());
    for item in &report.items[1..] {
        assert_eq!(item.overall_status, ItemStatus::Cancelled);
        assert!(item.per_stage.is_empty());
        assert!(log.executions_for(&item.item_id).is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_runBatch_withCancelledFlag_shouldStartNothing() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ExecutionLog::new();
    let cancel = CancellationFlag::new();
    cancel.cancel();
    let registry = StageRegistry::new().with_stage(ScriptedStage::new("download", &log).into_arc(), true);

    let report = orchestrator(&dir, 2)
        .run_batch(sources(3), &registry, &NoProgress, &cancel)
        .await?;

    assert_eq!(report.cancelled, 3);
    assert!(log.executions().is_empty());
    // Stages are still released
    assert_eq!(log.lifecycle(), vec!["setup:download", "teardown:download"]);
    Ok(())
}

#[tokio::test]
async fn test_runBatch_withSeveralWorkers_shouldOverlapItems() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ExecutionLog::new();
    let registry = StageRegistry::new()
        .with_stage(ScriptedStage::new("encode", &log).with_delay(Duration::from_millis(50)).into_arc(), true)
        .with_stage(ScriptedStage::new("thumbnail", &log).into_arc(), true);
    let sink = RecordingSink::new();

    let report = orchestrator(&dir, 3)
        .run_batch(sources(6), &registry, &sink, &CancellationFlag::new())
        .await?;

    assert_eq!(report.successful, 6);
    assert!(log.peak_running() > 1, "items did not overlap");
    assert!(log.peak_running() <= 3);

    // Items come back in batch order regardless of completion order
    let indexes: Vec<usize> = report.items.iter().map(|item| item.index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3, 4, 5]);

    let percents = sink.percents();
    assert!(percents.windows(2).all(|pair| pair[1] >= pair[0]), "progress went backwards: {:?}", percents);
    assert_eq!(percents.last().copied(), Some(100.0));
    Ok(())
}

#[tokio::test]
async fn test_runBatch_progress_shouldUseZeroBasedItemIndexes() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ExecutionLog::new();
    let registry = StageRegistry::new().with_stage(ScriptedStage::new("encode", &log).into_arc(), true);
    let sink = RecordingSink::new();

    orchestrator(&dir, 1)
        .run_batch(sources(2), &registry, &sink, &CancellationFlag::new())
        .await?;

    let calls = sink.calls();
    assert_eq!(calls.first().map(|call| call.item_index), Some(0));
    assert!(calls.iter().all(|call| call.item_index < 2 && call.total_items == 2));
    assert!(calls.iter().any(|call| call.item_index == 1));
    assert!(calls.iter().all(|call| (0.0..=100.0).contains(&call.percent)));

    // Halfway through the only stage of the first item is a quarter of the batch
    let halfway = calls
        .iter()
        .find(|call| call.message.contains("item_001: encode halfway"))
        .unwrap();
    assert!((halfway.percent - 25.0).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn test_runBatch_withSetupFailure_shouldReleaseEarlierStagesAndRunNothing() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ExecutionLog::new();
    let registry = StageRegistry::new()
        .with_stage(ScriptedStage::new("download", &log).into_arc(), true)
        .with_stage(ScriptedStage::new("subtitle", &log).failing_setup().into_arc(), true)
        .with_stage(ScriptedStage::new("encode", &log).into_arc(), true);

    let err = orchestrator(&dir, 1)
        .run_batch(sources(2), &registry, &NoProgress, &CancellationFlag::new())
        .await
        .unwrap_err();

    match err {
        BatchError::Setup(StageError::Setup { stage, message }) => {
            assert_eq!(stage, "subtitle");
            assert!(message.contains("resource unavailable"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(log.lifecycle(), vec!["setup:download", "setup:subtitle", "teardown:download"]);
    assert!(log.executions().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_runBatch_shouldTearDownInReverseOrder() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ExecutionLog::new();
    let registry = StageRegistry::new()
        .with_stage(ScriptedStage::new("download", &log).into_arc(), true)
        .with_stage(ScriptedStage::new("encode", &log).into_arc(), true);

    orchestrator(&dir, 1)
        .run_batch(sources(1), &registry, &NoProgress, &CancellationFlag::new())
        .await?;

    assert_eq!(
        log.lifecycle(),
        vec!["setup:download", "setup:encode", "teardown:encode", "teardown:download"]
    );
    Ok(())
}

#[tokio::test]
async fn test_runBatch_withNoEnabledStages_shouldFailBeforeStarting() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ExecutionLog::new();

    let empty = StageRegistry::new();
    let all_disabled = StageRegistry::new().with_stage(ScriptedStage::new("download", &log).into_arc(), false);

    for registry in [empty, all_disabled] {
        let err = orchestrator(&dir, 1)
            .run_batch(sources(1), &registry, &NoProgress, &CancellationFlag::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::EmptyStageList));
    }
    assert!(log.lifecycle().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_runBatch_withNoItems_shouldReturnEmptyReport() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ExecutionLog::new();
    let registry = StageRegistry::new().with_stage(ScriptedStage::new("download", &log).into_arc(), true);

    let report = orchestrator(&dir, 1)
        .run_batch(Vec::new(), &registry, &NoProgress, &CancellationFlag::new())
        .await?;

    assert_eq!(report.total_items, 0);
    assert!(report.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_runBatch_sharedRegistry_shouldServeConsecutiveBatches() -> anyhow::Result<()> {
    let dir = common::create_temp_dir()?;
    let log = ExecutionLog::new();
    let registry = StageRegistry::new().with_stage(ScriptedStage::new("download", &log).into_arc(), true);
    let orchestrator = orchestrator(&dir, 2);

    let first = orchestrator
        .run_batch(sources(2), &registry, &NoProgress, &CancellationFlag::new())
        .await?;
    let second = orchestrator
        .run_batch(sources(2), &registry, &NoProgress, &CancellationFlag::new())
        .await?;

    assert_ne!(first.batch_id, second.batch_id);
    assert_eq!(log.executions().len(), 4);
    Ok(())
}
