/*!
 * Common test utilities for the vidopt test suite
 */

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use vidopt::pipeline::{Artifact, CancellationFlag, ProgressSink, Stage, StageContext, StageOutcome};
use vidopt::transcript::TranscriptSegment;

/// Route library logs to the test output; safe to call repeatedly
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Segments of an Indonesian talk with a conflict, a climax and a conclusion
pub fn sample_transcript() -> Vec<TranscriptSegment> {
    vec![
        TranscriptSegment::new(0.0, 8.0, "Halo semuanya, selamat datang di channel ini"),
        TranscriptSegment::new(8.0, 60.0, "Hari ini kita bahas cara belajar yang efektif"),
        TranscriptSegment::new(150.0, 170.0, "Tapi ada masalah besar yang sering muncul"),
        TranscriptSegment::new(300.0, 330.0, "Kemudian kita coba metode yang berbeda"),
        TranscriptSegment::new(480.0, 500.0, "Ternyata hasilnya luar biasa"),
        TranscriptSegment::new(700.0, 720.0, "Akhirnya semua berhasil"),
        TranscriptSegment::new(860.0, 900.0, "Kesimpulannya, terima kasih sudah menonton"),
    ]
}

/// One stage execution as seen by a scripted stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub item_id: String,
    pub stage: String,
    pub input: String,
}

/// Shared log of executions and lifecycle calls across scripted stages
#[derive(Debug, Default)]
pub struct ExecutionLog {
    executions: Mutex<Vec<Execution>>,
    lifecycle: Mutex<Vec<String>>,
    running: AtomicUsize,
    peak_running: AtomicUsize,
}

impl ExecutionLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn executions(&self) -> Vec<Execution> {
        self.executions.lock().clone()
    }

    pub fn executions_for(&self, item_id: &str) -> Vec<String> {
        self.executions
            .lock()
            .iter()
            .filter(|execution| execution.item_id == item_id)
            .map(|execution| execution.stage.clone())
            .collect()
    }

    /// `setup:<stage>` and `teardown:<stage>` entries in call order
    pub fn lifecycle(&self) -> Vec<String> {
        self.lifecycle.lock().clone()
    }

    /// Highest number of stage executions observed at the same time
    pub fn peak_running(&self) -> usize {
        self.peak_running.load(Ordering::SeqCst)
    }
}

/// Stage whose behavior is scripted per item
pub struct ScriptedStage {
    name: String,
    log: Arc<ExecutionLog>,
    fail_on: Option<String>,
    cancel_on: Option<(String, CancellationFlag)>,
    fail_setup: bool,
    delay: Duration,
}

impl ScriptedStage {
    pub fn new(name: &str, log: &Arc<ExecutionLog>) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            fail_on: None,
            cancel_on: None,
            fail_setup: false,
            delay: Duration::ZERO,
        }
    }

    /// Fail when running for `item_id`
    pub fn failing_on(mut self, item_id: &str) -> Self {
        self.fail_on = Some(item_id.to_string());
        self
    }

    /// Request cancellation while running for `item_id`
    pub fn cancelling_on(mut self, item_id: &str, flag: &CancellationFlag) -> Self {
        self.cancel_on = Some((item_id.to_string(), flag.clone()));
        self
    }

    pub fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn into_arc(self) -> Arc<dyn Stage> {
        Arc::new(self)
    }
}

#[async_trait]
impl Stage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn setup(&self) -> Result<()> {
        self.log.lifecycle.lock().push(format!("setup:{}", self.name));
        if self.fail_setup {
            return Err(anyhow!("resource unavailable"));
        }
        Ok(())
    }

    async fn execute(&self, input: Artifact, ctx: &StageContext) -> Result<StageOutcome> {
        self.log.executions.lock().push(Execution {
            item_id: ctx.item_id.clone(),
            stage: self.name.clone(),
            input: input.location.clone(),
        });

        let running = self.log.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.peak_running.fetch_max(running, Ordering::SeqCst);

        ctx.report(50.0, &format!("{}: {} halfway", ctx.item_id, self.name));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.log.running.fetch_sub(1, Ordering::SeqCst);

        if let Some((item_id, flag)) = &self.cancel_on {
            if *item_id == ctx.item_id {
                flag.cancel();
            }
        }

        if self.fail_on.as_deref() == Some(ctx.item_id.as_str()) {
            return Err(anyhow!("{} could not process {}", self.name, input));
        }

        Ok(StageOutcome::Produced(Artifact::new(format!("{}+{}", input, self.name))))
    }

    async fn teardown(&self) -> Result<()> {
        self.log.lifecycle.lock().push(format!("teardown:{}", self.name));
        Ok(())
    }
}

/// One progress callback
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressCall {
    pub item_index: usize,
    pub total_items: usize,
    pub percent: f64,
    pub message: String,
}

/// Sink that records every callback
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<ProgressCall>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ProgressCall> {
        self.calls.lock().clone()
    }

    pub fn percents(&self) -> Vec<f64> {
        self.calls.lock().iter().map(|call| call.percent).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn on_progress(&self, item_index: usize, total_items: usize, percent: f64, message: &str) {
        self.calls.lock().push(ProgressCall {
            item_index,
            total_items,
            percent,
            message: message.to_string(),
        });
    }
}
