/*!
 * A stage that runs an external program over the item's artifact.
 *
 * The argument list is a template; `{input}`, `{output}`, `{work_dir}`,
 * `{item_id}` and `{option}` are substituted per item. The output file is
 * `<stem>_<suffix>.<ext>` inside the item's work directory.
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::errors::StageError;
use crate::file_utils::FileManager;

use super::stage::{Artifact, Stage, StageContext, StageOutcome};

// @const: stderr lines that carry no error information
const NOISE_PREFIXES: &[&str] = &[
    "ffmpeg version",
    "built with",
    "configuration:",
    "lib",
    "Input #",
    "Metadata:",
    "Duration:",
    "Chapter",
    "Stream #",
    "title",
    "encoder",
    "Output #",
    "Stream mapping:",
    "Press [q]",
];

/// How to invoke the program behind a stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandTemplate {
    /// Executable name or path
    pub program: String,

    /// Arguments, with placeholders
    #[serde(default)]
    pub args: Vec<String>,

    /// Suffix appended to the input stem to name the output
    #[serde(default)]
    pub output_suffix: String,

    /// Output extension; the input's extension when unset
    #[serde(default)]
    pub output_extension: Option<String>,

    /// The output is a by-product and the input passes on unchanged
    #[serde(default)]
    pub side_output: bool,

    /// Skip the stage when the input is already a local file
    #[serde(default)]
    pub pass_local_files: bool,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            output_suffix: String::new(),
            output_extension: None,
            side_output: false,
            pass_local_files: false,
        }
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.output_suffix = suffix.to_string();
        self
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.output_extension = Some(extension.to_string());
        self
    }

    pub fn as_side_output(mut self) -> Self {
        self.side_output = true;
        self
    }

    pub fn passing_local_files(mut self) -> Self {
        self.pass_local_files = true;
        self
    }

    /// Arguments with placeholders substituted
    pub fn render_args(&self, values: &TemplateValues) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", values.input)
                    .replace("{output}", values.output)
                    .replace("{work_dir}", values.work_dir)
                    .replace("{item_id}", values.item_id)
                    .replace("{option}", values.option)
            })
            .collect()
    }
}

/// Values substituted into a command template
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub input: &'a str,
    pub output: &'a str,
    pub work_dir: &'a str,
    pub item_id: &'a str,
    pub option: &'a str,
}

/// Runs one external program per item
#[derive(Debug, Clone)]
pub struct CommandStage {
    name: String,
    template: CommandTemplate,
    option: Option<String>,
    timeout: Option<Duration>,
}

impl CommandStage {
    pub fn new(name: impl Into<String>, template: CommandTemplate) -> Self {
        Self {
            name: name.into(),
            template,
            option: None,
            timeout: None,
        }
    }

    /// Value substituted for `{option}`
    pub fn with_option(mut self, option: Option<String>) -> Self {
        self.option = option;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Run a program to completion, capturing its output; `StageError::Timeout` past `timeout`
pub(crate) async fn run_program(
    stage: &str,
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<std::process::Output> {
    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| anyhow!("Failed to start '{}': {}", program, e))?;

    let output = child.wait_with_output();
    let Some(limit) = timeout else {
        return Ok(output.await?);
    };

    tokio::select! {
        result = output => Ok(result?),
        _ = tokio::time::sleep(limit) => Err(StageError::Timeout {
            stage: stage.to_string(),
            secs: limit.as_secs_f64(),
        }
        .into()),
    }
}

#[async_trait]
impl Stage for CommandStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: Artifact, ctx: &StageContext) -> Result<StageOutcome> {
        if self.template.pass_local_files && input.path().is_file() {
            return Ok(StageOutcome::Skipped {
                reason: format!("{} is already a local file", input),
            });
        }

        FileManager::ensure_dir(&ctx.work_dir)?;

        let output_path = FileManager::generate_output_path(
            input.path(),
            &ctx.work_dir,
            &self.template.output_suffix,
            self.template.output_extension.as_deref(),
        );
        let output = output_path.to_string_lossy().to_string();
        let work_dir = ctx.work_dir.to_string_lossy().to_string();

        let args = self.template.render_args(&TemplateValues {
            input: &input.location,
            output: &output,
            work_dir: &work_dir,
            item_id: &ctx.item_id,
            option: self.option.as_deref().unwrap_or_default(),
        });
        debug!("{}: {} {}", ctx.item_id, self.template.program, args.join(" "));

        ctx.report(0.0, &format!("{}: {}", ctx.item_id, self.name));
        let result = run_program(&self.name, &self.template.program, &args, self.timeout).await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let filtered = filter_stderr(&stderr);
            error!("{}: '{}' failed: {}", ctx.item_id, self.template.program, filtered);
            return Err(anyhow!(
                "'{}' exited with {}: {}",
                self.template.program,
                result.status,
                filtered
            ));
        }

        if !Path::new(&output).exists() {
            return Err(anyhow!("'{}' did not produce {}", self.template.program, output));
        }

        ctx.report(100.0, &format!("{}: {} done", ctx.item_id, self.name));

        if self.template.side_output {
            Ok(StageOutcome::SideOutput { output_ref: output })
        } else {
            Ok(StageOutcome::Produced(Artifact::new(output)))
        }
    }
}

/// Keep only the stderr lines that say what went wrong
pub fn filter_stderr(stderr: &str) -> String {
    let meaningful: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !NOISE_PREFIXES.iter().any(|prefix| line.starts_with(prefix)))
        .collect();

    if meaningful.is_empty() {
        "unknown error (stderr was empty after filtering)".to_string()
    } else {
        meaningful.join("\n")
    }
}
