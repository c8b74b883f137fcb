// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use vidopt::app_config::{self, Config};
use vidopt::chapters::format_timestamps;
use vidopt::file_utils::FileManager;
use vidopt::pipeline::CancellationFlag;
use vidopt::timeline::KeepPlan;
use vidopt::Controller;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Plan keep intervals from cuts (JSON array or silence detector log)
    Plan {
        /// Cuts file: `[{"start": .., "end": ..}]` JSON or silencedetect output
        #[arg(value_name = "CUTS_PATH")]
        cuts_path: PathBuf,

        /// Total duration of the source, in seconds
        #[arg(short, long)]
        duration: f64,

        /// Context kept on each side of a cut, in seconds
        #[arg(short, long)]
        padding: Option<f64>,

        /// Shortest keep interval, in seconds
        #[arg(short, long)]
        min_keep: Option<f64>,

        /// Write the plan JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Move a hook segment to the front of the timeline
    Hook {
        /// Total duration of the source, in seconds
        #[arg(short, long, required_unless_present = "plan")]
        duration: Option<f64>,

        /// Hook start, in seconds
        #[arg(short, long)]
        start: f64,

        /// Hook end, in seconds
        #[arg(short, long)]
        end: f64,

        /// Existing keep plan to reorder; hook bounds are then output positions
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Write the plan JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate YouTube chapters from a transcript (SRT or JSON)
    Chapters {
        /// Transcript file
        #[arg(value_name = "TRANSCRIPT_PATH")]
        transcript_path: PathBuf,

        /// Transcript language code (e.g., 'id', 'en')
        #[arg(short, long)]
        language: Option<String>,

        /// Save the chapter file here as well
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the configured stages over a list file or a directory of videos
    Batch {
        /// List file (one source per line) or directory
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Items processed at the same time
        #[arg(short, long)]
        workers: Option<usize>,

        /// Parent directory of per-item outputs
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Store the report in SQLite; without a path, in the user data directory
        #[arg(long, value_name = "DB_PATH", num_args = 0..=1)]
        database: Option<Option<PathBuf>>,
    },

    /// Generate shell completions for vidopt
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// vidopt - video optimization pipeline
///
/// Plans silence cuts and hooks, synthesizes chapters, and runs batches of
/// videos through configurable processing stages.
#[derive(Parser, Debug)]
#[command(name = "vidopt")]
#[command(version)]
#[command(about = "Video optimization pipeline")]
#[command(long_about = "vidopt plans edits to talking-head videos and runs them over batches.

EXAMPLES:
    vidopt plan silence.log -d 620.5            # Keep plan from silencedetect output
    vidopt plan cuts.json -d 300 -p 0.2 -m 0.5  # Custom padding and minimum keep
    vidopt hook -d 600 -s 245 -e 260            # Put 4:05-4:20 first
    vidopt chapters talk.srt -l en -o ch.txt    # Chapters for an English transcript
    vidopt batch videos.txt -w 2                # Process a list with two workers
    vidopt batch videos/ --database             # Keep the report in the default SQLite database
    vidopt completions bash > vidopt.bash       # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation, filtered by the global max level
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color code for log level
    fn get_color_for_level(level: Level) -> u8 {
        match level {
            Level::Error => 31,
            Level::Warn => 33,
            Level::Info => 32,
            Level::Debug => 36,
            Level::Trace => 35,
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let emoji = Self::get_emoji_for_level(record.level());

            let _ = writeln!(
                std::io::stderr(),
                "\x1B[1;{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                emoji,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "vidopt", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = cli.log_level {
        log::set_max_level(app_config::LogLevel::from(level).into());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    match cli.log_level {
        Some(level) => config.log_level = level.into(),
        None => log::set_max_level(config.log_level.into()),
    }

    match cli.command {
        Commands::Plan {
            cuts_path,
            duration,
            padding,
            min_keep,
            output,
        } => {
            if let Some(padding) = padding {
                config.planner.padding_secs = padding;
            }
            if let Some(min_keep) = min_keep {
                config.planner.min_keep_secs = min_keep;
            }
            let controller = Controller::with_config(config)?;
            let plan = controller.plan(&cuts_path, duration)?;
            emit_plan(&plan, output.as_deref())
        }
        Commands::Hook {
            duration,
            start,
            end,
            plan,
            output,
        } => {
            let controller = Controller::with_config(config)?;
            let base = match plan {
                Some(path) => {
                    let content = FileManager::read_to_string(&path)?;
                    let plan: KeepPlan = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse keep plan: {:?}", path))?;
                    Some(plan)
                }
                None => None,
            };
            let promoted = controller.hook(base.as_ref(), duration, start, end)?;
            emit_plan(&promoted, output.as_deref())
        }
        Commands::Chapters {
            transcript_path,
            language,
            output,
        } => {
            if let Some(language) = language {
                config.chapters.language = language;
            }
            let controller = Controller::with_config(config)?;
            let markers = controller.chapters(&transcript_path, output.as_deref())?;
            println!("{}", format_timestamps(&markers));
            Ok(())
        }
        Commands::Batch {
            input_path,
            workers,
            output_dir,
            database,
        } => {
            if let Some(workers) = workers {
                config.batch.max_workers = workers;
            }
            if let Some(output_dir) = output_dir {
                config.batch.output_dir = output_dir;
            }
            if let Some(path) = database {
                config.batch.use_database(path)?;
            }
            let controller = Controller::with_config(config)?;

            let cancel = CancellationFlag::new();
            let flag = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, finishing items already running...");
                    flag.cancel();
                }
            });

            let report = controller.run_batch(&input_path, &cancel).await?;
            if report.was_cancelled() {
                warn!("Batch cancelled: {} items did not run", report.cancelled);
            }
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

// Print a plan as JSON, or save it
fn emit_plan(plan: &KeepPlan, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(plan).context("Failed to serialize keep plan")?;
    match output {
        Some(path) => {
            FileManager::write_to_file(path, &json)?;
            info!("Plan saved to {:?}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}
