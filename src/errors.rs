/*!
 * Error types for the vidopt application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors returned by the interval planner for malformed input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// Interval bounds are inverted, non-finite or outside the timeline
    #[error("Invalid range [{start}, {end}]: {reason}")]
    InvalidRange {
        /// Start of the offending range in seconds
        start: f64,
        /// End of the offending range in seconds
        end: f64,
        /// Why the range was rejected
        reason: String,
    },

    /// A planning parameter is outside its allowed domain
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Offending value
        value: f64,
    },
}

impl PlanError {
    pub(crate) fn invalid_range(start: f64, end: f64, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            start,
            end,
            reason: reason.into(),
        }
    }
}

/// Chapter synthesis conditions a caller may want to surface
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChapterError {
    /// The transcript had no segments; synthesis yields no markers
    #[error("Transcript is empty, no chapters generated")]
    EmptyInput,
}

/// Errors raised by (or on behalf of) a pipeline stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    /// The stage ran and reported a failure
    #[error("Stage '{stage}' failed: {message}")]
    Execution {
        /// Name of the failing stage
        stage: String,
        /// Original failure message
        message: String,
    },

    /// The stage did not finish in time
    #[error("Stage '{stage}' timed out after {secs}s")]
    Timeout {
        /// Name of the stage
        stage: String,
        /// Timeout that elapsed, in seconds
        secs: f64,
    },

    /// The stage could not acquire its resources before the run
    #[error("Stage '{stage}' setup failed: {message}")]
    Setup {
        /// Name of the stage
        stage: String,
        /// Setup failure message
        message: String,
    },
}

impl StageError {
    /// Wrap an arbitrary failure coming out of a stage implementation
    pub fn execution(stage: &str, error: &anyhow::Error) -> Self {
        Self::Execution {
            stage: stage.to_string(),
            message: format!("{:#}", error),
        }
    }

    /// Name of the stage this error belongs to
    pub fn stage(&self) -> &str {
        match self {
            Self::Execution { stage, .. } | Self::Timeout { stage, .. } | Self::Setup { stage, .. } => stage,
        }
    }
}

/// Fatal errors detected while setting up a batch, before any item starts
#[derive(Error, Debug)]
pub enum BatchError {
    /// No stage is enabled, there is nothing to run
    #[error("No pipeline stages are enabled")]
    EmptyStageList,

    /// The worker count must be at least one
    #[error("Invalid worker count: {0}")]
    InvalidWorkerCount(usize),

    /// A stage failed to acquire its resources
    #[error("Batch setup failed: {0}")]
    Setup(#[from] StageError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the interval planner
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Error from chapter synthesis
    #[error("Chapter error: {0}")]
    Chapter(#[from] ChapterError),

    /// Error from batch setup
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
