use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required artifact is missing before a stage starts.
    #[error("input not found: {path}")]
    InputNotFound { path: PathBuf },

    /// An external tool exited non-zero.
    #[error("{tool} exited with {status}: {stderr}")]
    ExternalToolFailure {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("{tool} timed out after {limit:?} and was killed")]
    Timeout { tool: String, limit: Duration },

    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no scoring-model files (*.{extension}) found in {dir}")]
    NoModelFilesFound { dir: PathBuf, extension: String },

    #[error("stage {stage} did not produce {path}")]
    ArtifactNotProduced { stage: String, path: PathBuf },

    #[error("malformed {what}: {message}")]
    Malformed { what: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn input_not_found(path: impl Into<PathBuf>) -> Self {
        Self::InputNotFound { path: path.into() }
    }

    pub fn malformed(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            what: what.into(),
            message: message.into(),
        }
    }
}

/// Terminal failure of a run: the stage that aborted it and why.
#[derive(Debug, Error)]
#[error("stage '{stage}' failed: {source}")]
pub struct StageFailure {
    pub stage: &'static str,
    #[source]
    pub source: PipelineError,
}
