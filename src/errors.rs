use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the reconstruction pipeline.
///
/// Every variant aborts the run. The process exit status is derived from the
/// variant through [`PipelineError::exit_code`], so a failing external tool
/// hands its own status back to the caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{what} does not exist: {path:?}")]
    MissingPath { what: String, path: PathBuf },

    #[error("Command not found: {program}. Ensure it is in PATH or provide full path")]
    MissingExecutable { program: String },

    #[error("Command failed with exit code {code}: {command}")]
    CommandFailed { command: String, code: i32 },

    #[error("{stage}: expected {paths:?} to exist")]
    MissingStageOutput { stage: String, paths: Vec<PathBuf> },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Exit status the process should terminate with.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::CommandFailed { code, .. } => *code,
            _ => 1,
        }
    }

    pub(crate) fn file_system(
        path: impl Into<PathBuf>,
        operation: &str,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            path: path.into(),
            operation: operation.to_string(),
            source,
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Code that knows the path and operation should build
/// [`PipelineError::FileSystem`] directly; this is only a fallback.
impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}
