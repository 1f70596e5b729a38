use crate::command::Invocation;
use crate::errors::Result;
use std::path::PathBuf;

/// Runs external programs on behalf of the pipeline.
///
/// The pipeline only ever talks to the outside world through this trait, so
/// tests can swap in a runner that records invocations instead of spawning
/// COLMAP or Brush.
pub trait CommandRunner {
    /// Run `invocation` to completion.
    ///
    /// Returns [`PipelineError::MissingExecutable`](crate::PipelineError::MissingExecutable)
    /// when the program cannot be started and
    /// [`PipelineError::CommandFailed`](crate::PipelineError::CommandFailed) on a
    /// non-zero exit.
    fn run(&self, invocation: &Invocation) -> Result<()>;

    /// Resolve `program` to an executable path, if it can be found.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}
