use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use crate::command::Invocation;
use crate::errors::{PipelineError, Result};
use crate::layout::ProjectLayout;
use crate::traits::CommandRunner;

type Effect = Box<dyn Fn(&Invocation) -> Result<()>>;

/// Command runner for tests.
///
/// Records every invocation instead of spawning it. Side effects (the
/// directories COLMAP would write) are opt-in via [`RecordingRunner::with_effect`].
#[derive(Default)]
pub struct RecordingRunner {
    calls: RefCell<Vec<Invocation>>,
    effects: Vec<Effect>,
    failures: Vec<(String, i32)>,
    missing: HashSet<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_effect(mut self, effect: impl Fn(&Invocation) -> Result<()> + 'static) -> Self {
        self.effects.push(Box::new(effect));
        self
    }

    /// Makes any invocation whose first argument is `step` exit with `code`.
    pub fn failing_on(mut self, step: &str, code: i32) -> Self {
        self.failures.push((step.to_string(), code));
        self
    }

    /// Makes `program` unresolvable, both for `locate` and `run`.
    pub fn without_program(mut self, program: &str) -> Self {
        self.missing.insert(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// First argument of each recorded call (`feature_extractor`, `mapper`, ...).
    pub fn steps(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|call| call.args_lossy().into_iter().next().unwrap_or_default())
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, invocation: &Invocation) -> Result<()> {
        if self.missing.contains(&invocation.program) {
            return Err(PipelineError::MissingExecutable {
                program: invocation.program.clone(),
            });
        }

        self.calls.borrow_mut().push(invocation.clone());

        let step = invocation.args_lossy().into_iter().next().unwrap_or_default();
        if let Some((_, code)) = self.failures.iter().find(|(s, _)| *s == step) {
            return Err(PipelineError::CommandFailed {
                command: invocation.to_string(),
                code: *code,
            });
        }

        self.effects.iter().try_for_each(|effect| effect(invocation))
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        (!self.missing.contains(program)).then(|| PathBuf::from(program))
    }
}

/// Effect that writes the directories a successful COLMAP run leaves
/// behind: `sparse/0` after `mapper`, `dense/0/{images,sparse}` after
/// `image_undistorter`.
pub fn colmap_outputs(layout: ProjectLayout) -> impl Fn(&Invocation) -> Result<()> {
    move |invocation| {
        let dirs = match invocation.args.first().and_then(|arg| arg.to_str()) {
            Some("mapper") => vec![layout.sparse_model()],
            Some("image_undistorter") => vec![layout.brush_images(), layout.brush_sparse()],
            _ => Vec::new(),
        };
        for dir in dirs {
            fs::create_dir_all(&dir).map_err(|e| PipelineError::file_system(&dir, "mock output", e))?;
        }
        Ok(())
    }
}
