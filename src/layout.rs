use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, Result};

/// Paths inside a project directory, as COLMAP and Brush lay them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub project_dir: PathBuf,
    pub database: PathBuf,
    pub sparse_dir: PathBuf,
    pub dense_dir: PathBuf,
    pub brush_exports: PathBuf,
}

impl ProjectLayout {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        Self {
            database: project_dir.join("database.db"),
            sparse_dir: project_dir.join("sparse"),
            dense_dir: project_dir.join("dense"),
            brush_exports: project_dir.join("brush_exports"),
            project_dir,
        }
    }

    /// First model written by the mapper.
    pub fn sparse_model(&self) -> PathBuf {
        self.sparse_dir.join("0")
    }

    /// Dataset root handed to Brush.
    pub fn brush_data(&self) -> PathBuf {
        self.dense_dir.join("0")
    }

    pub fn brush_images(&self) -> PathBuf {
        self.brush_data().join("images")
    }

    pub fn brush_sparse(&self) -> PathBuf {
        self.brush_data().join("sparse")
    }

    pub fn brush_masks(&self) -> PathBuf {
        self.brush_data().join("masks")
    }

    /// Creates the project, `sparse/` and `dense/` directories. Safe to call
    /// on an existing project.
    pub fn prepare(&self) -> Result<()> {
        for dir in [&self.project_dir, &self.sparse_dir, &self.dense_dir] {
            create_dir(dir)?;
        }
        Ok(())
    }

    pub fn prepare_exports(&self) -> Result<()> {
        create_dir(&self.brush_exports)
    }

    pub fn require_sparse_model(&self) -> Result<()> {
        require_dirs("mapper may have failed", [self.sparse_model()])
    }

    pub fn require_undistorted_dataset(&self) -> Result<()> {
        require_dirs("image_undistorter", [self.brush_images(), self.brush_sparse()])
    }
}

pub(crate) fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| PipelineError::file_system(dir, "create directory", e))
}

fn require_dirs<const N: usize>(stage: &str, paths: [PathBuf; N]) -> Result<()> {
    if paths.iter().all(|path| path.is_dir()) {
        return Ok(());
    }
    Err(PipelineError::MissingStageOutput {
        stage: stage.to_string(),
        paths: paths.into(),
    })
}
