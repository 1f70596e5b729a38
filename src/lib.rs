pub mod brush;
pub mod colmap;
pub mod command;
pub mod config;
pub mod errors;
pub mod layout;
pub mod masks;
pub mod traits;

pub mod mocks;

use tracing::info;

pub use command::{Invocation, SystemRunner};
pub use config::Config;
pub use errors::{PipelineError, Result};
pub use layout::ProjectLayout;
pub use masks::{DenseMasks, MaskDiscovery};
pub use traits::*;

/// Number of external stages, used for `n/5` progress lines.
pub const STAGES: usize = 5;

/// Drives COLMAP and Brush over one project directory.
pub struct Pipeline<R: CommandRunner> {
    runner: R,
    config: Config,
    layout: ProjectLayout,
}

impl<R: CommandRunner> Pipeline<R> {
    pub fn new(runner: R, config: Config) -> Self {
        let layout = ProjectLayout::new(&config.project_dir);
        Self {
            runner,
            config,
            layout,
        }
    }

    pub const fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs every stage in order, stopping at the first failure.
    pub fn run(&self) -> Result<()> {
        let config = &self.config;
        let layout = &self.layout;

        if !config.images_dir.exists() {
            return Err(PipelineError::MissingPath {
                what: "IMAGES_DIR".to_string(),
                path: config.images_dir.clone(),
            });
        }

        layout.prepare()?;

        info!("Project: {}", layout.project_dir.display());
        info!("Images:  {}", config.images_dir.display());

        let masks = masks::discover_colmap_masks(
            config.masks_dir.as_deref(),
            &config.images_dir,
            &config.mask_ext,
        )?;

        self.stage(1, "COLMAP: feature extraction");
        self.runner
            .run(&colmap::feature_extractor(config, layout, &masks))?;

        self.stage(2, "COLMAP: exhaustive matching");
        self.runner.run(&colmap::exhaustive_matcher(config, layout))?;

        self.stage(3, "COLMAP: mapper (sparse SfM)");
        self.runner.run(&colmap::mapper(config, layout))?;
        layout.require_sparse_model()?;

        self.stage(
            4,
            "COLMAP: image_undistorter (creates dense/0/images + dense/0/sparse)",
        );
        self.runner.run(&colmap::image_undistorter(config, layout))?;
        layout.require_undistorted_dataset()?;

        info!("Dataset for Brush: {}", layout.brush_data().display());

        masks::stage_dense_masks(
            config.dense_masks_dir.as_deref(),
            &layout.brush_masks(),
            &config.mask_ext,
        )?;

        if config.brush_enabled() {
            self.stage(5, "BRUSH: train + export");
            self.train()?;
        } else {
            info!("Skipping Brush training (run_brush=0).");
        }

        info!("DONE");
        Ok(())
    }

    fn stage(&self, n: usize, label: &str) {
        info!("{n}/{STAGES} {label}");
    }

    fn train(&self) -> Result<()> {
        let config = &self.config;

        if self.runner.locate(&config.brush_bin).is_none() {
            return Err(PipelineError::MissingExecutable {
                program: config.brush_bin.clone(),
            });
        }

        self.layout.prepare_exports()?;

        let invocation = brush::train(config, &self.layout);
        if let Some(device) = invocation.env_var(brush::GPU_DEVICE_ENV) {
            info!(
                "Using GPU device via {}={device}",
                brush::GPU_DEVICE_ENV
            );
        }

        self.runner.run(&invocation)?;
        info!("Brush exports: {}", self.layout.brush_exports.display());
        Ok(())
    }
}

impl Pipeline<SystemRunner> {
    pub fn with_system_runner(config: Config) -> Self {
        Self::new(SystemRunner, config)
    }
}
