use std::process;

use anyhow::{Context, Result};
use tracing::{error, info_span};
use tracing_subscriber::EnvFilter;

use colmap_brush_rs::{Config, Pipeline, PipelineError};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .without_time()
        .init();

    let _span = info_span!("PIPELINE").entered();

    if let Err(err) = run() {
        error!("{err:#}");
        let code = err
            .downcast_ref::<PipelineError>()
            .map_or(1, PipelineError::exit_code);
        process::exit(code);
    }
}

fn run() -> Result<()> {
    let config = Config::new();
    let project_dir = config.project_dir.clone();

    Pipeline::with_system_runner(config)
        .run()
        .with_context(|| format!("Pipeline aborted for project {}", project_dir.display()))
}
