use crate::command::Invocation;
use crate::config::Config;
use crate::layout::ProjectLayout;

/// Environment variable Brush's compute backend reads to pick a GPU.
pub const GPU_DEVICE_ENV: &str = "CUBECL_DEFAULT_DEVICE";

/// Stage 5: train on `dense/0` and export into `brush_exports/`.
///
/// Evaluation runs on the export cadence so every exported snapshot has
/// matching eval images on disk.
pub fn train(config: &Config, layout: &ProjectLayout) -> Invocation {
    let invocation = Invocation::new(&config.brush_bin)
        .arg(layout.brush_data())
        .opt("--total-steps", config.brush_total_steps)
        .opt("--max-resolution", config.brush_max_resolution())
        .opt("--max-splats", config.brush_max_splats)
        .opt("--eval-split-every", config.brush_eval_split_every)
        .opt("--export-every", config.brush_export_every)
        .path_opt("--export-path", &layout.brush_exports)
        .opt("--export-name", &config.brush_export_name)
        .opt("--eval-every", config.brush_export_every)
        .arg("--eval-save-to-disk");

    match config.gpu_device() {
        Some(device) => invocation.env(GPU_DEVICE_ENV, device),
        None => invocation,
    }
}
