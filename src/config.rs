use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// COLMAP -> Brush pipeline: photos in, trained Gaussian splat out.
#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None, rename_all = "snake_case")]
pub struct Config {
    /// Path to project directory
    #[arg(long)]
    pub project_dir: PathBuf,

    /// Path to original images
    #[arg(long)]
    pub images_dir: PathBuf,

    /// Name or path of COLMAP binary
    #[arg(long, default_value = "colmap")]
    pub colmap_bin: String,

    /// Name or path of Brush binary
    #[arg(long, default_value = "brush")]
    pub brush_bin: String,

    /// Directory containing masks for original images (for COLMAP)
    #[arg(long)]
    pub masks_dir: Option<PathBuf>,

    /// Extension of mask files
    #[arg(long, default_value = "png")]
    pub mask_ext: String,

    /// Directory containing masks for undistorted images (for Brush)
    #[arg(long)]
    pub dense_masks_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 3200)]
    pub sfm_max_image_size: u32,

    #[arg(long, default_value_t = 8192)]
    pub sift_max_num_features: u32,

    /// Also caps the resolution Brush trains at
    #[arg(long, default_value_t = 2000)]
    pub undistort_max_image_size: u32,

    #[arg(long, default_value = "OPENCV")]
    pub camera_model: String,

    /// Forwarded to COLMAP as-is, like the `refine_*` flags
    #[arg(long, default_value_t = 1)]
    pub single_camera: i32,

    #[arg(long, default_value_t = 15)]
    pub min_num_matches: u32,

    #[arg(long, default_value_t = 1)]
    pub refine_focal_length: i32,

    #[arg(long, default_value_t = 1)]
    pub refine_extra_params: i32,

    #[arg(long, default_value_t = 0)]
    pub refine_principal_point: i32,

    /// Whether to run Brush training (1=yes, 0=no)
    #[arg(long, default_value_t = 1, value_parser = flag_value)]
    pub run_brush: u8,

    #[arg(long, default_value_t = 30000)]
    pub brush_total_steps: u32,

    #[arg(long, default_value_t = 10_000_000)]
    pub brush_max_splats: u32,

    #[arg(long, default_value_t = 5000)]
    pub brush_export_every: u32,

    #[arg(long, default_value_t = 8)]
    pub brush_eval_split_every: u32,

    #[arg(long, default_value = "export_{iter}.ply")]
    pub brush_export_name: String,

    /// Optional GPU device ID for Brush
    #[arg(long, default_value = "")]
    pub cubecl_default_device: String,
}

impl Config {
    pub fn new() -> Self {
        Self::parse()
    }

    /// Configuration with every tuning parameter at its default.
    pub fn for_dirs(project_dir: impl AsRef<Path>, images_dir: impl AsRef<Path>) -> Self {
        Self::parse_from([
            OsString::from(env!("CARGO_PKG_NAME")),
            OsString::from("--project_dir"),
            project_dir.as_ref().as_os_str().to_owned(),
            OsString::from("--images_dir"),
            images_dir.as_ref().as_os_str().to_owned(),
        ])
    }

    pub const fn brush_enabled(&self) -> bool {
        self.run_brush == 1
    }

    /// Brush trains on the undistorted images, so it shares their size cap.
    pub const fn brush_max_resolution(&self) -> u32 {
        self.undistort_max_image_size
    }

    pub fn gpu_device(&self) -> Option<&str> {
        Some(self.cubecl_default_device.as_str()).filter(|device| !device.is_empty())
    }
}

fn flag_value(s: &str) -> Result<u8, String> {
    match s.trim() {
        "0" => Ok(0),
        "1" => Ok(1),
        other => Err(format!("{other} is not supported. Expected `0` or `1`")),
    }
}
