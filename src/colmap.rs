//! Argument lists for the four COLMAP stages.

use crate::command::Invocation;
use crate::config::Config;
use crate::layout::ProjectLayout;
use crate::masks::MaskDiscovery;

/// Stage 1: SIFT feature extraction, with masks appended when discovered.
pub fn feature_extractor(
    config: &Config,
    layout: &ProjectLayout,
    masks: &MaskDiscovery,
) -> Invocation {
    Invocation::new(&config.colmap_bin)
        .arg("feature_extractor")
        .path_opt("--database_path", &layout.database)
        .path_opt("--image_path", &config.images_dir)
        .opt("--ImageReader.single_camera", config.single_camera)
        .opt("--ImageReader.camera_model", &config.camera_model)
        .opt("--SiftExtraction.use_gpu", 1)
        .opt("--SiftExtraction.max_image_size", config.sfm_max_image_size)
        .opt(
            "--SiftExtraction.max_num_features",
            config.sift_max_num_features,
        )
        .args(masks.colmap_args())
}

/// Stage 2.
pub fn exhaustive_matcher(config: &Config, layout: &ProjectLayout) -> Invocation {
    Invocation::new(&config.colmap_bin)
        .arg("exhaustive_matcher")
        .path_opt("--database_path", &layout.database)
        .opt("--SiftMatching.use_gpu", 1)
}

/// Stage 3: sparse reconstruction into `sparse/`.
pub fn mapper(config: &Config, layout: &ProjectLayout) -> Invocation {
    Invocation::new(&config.colmap_bin)
        .arg("mapper")
        .path_opt("--database_path", &layout.database)
        .path_opt("--image_path", &config.images_dir)
        .path_opt("--output_path", &layout.sparse_dir)
        .opt("--Mapper.min_num_matches", config.min_num_matches)
        .opt("--Mapper.ba_refine_focal_length", config.refine_focal_length)
        .opt("--Mapper.ba_refine_extra_params", config.refine_extra_params)
        .opt(
            "--Mapper.ba_refine_principal_point",
            config.refine_principal_point,
        )
}

/// Stage 4: undistorts `sparse/0` into `dense/`, producing the
/// `dense/0/images` + `dense/0/sparse` dataset Brush reads.
pub fn image_undistorter(config: &Config, layout: &ProjectLayout) -> Invocation {
    Invocation::new(&config.colmap_bin)
        .arg("image_undistorter")
        .path_opt("--image_path", &config.images_dir)
        .path_opt("--input_path", &layout.sparse_model())
        .path_opt("--output_path", &layout.dense_dir)
        .opt("--output_type", "COLMAP")
        .opt("--max_image_size", config.undistort_max_image_size)
}
