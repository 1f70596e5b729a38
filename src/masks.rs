use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::errors::{PipelineError, Result};
use crate::layout::create_dir;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "tif", "tiff"];

/// Outcome of looking for COLMAP masks next to the source images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaskDiscovery {
    NotConfigured,
    Empty { dir: PathBuf },
    Found { dir: PathBuf, masks: usize, images: usize },
}

impl MaskDiscovery {
    /// Extra `feature_extractor` arguments, empty unless masks were found.
    pub fn colmap_args(&self) -> Vec<OsString> {
        match self {
            Self::Found { dir, .. } => vec![
                OsString::from("--ImageReader.mask_path"),
                dir.as_os_str().to_owned(),
            ],
            _ => Vec::new(),
        }
    }
}

/// Outcome of staging undistorted masks into the Brush dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenseMasks {
    NotConfigured,
    SourceMissing { dir: PathBuf },
    Empty { dir: PathBuf },
    Copied(usize),
}

/// Regular files directly inside `dir`, symlinks resolved. A directory that
/// cannot be read is an error, not an empty listing.
fn files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry
            .map_err(|e| PipelineError::file_system(dir, "read directory", e.into()))?;
        // `Path::is_file` follows symlinks; a dangling link is skipped
        if entry.path().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Counts files directly inside `dir` with a common photo extension.
pub fn count_images(dir: &Path) -> Result<usize> {
    Ok(files_in(dir)?
        .iter()
        .filter(|path| IMAGE_EXTENSIONS.iter().any(|ext| has_extension(path, ext)))
        .count())
}

/// Files directly inside `dir` whose extension matches `ext`, ignoring case
/// and any leading dot.
pub fn find_masks(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let ext = ext.trim_start_matches('.');
    Ok(files_in(dir)?
        .into_iter()
        .filter(|path| has_extension(path, ext))
        .collect())
}

/// Decides whether feature extraction should use masks. Reads the
/// filesystem only.
pub fn discover_colmap_masks(
    masks_dir: Option<&Path>,
    images_dir: &Path,
    ext: &str,
) -> Result<MaskDiscovery> {
    let Some(dir) = masks_dir.filter(|dir| dir.exists()) else {
        info!("No COLMAP masks configured/found. Continuing without masks.");
        return Ok(MaskDiscovery::NotConfigured);
    };

    let masks = find_masks(dir, ext)?.len();
    if masks == 0 {
        warn!(
            "MASKS_DIR exists ({}) but no files with extension .{} found.",
            dir.display(),
            ext.trim_start_matches('.')
        );
        return Ok(MaskDiscovery::Empty {
            dir: dir.to_path_buf(),
        });
    }

    let images = count_images(images_dir)?;
    info!("Masks detected for COLMAP: {masks} mask(s). Using masks for feature extraction.");
    if images > 0 && masks < images {
        warn!("Fewer masks than images. Images without masks will be processed without masking.");
    }

    Ok(MaskDiscovery::Found {
        dir: dir.to_path_buf(),
        masks,
        images,
    })
}

/// Copies undistorted masks from `source` into `target` so Brush picks them
/// up alongside `dense/0/images`.
pub fn stage_dense_masks(source: Option<&Path>, target: &Path, ext: &str) -> Result<DenseMasks> {
    let Some(source) = source else {
        info!("No undistorted masks configured for Brush (DENSE_MASKS_DIR empty).");
        return Ok(DenseMasks::NotConfigured);
    };

    if !source.exists() {
        warn!(
            "DENSE_MASKS_DIR set but directory not found: {}",
            source.display()
        );
        return Ok(DenseMasks::SourceMissing {
            dir: source.to_path_buf(),
        });
    }

    let masks = find_masks(source, ext)?;
    if masks.is_empty() {
        warn!(
            "DENSE_MASKS_DIR provided but no *.{} files found.",
            ext.trim_start_matches('.')
        );
        return Ok(DenseMasks::Empty {
            dir: source.to_path_buf(),
        });
    }

    info!(
        "Copying undistorted masks into dataset for Brush -> {}",
        target.display()
    );
    create_dir(target)?;

    let progress_bar = ProgressBar::new(masks.len() as u64);
    progress_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec} {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );

    masks
        .par_iter()
        .progress_with(progress_bar.clone())
        .try_for_each(|mask| -> Result<()> {
            // find_masks only yields regular files, which always have a name
            let Some(name) = mask.file_name() else {
                return Ok(());
            };
            fs::copy(mask, target.join(name))
                .map(|_| ())
                .map_err(|e| PipelineError::file_system(mask, "copy mask", e))
        })?;

    progress_bar.finish_and_clear();
    info!("Brush masks ready: {} file(s) copied.", masks.len());

    Ok(DenseMasks::Copied(masks.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, names: &[&str]) -> std::io::Result<()> {
        fs::create_dir_all(dir)?;
        for name in names {
            fs::write(dir.join(name), b"")?;
        }
        Ok(())
    }

    #[test]
    fn test_count_images_is_case_insensitive_and_flat() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let images = temp_dir.path().join("images");
        touch(&images, &["a.JPG", "b.jpeg", "c.png", "d.tif", "e.TIFF", "notes.txt"])?;
        touch(&images.join("nested"), &["f.jpg"])?;

        assert_eq!(count_images(&images)?, 5);
        Ok(())
    }

    #[test]
    fn test_find_masks_accepts_leading_dot() -> Result<()> {
        let temp_dir = TempDir::new()?;
        touch(temp_dir.path(), &["a.jpg.png", "b.PNG", "c.jpg"])?;

        let with_dot = find_masks(temp_dir.path(), ".png")?;
        let without_dot = find_masks(temp_dir.path(), "png")?;

        assert_eq!(with_dot.len(), 2);
        assert_eq!(with_dot, without_dot);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_masks_and_images_are_counted() -> Result<()> {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new()?;
        let real = temp_dir.path().join("real");
        touch(&real, &["1.png", "1.jpg"])?;

        let images = temp_dir.path().join("images");
        let masks = temp_dir.path().join("masks");
        let dense_masks = temp_dir.path().join("dense_masks");
        fs::create_dir_all(&images)?;
        fs::create_dir_all(&masks)?;
        fs::create_dir_all(&dense_masks)?;
        symlink(real.join("1.jpg"), images.join("1.jpg"))?;
        symlink(real.join("1.png"), masks.join("1.png"))?;
        symlink(real.join("1.png"), dense_masks.join("1.png"))?;
        symlink(real.join("gone.png"), masks.join("dangling.png"))?;

        assert_eq!(count_images(&images)?, 1);
        assert_eq!(
            discover_colmap_masks(Some(&masks), &images, "png")?,
            MaskDiscovery::Found {
                dir: masks.clone(),
                masks: 1,
                images: 1
            }
        );

        let target = temp_dir.path().join("dense/0/masks");
        assert_eq!(
            stage_dense_masks(Some(&dense_masks), &target, "png")?,
            DenseMasks::Copied(1)
        );
        assert!(target.join("1.png").is_file());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_masks_dir_is_an_error() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new()?;
        let masks = temp_dir.path().join("masks");
        touch(&masks, &["1.png"])?;
        fs::set_permissions(&masks, fs::Permissions::from_mode(0o000))?;

        // root ignores directory permissions
        let readable = fs::read_dir(&masks).is_ok();
        let discovery = discover_colmap_masks(Some(&masks), temp_dir.path(), "png");
        let staged = stage_dense_masks(Some(&masks), &temp_dir.path().join("out"), "png");
        fs::set_permissions(&masks, fs::Permissions::from_mode(0o755))?;

        if !readable {
            assert!(matches!(discovery, Err(PipelineError::FileSystem { .. })));
            assert!(matches!(staged, Err(PipelineError::FileSystem { .. })));
        }
        Ok(())
    }

    #[test]
    fn test_discovery_without_masks_dir() -> Result<()> {
        let temp_dir = TempDir::new()?;

        let discovery = discover_colmap_masks(None, temp_dir.path(), "png")?;
        assert_eq!(discovery, MaskDiscovery::NotConfigured);
        assert!(discovery.colmap_args().is_empty());

        let missing = temp_dir.path().join("missing");
        let discovery = discover_colmap_masks(Some(&missing), temp_dir.path(), "png")?;
        assert_eq!(discovery, MaskDiscovery::NotConfigured);
        Ok(())
    }

    #[test]
    fn test_discovery_with_empty_masks_dir() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let masks = temp_dir.path().join("masks");
        touch(&masks, &["readme.txt"])?;

        let discovery = discover_colmap_masks(Some(&masks), temp_dir.path(), "png")?;
        assert_eq!(discovery, MaskDiscovery::Empty { dir: masks });
        assert!(discovery.colmap_args().is_empty());
        Ok(())
    }

    #[test]
    fn test_discovery_with_masks() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let images = temp_dir.path().join("images");
        let masks = temp_dir.path().join("masks");
        touch(&images, &["1.jpg", "2.jpg", "3.jpg"])?;
        touch(&masks, &["1.jpg.png", "2.jpg.png"])?;

        let discovery = discover_colmap_masks(Some(&masks), &images, "png")?;
        assert_eq!(
            discovery,
            MaskDiscovery::Found {
                dir: masks.clone(),
                masks: 2,
                images: 3
            }
        );
        assert_eq!(
            discovery.colmap_args(),
            vec![OsString::from("--ImageReader.mask_path"), masks.into_os_string()]
        );
        Ok(())
    }

    #[test]
    fn test_stage_dense_masks_copies_matching_files() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let source = temp_dir.path().join("dense_masks");
        let target = temp_dir.path().join("dense/0/masks");
        touch(&source, &["1.png", "2.png", "skip.jpg"])?;

        let staged = stage_dense_masks(Some(&source), &target, "png")?;

        assert_eq!(staged, DenseMasks::Copied(2));
        assert!(target.join("1.png").is_file());
        assert!(target.join("2.png").is_file());
        assert!(!target.join("skip.jpg").exists());
        Ok(())
    }

    #[test]
    fn test_stage_dense_masks_leaves_target_alone_when_nothing_to_copy() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let target = temp_dir.path().join("masks");

        assert_eq!(
            stage_dense_masks(None, &target, "png")?,
            DenseMasks::NotConfigured
        );

        let missing = temp_dir.path().join("missing");
        assert_eq!(
            stage_dense_masks(Some(&missing), &target, "png")?,
            DenseMasks::SourceMissing { dir: missing }
        );

        let empty = temp_dir.path().join("empty");
        fs::create_dir_all(&empty)?;
        assert_eq!(
            stage_dense_masks(Some(&empty), &target, "png")?,
            DenseMasks::Empty { dir: empty }
        );

        assert!(!target.exists());
        Ok(())
    }
}
