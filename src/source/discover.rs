use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, SourceError};

/// Extensions accepted for Motion-JPEG AVI output
pub const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Extensions accepted for MP4 output
pub const STILL_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// List the images in `directory`, sorted by file name
///
/// Hidden files and files with other extensions are skipped.
pub fn discover_images<P: AsRef<Path>>(directory: P, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let directory = directory.as_ref();

    if !directory.is_dir() {
        return Err(SourceError::ReadFailed {
            path: directory.display().to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        }
        .into());
    }

    let entries = std::fs::read_dir(directory).map_err(|e| SourceError::ReadFailed {
        path: directory.display().to_string(),
        source: e,
    })?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && !is_hidden_file(&path) && has_extension(&path, extensions) {
            images.push(path);
        } else {
            debug!("Skipping {:?}", path);
        }
    }

    if images.is_empty() {
        return Err(SourceError::EmptyInput.into());
    }

    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    info!("Found {} images in {}", images.len(), directory.display());
    Ok(images)
}

/// Expand a single directory argument into its images
///
/// Explicit file lists keep their order but every entry must carry one of
/// `extensions`.
pub fn expand_inputs(inputs: &[PathBuf], extensions: &[&str]) -> Result<Vec<PathBuf>> {
    match inputs {
        [] => Err(SourceError::EmptyInput.into()),
        [single] if single.is_dir() => discover_images(single, extensions),
        _ => {
            if let Some(rejected) = inputs.iter().find(|path| !has_extension(path, extensions)) {
                return Err(SourceError::UnsupportedFormat {
                    path: rejected.display().to_string(),
                    expected: extensions.join(", "),
                }
                .into());
            }
            Ok(inputs.to_vec())
        }
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed)))
        .unwrap_or(false)
}

fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
