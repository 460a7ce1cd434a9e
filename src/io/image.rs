//! Target loading, tile discovery and canvas export

use crate::io::configuration::{JPEG_QUALITY, SUPPORTED_EXTENSIONS};
use crate::io::error::{MosaicError, Result, WithPath};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use std::path::{Path, PathBuf};

/// Decode a target image as 8-bit RGB
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded
pub fn load_target(path: &Path) -> Result<RgbImage> {
    Ok(image::open(path).with_path(path)?.to_rgb8())
}

/// Whether a path has one of the supported image extensions
pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
}

/// List image files directly inside `directory`, sorted by path
///
/// Subdirectories are not searched.
///
/// # Errors
///
/// Returns an error if `directory` is not a directory or cannot be read
pub fn collect_image_paths(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        return Err(MosaicError::DirectoryNotFound {
            path: directory.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(directory).map_err(|e| MosaicError::FileSystem {
        path: directory.to_path_buf(),
        operation: "read directory",
        source: e,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_supported_extension(path))
        .collect();
    paths.sort();

    Ok(paths)
}

/// Write the finished canvas, choosing the encoder from the extension
///
/// JPEG output is written at a fixed high quality; other formats use the
/// encoder defaults. Missing parent directories are created.
///
/// # Errors
///
/// Returns an error if:
/// - The parent directory cannot be created
/// - The extension does not name a supported format
/// - Encoding or writing fails
pub fn save_canvas(canvas: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| MosaicError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create directory",
            source: e,
        })?;
    }

    let export_error = |source| MosaicError::ImageExport {
        path: path.to_path_buf(),
        source,
    };

    match ImageFormat::from_path(path).map_err(export_error)? {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(path).map_err(|e| MosaicError::FileSystem {
                path: path.to_path_buf(),
                operation: "create file",
                source: e,
            })?;
            let mut writer = std::io::BufWriter::new(file);
            let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
            canvas.write_with_encoder(encoder).map_err(export_error)
        }
        format => canvas.save_with_format(path, format).map_err(export_error),
    }
}
