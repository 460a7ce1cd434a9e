//! Tile preparation: square crop, resampling and colour signature
//!
//! Every candidate image is center-cropped to a square on its shorter side,
//! resampled with a Lanczos filter to the pool's tile size, and summarized by
//! its per-channel mean colour. Loading a directory's worth of tiles is
//! parallelized across files; each file produces an independent outcome.

use crate::analysis::audit::TileAudit;
use crate::io::error::{MosaicError, Result, WithPath, invalid_parameter};
use crate::math::color::{BLACK, Color, mean_color};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};
use std::path::{Path, PathBuf};

/// A square tile ready for placement
///
/// The average colour is computed once on construction and never changes.
#[derive(Debug, Clone)]
pub struct Tile {
    pixels: RgbImage,
    average_color: Color,
    source: String,
}

impl Tile {
    /// Wrap prepared pixels, computing their average colour
    pub fn new(pixels: RgbImage, source: impl Into<String>) -> Self {
        let average_color = average_color(&pixels);
        Self {
            pixels,
            average_color,
            source: source.into(),
        }
    }

    /// Build a uniformly coloured tile
    pub fn solid(size: u32, color: Color, source: impl Into<String>) -> Self {
        Self::new(RgbImage::from_pixel(size, size, Rgb(color)), source)
    }

    /// Prepared pixel buffer
    pub const fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    /// Mean colour of the prepared pixels
    pub const fn average_color(&self) -> Color {
        self.average_color
    }

    /// Identifier of the file the tile came from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Edge length in pixels
    pub fn size(&self) -> u32 {
        self.pixels.width()
    }
}

/// Result of preparing a single tile file
#[derive(Debug)]
pub enum TileOutcome {
    /// The file produced a usable tile
    Loaded(Tile),
    /// The file was decoded but rejected as a text card
    TextCard,
    /// The file could not be decoded or cropped
    Failed(MosaicError),
}

/// Per-channel mean colour of an image, truncated to integers
pub fn average_color(pixels: &RgbImage) -> Color {
    mean_color(pixels.pixels().map(|p| p.0)).unwrap_or(BLACK)
}

/// Largest centered square inside a `width` x `height` image as `(x, y, side)`
pub const fn center_square(width: u32, height: u32) -> (u32, u32, u32) {
    let side = if width < height { width } else { height };
    ((width - side) / 2, (height - side) / 2, side)
}

/// Crop an image to its centered square and resample to `tile_size`
///
/// # Errors
///
/// Returns an invalid parameter error if the image has no pixels or the
/// tile size is zero
pub fn prepare_tile(image: &RgbImage, tile_size: u32, source: impl Into<String>) -> Result<Tile> {
    if tile_size == 0 {
        return Err(invalid_parameter("tile_size", &tile_size, &"must be positive"));
    }

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(invalid_parameter(
            "image",
            &format!("{width}x{height}"),
            &"cannot crop an empty image",
        ));
    }

    let (x, y, side) = center_square(width, height);
    let square = imageops::crop_imm(image, x, y, side, side).to_image();
    let resized = imageops::resize(&square, tile_size, tile_size, FilterType::Lanczos3);

    Ok(Tile::new(resized, source))
}

/// Decode an image file and prepare it as a tile
///
/// # Errors
///
/// Returns an error if the file cannot be decoded or cropped
pub fn load_tile(path: &Path, tile_size: u32) -> Result<Tile> {
    let decoded = image::open(path).with_path(path)?.to_rgb8();
    prepare_tile(&decoded, tile_size, source_name(path))
}

/// Decode and prepare a tile, optionally rejecting text cards
pub fn load_tile_checked(path: &Path, tile_size: u32, skip_text_cards: bool) -> TileOutcome {
    let decoded = match image::open(path).with_path(path) {
        Ok(decoded) => decoded.to_rgb8(),
        Err(error) => return TileOutcome::Failed(error),
    };

    if skip_text_cards && TileAudit::of_image(&decoded).is_text_card {
        return TileOutcome::TextCard;
    }

    match prepare_tile(&decoded, tile_size, source_name(path)) {
        Ok(tile) => TileOutcome::Loaded(tile),
        Err(error) => TileOutcome::Failed(error),
    }
}

/// Prepare many tile files in parallel
///
/// Outcomes are returned in the same order as `paths`. The progress bar is
/// advanced once per file.
pub fn load_tiles(
    paths: &[PathBuf],
    tile_size: u32,
    skip_text_cards: bool,
    progress: ProgressBar,
) -> Vec<(PathBuf, TileOutcome)> {
    paths
        .par_iter()
        .progress_with(progress)
        .map(|path| {
            (
                path.clone(),
                load_tile_checked(path, tile_size, skip_text_cards),
            )
        })
        .collect()
}

fn source_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}
