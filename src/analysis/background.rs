//! Background detection and background-cell classification
//!
//! Cells that are mostly background are painted with a solid colour instead
//! of receiving a tile, which keeps logos and cut-outs crisp.

use crate::io::error::{Result, config_parse};
use crate::math::color::{BLACK, Color, WHITE, color_distance, mean_color, parse_rgb_triplet};
use crate::spatial::grid::{CellBounds, cell_pixels};
use image::RgbImage;
use std::str::FromStr;

/// How the background colour is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundSpec {
    /// Background skipping is disabled
    #[default]
    Disabled,
    /// Detect the colour from the target image's corners
    Auto,
    /// Use a fixed colour
    Fixed(Color),
}

impl BackgroundSpec {
    /// Resolve the specification against a target image
    ///
    /// Returns `None` when background skipping is disabled.
    pub fn resolve(self, image: &RgbImage, corner_sample_size: u32) -> Option<Color> {
        match self {
            Self::Disabled => None,
            Self::Auto => Some(detect_background(image, corner_sample_size)),
            Self::Fixed(color) => Some(color),
        }
    }
}

impl FromStr for BackgroundSpec {
    type Err = crate::io::error::MosaicError;

    /// Accepts `auto`, `white`, `black`, `none` or `R,G,B`
    fn from_str(s: &str) -> Result<Self> {
        let spec = s.trim().to_lowercase();
        match spec.as_str() {
            "" | "none" => Ok(Self::Disabled),
            "auto" => Ok(Self::Auto),
            "white" => Ok(Self::Fixed(WHITE)),
            "black" => Ok(Self::Fixed(BLACK)),
            other => parse_rgb_triplet(other).map(Self::Fixed).ok_or_else(|| {
                config_parse(
                    "background",
                    s,
                    &"expected auto, white, black, none or R,G,B",
                )
            }),
        }
    }
}

/// Estimate the background colour from the four corners of an image
///
/// Square patches of `sample_size` pixels are taken from each corner
/// (clamped to the image) and averaged together.
pub fn detect_background(image: &RgbImage, sample_size: u32) -> Color {
    let (width, height) = image.dimensions();
    let patch_w = sample_size.min(width);
    let patch_h = sample_size.min(height);
    let right = width - patch_w;
    let bottom = height - patch_h;

    let corners = [(0, 0), (right, 0), (0, bottom), (right, bottom)];
    let samples = corners.into_iter().flat_map(|(x, y)| {
        cell_pixels(
            image,
            CellBounds {
                x,
                y,
                width: patch_w,
                height: patch_h,
            },
        )
    });

    mean_color(samples).unwrap_or(WHITE)
}

/// Decide whether a cell is background
///
/// True when at least `threshold` of the pixels lie within `tolerance`
/// (Euclidean RGB distance) of `background`. An empty cell is never
/// background.
pub fn is_background(
    pixels: impl IntoIterator<Item = Color>,
    background: Color,
    threshold: f64,
    tolerance: f64,
) -> bool {
    let mut total = 0usize;
    let mut matching = 0usize;

    for pixel in pixels {
        total += 1;
        if color_distance(pixel, background) <= tolerance {
            matching += 1;
        }
    }

    total > 0 && matching as f64 / total as f64 >= threshold
}
