//! Blend-mode compositing for tile tinting and the whole-canvas cheat blend
//!
//! All arithmetic happens in normalized [0, 1] space. Each mode produces a
//! blend target which is then interpolated with the base by `alpha`:
//! `out = (1 - alpha) * base + alpha * blend`.

use crate::io::error::{MosaicError, Result, config_parse, invalid_parameter};
use crate::math::color::{Color, denormalize, luminance, normalize};
use image::RgbImage;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Overlay luminance below which `color` mode cannot rescale the overlay
const MIN_OVERLAY_LUMINANCE: f32 = 0.001;

/// Pixel compositing formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Plain alpha blend toward the overlay
    #[default]
    Normal,
    /// Darkens: `base * overlay`
    Multiply,
    /// Lightens: `1 - (1 - base) * (1 - overlay)`
    Screen,
    /// Multiply in the darks, screen in the lights
    Overlay,
    /// Gentler overlay: `(1 - 2o) * base^2 + 2o * base`
    #[value(name = "soft_light")]
    SoftLight,
    /// Overlay hue and saturation at the base luminance
    Color,
}

impl BlendMode {
    /// Every mode, in documentation order
    pub const ALL: [Self; 6] = [
        Self::Normal,
        Self::Multiply,
        Self::Screen,
        Self::Overlay,
        Self::SoftLight,
        Self::Color,
    ];

    /// Canonical lowercase name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Overlay => "overlay",
            Self::SoftLight => "soft_light",
            Self::Color => "color",
        }
    }

    // Per-channel formulas; `color` mode works on whole pixels instead
    fn blend_channel(self, base: f32, overlay: f32) -> f32 {
        match self {
            Self::Normal | Self::Color => overlay,
            Self::Multiply => base * overlay,
            Self::Screen => 1.0 - (1.0 - base) * (1.0 - overlay),
            Self::Overlay => {
                if base < 0.5 {
                    2.0 * base * overlay
                } else {
                    1.0 - 2.0 * (1.0 - base) * (1.0 - overlay)
                }
            }
            Self::SoftLight => (1.0 - 2.0 * overlay) * base * base + 2.0 * overlay * base,
        }
    }
}

impl FromStr for BlendMode {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|mode| mode.name() == wanted)
            .ok_or_else(|| {
                config_parse(
                    "blend_mode",
                    s,
                    &"expected normal, multiply, screen, overlay, soft_light or color",
                )
            })
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Blend mode together with its strength
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendConfig {
    /// Compositing formula
    pub mode: BlendMode,
    /// Strength in [0, 1]; 0 leaves the base untouched
    pub alpha: f32,
}

impl BlendConfig {
    /// Create a blend configuration
    pub const fn new(mode: BlendMode, alpha: f32) -> Self {
        Self { mode, alpha }
    }

    /// Check that alpha lies in [0, 1]
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error naming `parameter` otherwise
    pub fn validate(&self, parameter: &'static str) -> Result<()> {
        if (0.0..=1.0).contains(&self.alpha) {
            Ok(())
        } else {
            Err(invalid_parameter(
                parameter,
                &self.alpha,
                &"must be between 0.0 and 1.0",
            ))
        }
    }
}

/// How `color` mode handles an overlay too dark to rescale
#[derive(Debug, Clone, Copy)]
enum DarkOverlay {
    /// Substitute the base luminance as a grey
    Grayscale,
    /// Clamp the overlay luminance to the minimum and rescale anyway
    Floor,
}

fn zip_channels(a: [f32; 3], b: [f32; 3], f: impl Fn(f32, f32) -> f32) -> [f32; 3] {
    [f(a[0], b[0]), f(a[1], b[1]), f(a[2], b[2])]
}

fn colorize(base: [f32; 3], overlay: [f32; 3], overlay_luma: f32, dark: DarkOverlay) -> [f32; 3] {
    let base_luma = luminance(base);

    let overlay_luma = match dark {
        DarkOverlay::Grayscale if overlay_luma <= MIN_OVERLAY_LUMINANCE => {
            return [base_luma; 3];
        }
        DarkOverlay::Grayscale => overlay_luma,
        DarkOverlay::Floor => overlay_luma.max(MIN_OVERLAY_LUMINANCE),
    };

    let scale = base_luma / overlay_luma;
    overlay.map(|c| (c * scale).clamp(0.0, 1.0))
}

fn blend_pixel(
    base: [f32; 3],
    overlay: [f32; 3],
    overlay_luma: f32,
    config: BlendConfig,
    dark: DarkOverlay,
) -> Color {
    let target = match config.mode {
        BlendMode::Color => colorize(base, overlay, overlay_luma, dark),
        mode => zip_channels(base, overlay, |b, o| mode.blend_channel(b, o)),
    };

    let alpha = config.alpha;
    denormalize(zip_channels(base, target, |b, t| {
        alpha.mul_add(t, (1.0 - alpha) * b)
    }))
}

/// Tint every pixel toward a flat colour
///
/// In `color` mode the tint's luminance is a single scalar; a tint darker
/// than 0.001 luminance turns the result grey at the base luminance.
pub fn apply_tint(pixels: &RgbImage, tint: Color, config: BlendConfig) -> RgbImage {
    let overlay = normalize(tint);
    let overlay_luma = luminance(overlay);

    let mut tinted = pixels.clone();
    for pixel in tinted.pixels_mut() {
        pixel.0 = blend_pixel(
            normalize(pixel.0),
            overlay,
            overlay_luma,
            config,
            DarkOverlay::Grayscale,
        );
    }
    tinted
}

/// Blend a same-sized overlay image over a base image
///
/// Uses the same formulas as [`apply_tint`], except that `color` mode uses
/// each overlay pixel's own luminance (floored at 0.001).
///
/// # Errors
///
/// Returns an invalid parameter error if the images differ in size
pub fn blend_images(base: &RgbImage, overlay: &RgbImage, config: BlendConfig) -> Result<RgbImage> {
    if base.dimensions() != overlay.dimensions() {
        return Err(invalid_parameter(
            "overlay",
            &format!("{}x{}", overlay.width(), overlay.height()),
            &format!("must match base size {}x{}", base.width(), base.height()),
        ));
    }

    let mut blended = base.clone();
    for (pixel, over) in blended.pixels_mut().zip(overlay.pixels()) {
        let over = normalize(over.0);
        pixel.0 = blend_pixel(
            normalize(pixel.0),
            over,
            luminance(over),
            config,
            DarkOverlay::Floor,
        );
    }
    Ok(blended)
}
