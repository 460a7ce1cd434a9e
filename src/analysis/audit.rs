//! Text-card detection for tile sources
//!
//! Some scraped tile sets contain placeholder cards (mostly white with a
//! little black text) instead of artwork. They match light cells well and
//! look bad in a mosaic, so they can be filtered out at load time.

use image::RgbImage;
use std::collections::HashSet;

/// Channel value above which a pixel counts as white
const WHITE_CHANNEL_MIN: u8 = 240;
/// Quantization step applied before counting distinct colours
const COLOR_QUANT_STEP: u8 = 32;
/// Maximum number of pixels examined when counting colours
const COLOR_SAMPLE_LIMIT: usize = 1000;
/// White fraction above which a tile may be a text card
const TEXT_CARD_WHITE_RATIO: f64 = 0.85;
/// Distinct quantized colours below which a tile may be a text card
const TEXT_CARD_MAX_COLORS: usize = 15;

/// Content metrics for one tile source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileAudit {
    /// Fraction of pixels with every channel above 240
    pub white_ratio: f64,
    /// Distinct colours after quantizing to steps of 32, over a strided sample
    pub unique_colors: usize,
    /// Fraction of pixels in the pink accent range (R>200, G<120, B<150)
    pub pink_ratio: f64,
    /// Mostly white with very few colours
    pub is_text_card: bool,
}

impl TileAudit {
    /// Measure an image
    pub fn of_image(image: &RgbImage) -> Self {
        let total = image.width() as usize * image.height() as usize;
        if total == 0 {
            return Self {
                white_ratio: 0.0,
                unique_colors: 0,
                pink_ratio: 0.0,
                is_text_card: false,
            };
        }

        let mut white = 0usize;
        let mut pink = 0usize;
        for pixel in image.pixels() {
            let [r, g, b] = pixel.0;
            if r > WHITE_CHANNEL_MIN && g > WHITE_CHANNEL_MIN && b > WHITE_CHANNEL_MIN {
                white += 1;
            }
            if r > 200 && g < 120 && b < 150 {
                pink += 1;
            }
        }

        // Evenly strided sample keeps the count deterministic
        let stride = total.div_ceil(COLOR_SAMPLE_LIMIT).max(1);
        let unique_colors = image
            .pixels()
            .step_by(stride)
            .map(|pixel| pixel.0.map(|c| (c / COLOR_QUANT_STEP) * COLOR_QUANT_STEP))
            .collect::<HashSet<_>>()
            .len();

        let white_ratio = white as f64 / total as f64;
        Self {
            white_ratio,
            unique_colors,
            pink_ratio: pink as f64 / total as f64,
            is_text_card: white_ratio > TEXT_CARD_WHITE_RATIO
                && unique_colors < TEXT_CARD_MAX_COLORS,
        }
    }
}
