//! RGB colour primitives shared by matching, classification and blending

use crate::io::error::{Result, config_parse};

/// 8-bit RGB triplet
pub type Color = [u8; 3];

/// Pure white
pub const WHITE: Color = [255, 255, 255];
/// Pure black
pub const BLACK: Color = [0, 0, 0];

/// Rec. 601 luma coefficients
const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

/// Euclidean distance between two colours in RGB space
///
/// Ranges from 0 to roughly 441.67 (black to white).
pub fn color_distance(a: Color, b: Color) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Luminance of a normalized [0, 1] RGB triplet
pub fn luminance(rgb: [f32; 3]) -> f32 {
    rgb.iter()
        .zip(LUMA_WEIGHTS.iter())
        .map(|(&c, &w)| c * w)
        .sum()
}

/// Map an 8-bit colour into normalized [0, 1] space
pub fn normalize(color: Color) -> [f32; 3] {
    color.map(|c| f32::from(c) / 255.0)
}

/// Map a normalized colour back to 8 bits, clamping and rounding each channel
pub fn denormalize(rgb: [f32; 3]) -> Color {
    rgb.map(|c| (c * 255.0).clamp(0.0, 255.0).round() as u8)
}

/// Per-channel arithmetic mean, truncated to integers
///
/// Returns `None` when the iterator yields no pixels.
pub fn mean_color(pixels: impl IntoIterator<Item = Color>) -> Option<Color> {
    let mut sums = [0u64; 3];
    let mut count = 0u64;

    for pixel in pixels {
        for (sum, &channel) in sums.iter_mut().zip(pixel.iter()) {
            *sum += u64::from(channel);
        }
        count += 1;
    }

    (count > 0).then(|| sums.map(|sum| (sum / count) as u8))
}

/// Parse a colour written as `RRGGBB`, `#RRGGBB` or `R,G,B`
///
/// # Errors
///
/// Returns a configuration parse error if the text matches none of the
/// accepted forms or a component is out of range
pub fn parse_color(spec: &str) -> Result<Color> {
    let trimmed = spec.trim();

    if trimmed.contains(',') {
        return parse_rgb_triplet(trimmed)
            .ok_or_else(|| config_parse("color", spec, &"expected R,G,B with values 0-255"));
    }

    parse_hex(trimmed.trim_start_matches('#'))
        .ok_or_else(|| config_parse("color", spec, &"expected RRGGBB, #RRGGBB or R,G,B"))
}

/// Parse `R,G,B` with each component in 0..=255
pub fn parse_rgb_triplet(text: &str) -> Option<Color> {
    let parts: Vec<u8> = text
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;

    match parts.as_slice() {
        &[r, g, b] => Some([r, g, b]),
        _ => None,
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
    };

    Some([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}
