//! Named-region classification for region-based tinting

use crate::io::configuration::DEFAULT_REGION_TOLERANCE;
use crate::math::color::{BLACK, Color, WHITE, color_distance};
use serde::Deserialize;

/// A reference colour with an optional tint for cells that match it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedRegion {
    /// Region name, used in diagnostics
    pub name: String,
    /// Reference colour cells are compared against
    pub color: Color,
    /// Tint applied to tiles in this region; `None` leaves them untinted
    #[serde(default)]
    pub tint: Option<Color>,
}

impl NamedRegion {
    /// Create a region
    pub fn new(name: impl Into<String>, color: Color, tint: Option<Color>) -> Self {
        Self {
            name: name.into(),
            color,
            tint,
        }
    }
}

/// Palette of reference colours with a classification tolerance
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPalette {
    regions: Vec<NamedRegion>,
    tolerance: f64,
}

impl Default for RegionPalette {
    /// Pink, black and yellow are tinted with themselves; white is left alone
    fn default() -> Self {
        const PINK: Color = [244, 114, 182];
        const YELLOW: Color = [255, 255, 0];

        Self::new(
            vec![
                NamedRegion::new("pink", PINK, Some(PINK)),
                NamedRegion::new("black", BLACK, Some(BLACK)),
                NamedRegion::new("yellow", YELLOW, Some(YELLOW)),
                NamedRegion::new("white", WHITE, None),
            ],
            DEFAULT_REGION_TOLERANCE,
        )
    }
}

impl RegionPalette {
    /// Create a palette from regions and a distance tolerance
    pub const fn new(regions: Vec<NamedRegion>, tolerance: f64) -> Self {
        Self { regions, tolerance }
    }

    /// Reference regions in priority order
    pub fn regions(&self) -> &[NamedRegion] {
        &self.regions
    }

    /// Maximum distance (exclusive) for a match
    pub const fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Nearest region closer than the tolerance
    ///
    /// Ties go to the region listed first.
    pub fn classify(&self, color: Color) -> Option<&NamedRegion> {
        let mut best: Option<(&NamedRegion, f64)> = None;

        for region in &self.regions {
            let distance = color_distance(color, region.color);
            if distance < self.tolerance && best.is_none_or(|(_, d)| distance < d) {
                best = Some((region, distance));
            }
        }

        best.map(|(region, _)| region)
    }

    /// Tint for a cell colour, if it falls in a tinted region
    pub fn tint_for(&self, color: Color) -> Option<Color> {
        self.classify(color).and_then(|region| region.tint)
    }
}
