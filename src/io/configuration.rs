//! Assembly constants, runtime defaults and the JSON settings file

use crate::analysis::regions::NamedRegion;
use crate::io::error::{MosaicError, Result, WithPath};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

// Tile preparation
/// Edge length of a grid cell in target-image pixels
pub const DEFAULT_TILE_SIZE: u32 = 40;
/// Output scale factor applied to every cell
pub const DEFAULT_ENLARGEMENT: u32 = 1;
/// File extensions recognised as tile images (lowercase, without dot)
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

// Reuse and diversity
/// Minimum Manhattan grid distance between two placements of one tile
pub const DEFAULT_MIN_REUSE_DISTANCE: u32 = 3;
/// Maximum placements per tile (0 = unlimited)
pub const DEFAULT_MAX_REUSE: usize = 0;
/// Usage penalty weight (0 = pure colour matching)
pub const DEFAULT_DIVERSITY_WEIGHT: f64 = 0.0;
/// Scale that puts a fully used tile's penalty on the order of RGB distance
pub const DIVERSITY_PENALTY_SCALE: f64 = 100.0;
/// Number of valid candidates sampled from during best-match selection
pub const DEFAULT_TOP_N: usize = 10;
/// Rank decay in the candidate weight `1 / (1 + decay * rank)`
pub const CANDIDATE_RANK_DECAY: f64 = 0.5;
/// History length at which a tile's placement list is trimmed
pub const RECENT_USAGE_CAPACITY: usize = 100;
/// Placements kept after trimming
pub const RECENT_USAGE_RETAINED: usize = 50;
/// Pool size below which a warning is issued
pub const LOW_TILE_COUNT_WARNING: usize = 50;

// Background detection
/// Fraction of matching pixels needed to classify a cell as background
pub const DEFAULT_BG_THRESHOLD: f64 = 0.7;
/// Maximum RGB distance for a pixel to count as background
pub const DEFAULT_BG_TOLERANCE: f64 = 30.0;
/// Edge length of the square patches sampled from each corner
pub const DEFAULT_CORNER_SAMPLE_SIZE: u32 = 20;

// Tinting
/// Default tint strength
pub const DEFAULT_TINT_ALPHA: f32 = 0.25;
/// Maximum distance for a cell colour to belong to a named region
pub const DEFAULT_REGION_TOLERANCE: f64 = 80.0;

// Randomness
/// Fixed seed for reproducible selection
pub const DEFAULT_SEED: u64 = 42;

// Output settings
/// Encoder quality used for JPEG output
pub const JPEG_QUALITY: u8 = 95;
/// Base name used when generating output filenames
pub const DEFAULT_OUTPUT_NAME: &str = "mosaic";

// Progress bar display settings
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 40;

/// Settings read from a JSON file
///
/// Every field is optional; command-line flags take precedence over
/// anything set here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MosaicSettings {
    /// Display name, also used for generated output filenames
    pub name: Option<String>,
    /// Target image to recreate
    pub target: Option<PathBuf>,
    /// Directory containing tile images
    pub tiles_dir: Option<PathBuf>,
    /// Directory for generated output files
    pub output_dir: Option<PathBuf>,
    /// Cell edge length in pixels
    pub tile_size: Option<u32>,
    /// Output enlargement factor
    pub enlarge: Option<u32>,
    /// Maximum placements per tile
    pub max_reuse: Option<usize>,
    /// Minimum reuse distance in grid units
    pub min_distance: Option<u32>,
    /// Forbid placing any tile twice
    pub no_reuse: Option<bool>,
    /// Cheat blend strength
    pub cheat: Option<f32>,
    /// Background specification (`auto`, `white`, `black`, `R,G,B`, `none`)
    pub background: Option<String>,
    /// Background match fraction
    pub bg_threshold: Option<f64>,
    /// Background colour tolerance
    pub bg_tolerance: Option<f64>,
    /// Diversity weight
    pub diversity: Option<f64>,
    /// Tint colour (`RRGGBB`, `#RRGGBB` or `R,G,B`)
    pub tint: Option<String>,
    /// Tint strength
    pub tint_alpha: Option<f32>,
    /// Blend mode name
    pub blend_mode: Option<String>,
    /// Pick tiles randomly instead of by colour
    pub no_color_match: Option<bool>,
    /// Tint tiles per classified region
    pub region_tint: Option<bool>,
    /// Replacement region palette
    pub regions: Option<Vec<NamedRegion>>,
    /// Region classification tolerance
    pub region_tolerance: Option<f64>,
    /// Random seed
    pub seed: Option<u64>,
    /// Exclude tiles that look like text cards
    pub skip_text_cards: Option<bool>,
    /// Keys this loader does not recognise, kept so they can be reported
    #[serde(flatten)]
    pub unrecognized: BTreeMap<String, serde_json::Value>,
}

impl MosaicSettings {
    /// Load settings from a JSON file
    ///
    /// Relative `target`, `tiles_dir` and `output_dir` entries are resolved
    /// against the directory containing the settings file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON
    /// for this schema
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MosaicError::FileSystem {
            path: path.to_path_buf(),
            operation: "read settings",
            source: e,
        })?;

        let mut settings = Self::from_json_str(&content).with_path(path)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        settings.target = settings.target.map(|p| resolve_relative(base, p));
        settings.tiles_dir = settings.tiles_dir.map(|p| resolve_relative(base, p));
        settings.output_dir = settings.output_dir.map(|p| resolve_relative(base, p));

        Ok(settings)
    }

    /// Parse settings from a JSON string without resolving paths
    ///
    /// Unknown keys are logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid JSON or a known key has
    /// the wrong type
    pub fn from_json_str(content: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(content).map_err(|e| MosaicError::SettingsFile {
                path: PathBuf::from("<unknown>"),
                source: e,
            })?;
        for key in settings.unrecognized.keys() {
            warn!("Ignoring unrecognized settings key '{key}'");
        }
        Ok(settings)
    }
}

fn resolve_relative(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Build a timestamped output path like `<dir>/<name>_20240131_235959.png`
pub fn generate_output_path(
    output_dir: &Path,
    name: &str,
    timestamp: &chrono::DateTime<chrono::Local>,
) -> PathBuf {
    let stem = name.to_lowercase().replace(' ', "_");
    output_dir.join(format!("{stem}_{}.png", timestamp.format("%Y%m%d_%H%M%S")))
}
