//! Command-line interface, settings merge and run orchestration

use crate::algorithm::executor::{AssemblyConfig, MosaicAssembler, RunStatistics};
use crate::algorithm::pool::ReusePolicy;
use crate::analysis::background::BackgroundSpec;
use crate::analysis::regions::RegionPalette;
use crate::io::configuration::{
    DEFAULT_BG_THRESHOLD, DEFAULT_BG_TOLERANCE, DEFAULT_CORNER_SAMPLE_SIZE, DEFAULT_DIVERSITY_WEIGHT,
    DEFAULT_ENLARGEMENT, DEFAULT_MAX_REUSE, DEFAULT_MIN_REUSE_DISTANCE, DEFAULT_OUTPUT_NAME,
    DEFAULT_REGION_TOLERANCE, DEFAULT_SEED, DEFAULT_TILE_SIZE, DEFAULT_TINT_ALPHA, DEFAULT_TOP_N,
    MosaicSettings, generate_output_path,
};
use crate::io::error::{Result, RunWarning, invalid_parameter};
use crate::io::progress::ProgressManager;
use crate::math::blend::{BlendConfig, BlendMode};
use crate::math::color::{Color, parse_color};
use chrono::{DateTime, Local};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug, Default)]
#[command(name = "tilemosaic")]
#[command(
    author,
    version,
    about = "Create a photo mosaic from tile images. Use --config for reusable presets."
)]
/// Command-line arguments for the mosaic generator
///
/// Every value left unset falls back to the settings file, then to the
/// built-in default.
// CLI tools commonly need multiple boolean flags for various features and user preferences
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// JSON settings file whose values act as defaults
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Target image to recreate as a mosaic
    #[arg(short, long, value_name = "IMAGE")]
    pub target: Option<PathBuf>,

    /// Directory containing tile images
    #[arg(short = 'i', long = "tiles", value_name = "DIR")]
    pub tiles: Option<PathBuf>,

    /// Output path; defaults to a timestamped file in the output directory
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Size of each grid cell in pixels
    #[arg(short = 's', long)]
    pub tile_size: Option<u32>,

    /// Never place a tile twice (relaxed automatically if there are too few tiles)
    #[arg(long)]
    pub no_reuse: bool,

    /// Maximum times a single tile can be used (0 = unlimited)
    #[arg(long)]
    pub max_reuse: Option<usize>,

    /// Minimum grid distance before the same tile can repeat
    #[arg(long)]
    pub min_distance: Option<u32>,

    /// Blend the target over the result (0.0-1.0); 0.2 is subtle, 0.4 obvious
    #[arg(long)]
    pub cheat: Option<f32>,

    /// Output enlargement factor
    #[arg(short, long)]
    pub enlarge: Option<u32>,

    /// Background colour to skip: auto, white, black, R,G,B or none
    #[arg(long, visible_alias = "bg")]
    pub background: Option<String>,

    /// Fraction of a cell that must match the background to skip it
    #[arg(long)]
    pub bg_threshold: Option<f64>,

    /// Colour distance within which a pixel matches the background
    #[arg(long)]
    pub bg_tolerance: Option<f64>,

    /// Penalty on tile reuse; 0 is pure colour matching, try 0.3-0.5
    #[arg(long)]
    pub diversity: Option<f64>,

    /// Tint applied to every tile (hex like 02135B or R,G,B)
    #[arg(long)]
    pub tint: Option<String>,

    /// Strength of the tile tint (0.0-1.0)
    #[arg(long)]
    pub tint_alpha: Option<f32>,

    /// How tints and the cheat overlay are blended
    #[arg(long, visible_alias = "blend", value_enum)]
    pub blend_mode: Option<BlendMode>,

    /// Pick tiles randomly instead of by colour similarity
    #[arg(long)]
    pub no_color_match: bool,

    /// Tint each cell according to the colour region it falls in
    #[arg(long)]
    pub region_tint: bool,

    /// Random seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Always take the best valid candidate instead of sampling
    #[arg(long)]
    pub deterministic: bool,

    /// Exclude tiles that look like text cards
    #[arg(long)]
    pub skip_text_cards: bool,

    /// Suppress progress bars
    #[arg(short, long)]
    pub quiet: bool,
}

/// A fully resolved run: paths, assembly parameters and config warnings
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRun {
    /// Display name of the run
    pub name: String,
    /// Target image path
    pub target: PathBuf,
    /// Tile directory
    pub tiles_dir: PathBuf,
    /// Output image path
    pub output: PathBuf,
    /// Parameters handed to the assembler
    pub assembly: AssemblyConfig,
    /// Settings that could not be parsed and were ignored
    pub warnings: Vec<RunWarning>,
}

impl Cli {
    /// Merge command-line values over a settings file
    ///
    /// Unparseable background, tint and blend-mode values are ignored with
    /// a warning, leaving the feature at its default.
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if no target image or tile
    /// directory is specified
    pub fn resolve(&self, settings: &MosaicSettings, now: &DateTime<Local>) -> Result<ResolvedRun> {
        let mut warnings = Vec::new();

        let target = self
            .target
            .clone()
            .or_else(|| settings.target.clone())
            .ok_or_else(|| {
                invalid_parameter(
                    "target",
                    &"<none>",
                    &"no target image specified (use --target or a settings file)",
                )
            })?;
        let tiles_dir = self
            .tiles
            .clone()
            .or_else(|| settings.tiles_dir.clone())
            .ok_or_else(|| {
                invalid_parameter(
                    "tiles",
                    &"<none>",
                    &"no tiles directory specified (use --tiles or a settings file)",
                )
            })?;

        let name = settings
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_OUTPUT_NAME.to_string());
        let output = self.output.clone().unwrap_or_else(|| {
            let output_dir = settings
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("."));
            generate_output_path(&output_dir, &name, now)
        });

        let background = self
            .background
            .as_deref()
            .or(settings.background.as_deref())
            .map_or(BackgroundSpec::Disabled, |spec| {
                spec.parse().unwrap_or_else(|_| {
                    warnings.push(RunWarning::ConfigIgnored {
                        field: "background",
                        value: spec.to_string(),
                    });
                    BackgroundSpec::Disabled
                })
            });

        let tint: Option<Color> = self
            .tint
            .as_deref()
            .or(settings.tint.as_deref())
            .and_then(|spec| match parse_color(spec) {
                Ok(color) => Some(color),
                Err(_) => {
                    warnings.push(RunWarning::ConfigIgnored {
                        field: "tint",
                        value: spec.to_string(),
                    });
                    None
                }
            });

        let blend_mode = self.blend_mode.unwrap_or_else(|| {
            settings
                .blend_mode
                .as_deref()
                .map_or(BlendMode::Normal, |mode| {
                    mode.parse().unwrap_or_else(|_| {
                        warnings.push(RunWarning::ConfigIgnored {
                            field: "blend_mode",
                            value: mode.to_string(),
                        });
                        BlendMode::Normal
                    })
                })
        });

        let region_tint = self.region_tint || settings.region_tint.unwrap_or(false);
        let region_palette = region_tint.then(|| {
            let tolerance = settings
                .region_tolerance
                .unwrap_or(DEFAULT_REGION_TOLERANCE);
            settings.regions.clone().map_or_else(
                || RegionPalette::new(RegionPalette::default().regions().to_vec(), tolerance),
                |regions| RegionPalette::new(regions, tolerance),
            )
        });

        let reuse = ReusePolicy {
            allow_reuse: !(self.no_reuse || settings.no_reuse.unwrap_or(false)),
            min_reuse_distance: self
                .min_distance
                .or(settings.min_distance)
                .unwrap_or(DEFAULT_MIN_REUSE_DISTANCE) as usize,
            max_reuse: self
                .max_reuse
                .or(settings.max_reuse)
                .unwrap_or(DEFAULT_MAX_REUSE),
            diversity_weight: self
                .diversity
                .or(settings.diversity)
                .unwrap_or(DEFAULT_DIVERSITY_WEIGHT),
        };

        let assembly = AssemblyConfig {
            tile_size: self
                .tile_size
                .or(settings.tile_size)
                .unwrap_or(DEFAULT_TILE_SIZE),
            enlargement: self
                .enlarge
                .or(settings.enlarge)
                .unwrap_or(DEFAULT_ENLARGEMENT),
            reuse,
            background,
            bg_threshold: self
                .bg_threshold
                .or(settings.bg_threshold)
                .unwrap_or(DEFAULT_BG_THRESHOLD),
            bg_tolerance: self
                .bg_tolerance
                .or(settings.bg_tolerance)
                .unwrap_or(DEFAULT_BG_TOLERANCE),
            corner_sample_size: DEFAULT_CORNER_SAMPLE_SIZE,
            tint,
            tint_blend: BlendConfig::new(
                blend_mode,
                self.tint_alpha
                    .or(settings.tint_alpha)
                    .unwrap_or(DEFAULT_TINT_ALPHA),
            ),
            region_palette,
            color_match: !(self.no_color_match || settings.no_color_match.unwrap_or(false)),
            top_n: DEFAULT_TOP_N,
            randomize: !self.deterministic,
            cheat_alpha: self.cheat.or(settings.cheat).unwrap_or(0.0),
            seed: self.seed.or(settings.seed).unwrap_or(DEFAULT_SEED),
            skip_text_cards: self.skip_text_cards || settings.skip_text_cards.unwrap_or(false),
        };

        Ok(ResolvedRun {
            name,
            target,
            tiles_dir,
            output,
            assembly,
            warnings,
        })
    }
}

/// Runs one mosaic from parsed command-line arguments
pub struct MosaicRunner {
    cli: Cli,
}

impl MosaicRunner {
    /// Create a runner for the given CLI arguments
    pub const fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Load settings, assemble the mosaic and log a summary
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file is invalid, a required path is
    /// missing, or any fatal assembly stage fails
    pub fn process(&self) -> Result<RunStatistics> {
        let settings = match &self.cli.config {
            Some(path) => {
                let settings = MosaicSettings::from_json_file(path)?;
                info!(
                    "Loaded config: {}",
                    settings
                        .name
                        .clone()
                        .unwrap_or_else(|| path.display().to_string())
                );
                settings
            }
            None => MosaicSettings::default(),
        };

        let run = self.cli.resolve(&settings, &Local::now())?;
        for warning in &run.warnings {
            warn!("{warning}");
        }
        log_configuration(&run);

        let progress = ProgressManager::new(self.cli.quiet);
        let mut assembler = MosaicAssembler::with_progress(run.assembly.clone(), progress)?;
        let mut statistics = assembler
            .run(&run.target, &run.tiles_dir, &run.output)?
            .clone();
        let mut warnings = run.warnings;
        warnings.append(&mut statistics.warnings);
        statistics.warnings = warnings;

        log_summary(&statistics, &run.output);
        Ok(statistics)
    }
}

fn log_configuration(run: &ResolvedRun) {
    let config = &run.assembly;
    info!("Photo mosaic: {}", run.name);

    if config.reuse.diversity_weight > 0.0 {
        info!("Diversity weight: {}", config.reuse.diversity_weight);
    }
    if config.region_palette.is_some() {
        info!(
            "Region-based tinting at {:.0}% ({} blend)",
            config.tint_blend.alpha * 100.0,
            config.tint_blend.mode
        );
    } else if let Some(tint) = config.tint {
        info!(
            "Tile tint {tint:?} at {:.0}% ({} blend)",
            config.tint_blend.alpha * 100.0,
            config.tint_blend.mode
        );
    }
    if !config.color_match {
        info!("Random tile selection (no colour matching)");
    }
}

fn log_summary(statistics: &RunStatistics, output: &Path) {
    let output = std::fs::canonicalize(output).unwrap_or_else(|_| output.to_path_buf());

    info!(
        "Tiles loaded: {} of {} candidates",
        statistics.tiles_loaded, statistics.tiles_discovered
    );
    if statistics.background_cells > 0 {
        info!(
            "Background cells: {} ({:.1}% of grid)",
            statistics.background_cells,
            statistics.background_fraction() * 100.0
        );
    }
    if statistics.exhaustion_fallbacks > 0 {
        info!("Exhaustion fallbacks: {}", statistics.exhaustion_fallbacks);
    }
    if !statistics.warnings.is_empty() {
        info!("Warnings issued: {}", statistics.warnings.len());
    }
    info!("Mosaic saved to: {}", output.display());
}
