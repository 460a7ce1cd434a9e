//! Mosaic assembly state machine
//!
//! A run moves through `Init → LoadTarget → LoadTiles → GridFill →
//! CheatBlend (optional) → Save → Done`. Each step is a separate method so
//! callers and tests can inject a target image or tile set directly, and
//! calling a step out of order is reported as an error rather than
//! silently producing a partial mosaic.

use crate::algorithm::pool::{PoolLoadReport, ReusePolicy, TilePool};
use crate::algorithm::selection::RandomSelector;
use crate::analysis::background::{BackgroundSpec, is_background};
use crate::analysis::regions::RegionPalette;
use crate::io::configuration::{
    DEFAULT_BG_THRESHOLD, DEFAULT_BG_TOLERANCE, DEFAULT_CORNER_SAMPLE_SIZE, DEFAULT_ENLARGEMENT,
    DEFAULT_SEED, DEFAULT_TILE_SIZE, DEFAULT_TINT_ALPHA, DEFAULT_TOP_N,
};
use crate::io::error::{MosaicError, Result, RunWarning, invalid_parameter};
use crate::io::image::{load_target, save_canvas};
use crate::io::progress::ProgressManager;
use crate::math::blend::{BlendConfig, BlendMode, apply_tint, blend_images};
use crate::math::color::{BLACK, Color, mean_color};
use crate::spatial::grid::{CellFill, GridLayout, cell_pixels};
use crate::spatial::tiles::Tile;
use image::RgbImage;
use image::imageops::{self, FilterType};
use ndarray::Array2;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Steps of a mosaic run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssemblyStage {
    /// Nothing loaded yet
    Init,
    /// Target image loaded and grid laid out
    LoadTarget,
    /// Tile pool built
    LoadTiles,
    /// Every grid cell resolved onto the canvas
    GridFill,
    /// Target blended over the canvas
    CheatBlend,
    /// Canvas being written
    Save,
    /// Canvas written
    Done,
}

impl AssemblyStage {
    /// Upper-case stage name used in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::LoadTarget => "LOAD_TARGET",
            Self::LoadTiles => "LOAD_TILES",
            Self::GridFill => "GRID_FILL",
            Self::CheatBlend => "CHEAT_BLEND",
            Self::Save => "SAVE",
            Self::Done => "DONE",
        }
    }
}

impl fmt::Display for AssemblyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters of one mosaic run
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyConfig {
    /// Cell edge length in target-image pixels
    pub tile_size: u32,
    /// Canvas scale factor; tiles are prepared at `tile_size * enlargement`
    pub enlargement: u32,
    /// Reuse constraints handed to the tile pool
    pub reuse: ReusePolicy,
    /// How the background colour is chosen
    pub background: BackgroundSpec,
    /// Fraction of matching pixels that makes a cell background
    pub bg_threshold: f64,
    /// Maximum RGB distance for a pixel to match the background
    pub bg_tolerance: f64,
    /// Corner patch size for automatic background detection
    pub corner_sample_size: u32,
    /// Global tint colour
    pub tint: Option<Color>,
    /// Mode and strength used for tinting tiles
    pub tint_blend: BlendConfig,
    /// Per-region tints; replaces the global tint when set
    pub region_palette: Option<RegionPalette>,
    /// Match tiles by colour; otherwise pick them at random
    pub color_match: bool,
    /// Number of valid candidates considered per cell
    pub top_n: usize,
    /// Sample among candidates instead of always taking the best
    pub randomize: bool,
    /// Strength of the final target overlay; 0 disables it
    pub cheat_alpha: f32,
    /// Seed for every random choice in the run
    pub seed: u64,
    /// Exclude tiles that look like text cards
    pub skip_text_cards: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            enlargement: DEFAULT_ENLARGEMENT,
            reuse: ReusePolicy::default(),
            background: BackgroundSpec::Disabled,
            bg_threshold: DEFAULT_BG_THRESHOLD,
            bg_tolerance: DEFAULT_BG_TOLERANCE,
            corner_sample_size: DEFAULT_CORNER_SAMPLE_SIZE,
            tint: None,
            tint_blend: BlendConfig::new(BlendMode::Normal, DEFAULT_TINT_ALPHA),
            region_palette: None,
            color_match: true,
            top_n: DEFAULT_TOP_N,
            randomize: true,
            cheat_alpha: 0.0,
            seed: DEFAULT_SEED,
            skip_text_cards: false,
        }
    }
}

impl AssemblyConfig {
    /// Check every numeric parameter against its allowed range
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error naming the first offending field
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(invalid_parameter("tile_size", &self.tile_size, &"must be positive"));
        }
        if self.enlargement == 0 {
            return Err(invalid_parameter(
                "enlargement",
                &self.enlargement,
                &"must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.bg_threshold) {
            return Err(invalid_parameter(
                "bg_threshold",
                &self.bg_threshold,
                &"must be between 0.0 and 1.0",
            ));
        }
        if self.bg_tolerance.is_nan() || self.bg_tolerance < 0.0 {
            return Err(invalid_parameter(
                "bg_tolerance",
                &self.bg_tolerance,
                &"must be non-negative",
            ));
        }
        self.tint_blend.validate("tint_alpha")?;
        self.cheat_blend().validate("cheat_alpha")?;
        self.reuse.validate()
    }

    /// Blend used for the final target overlay
    ///
    /// Shares the tint's blend mode.
    pub const fn cheat_blend(&self) -> BlendConfig {
        BlendConfig::new(self.tint_blend.mode, self.cheat_alpha)
    }

    /// Tint for a cell with the given average colour
    pub fn tint_for(&self, cell_color: Color) -> Option<Color> {
        match &self.region_palette {
            Some(palette) => palette.tint_for(cell_color),
            None => self.tint,
        }
    }
}

/// Counts and warnings gathered over a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    /// Candidate tile files found
    pub tiles_discovered: usize,
    /// Tiles in the pool
    pub tiles_loaded: usize,
    /// Tile files that could not be prepared
    pub tiles_failed: usize,
    /// Tile files rejected as text cards
    pub tiles_rejected: usize,
    /// Grid cells
    pub cells_total: usize,
    /// Cells painted with the background colour
    pub background_cells: usize,
    /// Cells that received a tile
    pub tiled_cells: usize,
    /// Selections that broke the reuse policy because no tile satisfied it
    pub exhaustion_fallbacks: usize,
    /// Resolved background colour, if background skipping was active
    pub background_color: Option<Color>,
    /// Every non-fatal condition reported during the run
    pub warnings: Vec<RunWarning>,
}

impl RunStatistics {
    /// Share of cells painted as background
    pub fn background_fraction(&self) -> f64 {
        if self.cells_total == 0 {
            0.0
        } else {
            self.background_cells as f64 / self.cells_total as f64
        }
    }
}

/// Drives one mosaic run from target image to saved canvas
///
/// Owns the tile pool and every piece of per-run state, so independent
/// assemblers never interfere.
pub struct MosaicAssembler {
    config: AssemblyConfig,
    stage: AssemblyStage,
    progress: ProgressManager,
    target: Option<RgbImage>,
    layout: Option<GridLayout>,
    background: Option<Color>,
    pool: Option<TilePool>,
    canvas: Option<RgbImage>,
    assignments: Option<Array2<CellFill>>,
    statistics: RunStatistics,
}

impl MosaicAssembler {
    /// Create an assembler with hidden progress bars
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if the configuration is invalid
    pub fn new(config: AssemblyConfig) -> Result<Self> {
        Self::with_progress(config, ProgressManager::new(true))
    }

    /// Create an assembler that reports through `progress`
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if the configuration is invalid
    pub fn with_progress(config: AssemblyConfig, progress: ProgressManager) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stage: AssemblyStage::Init,
            progress,
            target: None,
            layout: None,
            background: None,
            pool: None,
            canvas: None,
            assignments: None,
            statistics: RunStatistics::default(),
        })
    }

    /// Current stage
    pub const fn stage(&self) -> AssemblyStage {
        self.stage
    }

    /// Run configuration
    pub const fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Grid laid over the target, once loaded
    pub const fn layout(&self) -> Option<&GridLayout> {
        self.layout.as_ref()
    }

    /// Resolved background colour, once the target is loaded
    pub const fn background_color(&self) -> Option<Color> {
        self.background
    }

    /// Tile pool, once built
    pub const fn pool(&self) -> Option<&TilePool> {
        self.pool.as_ref()
    }

    /// Output canvas, once the grid is filled
    pub const fn canvas(&self) -> Option<&RgbImage> {
        self.canvas.as_ref()
    }

    /// How each cell was resolved, indexed `[row, column]`
    pub const fn assignments(&self) -> Option<&Array2<CellFill>> {
        self.assignments.as_ref()
    }

    /// Counts and warnings so far
    pub const fn statistics(&self) -> &RunStatistics {
        &self.statistics
    }

    /// Consume the assembler, returning the canvas if the grid was filled
    pub fn into_canvas(self) -> Option<RgbImage> {
        self.canvas
    }

    /// Load the target image from disk
    ///
    /// # Errors
    ///
    /// Returns an error if called out of order, the image cannot be
    /// decoded, or it is smaller than one grid cell
    pub fn load_target(&mut self, path: &Path) -> Result<()> {
        self.expect_stage("load target", &[AssemblyStage::Init])?;
        info!("Loading target image: {}", path.display());
        let target = load_target(path)?;
        self.set_target(target)
    }

    /// Use an in-memory target image
    ///
    /// Lays out the grid and resolves the background colour.
    ///
    /// # Errors
    ///
    /// Returns an error if called out of order or the image is smaller
    /// than one grid cell
    pub fn set_target(&mut self, target: RgbImage) -> Result<()> {
        self.expect_stage("set target", &[AssemblyStage::Init])?;

        let (width, height) = target.dimensions();
        let layout =
            GridLayout::for_image(width, height, self.config.tile_size, self.config.enlargement)?;
        let background = self
            .config
            .background
            .resolve(&target, self.config.corner_sample_size);

        info!(
            "Target {width}x{height}, grid {}x{} = {} cells",
            layout.columns,
            layout.rows,
            layout.cell_count()
        );
        if let Some(color) = background {
            info!(
                "Background colour {color:?} (threshold {:.0}%)",
                self.config.bg_threshold * 100.0
            );
        }

        self.statistics.cells_total = layout.cell_count();
        self.statistics.background_color = background;
        self.layout = Some(layout);
        self.background = background;
        self.target = Some(target);
        self.stage = AssemblyStage::LoadTarget;
        Ok(())
    }

    /// Build the tile pool from every supported image in a directory
    ///
    /// # Errors
    ///
    /// Returns an error if called out of order, the directory does not
    /// exist, or no tile could be prepared
    pub fn load_tiles(&mut self, directory: &Path) -> Result<()> {
        let layout = self.require_layout("load tiles")?;
        info!("Loading tiles from {}", directory.display());

        let (pool, report) = TilePool::from_directory(
            directory,
            layout.output_tile_size(),
            self.config.skip_text_cards,
            self.config.reuse,
            RandomSelector::new(self.config.seed),
            self.progress.tile_bar(0),
        )?;

        self.absorb_report(report);
        self.install_pool(pool);
        Ok(())
    }

    /// Use already prepared tiles
    ///
    /// # Errors
    ///
    /// Returns an error if called out of order, `tiles` is empty, or any
    /// tile is not `tile_size * enlargement` pixels square
    pub fn set_tiles(&mut self, tiles: Vec<Tile>) -> Result<()> {
        let layout = self.require_layout("set tiles")?;
        let expected = layout.output_tile_size();

        if let Some(tile) = tiles
            .iter()
            .find(|t| t.pixels().dimensions() != (expected, expected))
        {
            let (width, height) = tile.pixels().dimensions();
            return Err(invalid_parameter(
                "tiles",
                &format!("{} is {width}x{height}", tile.source()),
                &format!("tiles must be {expected}x{expected}"),
            ));
        }

        let pool = TilePool::new(tiles, self.config.reuse, RandomSelector::new(self.config.seed))?;
        self.statistics.tiles_discovered = pool.len();
        self.statistics.tiles_loaded = pool.len();
        self.install_pool(pool);
        Ok(())
    }

    /// Resolve every grid cell onto a fresh canvas in row-major order
    ///
    /// Background cells are painted solid without touching the pool. All
    /// other cells receive a tile, tinted when configured.
    ///
    /// # Errors
    ///
    /// Returns an error if called before the tiles are loaded
    pub fn fill_grid(&mut self) -> Result<()> {
        self.expect_stage("fill grid", &[AssemblyStage::LoadTiles])?;
        let (Some(target), Some(layout), Some(pool)) =
            (self.target.as_ref(), self.layout, self.pool.as_mut())
        else {
            return Err(self.stage_error("fill grid"));
        };

        let config = &self.config;
        let progress = self.progress.grid_bar(layout.cell_count());
        let mut canvas = layout.blank_canvas();
        let mut fills = Vec::with_capacity(layout.cell_count());
        let mut background_cells = 0;

        for position in layout.positions() {
            let bounds = layout.source_bounds(position);

            let fill = match self.background {
                Some(bg)
                    if is_background(
                        cell_pixels(target, bounds),
                        bg,
                        config.bg_threshold,
                        config.bg_tolerance,
                    ) =>
                {
                    layout.paint_cell(&mut canvas, position, bg);
                    background_cells += 1;
                    CellFill::Background(bg)
                }
                _ => {
                    let cell_color = mean_color(cell_pixels(target, bounds)).unwrap_or(BLACK);
                    let index = if config.color_match {
                        pool.find_best_match(cell_color, position, config.top_n, config.randomize)
                    } else {
                        pool.find_random_tile(position)
                    };

                    if let Some(tile) = pool.tile(index) {
                        match config.tint_for(cell_color) {
                            Some(tint) => {
                                let tinted = apply_tint(tile.pixels(), tint, config.tint_blend);
                                layout.place_pixels(&mut canvas, position, &tinted);
                            }
                            None => layout.place_pixels(&mut canvas, position, tile.pixels()),
                        }
                    }
                    CellFill::Tile(index)
                }
            };

            fills.push(fill);
            progress.inc(1);
        }
        progress.finish();

        let exhaustion_fallbacks = pool.exhaustion_fallbacks();
        let assignments = layout.assignment_map(fills)?;

        if background_cells > 0 {
            info!(
                "Skipped {background_cells} background cells ({:.1}% of grid)",
                background_cells as f64 / layout.cell_count() as f64 * 100.0
            );
        }
        if exhaustion_fallbacks > 0 {
            warn!("Reuse constraints could not be met for {exhaustion_fallbacks} cells");
        }

        self.statistics.background_cells = background_cells;
        self.statistics.tiled_cells = layout.cell_count() - background_cells;
        self.statistics.exhaustion_fallbacks = exhaustion_fallbacks;
        self.canvas = Some(canvas);
        self.assignments = Some(assignments);
        self.stage = AssemblyStage::GridFill;
        Ok(())
    }

    /// Blend the target, resized to the canvas, over the filled canvas
    ///
    /// Does nothing to the pixels when the cheat alpha is zero.
    ///
    /// # Errors
    ///
    /// Returns an error if called before the grid is filled
    pub fn cheat_blend(&mut self) -> Result<()> {
        self.expect_stage("cheat blend", &[AssemblyStage::GridFill])?;
        let blend = self.config.cheat_blend();

        if blend.alpha > 0.0 {
            let (Some(target), Some(canvas)) = (self.target.as_ref(), self.canvas.as_ref()) else {
                return Err(self.stage_error("cheat blend"));
            };

            info!("Applying cheat blend (alpha={}, {})", blend.alpha, blend.mode);
            let (width, height) = canvas.dimensions();
            let overlay = imageops::resize(target, width, height, FilterType::Lanczos3);
            self.canvas = Some(blend_images(canvas, &overlay, blend)?);
        }

        self.stage = AssemblyStage::CheatBlend;
        Ok(())
    }

    /// Write the canvas to `path`
    ///
    /// # Errors
    ///
    /// Returns an error if called before the grid is filled or the image
    /// cannot be written
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.expect_stage("save", &[AssemblyStage::GridFill, AssemblyStage::CheatBlend])?;
        let Some(canvas) = self.canvas.as_ref() else {
            return Err(self.stage_error("save"));
        };

        self.stage = AssemblyStage::Save;
        save_canvas(canvas, path)?;
        info!("Saved mosaic to {}", path.display());

        self.stage = AssemblyStage::Done;
        Ok(())
    }

    /// Perform every stage in order
    ///
    /// # Errors
    ///
    /// Returns the first fatal error from any stage
    pub fn run(&mut self, target: &Path, tiles_dir: &Path, output: &Path) -> Result<&RunStatistics> {
        self.load_target(target)?;
        self.load_tiles(tiles_dir)?;
        self.fill_grid()?;
        if self.config.cheat_alpha > 0.0 {
            self.cheat_blend()?;
        }
        self.save(output)?;
        self.progress.finish();
        Ok(&self.statistics)
    }

    fn expect_stage(&self, operation: &'static str, allowed: &[AssemblyStage]) -> Result<()> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(self.stage_error(operation))
        }
    }

    const fn stage_error(&self, operation: &'static str) -> MosaicError {
        MosaicError::InvalidStage {
            operation,
            stage: self.stage.name(),
        }
    }

    fn require_layout(&self, operation: &'static str) -> Result<GridLayout> {
        self.expect_stage(operation, &[AssemblyStage::LoadTarget])?;
        self.layout.ok_or_else(|| self.stage_error(operation))
    }

    fn absorb_report(&mut self, report: PoolLoadReport) {
        self.statistics.tiles_discovered = report.discovered;
        self.statistics.tiles_loaded = report.loaded;
        self.statistics.tiles_failed = report.failed;
        self.statistics.tiles_rejected = report.rejected;

        for warning in report.warnings {
            debug!("{warning}");
            self.statistics.warnings.push(warning);
        }
        if report.failed > 0 {
            warn!("Skipped {} unreadable tile files", report.failed);
        }
        if report.rejected > 0 {
            warn!("Rejected {} text-card tiles", report.rejected);
        }
    }

    fn install_pool(&mut self, mut pool: TilePool) {
        info!("Loaded {} tiles", pool.len());

        if let Some(warning) = pool.low_tile_warning() {
            self.record_warning(warning);
        }
        if let Some(warning) = pool.relax_for_capacity(self.statistics.cells_total) {
            self.record_warning(warning);
        }

        self.pool = Some(pool);
        self.stage = AssemblyStage::LoadTiles;
    }

    fn record_warning(&mut self, warning: RunWarning) {
        warn!("{warning}");
        self.statistics.warnings.push(warning);
    }
}
