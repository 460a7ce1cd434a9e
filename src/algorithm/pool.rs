//! Tile pool with reuse and diversity bookkeeping
//!
//! The pool owns every prepared tile together with the mutable state that
//! constrains selection: per-tile usage counts, a bounded history of grid
//! positions each tile was placed at, and the set of tiles never used.
//! Selection and recording happen in one call so that each cell's choice
//! is fully accounted for before the next cell is considered.

use crate::algorithm::selection::{RandomSelector, candidate_weights, rank_by_adjusted_distance};
use crate::io::configuration::{
    DEFAULT_DIVERSITY_WEIGHT, DEFAULT_MAX_REUSE, DEFAULT_MIN_REUSE_DISTANCE,
    LOW_TILE_COUNT_WARNING, RECENT_USAGE_CAPACITY, RECENT_USAGE_RETAINED,
};
use crate::io::error::{MosaicError, Result, RunWarning, invalid_parameter};
use crate::io::image::collect_image_paths;
use crate::math::color::Color;
use crate::spatial::grid::{GridPosition, manhattan_distance};
use crate::spatial::tiles::{Tile, TileOutcome, load_tiles};
use bitvec::vec::BitVec;
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};

/// Constraints on how often and how close together a tile may repeat
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReusePolicy {
    /// Whether a tile may be placed more than once
    pub allow_reuse: bool,
    /// Minimum Manhattan grid distance between placements of one tile
    pub min_reuse_distance: usize,
    /// Maximum placements per tile (0 = unlimited)
    pub max_reuse: usize,
    /// Weight of the usage penalty added to colour distance
    pub diversity_weight: f64,
}

impl Default for ReusePolicy {
    fn default() -> Self {
        Self {
            allow_reuse: true,
            min_reuse_distance: DEFAULT_MIN_REUSE_DISTANCE as usize,
            max_reuse: DEFAULT_MAX_REUSE,
            diversity_weight: DEFAULT_DIVERSITY_WEIGHT,
        }
    }
}

impl ReusePolicy {
    /// Unlimited reuse with no distance constraint
    pub const fn unconstrained() -> Self {
        Self {
            allow_reuse: true,
            min_reuse_distance: 0,
            max_reuse: 0,
            diversity_weight: 0.0,
        }
    }

    /// True when no placement can ever be rejected
    pub const fn is_unconstrained(&self) -> bool {
        self.allow_reuse && self.max_reuse == 0 && self.min_reuse_distance == 0
    }

    /// Check that the diversity weight is a non-negative number
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error otherwise
    pub fn validate(&self) -> Result<()> {
        if self.diversity_weight.is_finite() && self.diversity_weight >= 0.0 {
            Ok(())
        } else {
            Err(invalid_parameter(
                "diversity_weight",
                &self.diversity_weight,
                &"must be a non-negative number",
            ))
        }
    }
}

/// Counts gathered while building a pool from a directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolLoadReport {
    /// Candidate image files found
    pub discovered: usize,
    /// Tiles successfully prepared
    pub loaded: usize,
    /// Files that could not be decoded or cropped
    pub failed: usize,
    /// Files rejected as text cards
    pub rejected: usize,
    /// One warning per failed or rejected file
    pub warnings: Vec<RunWarning>,
}

/// Prepared tiles plus all reuse state for one mosaic run
#[derive(Debug)]
pub struct TilePool {
    tiles: Vec<Tile>,
    colors: Vec<Color>,
    usage_counts: Vec<usize>,
    recent_usage: Vec<Vec<GridPosition>>,
    unused: BitVec,
    policy: ReusePolicy,
    selector: RandomSelector,
    exhaustion_fallbacks: usize,
}

impl TilePool {
    /// Build a pool from prepared tiles
    ///
    /// # Errors
    ///
    /// Returns an empty pool error if `tiles` is empty, or an invalid
    /// parameter error if the policy is invalid
    pub fn new(tiles: Vec<Tile>, policy: ReusePolicy, selector: RandomSelector) -> Result<Self> {
        policy.validate()?;
        if tiles.is_empty() {
            return Err(MosaicError::EmptyPool {
                directory: PathBuf::from("<memory>"),
                discovered: 0,
            });
        }

        let count = tiles.len();
        let colors = tiles.iter().map(Tile::average_color).collect();

        Ok(Self {
            tiles,
            colors,
            usage_counts: vec![0; count],
            recent_usage: vec![Vec::new(); count],
            unused: BitVec::repeat(true, count),
            policy,
            selector,
            exhaustion_fallbacks: 0,
        })
    }

    /// Prepare every supported image in a directory and build a pool
    ///
    /// Files that fail to load are skipped and reported rather than
    /// aborting the build.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory does not exist or no tile could
    /// be prepared from it
    pub fn from_directory(
        directory: &Path,
        tile_size: u32,
        skip_text_cards: bool,
        policy: ReusePolicy,
        selector: RandomSelector,
        progress: ProgressBar,
    ) -> Result<(Self, PoolLoadReport)> {
        let paths = collect_image_paths(directory)?;
        progress.set_length(paths.len() as u64);

        let mut report = PoolLoadReport {
            discovered: paths.len(),
            ..PoolLoadReport::default()
        };

        let mut tiles = Vec::with_capacity(paths.len());
        for (path, outcome) in load_tiles(&paths, tile_size, skip_text_cards, progress) {
            match outcome {
                TileOutcome::Loaded(tile) => tiles.push(tile),
                TileOutcome::TextCard => {
                    report.rejected += 1;
                    report.warnings.push(RunWarning::TextCardRejected { path });
                }
                TileOutcome::Failed(error) => {
                    report.failed += 1;
                    report.warnings.push(RunWarning::TileSkipped {
                        path,
                        reason: error.to_string(),
                    });
                }
            }
        }
        report.loaded = tiles.len();

        if tiles.is_empty() {
            return Err(MosaicError::EmptyPool {
                directory: directory.to_path_buf(),
                discovered: report.discovered,
            });
        }

        Ok((Self::new(tiles, policy, selector)?, report))
    }

    /// Number of tiles
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Always false for a constructed pool
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tile at `index`
    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    /// All tiles in pool order
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Active reuse policy
    pub const fn policy(&self) -> &ReusePolicy {
        &self.policy
    }

    /// Times the tile at `index` has been placed
    pub fn usage_count(&self, index: usize) -> usize {
        self.usage_counts.get(index).copied().unwrap_or(0)
    }

    /// Recent placements of the tile at `index`, oldest first
    pub fn recent_usage(&self, index: usize) -> &[GridPosition] {
        self.recent_usage.get(index).map_or(&[], Vec::as_slice)
    }

    /// Whether the tile at `index` has never been placed
    pub fn is_unused(&self, index: usize) -> bool {
        self.unused.get(index).is_some_and(|bit| *bit)
    }

    /// Number of tiles never placed
    pub fn unused_count(&self) -> usize {
        self.unused.count_ones()
    }

    /// Selections that ignored the policy because no tile satisfied it
    pub const fn exhaustion_fallbacks(&self) -> usize {
        self.exhaustion_fallbacks
    }

    /// Warning for pools smaller than recommended
    pub fn low_tile_warning(&self) -> Option<RunWarning> {
        (self.len() < LOW_TILE_COUNT_WARNING).then(|| RunWarning::LowTileCount {
            loaded: self.len(),
        })
    }

    /// Allow reuse when a no-reuse grid has more cells than tiles
    ///
    /// Sets `max_reuse` to `cells / tiles + 1` and returns the warning to
    /// report, or `None` when no relaxation was needed.
    pub fn relax_for_capacity(&mut self, cells: usize) -> Option<RunWarning> {
        let tiles = self.len();
        if self.policy.allow_reuse || cells <= tiles {
            return None;
        }

        let max_reuse = cells / tiles + 1;
        self.policy.allow_reuse = true;
        self.policy.max_reuse = max_reuse;

        Some(RunWarning::CapacityRelaxed {
            cells,
            tiles,
            max_reuse,
        })
    }

    /// Whether the tile at `index` may be placed at `position`
    pub fn is_valid_position(&self, index: usize, position: GridPosition) -> bool {
        let count = self.usage_count(index);

        if !self.policy.allow_reuse && count > 0 {
            return false;
        }
        if self.policy.max_reuse > 0 && count >= self.policy.max_reuse {
            return false;
        }

        self.recent_usage(index)
            .iter()
            .all(|&previous| manhattan_distance(previous, position) >= self.policy.min_reuse_distance)
    }

    /// Colour distance plus diversity penalty for every tile, best first
    pub fn adjusted_distances(&self, target: Color) -> Vec<(usize, f64)> {
        rank_by_adjusted_distance(
            target,
            &self.colors,
            &self.usage_counts,
            self.policy.diversity_weight,
        )
    }

    /// Choose the tile whose colour best matches `target` and record it
    ///
    /// Under an unconstrained policy the closest tile wins outright.
    /// Otherwise up to `top_n` tiles valid at `position` are kept in rank
    /// order and, with `randomize`, one is drawn with weights favouring
    /// better ranks. If no tile is valid the least used tile is taken.
    pub fn find_best_match(
        &mut self,
        target: Color,
        position: GridPosition,
        top_n: usize,
        randomize: bool,
    ) -> usize {
        let ranked = self.adjusted_distances(target);

        let chosen = if self.policy.is_unconstrained() {
            ranked.first().map(|&(index, _)| index)
        } else {
            let candidates: Vec<usize> = ranked
                .iter()
                .map(|&(index, _)| index)
                .filter(|&index| self.is_valid_position(index, position))
                .take(top_n.max(1))
                .collect();

            if randomize && candidates.len() > 1 {
                let pick = self
                    .selector
                    .weighted_choice(&candidate_weights(candidates.len()));
                candidates.get(pick).copied()
            } else {
                candidates.first().copied()
            }
        };

        self.commit(chosen, position)
    }

    /// Choose a random tile valid at `position` and record it
    ///
    /// Tiles never used before are preferred; then any valid tile; then
    /// the least used tile.
    pub fn find_random_tile(&mut self, position: GridPosition) -> usize {
        let valid_unused: Vec<usize> = self
            .unused
            .iter_ones()
            .filter(|&index| self.is_valid_position(index, position))
            .collect();

        let chosen = match self.selector.choose(&valid_unused) {
            Some(index) => Some(index),
            None => {
                let valid: Vec<usize> = (0..self.len())
                    .filter(|&index| self.is_valid_position(index, position))
                    .collect();
                self.selector.choose(&valid)
            }
        };

        self.commit(chosen, position)
    }

    /// Record that the tile at `index` was placed at `position`
    pub fn record_usage(&mut self, index: usize, position: GridPosition) {
        if let Some(count) = self.usage_counts.get_mut(index) {
            *count += 1;
        }

        if let Some(history) = self.recent_usage.get_mut(index) {
            history.push(position);
            if history.len() > RECENT_USAGE_CAPACITY {
                let excess = history.len() - RECENT_USAGE_RETAINED;
                history.drain(..excess);
            }
        }

        if index < self.unused.len() {
            self.unused.set(index, false);
        }
    }

    fn commit(&mut self, chosen: Option<usize>, position: GridPosition) -> usize {
        let index = chosen.unwrap_or_else(|| {
            self.exhaustion_fallbacks += 1;
            self.least_used()
        });
        self.record_usage(index, position);
        index
    }

    // Ties resolve to the lowest index
    fn least_used(&self) -> usize {
        self.usage_counts
            .iter()
            .enumerate()
            .min_by_key(|&(_, &count)| count)
            .map_or(0, |(index, _)| index)
    }
}
