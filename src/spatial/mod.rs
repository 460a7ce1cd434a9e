//! Spatial data structures for the mosaic grid
//!
//! This module contains spatial-related functionality including:
//! - Grid layout over the target image and the output canvas
//! - Tile preparation and loading

/// Grid layout, cell bounds and the assignment map
pub mod grid;
/// Tile preparation and parallel loading
pub mod tiles;

pub use grid::GridLayout;
pub use tiles::Tile;
