//! Photo mosaic assembly from a pool of tile images
//!
//! A target image is divided into a grid of square cells. Each cell is filled
//! with the tile whose average colour best matches it, subject to reuse
//! limits and a diversity penalty, or painted solid when it belongs to the
//! background. Tiles may be tinted per cell and the target can be blended
//! back over the finished canvas.

#![forbid(unsafe_code)]

/// Tile pool, candidate selection and the assembly state machine
pub mod algorithm;
/// Background, region and tile-source heuristics
pub mod analysis;
/// Input/output operations, configuration and error handling
pub mod io;
/// Colour arithmetic and blend modes
pub mod math;
/// Grid layout and tile preparation
pub mod spatial;

pub use io::error::{MosaicError, Result};
