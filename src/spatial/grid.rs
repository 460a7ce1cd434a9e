//! Grid layout over the target image and the output canvas
//!
//! A grid cell `[gx, gy]` covers a `tile_size` square of the target image and
//! a `tile_size * enlargement` square of the canvas. Partial cells at the
//! right and bottom edges of the target are dropped.

use crate::io::error::{MosaicError, Result, invalid_parameter};
use crate::math::color::Color;
use image::{Rgb, RgbImage, imageops};
use ndarray::Array2;

/// Grid coordinates as `[gx, gy]` (column, row)
pub type GridPosition = [usize; 2];

/// Manhattan distance between two grid positions
pub const fn manhattan_distance(a: GridPosition, b: GridPosition) -> usize {
    a[0].abs_diff(b[0]) + a[1].abs_diff(b[1])
}

/// Pixel rectangle inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBounds {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Iterate the pixels of a rectangle in row-major order, clipped to the image
pub fn cell_pixels(image: &RgbImage, bounds: CellBounds) -> impl Iterator<Item = Color> + '_ {
    let x_range = bounds.x..bounds.x.saturating_add(bounds.width);
    (bounds.y..bounds.y.saturating_add(bounds.height)).flat_map(move |y| {
        x_range
            .clone()
            .filter_map(move |x| image.get_pixel_checked(x, y).map(|p| p.0))
    })
}

/// How a grid cell was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFill {
    /// Index of the pool tile placed in the cell
    Tile(usize),
    /// Solid background colour painted instead of a tile
    Background(Color),
}

/// Dimensions of the mosaic grid and the mapping to canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// Number of cells per row
    pub columns: usize,
    /// Number of cell rows
    pub rows: usize,
    /// Cell edge length in target-image pixels
    pub tile_size: u32,
    /// Canvas scale factor
    pub enlargement: u32,
}

impl GridLayout {
    /// Lay a grid over a `width` x `height` target image
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if `tile_size` is zero,
    /// `enlargement` is zero, or the image is smaller than one cell
    pub fn for_image(width: u32, height: u32, tile_size: u32, enlargement: u32) -> Result<Self> {
        if tile_size == 0 {
            return Err(invalid_parameter("tile_size", &tile_size, &"must be positive"));
        }
        if enlargement == 0 {
            return Err(invalid_parameter(
                "enlargement",
                &enlargement,
                &"must be at least 1",
            ));
        }

        let columns = (width / tile_size) as usize;
        let rows = (height / tile_size) as usize;
        if columns == 0 || rows == 0 {
            return Err(invalid_parameter(
                "tile_size",
                &tile_size,
                &format!("target image {width}x{height} is smaller than one cell"),
            ));
        }

        Ok(Self {
            columns,
            rows,
            tile_size,
            enlargement,
        })
    }

    /// Total number of cells
    pub const fn cell_count(&self) -> usize {
        self.columns * self.rows
    }

    /// Edge length of a placed tile on the canvas
    pub const fn output_tile_size(&self) -> u32 {
        self.tile_size * self.enlargement
    }

    /// Canvas size as `(width, height)`
    pub const fn canvas_dimensions(&self) -> (u32, u32) {
        let size = self.output_tile_size();
        (self.columns as u32 * size, self.rows as u32 * size)
    }

    /// Region of the target image covered by a cell
    pub const fn source_bounds(&self, position: GridPosition) -> CellBounds {
        CellBounds {
            x: position[0] as u32 * self.tile_size,
            y: position[1] as u32 * self.tile_size,
            width: self.tile_size,
            height: self.tile_size,
        }
    }

    /// Top-left canvas pixel of a cell
    pub const fn canvas_origin(&self, position: GridPosition) -> (u32, u32) {
        let size = self.output_tile_size();
        (position[0] as u32 * size, position[1] as u32 * size)
    }

    /// All cell positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = GridPosition> + use<> {
        let columns = self.columns;
        (0..self.rows).flat_map(move |gy| (0..columns).map(move |gx| [gx, gy]))
    }

    /// Allocate a black canvas of the output size
    pub fn blank_canvas(&self) -> RgbImage {
        let (width, height) = self.canvas_dimensions();
        RgbImage::new(width, height)
    }

    /// Paint a cell of the canvas with a solid colour
    pub fn paint_cell(&self, canvas: &mut RgbImage, position: GridPosition, color: Color) {
        let size = self.output_tile_size();
        let solid = RgbImage::from_pixel(size, size, Rgb(color));
        self.place_pixels(canvas, position, &solid);
    }

    /// Copy tile pixels into a cell of the canvas
    ///
    /// Pixels falling outside the canvas are clipped.
    pub fn place_pixels(&self, canvas: &mut RgbImage, position: GridPosition, pixels: &RgbImage) {
        let (x, y) = self.canvas_origin(position);
        imageops::replace(canvas, pixels, i64::from(x), i64::from(y));
    }

    /// Arrange row-major cell fills into a `[rows, columns]` array
    ///
    /// # Errors
    ///
    /// Returns an invalid parameter error if the number of fills does not
    /// match the cell count
    pub fn assignment_map(&self, fills: Vec<CellFill>) -> Result<Array2<CellFill>> {
        let count = fills.len();
        Array2::from_shape_vec((self.rows, self.columns), fills).map_err(|e| {
            MosaicError::InvalidParameter {
                parameter: "cell_fills",
                value: count.to_string(),
                reason: format!("expected {} cells: {e}", self.cell_count()),
            }
        })
    }
}
