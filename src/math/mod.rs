//! Colour arithmetic and compositing

/// Blend modes for tile tinting and the cheat blend
pub mod blend;
/// RGB colour primitives, distances and parsing
pub mod color;
