//! Heuristics over target cells and tile sources

/// Text-card detection for tile sources
pub mod audit;
/// Background colour detection and background-cell classification
pub mod background;
/// Named-region classification for region-based tinting
pub mod regions;
