//! Input/output, configuration and error handling

/// Command-line interface and run orchestration
pub mod cli;
/// Constants, defaults and the JSON settings file
pub mod configuration;
/// Error types and non-fatal warnings
pub mod error;
/// Target loading, tile discovery and canvas export
pub mod image;
/// Progress bars for tile loading and grid filling
pub mod progress;
