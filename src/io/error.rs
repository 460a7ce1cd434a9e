//! Error types and non-fatal warnings for mosaic assembly

use std::fmt;
use std::path::{Path, PathBuf};

/// Main error type for all mosaic operations
#[derive(Debug)]
pub enum MosaicError {
    /// Failed to decode an image from the filesystem
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image loading error
        source: image::ImageError,
    },

    /// Tile directory does not exist or is not a directory
    DirectoryNotFound {
        /// Path that was expected to be a directory
        path: PathBuf,
    },

    /// No tile could be prepared from the tile directory
    EmptyPool {
        /// Directory the tiles were read from
        directory: PathBuf,
        /// Number of candidate image files discovered
        discovered: usize,
    },

    /// A background or tint specification could not be parsed
    ///
    /// Callers treat this as non-fatal and disable the feature.
    ConfigParse {
        /// Name of the setting being parsed
        field: &'static str,
        /// Raw value that failed to parse
        value: String,
        /// Explanation of the accepted forms
        reason: String,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Failed to save the finished canvas
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image export error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Settings file is not valid JSON for the expected schema
    SettingsFile {
        /// Path to the settings file
        path: PathBuf,
        /// Underlying deserialization error
        source: serde_json::Error,
    },

    /// An assembler operation was invoked out of order
    InvalidStage {
        /// Operation that was attempted
        operation: &'static str,
        /// Stage the assembler was in
        stage: &'static str,
    },
}

impl fmt::Display for MosaicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::DirectoryNotFound { path } => {
                write!(f, "Tiles directory not found: '{}'", path.display())
            }
            Self::EmptyPool {
                directory,
                discovered,
            } => {
                write!(
                    f,
                    "No usable tiles in '{}' ({discovered} candidate files)",
                    directory.display()
                )
            }
            Self::ConfigParse {
                field,
                value,
                reason,
            } => {
                write!(f, "Could not parse {field} '{value}': {reason}")
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
            Self::SettingsFile { path, source } => {
                write!(f, "Invalid settings file '{}': {source}", path.display())
            }
            Self::InvalidStage { operation, stage } => {
                write!(f, "Cannot {operation} while assembler is in stage {stage}")
            }
        }
    }
}

impl std::error::Error for MosaicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            Self::SettingsFile { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for mosaic results
pub type Result<T> = std::result::Result<T, MosaicError>;

/// Attaches the real file path to errors converted without one
pub trait WithPath<T> {
    /// Replace the placeholder path of an image or file system error
    ///
    /// # Errors
    ///
    /// Propagates the original error with the path applied
    fn with_path(self, path: &Path) -> Result<T>;
}

impl<T, E> WithPath<T> for std::result::Result<T, E>
where
    E: Into<MosaicError>,
{
    fn with_path(self, path: &Path) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();
            match &mut error {
                MosaicError::ImageLoad { path: p, .. }
                | MosaicError::ImageExport { path: p, .. }
                | MosaicError::FileSystem { path: p, .. }
                | MosaicError::SettingsFile { path: p, .. } => {
                    *p = path.to_path_buf();
                }
                _ => {}
            }
            error
        })
    }
}

impl From<image::ImageError> for MosaicError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<std::io::Error> for MosaicError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> MosaicError {
    MosaicError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a configuration parse error
pub fn config_parse(field: &'static str, value: &str, reason: &impl ToString) -> MosaicError {
    MosaicError::ConfigParse {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Conditions that are reported but never abort a run
#[derive(Debug, Clone, PartialEq)]
pub enum RunWarning {
    /// Fewer tiles than recommended were loaded
    LowTileCount {
        /// Number of tiles in the pool
        loaded: usize,
    },

    /// The grid needs more cells than the pool has tiles under a no-reuse policy
    CapacityRelaxed {
        /// Number of grid cells
        cells: usize,
        /// Number of tiles in the pool
        tiles: usize,
        /// Reuse limit applied after relaxing
        max_reuse: usize,
    },

    /// A background or tint setting was ignored
    ConfigIgnored {
        /// Name of the setting
        field: &'static str,
        /// Raw value that could not be parsed
        value: String,
    },

    /// A tile file could not be prepared and was skipped
    TileSkipped {
        /// Path of the skipped file
        path: PathBuf,
        /// Description of the failure
        reason: String,
    },

    /// A tile was excluded because it looks like a text card
    TextCardRejected {
        /// Path of the rejected file
        path: PathBuf,
    },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowTileCount { loaded } => write!(
                f,
                "Only {loaded} tiles loaded. For best results, use 100+ tiles."
            ),
            Self::CapacityRelaxed {
                cells,
                tiles,
                max_reuse,
            } => write!(
                f,
                "Need {cells} tiles but only have {tiles}. Setting max_reuse to {max_reuse}."
            ),
            Self::ConfigIgnored { field, value } => {
                write!(f, "Could not parse {field} '{value}', ignoring")
            }
            Self::TileSkipped { path, reason } => {
                write!(f, "Skipped tile '{}': {reason}", path.display())
            }
            Self::TextCardRejected { path } => {
                write!(f, "Rejected text-card tile '{}'", path.display())
            }
        }
    }
}
