//! Error types for demkit

use thiserror::Error;

/// Main error type for demkit operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read source row {row}: {reason}")]
    Read { row: usize, reason: String },

    #[error("Failed to write band {band}, row {row}: {reason}")]
    Write {
        band: usize,
        row: usize,
        reason: String,
    },

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Buffer size mismatch: expected {expected} values, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("{0}")]
    Configuration(String),

    #[error("Unable to fetch band #{band}: source has {count} band(s)")]
    InvalidBand { band: usize, count: usize },

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{}", color_table_message(.table, .line, .reason))]
    ColorTable {
        table: String,
        line: Option<usize>,
        reason: String,
    },

    #[error("User terminated")]
    Cancelled,
}

fn color_table_message(table: &str, line: &Option<usize>, reason: &str) -> String {
    match line {
        Some(line) => format!("{}:{}: {}", table, line, reason),
        None => reason.to_string(),
    }
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad algorithm name, option combination, band index or parameter value
    Configuration,
    /// Color table could not be read or parsed
    ColorTable,
    /// Raster source or sink failure
    Io,
    /// Progress callback asked to stop
    Cancelled,
    /// Anything else (geometry, unsupported types)
    Other,
}

impl Error {
    /// Which failure class this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UnknownAlgorithm(_)
            | Error::Configuration(_)
            | Error::InvalidBand { .. }
            | Error::InvalidParameter { .. } => ErrorCategory::Configuration,
            Error::ColorTable { .. } => ErrorCategory::ColorTable,
            Error::Io(_) | Error::Read { .. } | Error::Write { .. } | Error::Tiff(_) => {
                ErrorCategory::Io
            }
            Error::Cancelled => ErrorCategory::Cancelled,
            Error::InvalidDimensions { .. }
            | Error::IndexOutOfBounds { .. }
            | Error::SizeMismatch { .. }
            | Error::UnsupportedDataType(_) => ErrorCategory::Other,
        }
    }

    /// Shorthand for a color table error tied to a source line.
    pub fn color_table(table: impl Into<String>, line: Option<usize>, reason: impl Into<String>) -> Self {
        Error::ColorTable {
            table: table.into(),
            line,
            reason: reason.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Result type alias for demkit operations
pub type Result<T> = std::result::Result<T, Error>;
