//! # demkit Core
//!
//! Core types, traits and I/O for the demkit DEM processing tools.
//!
//! This crate provides:
//! - `Raster<T>`: generic in-memory raster grid
//! - `NeighborhoodWindow`: the 3x3 sample every terrain kernel consumes
//! - `SourceNoData` / `DestNoData`: nodata semantics on both sides of a kernel
//! - `RasterSource`, `RasterSink`, `ProgressReporter`: the narrow interfaces
//!   through which processing reads, writes and reports
//! - Native GeoTIFF I/O for the command-line tool

pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, ErrorCategory, Result};
pub use raster::{
    DataType, DestNoData, GeoTransform, NeighborhoodWindow, Raster, RasterElement, SourceNoData,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::io::{NoProgress, ProgressReporter, RasterSink, RasterSource};
    pub use crate::raster::{
        DataType, DestNoData, GeoTransform, NeighborhoodWindow, Raster, RasterElement,
        SourceNoData,
    };
}
