//! # demkit Algorithms
//!
//! DEM products computed from 3x3 neighborhoods, in the manner of gdaldem.
//!
//! ## Modules
//!
//! - **terrain**: hillshade, slope, aspect, TRI, TPI and roughness kernels
//! - **windowed**: the streaming processor and the lazy kernel band that
//!   drive a kernel over a raster source with three resident rows
//! - **dem**: the factory that maps an algorithm name and options to a
//!   runnable operation, color relief included

pub mod dem;
mod maybe_rayon;
pub mod terrain;
pub mod windowed;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::dem::{
        ColorTableSource, DemAlgorithm, DemOptions, DemProcessing, Engine, LazyBands, Operation,
    };
    pub use crate::terrain::{
        apply_to_raster, aspect, hillshade, roughness, slope, tpi, tri, AngleConvention,
        AspectParams, GradientAlgorithm, HillshadeMode, HillshadeParams, Kernel, SlopeParams,
        SlopeUnits, TerrainKernel, TriAlgorithm,
    };
    pub use crate::windowed::{WindowedKernelBand, WindowedRasterProcessor};
    pub use demkit_colormap::{ColorBreakpointTable, ColorRelief, ColorSelectionMode};
    pub use demkit_core::prelude::*;
}
