//! Roughness: largest elevation difference inside the 3x3 window

use super::{apply_to_raster, Kernel, TerrainKernel};
use demkit_core::raster::{NeighborhoodWindow, Raster};
use demkit_core::Result;

/// Roughness algorithm
#[derive(Debug, Clone, Copy, Default)]
pub struct Roughness;

impl Kernel for Roughness {
    #[inline]
    fn apply(&self, window: &NeighborhoodWindow, _dst_nodata: f64) -> f64 {
        window.max() - window.min()
    }

    fn name(&self) -> &'static str {
        "roughness"
    }
}

pub fn roughness(dem: &Raster<f64>, compute_edges: bool) -> Result<Raster<f64>> {
    apply_to_raster(dem, &TerrainKernel::Roughness, compute_edges)
}
