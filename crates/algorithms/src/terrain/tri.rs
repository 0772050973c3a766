//! Terrain Ruggedness Index (TRI)
//!
//! Quantifies the elevation difference between a cell and its 8 neighbors.
//!
//! - Wilson et al. (2007): mean absolute difference, suited to bathymetry
//!   and the default
//! - Riley et al. (1999): square root of the summed squared differences,
//!   suited to terrestrial surfaces

use super::{apply_to_raster, Kernel, TerrainKernel};
use demkit_core::raster::{NeighborhoodWindow, Raster};
use demkit_core::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// TRI formulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TriAlgorithm {
    #[default]
    Wilson,
    Riley,
}

impl FromStr for TriAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wilson" => Ok(TriAlgorithm::Wilson),
            "riley" => Ok(TriAlgorithm::Riley),
            _ => Err(format!("unknown TRI algorithm '{}' (expected Wilson or Riley)", s)),
        }
    }
}

impl Kernel for TriAlgorithm {
    #[inline]
    fn apply(&self, window: &NeighborhoodWindow, _dst_nodata: f64) -> f64 {
        let center = window.center();
        match self {
            TriAlgorithm::Wilson => window.neighbors().map(|v| (v - center).abs()).sum::<f64>() / 8.0,
            TriAlgorithm::Riley => window
                .neighbors()
                .map(|v| (v - center) * (v - center))
                .sum::<f64>()
                .sqrt(),
        }
    }

    fn name(&self) -> &'static str {
        "TRI"
    }
}

/// Calculate Terrain Ruggedness Index
///
/// # Returns
/// Raster with TRI values (same units as input elevation), -9999 where
/// no value could be computed
pub fn tri(dem: &Raster<f64>, algorithm: TriAlgorithm, compute_edges: bool) -> Result<Raster<f64>> {
    apply_to_raster(dem, &TerrainKernel::Tri(algorithm), compute_edges)
}
