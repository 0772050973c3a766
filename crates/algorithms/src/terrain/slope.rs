//! Slope calculation from DEMs
//!
//! Rate of change of elevation from the Horn (1981) or Zevenbergen-Thorne
//! gradient, in degrees or percent.

use super::gradient::GradientAlgorithm;
use super::{apply_to_raster, inverse_resolution, Kernel, TerrainKernel};
use demkit_core::raster::{GeoTransform, NeighborhoodWindow, Raster};
use demkit_core::Result;
use serde::{Deserialize, Serialize};

/// Units for slope output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlopeUnits {
    /// Degrees (0-90)
    #[default]
    Degrees,
    /// Percent rise (0-infinity, 100 at 45 degrees)
    Percent,
}

/// Parameters for slope calculation
#[derive(Debug, Clone)]
pub struct SlopeParams {
    pub units: SlopeUnits,
    /// Ratio of horizontal to vertical units along x
    pub xscale: f64,
    /// Ratio of horizontal to vertical units along y
    pub yscale: f64,
    pub gradient: GradientAlgorithm,
    pub compute_edges: bool,
}

impl Default for SlopeParams {
    fn default() -> Self {
        Self {
            units: SlopeUnits::Degrees,
            xscale: 1.0,
            yscale: 1.0,
            gradient: GradientAlgorithm::Horn,
            compute_edges: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SlopeContext {
    units: SlopeUnits,
    gradient: GradientAlgorithm,
    inv_ewres: f64,
    inv_nsres: f64,
    divisor: f64,
}

impl SlopeContext {
    pub fn new(params: &SlopeParams, transform: &GeoTransform) -> Result<Self> {
        let (inv_ewres, inv_nsres) = inverse_resolution(transform, params.xscale, params.yscale)?;
        Ok(Self {
            units: params.units,
            gradient: params.gradient,
            inv_ewres,
            inv_nsres,
            divisor: params.gradient.divisor(),
        })
    }

    pub fn units(&self) -> SlopeUnits {
        self.units
    }
}

impl Kernel for SlopeContext {
    #[inline]
    fn apply(&self, window: &NeighborhoodWindow, _dst_nodata: f64) -> f64 {
        let (x, y) = self.gradient.scaled(window, self.inv_ewres, self.inv_nsres);
        let rise = (x * x + y * y).sqrt() / self.divisor;
        match self.units {
            SlopeUnits::Degrees => rise.atan().to_degrees(),
            SlopeUnits::Percent => 100.0 * rise,
        }
    }

    fn name(&self) -> &'static str {
        "slope"
    }
}

/// Calculate slope from a DEM
///
/// Cells without a result (borders without `compute_edges`, nodata
/// footprints) hold -9999.
pub fn slope(dem: &Raster<f64>, params: SlopeParams) -> Result<Raster<f64>> {
    let ctx = SlopeContext::new(&params, dem.transform())?;
    apply_to_raster(dem, &TerrainKernel::Slope(ctx), params.compute_edges)
}
