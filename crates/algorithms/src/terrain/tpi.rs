//! Topographic Position Index (TPI)
//!
//! TPI measures the difference between the elevation of a cell and the mean
//! elevation of its 8 neighbors:
//!
//!   TPI = z_center - mean(z_neighbors)
//!
//! - Positive TPI → cell is higher than surroundings (ridge, hilltop)
//! - Negative TPI → cell is lower than surroundings (valley, depression)
//! - Near-zero TPI → flat area or constant slope
//!
//! Reference: Weiss (2001) "Topographic Position and Landforms Analysis"

use super::{apply_to_raster, Kernel, TerrainKernel};
use demkit_core::raster::{NeighborhoodWindow, Raster};
use demkit_core::Result;

/// TPI algorithm
#[derive(Debug, Clone, Copy, Default)]
pub struct Tpi;

impl Kernel for Tpi {
    #[inline]
    fn apply(&self, window: &NeighborhoodWindow, _dst_nodata: f64) -> f64 {
        window.center() - window.neighbors().sum::<f64>() / 8.0
    }

    fn name(&self) -> &'static str {
        "TPI"
    }
}

/// Calculate Topographic Position Index
pub fn tpi(dem: &Raster<f64>, compute_edges: bool) -> Result<Raster<f64>> {
    apply_to_raster(dem, &TerrainKernel::Tpi, compute_edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use demkit_core::GeoTransform;

    #[test]
    fn test_tpi_peak_and_pit() {
        let peak = NeighborhoodWindow::new([0.0, 0.0, 0.0, 0.0, 8.0, 0.0, 0.0, 0.0, 0.0]);
        assert_relative_eq!(Kernel::apply(&Tpi, &peak, -9999.0), 8.0);
        let pit = NeighborhoodWindow::new([4.0, 4.0, 4.0, 4.0, 0.0, 4.0, 4.0, 4.0, 4.0]);
        assert_relative_eq!(Kernel::apply(&Tpi, &pit, -9999.0), -4.0);
    }

    #[test]
    fn test_tpi_constant_slope() {
        let mut dem = Raster::new(7, 7);
        dem.set_transform(GeoTransform::new(0.0, 7.0, 1.0, -1.0));
        for row in 0..7 {
            for col in 0..7 {
                dem.set(row, col, 3.0 * col as f64 - row as f64).unwrap();
            }
        }
        let result = tpi(&dem, true).unwrap();
        for row in 0..7 {
            for col in 0..7 {
                assert_relative_eq!(result.get(row, col).unwrap(), 0.0, epsilon = 1e-5);
            }
        }
    }
}
