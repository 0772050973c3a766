//! Aspect calculation from DEMs
//!
//! Direction of the steepest descent. Flat cells have no aspect and get the
//! destination nodata, or 0 with `zero_for_flat`.

use super::gradient::GradientAlgorithm;
use super::{apply_to_raster, Kernel, TerrainKernel, FLOAT_DST_NODATA};
use demkit_core::raster::{DestNoData, NeighborhoodWindow, Raster};
use demkit_core::Result;
use serde::{Deserialize, Serialize};

/// Angle convention of the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AngleConvention {
    /// 0 = north, 90 = east, clockwise
    #[default]
    Azimuth,
    /// 0 = east, 90 = north, counter-clockwise
    Trigonometric,
}

/// Parameters for aspect calculation
#[derive(Debug, Clone, Default)]
pub struct AspectParams {
    pub convention: AngleConvention,
    /// Write 0 for flat cells instead of nodata, and declare no nodata
    pub zero_for_flat: bool,
    pub gradient: GradientAlgorithm,
    pub compute_edges: bool,
}

#[derive(Debug, Clone)]
pub struct AspectContext {
    convention: AngleConvention,
    zero_for_flat: bool,
    gradient: GradientAlgorithm,
}

impl AspectContext {
    pub fn new(params: &AspectParams) -> Self {
        Self {
            convention: params.convention,
            zero_for_flat: params.zero_for_flat,
            gradient: params.gradient,
        }
    }

    pub fn convention(&self) -> AngleConvention {
        self.convention
    }
}

impl Kernel for AspectContext {
    /// Computed in single precision, so that a direction within f32 rounding
    /// of north comes out as 0 rather than 360.
    fn apply(&self, window: &NeighborhoodWindow, dst_nodata: f64) -> f64 {
        let (dx, dy) = self.gradient.deltas(window);
        if dx == 0.0 && dy == 0.0 {
            return dst_nodata;
        }

        let mut aspect = dy.atan2(-dx).to_degrees() as f32;
        match self.convention {
            AngleConvention::Azimuth => {
                aspect = if aspect > 90.0 { 450.0 - aspect } else { 90.0 - aspect };
            }
            AngleConvention::Trigonometric => {
                if aspect < 0.0 {
                    aspect += 360.0;
                }
            }
        }
        if aspect == 360.0 {
            aspect = 0.0;
        }
        aspect as f64
    }

    fn dst_nodata(&self) -> DestNoData {
        if self.zero_for_flat {
            DestNoData::undeclared(0.0)
        } else {
            DestNoData::declared(FLOAT_DST_NODATA)
        }
    }

    fn name(&self) -> &'static str {
        "aspect"
    }
}

/// Calculate aspect from a DEM
///
/// Values are in [0, 360). The aspect does not depend on resolution or
/// z factor, only on the direction of the gradient.
pub fn aspect(dem: &Raster<f64>, params: AspectParams) -> Result<Raster<f64>> {
    let ctx = AspectContext::new(&params);
    apply_to_raster(dem, &TerrainKernel::Aspect(ctx), params.compute_edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use demkit_core::GeoTransform;

    /// Window of the plane z = ex * x + sy * y (x east, y south, in cells)
    fn plane(ex: f64, sy: f64) -> NeighborhoodWindow {
        let mut v = [0.0; 9];
        for r in 0..3 {
            for c in 0..3 {
                v[r * 3 + c] = ex * c as f64 + sy * r as f64;
            }
        }
        NeighborhoodWindow::new(v)
    }

    fn azimuth() -> AspectContext {
        AspectContext::new(&AspectParams::default())
    }

    #[test]
    fn test_aspect_cardinal_directions() {
        let k = azimuth();
        // Descending towards the east
        assert_relative_eq!(k.apply(&plane(-1.0, 0.0), -9999.0), 90.0);
        // Descending towards the west
        assert_relative_eq!(k.apply(&plane(1.0, 0.0), -9999.0), 270.0);
        // Descending towards the south
        assert_relative_eq!(k.apply(&plane(0.0, -1.0), -9999.0), 180.0);
        // Descending towards the north
        assert_eq!(k.apply(&plane(0.0, 1.0), -9999.0), 0.0);
        // South-east
        assert_relative_eq!(k.apply(&plane(-1.0, -1.0), -9999.0), 135.0, epsilon = 1e-4);
    }

    #[test]
    fn test_aspect_trigonometric() {
        let k = AspectContext::new(&AspectParams {
            convention: AngleConvention::Trigonometric,
            ..Default::default()
        });
        assert_eq!(k.apply(&plane(-1.0, 0.0), -9999.0), 0.0);
        assert_relative_eq!(k.apply(&plane(0.0, 1.0), -9999.0), 90.0);
        assert_relative_eq!(k.apply(&plane(1.0, 0.0), -9999.0), 180.0);
        assert_relative_eq!(k.apply(&plane(0.0, -1.0), -9999.0), 270.0);
    }

    #[test]
    fn test_aspect_flat_is_nodata() {
        let k = azimuth();
        assert_eq!(k.apply(&NeighborhoodWindow::flat(12.0), -9999.0), -9999.0);
        assert_eq!(k.dst_nodata(), DestNoData::declared(-9999.0));

        let zero = AspectContext::new(&AspectParams {
            zero_for_flat: true,
            ..Default::default()
        });
        let dst = zero.dst_nodata();
        assert_eq!(dst.metadata(), None);
        assert_eq!(zero.apply(&NeighborhoodWindow::flat(12.0), dst.value), 0.0);
    }

    #[test]
    fn test_aspect_scale_invariant() {
        let w = NeighborhoodWindow::new([12.0, 15.0, 9.0, 4.0, 8.0, 30.0, -2.0, 1.0, 0.5]);
        let scaled = NeighborhoodWindow::new((*w.values()).map(|v| v * 7.5));
        for alg in [GradientAlgorithm::Horn, GradientAlgorithm::ZevenbergenThorne] {
            let k = AspectContext::new(&AspectParams {
                gradient: alg,
                ..Default::default()
            });
            assert_relative_eq!(k.apply(&w, -9999.0), k.apply(&scaled, -9999.0), epsilon = 1e-4);
        }
    }

    #[test]
    fn test_aspect_range() {
        let k = azimuth();
        for i in 0..72 {
            let theta = (i as f64 * 5.0).to_radians();
            let v = k.apply(&plane(theta.cos(), theta.sin()), -9999.0);
            assert!((0.0..360.0).contains(&v), "{} -> {}", i, v);
        }
    }

    #[test]
    fn test_aspect_raster() {
        let mut dem = Raster::new(5, 5);
        dem.set_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0));
        for row in 0..5 {
            for col in 0..5 {
                dem.set(row, col, 100.0 - col as f64).unwrap();
            }
        }
        let result = aspect(&dem, AspectParams::default()).unwrap();
        assert_eq!(result.get(0, 0).unwrap(), -9999.0);
        assert_relative_eq!(result.get(2, 2).unwrap(), 90.0);
    }
}
