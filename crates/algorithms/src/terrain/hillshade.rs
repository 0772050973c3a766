//! Hillshade (shaded relief) calculation
//!
//! Illumination of each cell by a light source at `azimuth` / `altitude`,
//! encoded on a 1..=255 byte ramp where 1 is full shadow. Four renderings
//! are available through [`HillshadeMode`].

use super::gradient::GradientAlgorithm;
use super::{apply_to_raster, inverse_resolution, Kernel, TerrainKernel};
use demkit_core::raster::{DataType, DestNoData, GeoTransform, NeighborhoodWindow, Raster};
use demkit_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const INV_SQUARE_OF_HALF_PI: f64 = 4.0 / (PI * PI);

/// Hillshade rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HillshadeMode {
    /// Lambertian shading from a single light source
    #[default]
    Standard,
    /// Shading darkened by slope
    Combined,
    /// Soft shading after Igor's relief method, no self-shadowing
    Igor,
    /// Weighted blend of light from 225, 270, 315 and 360 degrees
    MultiDirectional,
}

impl HillshadeMode {
    pub fn name(&self) -> &'static str {
        match self {
            HillshadeMode::Standard => "standard",
            HillshadeMode::Combined => "combined",
            HillshadeMode::Igor => "igor",
            HillshadeMode::MultiDirectional => "multidirectional",
        }
    }
}

/// Parameters for hillshade calculation
#[derive(Debug, Clone)]
pub struct HillshadeParams {
    /// Sun azimuth in degrees (0 = North, clockwise). Ignored by multidirectional.
    pub azimuth: f64,
    /// Sun altitude in degrees above horizon (0-90)
    pub altitude: f64,
    /// Vertical exaggeration
    pub z_factor: f64,
    /// Ratio of horizontal to vertical units along x (111120 for degrees vs meters)
    pub xscale: f64,
    /// Same along y
    pub yscale: f64,
    pub mode: HillshadeMode,
    pub gradient: GradientAlgorithm,
    /// Synthesize neighbors at raster borders instead of writing nodata
    pub compute_edges: bool,
}

impl Default for HillshadeParams {
    fn default() -> Self {
        Self {
            azimuth: 315.0,
            altitude: 45.0,
            z_factor: 1.0,
            xscale: 1.0,
            yscale: 1.0,
            mode: HillshadeMode::Standard,
            gradient: GradientAlgorithm::Horn,
            compute_edges: false,
        }
    }
}

/// Hillshade constants derived once from parameters and geometry.
#[derive(Debug, Clone)]
pub struct HillshadeContext {
    mode: HillshadeMode,
    gradient: GradientAlgorithm,
    inv_ewres: f64,
    inv_nsres: f64,
    /// z / 8 (Horn) or z / 2 (Zevenbergen-Thorne)
    zf: f64,
    square_zf: f64,
    sin_alt: f64,
    cos_alt_zf: f64,
    sin_az_cos_alt_zf: f64,
    cos_az_cos_alt_zf: f64,
    az_rad: f64,
}

impl HillshadeContext {
    pub fn new(params: &HillshadeParams, transform: &GeoTransform) -> Result<Self> {
        let (inv_ewres, inv_nsres) = inverse_resolution(transform, params.xscale, params.yscale)?;
        super::check_factor("z factor", params.z_factor)?;
        if !(0.0..=90.0).contains(&params.altitude) {
            return Err(Error::InvalidParameter {
                name: "altitude",
                value: params.altitude.to_string(),
                reason: "must be between 0 and 90 degrees".into(),
            });
        }

        let zf = params.z_factor / params.gradient.divisor();
        let alt = params.altitude.to_radians();
        let az_rad = params.azimuth.to_radians();
        let cos_alt_zf = alt.cos() * zf;

        Ok(Self {
            mode: params.mode,
            gradient: params.gradient,
            inv_ewres,
            inv_nsres,
            zf,
            square_zf: zf * zf,
            sin_alt: alt.sin(),
            cos_alt_zf,
            sin_az_cos_alt_zf: az_rad.sin() * cos_alt_zf,
            cos_az_cos_alt_zf: az_rad.cos() * cos_alt_zf,
            az_rad,
        })
    }

    pub fn mode(&self) -> HillshadeMode {
        self.mode
    }

    /// Numerator shared by standard and combined shading
    #[inline]
    fn lit(&self, x: f64, y: f64) -> f64 {
        self.sin_alt - (y * self.cos_az_cos_alt_zf - x * self.sin_az_cos_alt_zf)
    }

    fn standard(&self, x: f64, y: f64) -> f64 {
        let cang = 254.0 * self.lit(x, y) / (1.0 + self.square_zf * (x * x + y * y)).sqrt();
        if cang <= 0.0 {
            1.0
        } else {
            1.0 + cang
        }
    }

    fn combined(&self, x: f64, y: f64) -> f64 {
        let slope = (x * x + y * y) * self.square_zf;
        let cos_incidence = (self.lit(x, y) / (1.0 + slope).sqrt()).clamp(-1.0, 1.0);
        let cang = 1.0 - cos_incidence.acos() * slope.sqrt().atan() * INV_SQUARE_OF_HALF_PI;
        if cang <= 0.0 {
            1.0
        } else {
            1.0 + 254.0 * cang
        }
    }

    fn multidirectional(&self, x: f64, y: f64) -> f64 {
        let xx = x * x;
        let yy = y * y;
        let xx_plus_yy = xx + yy;
        if xx_plus_yy == 0.0 {
            return 1.0 + 254.0 * self.sin_alt;
        }

        let base = 127.0 * self.sin_alt;
        let diagonal = 127.0 * (225.0f64).to_radians().cos() * self.cos_alt_zf;
        let axial = 127.0 * self.cos_alt_zf;
        let val225 = (base + (x - y) * diagonal).max(0.0);
        let val270 = (base - x * axial).max(0.0);
        let val315 = (base + (x + y) * diagonal).max(0.0);
        let val360 = (base - y * axial).max(0.0);

        let w225 = 0.5 * xx_plus_yy - x * y;
        let w270 = xx;
        let w315 = xx_plus_yy - w225;
        let w360 = yy;

        let blended = (w225 * val225 + w270 * val270 + w315 * val315 + w360 * val360) / xx_plus_yy;
        1.0 + blended / (1.0 + self.square_zf * xx_plus_yy).sqrt()
    }

    fn igor(&self, window: &NeighborhoodWindow, x: f64, y: f64) -> f64 {
        let slope_deg = ((x * x + y * y).sqrt() * self.zf).atan().to_degrees();
        let (dx, dy) = self.gradient.deltas(window);
        let aspect = dy.atan2(-dx);

        let aspect_diff = angle_between(aspect, 3.0 * PI / 2.0 - self.az_rad);
        let shadowness = 1.0 - slope_deg / 90.0 * (1.0 - aspect_diff / PI);
        255.0 * shadowness
    }
}

/// Absolute difference of two angles in radians, folded into [0, PI]
fn angle_between(a: f64, b: f64) -> f64 {
    let normalize = |v: f64| {
        let v = v % (2.0 * PI);
        if v < 0.0 {
            v + 2.0 * PI
        } else {
            v
        }
    };
    let diff = (normalize(a) - normalize(b)).abs();
    if diff > PI {
        2.0 * PI - diff
    } else {
        diff
    }
}

impl Kernel for HillshadeContext {
    #[inline]
    fn apply(&self, window: &NeighborhoodWindow, _dst_nodata: f64) -> f64 {
        let (x, y) = self.gradient.scaled(window, self.inv_ewres, self.inv_nsres);
        match self.mode {
            HillshadeMode::Standard => self.standard(x, y),
            HillshadeMode::Combined => self.combined(x, y),
            HillshadeMode::Igor => self.igor(window, x, y),
            HillshadeMode::MultiDirectional => self.multidirectional(x, y),
        }
    }

    fn dst_nodata(&self) -> DestNoData {
        DestNoData::declared(0.0)
    }

    fn output_data_type(&self) -> DataType {
        DataType::Byte
    }

    fn name(&self) -> &'static str {
        "hillshade"
    }
}

/// Calculate hillshade from a DEM
///
/// # Arguments
/// * `dem` - Input DEM raster
/// * `params` - Light source, z factor, scales, mode and gradient
///
/// # Returns
/// Raster with byte values 1-255, 0 where no value could be computed
pub fn hillshade(dem: &Raster<f64>, params: HillshadeParams) -> Result<Raster<f64>> {
    let ctx = HillshadeContext::new(&params, dem.transform())?;
    apply_to_raster(dem, &TerrainKernel::Hillshade(ctx), params.compute_edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_dem() -> Raster<f64> {
        // Slope rising to the east
        let mut dem = Raster::new(10, 10);
        dem.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        for row in 0..10 {
            for col in 0..10 {
                dem.set(row, col, col as f64 * 10.0).unwrap();
            }
        }
        dem
    }

    fn context(params: HillshadeParams) -> HillshadeContext {
        HillshadeContext::new(&params, &GeoTransform::new(0.0, 0.0, 1.0, -1.0)).unwrap()
    }

    fn tilted(dz_east: f64) -> NeighborhoodWindow {
        let mut v = [0.0; 9];
        for r in 0..3 {
            for c in 0..3 {
                v[r * 3 + c] = dz_east * c as f64;
            }
        }
        NeighborhoodWindow::new(v)
    }

    #[test]
    fn test_hillshade_flat_surface() {
        let ctx = context(HillshadeParams::default());
        let v = ctx.apply(&NeighborhoodWindow::flat(100.0), 0.0);
        assert_relative_eq!(v, 1.0 + 254.0 * (45.0f64).to_radians().sin(), epsilon = 1e-9);
        assert_eq!(DataType::Byte.quantize(v), 181.0);
    }

    #[test]
    fn test_hillshade_range() {
        for mode in [HillshadeMode::Standard, HillshadeMode::Combined, HillshadeMode::MultiDirectional] {
            let ctx = context(HillshadeParams { mode, ..Default::default() });
            for dz in [-50.0, -3.0, -0.5, 0.0, 0.5, 3.0, 50.0] {
                let v = ctx.apply(&tilted(dz), 0.0);
                assert!((1.0..=255.0).contains(&v), "{:?} dz={} -> {}", mode, dz, v);
            }
        }
    }

    #[test]
    fn test_hillshade_full_shadow() {
        // Sun in the west, steep wall facing east
        let ctx = context(HillshadeParams {
            azimuth: 270.0,
            altitude: 10.0,
            ..Default::default()
        });
        assert_eq!(ctx.apply(&tilted(-1000.0), 0.0), 1.0);
    }

    #[test]
    fn test_hillshade_facing_sun_is_brighter() {
        // Light from the west: a west-facing slope (rising to the east) is lit
        let ctx = context(HillshadeParams {
            azimuth: 270.0,
            ..Default::default()
        });
        let west_facing = ctx.apply(&tilted(1.0), 0.0);
        let east_facing = ctx.apply(&tilted(-1.0), 0.0);
        assert!(west_facing > east_facing);
    }

    #[test]
    fn test_zevenbergen_thorne_flat() {
        let ctx = context(HillshadeParams {
            gradient: GradientAlgorithm::ZevenbergenThorne,
            ..Default::default()
        });
        assert_eq!(DataType::Byte.quantize(ctx.apply(&NeighborhoodWindow::flat(7.0), 0.0)), 181.0);
    }

    #[test]
    fn test_multidirectional_flat() {
        let ctx = context(HillshadeParams {
            mode: HillshadeMode::MultiDirectional,
            altitude: 30.0,
            ..Default::default()
        });
        assert_relative_eq!(ctx.apply(&NeighborhoodWindow::flat(0.0), 0.0), 128.0, epsilon = 1e-9);
    }

    #[test]
    fn test_combined_flat_matches_standard() {
        let std = context(HillshadeParams::default());
        let comb = context(HillshadeParams {
            mode: HillshadeMode::Combined,
            ..Default::default()
        });
        let w = NeighborhoodWindow::flat(3.0);
        // acos(sin 45) * atan(0) vanishes: combined flat ground is fully lit
        assert_relative_eq!(comb.apply(&w, 0.0), 255.0);
        assert!(std.apply(&w, 0.0) < comb.apply(&w, 0.0));
    }

    #[test]
    fn test_igor_flat_and_steep() {
        let ctx = context(HillshadeParams {
            mode: HillshadeMode::Igor,
            ..Default::default()
        });
        assert_relative_eq!(ctx.apply(&NeighborhoodWindow::flat(5.0), 0.0), 255.0);
        let steep = ctx.apply(&tilted(-1.0e6), 0.0);
        assert!((0.0..255.0).contains(&steep));
    }

    #[test]
    fn test_igor_slope_and_aspect_strength() {
        // 45° slope facing west: shadowness = 1 - (45/90) * (1 - diff/pi)
        let igor = |azimuth| {
            context(HillshadeParams {
                mode: HillshadeMode::Igor,
                azimuth,
                ..Default::default()
            })
            .apply(&tilted(1.0), 0.0)
        };
        assert_relative_eq!(igor(90.0), 127.5, epsilon = 1e-9);
        assert_relative_eq!(igor(270.0), 255.0, epsilon = 1e-9);
        assert_relative_eq!(igor(315.0), 255.0 * (1.0 - 0.5 * 0.25), epsilon = 1e-9);
    }

    #[test]
    fn test_angle_between() {
        assert_relative_eq!(angle_between(0.1, 2.0 * PI - 0.1), 0.2, epsilon = 1e-12);
        assert_relative_eq!(angle_between(-PI / 2.0, PI / 2.0), PI, epsilon = 1e-12);
        assert_relative_eq!(angle_between(PI / 4.0, PI / 4.0 + 4.0 * PI), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hillshade_raster() {
        let dem = create_test_dem();
        let result = hillshade(&dem, HillshadeParams::default()).unwrap();
        assert_eq!(result.nodata(), Some(0.0));
        assert_eq!(result.get(0, 0).unwrap(), 0.0);
        let center = result.get(5, 5).unwrap();
        assert!(center >= 1.0 && center <= 255.0);
        assert_eq!(center, result.get(4, 4).unwrap());
    }

    #[test]
    fn test_invalid_altitude() {
        let params = HillshadeParams {
            altitude: 120.0,
            ..Default::default()
        };
        assert!(hillshade(&create_test_dem(), params).is_err());
    }
}
