//! Terrain kernels over a 3x3 neighborhood
//!
//! Every product here is a pure function of one [`NeighborhoodWindow`]:
//! - Hillshade: shaded relief (standard, combined, Igor, multidirectional)
//! - Slope: steepest gradient in degrees or percent
//! - Aspect: downslope direction, azimuth or trigonometric convention
//! - TRI: Terrain Ruggedness Index (Wilson or Riley)
//! - TPI: Topographic Position Index
//! - Roughness: elevation range of the window
//!
//! Kernels are selected once into a [`TerrainKernel`] and driven either by
//! the streaming [`WindowedRasterProcessor`](crate::windowed::WindowedRasterProcessor)
//! or, for in-memory rasters, by [`apply_to_raster`].

mod aspect;
mod gradient;
mod hillshade;
mod roughness;
mod slope;
mod tpi;
mod tri;

pub use aspect::{aspect, AngleConvention, AspectContext, AspectParams};
pub use gradient::GradientAlgorithm;
pub use hillshade::{hillshade, HillshadeContext, HillshadeMode, HillshadeParams};
pub use roughness::{roughness, Roughness};
pub use slope::{slope, SlopeContext, SlopeParams, SlopeUnits};
pub use tpi::{tpi, Tpi};
pub use tri::{tri, TriAlgorithm};

use crate::maybe_rayon::*;
use crate::windowed::ScanGeometry;
use demkit_core::raster::{DataType, DestNoData, GeoTransform, NeighborhoodWindow, Raster};
use demkit_core::{Error, Result};
use ndarray::Array2;
use tracing::debug;

/// Destination nodata of the Float32 products
pub const FLOAT_DST_NODATA: f64 = -9999.0;

/// A per-pixel terrain product.
///
/// Implementations must be pure: the same window always yields the same
/// value, and nothing is mutated, so one kernel may serve many threads.
pub trait Kernel {
    /// Value for one window. `dst_nodata` is returned only for windows the
    /// product is undefined on (flat aspect).
    fn apply(&self, window: &NeighborhoodWindow, dst_nodata: f64) -> f64;

    /// Value written for pixels without a result
    fn dst_nodata(&self) -> DestNoData {
        DestNoData::declared(FLOAT_DST_NODATA)
    }

    /// Band type the product is stored as
    fn output_data_type(&self) -> DataType {
        DataType::Float32
    }

    fn name(&self) -> &'static str;
}

/// One of the terrain kernels, chosen at configuration time.
#[derive(Debug, Clone)]
pub enum TerrainKernel {
    Hillshade(HillshadeContext),
    Slope(SlopeContext),
    Aspect(AspectContext),
    Tri(TriAlgorithm),
    Tpi,
    Roughness,
}

impl Kernel for TerrainKernel {
    #[inline]
    fn apply(&self, window: &NeighborhoodWindow, dst_nodata: f64) -> f64 {
        match self {
            TerrainKernel::Hillshade(ctx) => ctx.apply(window, dst_nodata),
            TerrainKernel::Slope(ctx) => ctx.apply(window, dst_nodata),
            TerrainKernel::Aspect(ctx) => ctx.apply(window, dst_nodata),
            TerrainKernel::Tri(alg) => alg.apply(window, dst_nodata),
            TerrainKernel::Tpi => Tpi.apply(window, dst_nodata),
            TerrainKernel::Roughness => Roughness.apply(window, dst_nodata),
        }
    }

    fn dst_nodata(&self) -> DestNoData {
        match self {
            TerrainKernel::Hillshade(ctx) => ctx.dst_nodata(),
            TerrainKernel::Aspect(ctx) => ctx.dst_nodata(),
            _ => DestNoData::declared(FLOAT_DST_NODATA),
        }
    }

    fn output_data_type(&self) -> DataType {
        match self {
            TerrainKernel::Hillshade(ctx) => ctx.output_data_type(),
            _ => DataType::Float32,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            TerrainKernel::Hillshade(ctx) => ctx.name(),
            TerrainKernel::Slope(ctx) => ctx.name(),
            TerrainKernel::Aspect(ctx) => ctx.name(),
            TerrainKernel::Tri(alg) => alg.name(),
            TerrainKernel::Tpi => Kernel::name(&Tpi),
            TerrainKernel::Roughness => Kernel::name(&Roughness),
        }
    }
}

/// Inverse east-west and north-south resolution, with optional scale
/// divisors folded in.
///
/// Fails when any factor is zero or not finite.
pub(crate) fn inverse_resolution(
    transform: &GeoTransform,
    xscale: f64,
    yscale: f64,
) -> Result<(f64, f64)> {
    check_factor("xscale", xscale)?;
    check_factor("yscale", yscale)?;
    check_factor("pixel width", transform.pixel_width)?;
    check_factor("pixel height", transform.pixel_height)?;
    Ok((
        1.0 / (transform.pixel_width * xscale),
        1.0 / (transform.pixel_height * yscale),
    ))
}

pub(crate) fn check_factor(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value != 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: "must be finite and non-zero".into(),
        })
    }
}

/// Run a kernel over an in-memory raster.
///
/// Produces the same values the streaming processor writes to a sink of
/// the kernel's output type, including quantization. Rows are computed
/// independently, in parallel when the `parallel` feature is on.
pub fn apply_to_raster<K: Kernel + Sync + ?Sized>(
    dem: &Raster<f64>,
    kernel: &K,
    compute_edges: bool,
) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let dst = kernel.dst_nodata();
    let data_type = kernel.output_data_type();
    let scan = ScanGeometry::new(dem, dst, compute_edges);
    debug!(
        "{} over {}x{} raster, edges {}",
        kernel.name(),
        cols,
        rows,
        if scan.computes_edges() { "computed" } else { "nodata" }
    );

    let lines = (0..rows)
        .map(|r| dem.row_slice(r))
        .collect::<Result<Vec<&[f64]>>>()?;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut scratch = vec![0.0; cols];
            let mut row_data = vec![0.0; cols];
            scan.compute(kernel, row, |r| lines[r], &mut scratch, &mut row_data);
            for v in row_data.iter_mut() {
                *v = data_type.quantize(*v);
            }
            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>();
    output.set_nodata(dst.metadata());
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::UnsupportedDataType(e.to_string()))?;

    Ok(output)
}
