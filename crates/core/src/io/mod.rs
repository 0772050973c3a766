//! Collaborator interfaces: raster sources, sinks and progress
//!
//! The processing core never opens files or creates datasets. It reads rows
//! from a [`RasterSource`], writes rows to a [`RasterSink`] and polls a
//! [`ProgressReporter`] once per row. In-memory implementations and a
//! native GeoTIFF codec live in the submodules.

mod memory;
mod native;

pub use memory::{AnyRaster, MemorySink};
pub use native::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer};

use crate::error::{Error, Result};
use crate::raster::{is_nodata, DataType, GeoTransform, SourceNoData};
use tracing::debug;

/// A single-band raster that can be read row by row.
pub trait RasterSource {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn data_type(&self) -> DataType;

    /// Declared nodata value, if any (may be NaN)
    fn nodata_value(&self) -> Option<f64>;

    fn geo_transform(&self) -> GeoTransform {
        GeoTransform::default()
    }

    /// Min/max known from metadata without scanning
    fn min_max(&self) -> Option<(f64, f64)> {
        None
    }

    /// Natural block size as (width, height)
    fn block_size(&self) -> (usize, usize) {
        (self.width(), 1)
    }

    /// Read row `y` into `buf` (length `width()`)
    fn read_row(&mut self, y: usize, buf: &mut [f64]) -> Result<()>;

    /// Read a window into `buf`, row-major, `width * height` values.
    fn read_block(
        &mut self,
        x_off: usize,
        y_off: usize,
        width: usize,
        height: usize,
        buf: &mut [f64],
    ) -> Result<()> {
        if x_off + width > self.width() || y_off + height > self.height() {
            return Err(Error::IndexOutOfBounds {
                row: y_off + height,
                col: x_off + width,
                rows: self.height(),
                cols: self.width(),
            });
        }
        if buf.len() < width * height {
            return Err(Error::SizeMismatch {
                expected: width * height,
                actual: buf.len(),
            });
        }
        let mut line = vec![0.0; self.width()];
        for (i, chunk) in buf.chunks_mut(width).take(height).enumerate() {
            self.read_row(y_off + i, &mut line)?;
            chunk.copy_from_slice(&line[x_off..x_off + width]);
        }
        Ok(())
    }

    /// Nodata description combining value and data type
    fn source_nodata(&self) -> Option<SourceNoData> {
        self.nodata_value().map(|v| SourceNoData::new(v, self.data_type()))
    }
}

macro_rules! forward_source {
    ($($ty:ty),*) => {$(
        impl<S: RasterSource + ?Sized> RasterSource for $ty {
            fn width(&self) -> usize {
                (**self).width()
            }

            fn height(&self) -> usize {
                (**self).height()
            }

            fn data_type(&self) -> DataType {
                (**self).data_type()
            }

            fn nodata_value(&self) -> Option<f64> {
                (**self).nodata_value()
            }

            fn geo_transform(&self) -> GeoTransform {
                (**self).geo_transform()
            }

            fn min_max(&self) -> Option<(f64, f64)> {
                (**self).min_max()
            }

            fn block_size(&self) -> (usize, usize) {
                (**self).block_size()
            }

            fn read_row(&mut self, y: usize, buf: &mut [f64]) -> Result<()> {
                (**self).read_row(y, buf)
            }

            fn read_block(
                &mut self,
                x_off: usize,
                y_off: usize,
                width: usize,
                height: usize,
                buf: &mut [f64],
            ) -> Result<()> {
                (**self).read_block(x_off, y_off, width, height, buf)
            }
        }
    )*};
}

forward_source!(&mut S, Box<S>);

/// A destination raster with one or more bands, written row by row.
pub trait RasterSink {
    fn band_count(&self) -> usize;

    /// Declare (or clear) the nodata value of `band` (0-based)
    fn set_nodata(&mut self, band: usize, nodata: Option<f64>) -> Result<()>;

    /// Write row `y` of `band` (0-based)
    fn write_row(&mut self, band: usize, y: usize, row: &[f64]) -> Result<()>;
}

/// Receives fractional progress in [0, 1]; returning `false` cancels.
pub trait ProgressReporter {
    fn report(&mut self, fraction: f64) -> bool;
}

impl<F: FnMut(f64) -> bool> ProgressReporter for F {
    fn report(&mut self, fraction: f64) -> bool {
        self(fraction)
    }
}

/// Progress reporter that never cancels
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&mut self, _fraction: f64) -> bool {
        true
    }
}

/// Report `fraction`, turning a cancellation request into [`Error::Cancelled`].
pub fn report_progress(progress: &mut dyn ProgressReporter, fraction: f64) -> Result<()> {
    if progress.report(fraction) {
        Ok(())
    } else {
        Err(Error::Cancelled)
    }
}

/// Scan a source for the min/max of its valid samples.
///
/// Returns `None` when every sample is nodata or NaN.
pub fn compute_min_max<S: RasterSource + ?Sized>(source: &mut S) -> Result<Option<(f64, f64)>> {
    let nodata = source.source_nodata();
    let mut line = vec![0.0; source.width()];
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for y in 0..source.height() {
        source.read_row(y, &mut line)?;
        for &v in line.iter().filter(|v| !v.is_nan() && !is_nodata(nodata.as_ref(), **v)) {
            min = min.min(v);
            max = max.max(v);
        }
    }

    Ok((min <= max).then_some((min, max)))
}

/// Min/max from metadata, computed by a full scan when absent.
pub fn resolve_min_max<S: RasterSource + ?Sized>(source: &mut S) -> Result<Option<(f64, f64)>> {
    if let Some(known) = source.min_max() {
        return Ok(Some(known));
    }
    debug!("no min/max metadata, scanning {}x{} source", source.width(), source.height());
    compute_min_max(source)
}

/// Generic copy: pull every row of every band and write it to `sink`.
///
/// Rows are copied top to bottom, all bands of a row before the next row,
/// which is the access pattern the lazy adapters are optimized for.
pub fn copy_bands(
    bands: &mut [&mut dyn RasterSource],
    sink: &mut dyn RasterSink,
    progress: &mut dyn ProgressReporter,
) -> Result<()> {
    let Some(first) = bands.first() else {
        return Ok(());
    };
    let (width, height) = (first.width(), first.height());

    if bands.len() > sink.band_count() {
        return Err(Error::InvalidBand {
            band: bands.len(),
            count: sink.band_count(),
        });
    }
    for band in bands.iter() {
        if band.width() != width || band.height() != height {
            return Err(Error::InvalidDimensions {
                width: band.width(),
                height: band.height(),
            });
        }
    }

    report_progress(progress, 0.0)?;

    let mut line = vec![0.0; width];
    for y in 0..height {
        for (b, band) in bands.iter_mut().enumerate() {
            band.read_row(y, &mut line)?;
            sink.write_row(b, y, &line)?;
        }
        report_progress(progress, (y + 1) as f64 / height as f64)?;
    }
    if height == 0 {
        report_progress(progress, 1.0)?;
    }

    Ok(())
}
