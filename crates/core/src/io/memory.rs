//! In-memory raster sources and sinks

use super::{RasterSink, RasterSource};
use crate::error::{Error, Result};
use crate::raster::{DataType, GeoTransform, Raster, RasterElement};

impl<T: RasterElement> RasterSource for Raster<T> {
    fn width(&self) -> usize {
        self.cols()
    }

    fn height(&self) -> usize {
        self.rows()
    }

    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn nodata_value(&self) -> Option<f64> {
        self.nodata().and_then(|v| v.to_f64())
    }

    fn geo_transform(&self) -> GeoTransform {
        *self.transform()
    }

    fn read_row(&mut self, y: usize, buf: &mut [f64]) -> Result<()> {
        let row = self.row_slice(y).map_err(|e| Error::Read {
            row: y,
            reason: e.to_string(),
        })?;
        if buf.len() != row.len() {
            return Err(Error::SizeMismatch {
                expected: row.len(),
                actual: buf.len(),
            });
        }
        for (dst, &v) in buf.iter_mut().zip(row) {
            *dst = v.to_f64().unwrap_or(f64::NAN);
        }
        Ok(())
    }
}

/// A raster of any supported element type, as produced by the GeoTIFF reader.
#[derive(Debug, Clone)]
pub enum AnyRaster {
    Byte(Raster<u8>),
    Int8(Raster<i8>),
    Int16(Raster<i16>),
    UInt16(Raster<u16>),
    Int32(Raster<i32>),
    UInt32(Raster<u32>),
    Float32(Raster<f32>),
    Float64(Raster<f64>),
}

macro_rules! each_variant {
    ($value:expr, $r:ident => $body:expr) => {
        match $value {
            AnyRaster::Byte($r) => $body,
            AnyRaster::Int8($r) => $body,
            AnyRaster::Int16($r) => $body,
            AnyRaster::UInt16($r) => $body,
            AnyRaster::Int32($r) => $body,
            AnyRaster::UInt32($r) => $body,
            AnyRaster::Float32($r) => $body,
            AnyRaster::Float64($r) => $body,
        }
    };
}

impl AnyRaster {
    pub fn data_type(&self) -> DataType {
        each_variant!(self, r => r.data_type())
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        each_variant!(self, r => r.shape())
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        each_variant!(self, r => r.set_transform(transform))
    }

    /// Set nodata from a float value, converted to the element type
    pub fn set_nodata(&mut self, nodata: Option<f64>) {
        each_variant!(self, r => r.set_nodata(nodata.map(RasterElement::from_f64)))
    }

    pub fn as_source(&self) -> &dyn RasterSource {
        each_variant!(self, r => r)
    }

    pub fn as_source_mut(&mut self) -> &mut dyn RasterSource {
        each_variant!(self, r => r)
    }
}

/// Multi-band in-memory sink.
///
/// Values are converted with [`DataType::quantize`] on write, so a Byte sink
/// holds exactly what a Byte band on disk would.
#[derive(Debug, Clone)]
pub struct MemorySink {
    width: usize,
    height: usize,
    data_type: DataType,
    transform: GeoTransform,
    bands: Vec<Vec<f64>>,
    nodata: Vec<Option<f64>>,
}

impl MemorySink {
    pub fn new(width: usize, height: usize, band_count: usize, data_type: DataType) -> Self {
        Self {
            width,
            height,
            data_type,
            transform: GeoTransform::default(),
            bands: vec![vec![0.0; width * height]; band_count],
            nodata: vec![None; band_count],
        }
    }

    /// Sink shaped like `source`, carrying its georeferencing
    pub fn like<S: RasterSource + ?Sized>(source: &S, band_count: usize, data_type: DataType) -> Self {
        let mut sink = Self::new(source.width(), source.height(), band_count, data_type);
        sink.transform = source.geo_transform();
        sink
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Row-major values of `band` (0-based)
    pub fn band(&self, band: usize) -> Option<&[f64]> {
        self.bands.get(band).map(Vec::as_slice)
    }

    pub fn nodata(&self, band: usize) -> Option<f64> {
        self.nodata.get(band).copied().flatten()
    }

    pub fn value(&self, band: usize, row: usize, col: usize) -> Option<f64> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.band(band).map(|b| b[row * self.width + col])
    }

    /// Copy one band out as a raster
    pub fn to_raster(&self, band: usize) -> Result<Raster<f64>> {
        let values = self.band(band).ok_or(Error::InvalidBand {
            band: band + 1,
            count: self.bands.len(),
        })?;
        let mut raster = Raster::from_vec(values.to_vec(), self.height, self.width)?;
        raster.set_transform(self.transform);
        raster.set_nodata(self.nodata(band));
        Ok(raster)
    }
}

impl RasterSink for MemorySink {
    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn set_nodata(&mut self, band: usize, nodata: Option<f64>) -> Result<()> {
        let count = self.bands.len();
        let slot = self.nodata.get_mut(band).ok_or(Error::InvalidBand {
            band: band + 1,
            count,
        })?;
        *slot = nodata;
        Ok(())
    }

    fn write_row(&mut self, band: usize, y: usize, row: &[f64]) -> Result<()> {
        let (width, height, data_type) = (self.width, self.height, self.data_type);
        let fail = |reason: String| Error::Write { band, row: y, reason };

        if y >= height {
            return Err(fail(format!("row outside 0..{}", height)));
        }
        if row.len() != width {
            return Err(fail(format!("expected {} values, got {}", width, row.len())));
        }
        let count = self.bands.len();
        let target = self
            .bands
            .get_mut(band)
            .ok_or_else(|| fail(format!("sink has {} band(s)", count)))?;

        for (dst, &v) in target[y * width..(y + 1) * width].iter_mut().zip(row) {
            *dst = data_type.quantize(v);
        }
        Ok(())
    }
}
