//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Georeferencing is limited to the
//! ModelPixelScale/ModelTiepoint pair, nodata travels in the GDAL_NODATA
//! ASCII tag. Output is limited to what the DEM products need: single-band
//! Float32 or Byte, and 3/4-band Byte for color relief.

use super::memory::{AnyRaster, MemorySink};
use super::RasterSink;
use crate::error::{Error, Result};
use crate::raster::{DataType, GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{ColorType, Gray32Float, Gray8, RGB8, RGBA8};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

const MODEL_PIXEL_SCALE: Tag = Tag::Unknown(33550);
const MODEL_TIEPOINT: Tag = Tag::Unknown(33922);
const GEO_KEY_DIRECTORY: Tag = Tag::Unknown(34735);
const GDAL_NODATA: Tag = Tag::Unknown(42113);

fn tiff_err(context: &str) -> impl Fn(tiff::TiffError) -> Error + '_ {
    move |e| Error::Tiff(format!("{}: {}", context, e))
}

/// Read band `band` (1-based) of a GeoTIFF file
pub fn read_geotiff<P: AsRef<Path>>(path: P, band: usize) -> Result<AnyRaster> {
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file), band)
}

/// Read band `band` (1-based) of a GeoTIFF held in memory
pub fn read_geotiff_from_buffer(data: &[u8], band: usize) -> Result<AnyRaster> {
    decode_geotiff(Cursor::new(data), band)
}

fn samples_per_pixel(color: tiff::ColorType) -> usize {
    match color {
        tiff::ColorType::Gray(_) | tiff::ColorType::Palette(_) => 1,
        tiff::ColorType::GrayA(_) => 2,
        tiff::ColorType::RGB(_) | tiff::ColorType::YCbCr(_) => 3,
        tiff::ColorType::RGBA(_) | tiff::ColorType::CMYK(_) => 4,
        tiff::ColorType::Multiband { num_samples, .. } => num_samples as usize,
        #[allow(unreachable_patterns)]
        _ => 1,
    }
}

/// Pick every `stride`-th sample starting at `band - 1`
fn select_band<S, T>(buf: Vec<S>, stride: usize, band: usize, rows: usize, cols: usize) -> Result<Raster<T>>
where
    S: Copy,
    T: RasterElement + From<S>,
{
    let data: Vec<T> = if stride == 1 {
        buf.into_iter().map(<T as From<S>>::from).collect()
    } else {
        buf.into_iter().skip(band - 1).step_by(stride).map(<T as From<S>>::from).collect()
    };
    Raster::from_vec(data, rows, cols)
}

fn decode_geotiff<R: Read + Seek>(reader: R, band: usize) -> Result<AnyRaster> {
    let mut decoder = Decoder::new(reader).map_err(tiff_err("TIFF decode error"))?;

    let (width, height) = decoder.dimensions().map_err(tiff_err("Cannot read dimensions"))?;
    let (rows, cols) = (height as usize, width as usize);

    let color = decoder.colortype().map_err(tiff_err("Cannot read color type"))?;
    let bands = samples_per_pixel(color);
    if band == 0 || band > bands {
        return Err(Error::InvalidBand { band, count: bands });
    }
    debug!("decoding {}x{} TIFF, {} sample(s) per pixel, band {}", cols, rows, bands, band);

    let image = decoder.read_image().map_err(tiff_err("Cannot read image data"))?;

    let mut raster = match image {
        DecodingResult::U8(buf) => AnyRaster::Byte(select_band(buf, bands, band, rows, cols)?),
        DecodingResult::I8(buf) => AnyRaster::Int8(select_band(buf, bands, band, rows, cols)?),
        DecodingResult::I16(buf) => AnyRaster::Int16(select_band(buf, bands, band, rows, cols)?),
        DecodingResult::U16(buf) => AnyRaster::UInt16(select_band(buf, bands, band, rows, cols)?),
        DecodingResult::I32(buf) => AnyRaster::Int32(select_band(buf, bands, band, rows, cols)?),
        DecodingResult::U32(buf) => AnyRaster::UInt32(select_band(buf, bands, band, rows, cols)?),
        DecodingResult::F32(buf) => AnyRaster::Float32(select_band(buf, bands, band, rows, cols)?),
        DecodingResult::F64(buf) => AnyRaster::Float64(select_band(buf, bands, band, rows, cols)?),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }

    if let Ok(text) = decoder.get_tag_ascii_string(GDAL_NODATA) {
        match text.trim_matches(char::from(0)).trim().parse::<f64>() {
            Ok(value) => raster.set_nodata(Some(value)),
            Err(_) => debug!("ignoring unparsable GDAL_NODATA tag {:?}", text),
        }
    }

    Ok(raster)
}

/// GeoTransform from ModelPixelScale + ModelTiepoint, if both are present
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// Write a sink to a GeoTIFF file
pub fn write_geotiff<P: AsRef<Path>>(sink: &MemorySink, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(sink, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a sink to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer(sink: &MemorySink) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(sink, Cursor::new(&mut buf))?;
    Ok(buf)
}

/// Pixel-interleave the sink bands
fn interleave<T>(sink: &MemorySink, convert: impl Fn(f64) -> T) -> Vec<T> {
    let bands: Vec<&[f64]> = (0..sink.band_count()).filter_map(|b| sink.band(b)).collect();
    let pixels = sink.width() * sink.height();
    let mut out = Vec::with_capacity(pixels * bands.len());
    for i in 0..pixels {
        for band in &bands {
            out.push(convert(band[i]));
        }
    }
    out
}

fn encode_geotiff<W: Write + Seek>(sink: &MemorySink, writer: W) -> Result<()> {
    let bands = sink.band_count();
    match (sink.data_type(), bands) {
        (DataType::Byte, 1) => encode_image::<Gray8, W>(sink, writer, interleave(sink, |v| v as u8)),
        (DataType::Byte, 3) => encode_image::<RGB8, W>(sink, writer, interleave(sink, |v| v as u8)),
        (DataType::Byte, 4) => encode_image::<RGBA8, W>(sink, writer, interleave(sink, |v| v as u8)),
        (DataType::Float32, 1) => {
            encode_image::<Gray32Float, W>(sink, writer, interleave(sink, |v| v as f32))
        }
        (data_type, bands) => Err(Error::UnsupportedDataType(format!(
            "cannot write {} band(s) of {} to GeoTIFF",
            bands, data_type
        ))),
    }
}

fn encode_image<C, W>(sink: &MemorySink, writer: W, data: Vec<C::Inner>) -> Result<()>
where
    C: ColorType,
    W: Write + Seek,
    [C::Inner]: tiff::encoder::TiffValue,
{
    let mut encoder = TiffEncoder::new(writer).map_err(tiff_err("TIFF encoder error"))?;
    let mut image = encoder
        .new_image::<C>(sink.width() as u32, sink.height() as u32)
        .map_err(tiff_err("Cannot create TIFF image"))?;

    let gt = sink.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(MODEL_PIXEL_SCALE, &scale[..])
        .map_err(tiff_err("Cannot write scale tag"))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(MODEL_TIEPOINT, &tiepoint[..])
        .map_err(tiff_err("Cannot write tiepoint tag"))?;

    // GTModelTypeGeoKey = Projected, GTRasterTypeGeoKey = PixelIsArea
    let geokeys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, 1, 1025, 0, 1, 1];
    image
        .encoder()
        .write_tag(GEO_KEY_DIRECTORY, &geokeys[..])
        .map_err(tiff_err("Cannot write geokey tag"))?;

    if let Some(nodata) = sink.nodata(0) {
        let text = format_nodata(nodata);
        image
            .encoder()
            .write_tag(GDAL_NODATA, text.as_str())
            .map_err(tiff_err("Cannot write nodata tag"))?;
    }

    image
        .write_data(&data)
        .map_err(tiff_err("Cannot write image data"))?;

    Ok(())
}

fn format_nodata(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
