//! Color relief: classify every source sample into an RGB(A) pixel.
//!
//! [`ColorRelief::run`] streams the source row by row into a 3 or 4 band
//! sink. [`ColorReliefDataset`] exposes the same output as lazy
//! per-channel [`RasterSource`]s for a generic copy loop to pull from.

use crate::color::Rgba;
use crate::lut::PrecomputedColorLut;
use crate::table::{ColorBreakpointTable, ColorSelectionMode};
use demkit_core::io::{report_progress, ProgressReporter, RasterSink, RasterSource};
use demkit_core::{DataType, Error, GeoTransform, Result};
use std::cell::RefCell;
use std::fmt;
use tracing::{debug, trace};

/// Color-relief configuration: a parsed table, a selection mode and
/// whether an alpha band is produced.
#[derive(Debug, Clone)]
pub struct ColorRelief {
    table: ColorBreakpointTable,
    mode: ColorSelectionMode,
    alpha: bool,
}

impl ColorRelief {
    pub fn new(table: ColorBreakpointTable, mode: ColorSelectionMode, alpha: bool) -> Self {
        Self { table, mode, alpha }
    }

    pub fn table(&self) -> &ColorBreakpointTable {
        &self.table
    }

    pub fn mode(&self) -> ColorSelectionMode {
        self.mode
    }

    pub fn alpha(&self) -> bool {
        self.alpha
    }

    /// 4 with alpha, 3 otherwise
    pub fn band_count(&self) -> usize {
        if self.alpha {
            4
        } else {
            3
        }
    }

    /// Lookup table for `source`, when its type and size qualify.
    pub fn lut_for<S: RasterSource + ?Sized>(&self, source: &S) -> Option<PrecomputedColorLut> {
        PrecomputedColorLut::build(
            &self.table,
            self.mode,
            source.data_type(),
            source.width(),
            source.height(),
        )
    }

    #[inline]
    fn classify(&self, lut: Option<&PrecomputedColorLut>, value: f64) -> Rgba {
        lut.and_then(|l| l.get(value))
            .unwrap_or_else(|| self.table.color(value, self.mode))
    }

    /// Stream `source` into the first 3 or 4 bands of `sink`.
    ///
    /// Bands are written as Byte values with no nodata. Progress is reported
    /// once before the first row and after every row (at 1 for an empty
    /// source).
    pub fn run<S: RasterSource + ?Sized>(
        &self,
        source: &mut S,
        sink: &mut dyn RasterSink,
        progress: &mut dyn ProgressReporter,
    ) -> Result<()> {
        let bands = self.band_count();
        if sink.band_count() < bands {
            return Err(Error::InvalidBand {
                band: bands,
                count: sink.band_count(),
            });
        }
        for band in 0..bands {
            sink.set_nodata(band, None)?;
        }

        let (width, height) = (source.width(), source.height());
        let lut = self.lut_for(source);
        debug!(
            "color relief {}x{}, {} band(s), {} mode, lut: {}",
            width,
            height,
            bands,
            self.mode.name(),
            lut.is_some()
        );

        report_progress(progress, 0.0)?;

        let mut line = vec![0.0; width];
        let mut channels = vec![vec![0.0; width]; bands];
        for y in 0..height {
            source.read_row(y, &mut line)?;
            for (x, &v) in line.iter().enumerate() {
                let color = self.classify(lut.as_ref(), v);
                for (c, out) in channels.iter_mut().enumerate() {
                    out[x] = color.channel(c) as f64;
                }
            }
            for (band, out) in channels.iter().enumerate() {
                sink.write_row(band, y, out)?;
            }
            report_progress(progress, (y + 1) as f64 / height as f64)?;
        }
        if height == 0 {
            report_progress(progress, 1.0)?;
        }

        Ok(())
    }

    /// Wrap `source` for lazy, block-wise production.
    pub fn into_dataset<S: RasterSource>(self, source: S) -> ColorReliefDataset<S> {
        ColorReliefDataset::new(source, self)
    }
}

// ─── Lazy dataset ──────────────────────────────────────────────────────

/// The last source block read, shared by all channel bands.
#[derive(Debug, Default)]
struct BlockCache {
    key: Option<(usize, usize)>,
    width: usize,
    values: Vec<f64>,
}

/// Lazily classified view of a source raster.
///
/// Each [`ColorReliefBand`] borrows the dataset and produces one channel.
/// Blocks span the full raster width and the source's natural block
/// height. The block behind a request is read once and kept until a
/// different block is asked for, so reading R, G, B and A of the same
/// rows costs a single source read.
pub struct ColorReliefDataset<S> {
    source: RefCell<S>,
    relief: ColorRelief,
    lut: Option<PrecomputedColorLut>,
    width: usize,
    height: usize,
    block: (usize, usize),
    cache: RefCell<BlockCache>,
}

impl<S> fmt::Debug for ColorReliefDataset<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorReliefDataset")
            .field("relief", &self.relief)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("block", &self.block)
            .field("lut", &self.lut.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: RasterSource> ColorReliefDataset<S> {
    pub fn new(source: S, relief: ColorRelief) -> Self {
        let (width, height) = (source.width(), source.height());
        // full-width strips, so row-interleaved channel reads never evict
        let (_, bh) = source.block_size();
        let block = (width.max(1), bh.clamp(1, height.max(1)));
        let lut = relief.lut_for(&source);
        debug!(
            "lazy color relief {}x{}, block {}x{}, lut: {}",
            width,
            height,
            block.0,
            block.1,
            lut.is_some()
        );

        Self {
            source: RefCell::new(source),
            relief,
            lut,
            width,
            height,
            block,
            cache: RefCell::new(BlockCache::default()),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn band_count(&self) -> usize {
        self.relief.band_count()
    }

    pub fn block_size(&self) -> (usize, usize) {
        self.block
    }

    pub fn geo_transform(&self) -> GeoTransform {
        self.source.borrow().geo_transform()
    }

    pub fn has_lut(&self) -> bool {
        self.lut.is_some()
    }

    /// Band producing `channel` (0 = red .. 3 = alpha).
    pub fn band(&self, channel: usize) -> Result<ColorReliefBand<'_, S>> {
        if channel >= self.band_count() {
            return Err(Error::InvalidBand {
                band: channel + 1,
                count: self.band_count(),
            });
        }
        Ok(ColorReliefBand { dataset: self, channel })
    }

    /// All channel bands, in order.
    pub fn bands(&self) -> Vec<ColorReliefBand<'_, S>> {
        (0..self.band_count())
            .map(|channel| ColorReliefBand { dataset: self, channel })
            .collect()
    }

    pub fn into_source(self) -> S {
        self.source.into_inner()
    }

    /// Make block (bx, by) the cached one, reading it if needed.
    fn load_block(&self, bx: usize, by: usize) -> Result<()> {
        let mut cache = self.cache.borrow_mut();
        if cache.key == Some((bx, by)) {
            return Ok(());
        }

        let (bw, bh) = self.block;
        let (x_off, y_off) = (bx * bw, by * bh);
        let width = bw.min(self.width - x_off);
        let height = bh.min(self.height - y_off);
        trace!("color relief cache miss: block ({}, {})", bx, by);

        cache.key = None;
        cache.values.resize(width * height, 0.0);
        self.source
            .borrow_mut()
            .read_block(x_off, y_off, width, height, &mut cache.values)?;
        cache.width = width;
        cache.key = Some((bx, by));
        Ok(())
    }

    fn read_channel_row(&self, channel: usize, y: usize, buf: &mut [f64]) -> Result<()> {
        if y >= self.height {
            return Err(Error::Read {
                row: y,
                reason: format!("row outside 0..{}", self.height),
            });
        }
        if buf.len() != self.width {
            return Err(Error::SizeMismatch {
                expected: self.width,
                actual: buf.len(),
            });
        }

        let (bw, bh) = self.block;
        let by = y / bh;
        for (bx, out) in buf.chunks_mut(bw).enumerate() {
            self.load_block(bx, by)?;
            let cache = self.cache.borrow();
            let start = (y - by * bh) * cache.width;
            let row = &cache.values[start..start + cache.width];
            for (dst, &v) in out.iter_mut().zip(row) {
                *dst = self.relief.classify(self.lut.as_ref(), v).channel(channel) as f64;
            }
        }
        Ok(())
    }
}

/// One output channel of a [`ColorReliefDataset`].
pub struct ColorReliefBand<'a, S> {
    dataset: &'a ColorReliefDataset<S>,
    channel: usize,
}

impl<S: RasterSource> ColorReliefBand<'_, S> {
    pub fn channel(&self) -> usize {
        self.channel
    }
}

impl<S: RasterSource> RasterSource for ColorReliefBand<'_, S> {
    fn width(&self) -> usize {
        self.dataset.width
    }

    fn height(&self) -> usize {
        self.dataset.height
    }

    fn data_type(&self) -> DataType {
        DataType::Byte
    }

    fn nodata_value(&self) -> Option<f64> {
        None
    }

    fn geo_transform(&self) -> GeoTransform {
        self.dataset.geo_transform()
    }

    fn block_size(&self) -> (usize, usize) {
        self.dataset.block
    }

    fn read_row(&mut self, y: usize, buf: &mut [f64]) -> Result<()> {
        self.dataset.read_channel_row(self.channel, y, buf)
    }
}
