//! Streaming 3x3 raster processing
//!
//! A source is scanned top to bottom with three resident rows. Each output
//! row is computed by [`ScanGeometry::compute`], which is shared by the
//! push-style [`WindowedRasterProcessor`] and the pull-style
//! [`WindowedKernelBand`], so both produce identical values.
//!
//! Edge policy:
//! - without compute-at-edges, the first and last rows and columns, and
//!   every window touching source nodata, get the destination nodata;
//! - with it (and a raster of at least 2x2), missing rows and columns are
//!   extrapolated linearly and nodata neighbors are extrapolated through
//!   the center. A nodata center always yields destination nodata.

mod band;
mod processor;

pub use band::WindowedKernelBand;
pub use processor::WindowedRasterProcessor;

use crate::terrain::Kernel;
use demkit_core::io::RasterSource;
use demkit_core::raster::{extrapolate_row, is_nodata, DestNoData, NeighborhoodWindow, SourceNoData};
use demkit_core::Result;
use std::ops::RangeInclusive;

/// Per-scan constants: geometry, edge policy and both nodata values.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScanGeometry {
    width: usize,
    height: usize,
    edges: bool,
    nodata: Option<SourceNoData>,
    dst: f64,
}

impl ScanGeometry {
    pub(crate) fn new<S: RasterSource + ?Sized>(source: &S, dst: DestNoData, compute_edges: bool) -> Self {
        let (width, height) = (source.width(), source.height());
        Self {
            width,
            height,
            edges: compute_edges && width >= 2 && height >= 2,
            nodata: source.source_nodata(),
            dst: dst.value,
        }
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn height(&self) -> usize {
        self.height
    }

    /// Whether border pixels get computed values
    pub(crate) fn computes_edges(&self) -> bool {
        self.edges
    }

    /// Source rows output row `y` depends on; `None` for an all-nodata row.
    pub(crate) fn source_rows(&self, y: usize) -> Option<RangeInclusive<usize>> {
        if y > 0 && y + 1 < self.height {
            Some(y - 1..=y + 1)
        } else if !self.edges {
            None
        } else if y == 0 {
            Some(0..=1)
        } else {
            Some(self.height - 2..=self.height - 1)
        }
    }

    /// Compute output row `y` into `out`.
    ///
    /// `row` must return every source row listed by [`Self::source_rows`].
    /// `scratch` holds the virtual row above row 0 or below the last row.
    pub(crate) fn compute<'a, K: Kernel + ?Sized>(
        &self,
        kernel: &K,
        y: usize,
        row: impl Fn(usize) -> &'a [f64],
        scratch: &mut [f64],
        out: &mut [f64],
    ) {
        let nodata = self.nodata.as_ref();
        let last = self.height.saturating_sub(1);
        match self.source_rows(y) {
            None => out.fill(self.dst),
            Some(_) if y == 0 => {
                extrapolate_row(row(0), row(1), nodata, scratch);
                self.compute_row(kernel, [&*scratch, row(0), row(1)], out);
            }
            Some(_) if y == last => {
                extrapolate_row(row(last), row(last - 1), nodata, scratch);
                self.compute_row(kernel, [row(last - 1), row(last), &*scratch], out);
            }
            Some(_) => self.compute_row(kernel, [row(y - 1), row(y), row(y + 1)], out),
        }
    }

    fn compute_row<K: Kernel + ?Sized>(&self, kernel: &K, rows: [&[f64]; 3], out: &mut [f64]) {
        let nodata = self.nodata.as_ref();
        for (col, value) in out.iter_mut().enumerate() {
            *value = if !self.edges && (col == 0 || col + 1 == self.width) {
                self.dst
            } else {
                self.pixel(kernel, NeighborhoodWindow::assemble(rows, col, nodata))
            };
        }
    }

    #[inline]
    fn pixel<K: Kernel + ?Sized>(&self, kernel: &K, mut window: NeighborhoodWindow) -> f64 {
        if let Some(nd) = self.nodata.as_ref() {
            if is_nodata(Some(nd), window.center()) {
                return self.dst;
            }
            if window.has_nodata(Some(nd)) {
                if !self.edges {
                    return self.dst;
                }
                window.fill_missing(nd);
            }
        }
        kernel.apply(&window, self.dst)
    }
}

/// Three consecutive source rows, each kept in slot `row % 3`.
#[derive(Debug, Clone)]
pub(crate) struct RowRing {
    slots: [Vec<f64>; 3],
    held: [Option<usize>; 3],
}

impl RowRing {
    pub(crate) fn new(width: usize) -> Self {
        Self {
            slots: [vec![0.0; width], vec![0.0; width], vec![0.0; width]],
            held: [None; 3],
        }
    }

    /// Make `rows` (at most three consecutive) resident, reading only the
    /// ones not already held. Returns the number of rows read.
    pub(crate) fn load<S: RasterSource + ?Sized>(
        &mut self,
        source: &mut S,
        rows: RangeInclusive<usize>,
    ) -> Result<usize> {
        let mut fresh = 0;
        for y in rows {
            let slot = y % 3;
            if self.held[slot] == Some(y) {
                continue;
            }
            self.held[slot] = None;
            source.read_row(y, &mut self.slots[slot])?;
            self.held[slot] = Some(y);
            fresh += 1;
        }
        Ok(fresh)
    }

    #[inline]
    pub(crate) fn row(&self, y: usize) -> &[f64] {
        &self.slots[y % 3]
    }
}
