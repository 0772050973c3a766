//! Push-style scan: read each source row once, write each output row once.

use super::{RowRing, ScanGeometry};
use crate::terrain::Kernel;
use demkit_core::io::{report_progress, ProgressReporter, RasterSink, RasterSource};
use demkit_core::{Error, Result};
use tracing::debug;

/// Streams a single-band source through a 3x3 kernel into band 0 of a sink.
///
/// # Example
///
/// ```ignore
/// use demkit_algorithms::terrain::{SlopeContext, SlopeParams, TerrainKernel};
/// use demkit_algorithms::windowed::WindowedRasterProcessor;
///
/// let ctx = SlopeContext::new(&SlopeParams::default(), &dem.geo_transform())?;
/// let processor = WindowedRasterProcessor::new(TerrainKernel::Slope(ctx), false);
/// processor.run(&mut dem, &mut sink, &mut NoProgress)?;
/// ```
#[derive(Debug, Clone)]
pub struct WindowedRasterProcessor<K> {
    kernel: K,
    compute_edges: bool,
}

impl<K: Kernel> WindowedRasterProcessor<K> {
    pub fn new(kernel: K, compute_edges: bool) -> Self {
        Self { kernel, compute_edges }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn compute_edges(&self) -> bool {
        self.compute_edges
    }

    pub fn into_kernel(self) -> K {
        self.kernel
    }

    /// Run the scan.
    ///
    /// The destination nodata is declared on the sink before the first row.
    /// Progress is reported at 0, after every row, and at 1 for an empty
    /// source; a `false` answer stops the scan with [`Error::Cancelled`],
    /// leaving the rows already written in place.
    pub fn run<S: RasterSource + ?Sized>(
        &self,
        source: &mut S,
        sink: &mut dyn RasterSink,
        progress: &mut dyn ProgressReporter,
    ) -> Result<()> {
        if sink.band_count() == 0 {
            return Err(Error::InvalidBand { band: 1, count: 0 });
        }

        let dst = self.kernel.dst_nodata();
        let scan = ScanGeometry::new(source, dst, self.compute_edges);
        let (width, height) = (scan.width(), scan.height());
        debug!(
            "{}: streaming {}x{} source, edges {}, dst nodata {:?}",
            self.kernel.name(),
            width,
            height,
            if scan.computes_edges() { "computed" } else { "nodata" },
            dst.metadata()
        );

        sink.set_nodata(0, dst.metadata())?;
        report_progress(progress, 0.0)?;

        let mut ring = RowRing::new(width);
        let mut scratch = vec![0.0; width];
        let mut line = vec![0.0; width];

        for y in 0..height {
            if let Some(rows) = scan.source_rows(y) {
                ring.load(source, rows)?;
            }
            scan.compute(&self.kernel, y, |r| ring.row(r), &mut scratch, &mut line);
            sink.write_row(0, y, &line)?;
            report_progress(progress, (y + 1) as f64 / height as f64)?;
        }

        if height == 0 {
            report_progress(progress, 1.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{bumpy, Counting};
    use super::*;
    use crate::terrain::{apply_to_raster, HillshadeContext, HillshadeParams, SlopeContext, SlopeParams, TerrainKernel};
    use demkit_core::io::{MemorySink, NoProgress};
    use demkit_core::DataType;

    fn slope_kernel(dem: &demkit_core::Raster<f64>) -> TerrainKernel {
        TerrainKernel::Slope(SlopeContext::new(&SlopeParams::default(), dem.transform()).unwrap())
    }

    #[test]
    fn reads_each_row_once() {
        let dem = bumpy(8, 6);
        let kernel = slope_kernel(&dem);
        for edges in [false, true] {
            let mut src = Counting::new(dem.clone());
            let mut sink = MemorySink::like(&src, 1, DataType::Float32);
            WindowedRasterProcessor::new(kernel.clone(), edges)
                .run(&mut src, &mut sink, &mut NoProgress)
                .unwrap();
            assert_eq!(src.reads, (0..8).collect::<Vec<_>>());
        }
    }

    #[test]
    fn matches_in_memory_helper() {
        let dem = bumpy(9, 11);
        let ctx = HillshadeContext::new(&HillshadeParams::default(), dem.transform()).unwrap();
        let kernel = TerrainKernel::Hillshade(ctx);
        for edges in [false, true] {
            let mut src = dem.clone();
            let mut sink = MemorySink::like(&src, 1, DataType::Byte);
            WindowedRasterProcessor::new(kernel.clone(), edges)
                .run(&mut src, &mut sink, &mut NoProgress)
                .unwrap();
            let eager = apply_to_raster(&dem, &kernel, edges).unwrap();
            assert_eq!(sink.band(0).unwrap(), eager.data().as_slice().unwrap());
            assert_eq!(sink.nodata(0), Some(0.0));
        }
    }

    #[test]
    fn progress_sequence() {
        let mut dem = bumpy(4, 4);
        let kernel = slope_kernel(&dem);
        let mut sink = MemorySink::like(&dem, 1, DataType::Float32);
        let mut seen = Vec::new();
        let mut progress = |f: f64| {
            seen.push(f);
            true
        };
        WindowedRasterProcessor::new(kernel, false)
            .run(&mut dem, &mut sink, &mut progress)
            .unwrap();
        assert_eq!(seen, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn cancellation_keeps_written_rows() {
        let mut dem = bumpy(6, 5);
        let kernel = slope_kernel(&dem);
        let mut sink = MemorySink::like(&dem, 1, DataType::Float32);
        sink.write_row(0, 4, &[7.0; 5]).unwrap();
        let mut progress = |f: f64| f < 0.3;
        let err = WindowedRasterProcessor::new(kernel, true)
            .run(&mut dem, &mut sink, &mut progress)
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_ne!(sink.value(0, 1, 2), Some(0.0));
        assert_eq!(sink.value(0, 4, 0), Some(7.0));
    }

    #[test]
    fn empty_source_reports_completion() {
        let mut dem: demkit_core::Raster<f64> = demkit_core::Raster::new(0, 0);
        let kernel = TerrainKernel::Roughness;
        let mut sink = MemorySink::new(0, 0, 1, DataType::Float32);
        let mut seen = Vec::new();
        let mut progress = |f: f64| {
            seen.push(f);
            true
        };
        WindowedRasterProcessor::new(kernel, true)
            .run(&mut dem, &mut sink, &mut progress)
            .unwrap();
        assert_eq!(seen, vec![0.0, 1.0]);
    }

    #[test]
    fn sink_without_bands() {
        let mut dem = bumpy(3, 3);
        let mut sink = MemorySink::new(3, 3, 0, DataType::Float32);
        let err = WindowedRasterProcessor::new(TerrainKernel::Tpi, false)
            .run(&mut dem, &mut sink, &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBand { .. }));
    }
}
