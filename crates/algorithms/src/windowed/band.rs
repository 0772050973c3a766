//! Pull-style scan: a kernel output exposed as a raster source.

use super::{RowRing, ScanGeometry};
use crate::terrain::Kernel;
use demkit_core::io::RasterSource;
use demkit_core::raster::{DataType, DestNoData, GeoTransform};
use demkit_core::{Error, Result};
use tracing::trace;

/// Kernel output computed on demand, one row per request.
///
/// Keeps the three source rows around the last computed row and that row
/// itself. Reading rows in increasing order costs one source row per output
/// row; any other order re-reads what is missing, up to three rows.
#[derive(Debug)]
pub struct WindowedKernelBand<S, K> {
    source: S,
    kernel: K,
    scan: ScanGeometry,
    dst: DestNoData,
    ring: RowRing,
    scratch: Vec<f64>,
    cached: Option<usize>,
    output: Vec<f64>,
}

impl<S: RasterSource, K: Kernel> WindowedKernelBand<S, K> {
    pub fn new(source: S, kernel: K, compute_edges: bool) -> Self {
        let dst = kernel.dst_nodata();
        let scan = ScanGeometry::new(&source, dst, compute_edges);
        let width = scan.width();
        Self {
            source,
            kernel,
            scan,
            dst,
            ring: RowRing::new(width),
            scratch: vec![0.0; width],
            cached: None,
            output: vec![0.0; width],
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn dst_nodata(&self) -> DestNoData {
        self.dst
    }

    pub fn into_source(self) -> S {
        self.source
    }

    fn produce(&mut self, y: usize) -> Result<()> {
        trace!("{}: computing row {} (cached {:?})", self.kernel.name(), y, self.cached);
        self.cached = None;
        if let Some(rows) = self.scan.source_rows(y) {
            self.ring.load(&mut self.source, rows)?;
        }
        let ring = &self.ring;
        self.scan
            .compute(&self.kernel, y, |r| ring.row(r), &mut self.scratch, &mut self.output);
        self.cached = Some(y);
        Ok(())
    }
}

impl<S: RasterSource, K: Kernel> RasterSource for WindowedKernelBand<S, K> {
    fn width(&self) -> usize {
        self.scan.width()
    }

    fn height(&self) -> usize {
        self.scan.height()
    }

    fn data_type(&self) -> DataType {
        self.kernel.output_data_type()
    }

    fn nodata_value(&self) -> Option<f64> {
        self.dst.metadata()
    }

    fn geo_transform(&self) -> GeoTransform {
        self.source.geo_transform()
    }

    fn read_row(&mut self, y: usize, buf: &mut [f64]) -> Result<()> {
        if y >= self.scan.height() {
            return Err(Error::Read {
                row: y,
                reason: format!("row outside 0..{}", self.scan.height()),
            });
        }
        if buf.len() != self.scan.width() {
            return Err(Error::SizeMismatch {
                expected: self.scan.width(),
                actual: buf.len(),
            });
        }
        if self.cached != Some(y) {
            self.produce(y)?;
        }
        buf.copy_from_slice(&self.output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{bumpy, Counting};
    use super::super::WindowedRasterProcessor;
    use super::*;
    use crate::terrain::{AspectContext, AspectParams, TerrainKernel, TriAlgorithm};
    use demkit_core::io::{copy_bands, MemorySink, NoProgress};

    fn streamed(dem: &demkit_core::Raster<f64>, kernel: &TerrainKernel, edges: bool) -> Vec<f64> {
        let mut src = dem.clone();
        let mut sink = MemorySink::like(&src, 1, DataType::Float32);
        WindowedRasterProcessor::new(kernel.clone(), edges)
            .run(&mut src, &mut sink, &mut NoProgress)
            .unwrap();
        sink.band(0).unwrap().to_vec()
    }

    #[test]
    fn sequential_pull_matches_streaming() {
        let dem = bumpy(7, 9);
        let kernel = TerrainKernel::Tri(TriAlgorithm::Riley);
        for edges in [false, true] {
            let mut counting = Counting::new(dem.clone());
            let mut band = WindowedKernelBand::new(&mut counting, kernel.clone(), edges);
            assert_eq!(band.nodata_value(), Some(-9999.0));

            let mut sink = MemorySink::like(&band, 1, DataType::Float32);
            copy_bands(&mut [&mut band as &mut dyn RasterSource], &mut sink, &mut NoProgress).unwrap();
            drop(band);
            assert_eq!(sink.band(0).unwrap(), streamed(&dem, &kernel, edges).as_slice());
            assert_eq!(counting.reads, (0..7).collect::<Vec<_>>());
        }
    }

    #[test]
    fn random_access_recomputes() {
        let dem = bumpy(6, 5);
        let kernel = TerrainKernel::Aspect(AspectContext::new(&AspectParams::default()));
        let expected = streamed(&dem, &kernel, true);

        let mut band = WindowedKernelBand::new(Counting::new(dem), kernel, true);
        let mut line = vec![0.0; 5];
        for y in [4, 1, 5, 0, 3, 3, 2] {
            band.read_row(y, &mut line).unwrap();
            let want: Vec<f64> = expected[y * 5..(y + 1) * 5].to_vec();
            let got: Vec<f64> = line.iter().map(|&v| v as f32 as f64).collect();
            assert_eq!(got, want, "row {}", y);
        }

        let source = band.into_source();
        // The second request for row 3 is served from the cached output
        assert_eq!(source.reads, vec![3, 4, 5, 0, 1, 2, 4, 5, 1, 2, 3, 4, 1]);
    }

    #[test]
    fn out_of_range_row() {
        let mut band = WindowedKernelBand::new(bumpy(3, 3), TerrainKernel::Tpi, false);
        let mut line = vec![0.0; 3];
        assert!(matches!(band.read_row(3, &mut line), Err(Error::Read { row: 3, .. })));
        assert!(band.read_row(0, &mut vec![0.0; 2]).is_err());
    }
}
