//! Terrain demo: every DEM product over a synthetic volcano
//!
//! Generates a 240x240 cone with a nodata crater lake and writes:
//!   dem.tif, hillshade.tif, hillshade_multi.tif, slope.tif, aspect.tif,
//!   tri.tif, tpi.tif, roughness.tif, color_relief.tif
//!
//! Run:
//!   cargo run -p demkit-algorithms --example terrain_demo

use std::fs;
use std::path::Path;

use demkit_algorithms::dem::{ColorTableSource, DemAlgorithm, DemOptions, DemProcessing};
use demkit_algorithms::terrain::HillshadeMode;
use demkit_core::io::{copy_bands, write_geotiff, MemorySink, NoProgress, RasterSink, RasterSource};
use demkit_core::{DataType, GeoTransform, Raster};

const SIZE: usize = 240;
const NODATA: f64 = -32768.0;

const RAMP: &str = "\
nv    0   0   0   0
0%   40  90  40
35%  150 170  80
70%  140 100  60
100% white
";

fn main() {
    let out_dir = Path::new("output/terrain_demo");
    fs::create_dir_all(out_dir).expect("Cannot create output directory");

    let dem = build_volcano();
    println!("Synthetic DEM: {}x{}", SIZE, SIZE);
    let mut copy = MemorySink::like(&dem, 1, DataType::Float32);
    copy.set_nodata(0, Some(NODATA)).unwrap();
    let mut source = dem.clone();
    copy_bands(&mut [&mut source as &mut dyn RasterSource], &mut copy, &mut NoProgress).unwrap();
    print_stats("  dem", &copy);
    save(out_dir, "dem.tif", &copy);

    let products = [
        ("hillshade.tif", DemAlgorithm::Hillshade, DemOptions::default()),
        (
            "hillshade_multi.tif",
            DemAlgorithm::Hillshade,
            DemOptions::default().with_hillshade_mode(HillshadeMode::MultiDirectional),
        ),
        ("slope.tif", DemAlgorithm::Slope, DemOptions::default()),
        ("aspect.tif", DemAlgorithm::Aspect, DemOptions::default()),
        ("tri.tif", DemAlgorithm::Tri, DemOptions::default()),
        ("tpi.tif", DemAlgorithm::Tpi, DemOptions::default()),
        ("roughness.tif", DemAlgorithm::Roughness, DemOptions::default()),
    ];
    for (name, algorithm, options) in products {
        let processing = DemProcessing::new(algorithm, options.with_compute_edges(true), None)
            .expect("invalid options");
        let sink = run(&processing, &dem);
        print_stats(&format!("  {}", algorithm), &sink);
        save(out_dir, name, &sink);
    }

    let colors = ColorTableSource::Text {
        name: "ramp".into(),
        text: RAMP.into(),
    };
    let processing = DemProcessing::new(
        DemAlgorithm::ColorRelief,
        DemOptions::default().with_alpha(true),
        Some(colors),
    )
    .expect("invalid options");
    let sink = run(&processing, &dem);
    save(out_dir, "color_relief.tif", &sink);

    println!("\n9 TIFF files written to {}/", out_dir.display());
}

fn run(processing: &DemProcessing, dem: &Raster<f64>) -> MemorySink {
    let mut op = processing.lazy(dem.clone()).expect("cannot attach source");
    let mut sink = MemorySink::like(dem, op.output_band_count(), op.output_data_type());
    op.run(&mut sink, &mut NoProgress)
        .unwrap_or_else(|e| panic!("{} failed: {}", processing.algorithm(), e));
    sink
}

/// Cone with ridges and a flat crater lake marked as nodata.
fn build_volcano() -> Raster<f64> {
    let mut dem = Raster::new(SIZE, SIZE);
    // 30 m cells, origin at (300000, 7400000)
    dem.set_transform(GeoTransform::new(300_000.0, 7_400_000.0, 30.0, -30.0));
    dem.set_nodata(Some(NODATA));

    let center = SIZE as f64 / 2.0;
    for r in 0..SIZE {
        for c in 0..SIZE {
            let (dy, dx) = (r as f64 - center, c as f64 - center);
            let dist = (dx * dx + dy * dy).sqrt();
            let ridges = 15.0 * (6.0 * dy.atan2(dx)).cos() * (dist / center).min(1.0);
            let z = if dist < 12.0 {
                NODATA
            } else {
                (2400.0 - 18.0 * dist).max(300.0) + ridges
            };
            dem.set(r, c, z).unwrap();
        }
    }
    dem
}

fn print_stats(label: &str, sink: &MemorySink) {
    let s = sink.to_raster(0).unwrap().statistics();
    println!(
        "{:<14} min={:>8.2}  max={:>8.2}  mean={:>8.2}  valid={:>6}  nodata={:>5}",
        label,
        s.min.unwrap_or(f64::NAN),
        s.max.unwrap_or(f64::NAN),
        s.mean.unwrap_or(f64::NAN),
        s.valid_count,
        s.nodata_count,
    );
}

fn save(dir: &Path, name: &str, sink: &MemorySink) {
    let path = dir.join(name);
    write_geotiff(sink, &path).unwrap_or_else(|e| panic!("Failed to write {}: {}", path.display(), e));
}
