//! End-to-end runs through the `dem` factory, on synthetic DEMs.

use approx::assert_relative_eq;
use demkit_algorithms::dem::{ColorTableSource, DemAlgorithm, DemOptions, DemProcessing, Operation};
use demkit_algorithms::terrain::{apply_to_raster, SlopeUnits};
use demkit_core::io::{read_geotiff, write_geotiff, MemorySink, NoProgress, RasterSource};
use demkit_core::{GeoTransform, Raster};
use std::io::Write;

/// Run an operation into a fresh sink sized from it.
fn run(mut op: Operation<Raster<f64>>) -> MemorySink {
    let mut sink = MemorySink::new(op.width(), op.height(), op.output_band_count(), op.output_data_type());
    sink.set_transform(op.geo_transform());
    op.run(&mut sink, &mut NoProgress).unwrap();
    sink
}

fn both(processing: &DemProcessing, dem: &Raster<f64>) -> [MemorySink; 2] {
    [
        run(processing.streaming(dem.clone()).unwrap()),
        run(processing.lazy(dem.clone()).unwrap()),
    ]
}

/// Hills and a valley at 25 m spacing
fn terrain(rows: usize, cols: usize) -> Raster<f64> {
    let mut dem = Raster::new(rows, cols);
    dem.set_transform(GeoTransform::new(500_000.0, 4_000_000.0, 25.0, -25.0));
    for r in 0..rows {
        for c in 0..cols {
            let (x, y) = (c as f64 * 0.4, r as f64 * 0.3);
            dem.set(r, c, 800.0 + 60.0 * x.sin() * y.cos() + 4.0 * r as f64).unwrap();
        }
    }
    dem
}

// ---------------------------------------------------------------------------
// Flat ground
// ---------------------------------------------------------------------------

#[test]
fn flat_hillshade_is_constant() {
    let dem: Raster<f64> = Raster::filled(3, 3, 100.0);
    let alg = DemAlgorithm::from_name("hillshade").unwrap();

    let edges = DemProcessing::new(alg, DemOptions::default().with_compute_edges(true), None).unwrap();
    for sink in both(&edges, &dem) {
        // 1 + 254 * sin(45°) = 180.6, stored as Byte
        assert!(sink.band(0).unwrap().iter().all(|&v| v == 181.0));
        assert_eq!(sink.nodata(0), Some(0.0));
    }

    let plain = DemProcessing::new(alg, DemOptions::default(), None).unwrap();
    for sink in both(&plain, &dem) {
        let band = sink.band(0).unwrap();
        assert_eq!(band[4], 181.0);
        assert_eq!(band.iter().filter(|&&v| v == 0.0).count(), 8);
    }
}

#[test]
fn flat_texture_products_are_zero() {
    let dem: Raster<f64> = Raster::filled(4, 5, 37.5);
    for alg in [DemAlgorithm::Tri, DemAlgorithm::Tpi, DemAlgorithm::Roughness] {
        let processing = DemProcessing::new(alg, DemOptions::default().with_compute_edges(true), None).unwrap();
        for sink in both(&processing, &dem) {
            assert!(sink.band(0).unwrap().iter().all(|&v| v == 0.0), "{}", alg);
        }
    }
}

#[test]
fn flat_aspect_nodata_or_zero() {
    let dem: Raster<f64> = Raster::filled(3, 3, 5.0);
    let aspect = DemProcessing::new(DemAlgorithm::Aspect, DemOptions::default(), None).unwrap();
    let zero = DemProcessing::new(
        DemAlgorithm::Aspect,
        DemOptions::default().with_zero_for_flat(true),
        None,
    )
    .unwrap();

    for sink in both(&aspect, &dem) {
        assert_eq!(sink.value(0, 1, 1), Some(-9999.0));
    }
    for sink in both(&zero, &dem) {
        assert_eq!(sink.value(0, 1, 1), Some(0.0));
        assert_eq!(sink.nodata(0), None);
    }
}

// ---------------------------------------------------------------------------
// Nodata footprint
// ---------------------------------------------------------------------------

#[test]
fn nodata_center_poisons_its_neighbors() {
    let mut dem = terrain(5, 5);
    dem.set(2, 2, -32768.0).unwrap();
    dem.set_nodata(Some(-32768.0));

    let processing = DemProcessing::new(DemAlgorithm::Tri, DemOptions::default(), None).unwrap();
    for sink in both(&processing, &dem) {
        // border rows/columns plus the 3x3 footprint cover the whole raster
        assert!(sink.band(0).unwrap().iter().all(|&v| v == -9999.0));
    }
}

#[test]
fn nodata_footprint_is_three_by_three() {
    let mut dem = terrain(7, 7);
    dem.set(3, 3, -32768.0).unwrap();
    dem.set_nodata(Some(-32768.0));

    let processing = DemProcessing::new(DemAlgorithm::Tri, DemOptions::default(), None).unwrap();
    for sink in both(&processing, &dem) {
        for r in 1..6 {
            for c in 1..6 {
                let v = sink.value(0, r, c).unwrap();
                let inside = (2..=4).contains(&r) && (2..=4).contains(&c);
                assert_eq!(v == -9999.0, inside, "({}, {}) = {}", r, c, v);
            }
        }
    }

    // With edges, only the center itself stays nodata
    let edges = DemProcessing::new(DemAlgorithm::Tri, DemOptions::default().with_compute_edges(true), None).unwrap();
    for sink in both(&edges, &dem) {
        let band = sink.band(0).unwrap();
        assert_eq!(band.iter().filter(|&&v| v == -9999.0).count(), 1);
        assert_eq!(sink.value(0, 3, 3), Some(-9999.0));
    }
}

// ---------------------------------------------------------------------------
// Properties over a real-looking surface
// ---------------------------------------------------------------------------

#[test]
fn slope_percent_is_tangent_of_degrees() {
    let dem = terrain(12, 14);
    let degrees = DemProcessing::new(DemAlgorithm::Slope, DemOptions::default(), None).unwrap();
    let percent = DemProcessing::new(
        DemAlgorithm::Slope,
        DemOptions::default().with_slope_units(SlopeUnits::Percent),
        None,
    )
    .unwrap();

    let deg = run(degrees.streaming(dem.clone()).unwrap());
    let pct = run(percent.streaming(dem).unwrap());
    for (&d, &p) in deg.band(0).unwrap().iter().zip(pct.band(0).unwrap()) {
        if d == -9999.0 {
            assert_eq!(p, -9999.0);
            continue;
        }
        assert_relative_eq!(p, 100.0 * d.to_radians().tan(), max_relative = 1e-4);
    }
}

#[test]
fn aspect_ignores_uniform_scaling() {
    let dem = terrain(10, 10);
    let mut scaled = dem.clone();
    scaled.data_mut().mapv_inplace(|v| v * 3.5);

    let processing = DemProcessing::new(DemAlgorithm::Aspect, DemOptions::default(), None).unwrap();
    let a = run(processing.streaming(dem).unwrap());
    let b = run(processing.streaming(scaled).unwrap());
    for (&x, &y) in a.band(0).unwrap().iter().zip(b.band(0).unwrap()) {
        assert_relative_eq!(x, y, epsilon = 1e-3);
    }
}

#[test]
fn hillshade_stays_on_byte_ramp() {
    let dem = terrain(16, 16);
    for opts in [
        DemOptions::default(),
        DemOptions::default().with_altitude(10.0).with_azimuth(90.0),
        DemOptions::default().with_z_factor(25.0),
    ] {
        let processing = DemProcessing::new(DemAlgorithm::Hillshade, opts.with_compute_edges(true), None).unwrap();
        let sink = run(processing.streaming(dem.clone()).unwrap());
        for &v in sink.band(0).unwrap() {
            assert!((1.0..=255.0).contains(&v), "{}", v);
        }
    }
}

#[test]
fn factory_matches_in_memory_helper() {
    let dem = terrain(9, 13);
    let processing = DemProcessing::new(DemAlgorithm::Slope, DemOptions::default().with_scale(2.0), None).unwrap();
    let kernel = processing.kernel(dem.transform()).unwrap().unwrap();
    let eager = apply_to_raster(&dem, &kernel, false).unwrap();
    let sink = run(processing.lazy(dem).unwrap());
    assert_eq!(sink.band(0).unwrap(), eager.data().as_slice().unwrap());
}

// ---------------------------------------------------------------------------
// Color relief and files
// ---------------------------------------------------------------------------

#[test]
fn color_relief_from_file_blends_midpoint() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# grey ramp").unwrap();
    writeln!(file, "0 0 0 0 255").unwrap();
    writeln!(file, "100 255 255 255 255").unwrap();

    let dem: Raster<f64> = Raster::from_vec(vec![0.0, 50.0, 100.0, 150.0], 2, 2).unwrap();
    let opts = DemOptions::default().with_alpha(true);
    let processing = DemProcessing::new(
        DemAlgorithm::ColorRelief,
        opts,
        Some(ColorTableSource::Path(file.path().to_path_buf())),
    )
    .unwrap();

    for sink in both(&processing, &dem) {
        let pixel = |r, c| (0..4).map(|b| sink.value(b, r, c).unwrap()).collect::<Vec<_>>();
        assert_eq!(pixel(0, 0), vec![0.0, 0.0, 0.0, 255.0]);
        assert_eq!(pixel(0, 1), vec![128.0, 128.0, 128.0, 255.0]);
        assert_eq!(pixel(1, 1), vec![255.0, 255.0, 255.0, 255.0]);
    }
}

#[test]
fn missing_color_file_is_a_color_table_error() {
    let dir = tempfile::tempdir().unwrap();
    let processing = DemProcessing::new(
        DemAlgorithm::ColorRelief,
        DemOptions::default(),
        Some(ColorTableSource::Path(dir.path().join("nope.txt"))),
    )
    .unwrap();
    let err = processing.streaming(terrain(3, 3)).unwrap_err();
    assert_eq!(err.category(), demkit_core::ErrorCategory::ColorTable);
    assert!(err.to_string().contains("Cannot find"));
}

#[test]
fn geotiff_round_trip_through_slope() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slope.tif");
    let dem = terrain(8, 10);

    let processing = DemProcessing::new(DemAlgorithm::Slope, DemOptions::default(), None).unwrap();
    let sink = run(processing.streaming(dem).unwrap());
    write_geotiff(&sink, &path).unwrap();

    let mut back = read_geotiff(&path, 1).unwrap();
    assert_eq!(back.shape(), (8, 10));
    let source = back.as_source_mut();
    assert_eq!(source.nodata_value(), Some(-9999.0));
    assert_relative_eq!(source.geo_transform().pixel_width, 25.0);

    let mut line = vec![0.0; 10];
    for y in 0..8 {
        source.read_row(y, &mut line).unwrap();
        assert_eq!(line.as_slice(), &sink.band(0).unwrap()[y * 10..(y + 1) * 10]);
    }
}
