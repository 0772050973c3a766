//! Color tables read from disk and applied end to end.

use demkit_colormap::{ColorBreakpointTable, ColorRelief, ColorSelectionMode, PrecomputedColorLut, Rgba};
use demkit_core::io::{MemorySink, NoProgress};
use demkit_core::{DataType, ErrorCategory, Raster};
use std::io::Write;
use tempfile::NamedTempFile;

fn color_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn single_black_entry() {
    let file = color_file("0 black\n");
    let mut dem: Raster<f32> = Raster::new(1, 1);

    let t = ColorBreakpointTable::from_path(file.path(), &mut dem, ColorSelectionMode::Interpolate).unwrap();
    for v in [-1e6, 0.0, 42.0] {
        assert_eq!(t.query(v, ColorSelectionMode::Interpolate), Some(Rgba::opaque(0, 0, 0)));
    }

    let t = ColorBreakpointTable::from_path(file.path(), &mut dem, ColorSelectionMode::Exact).unwrap();
    assert_eq!(t.query(0.0, ColorSelectionMode::Exact), Some(Rgba::opaque(0, 0, 0)));
    assert_eq!(t.color(0.5, ColorSelectionMode::Exact), Rgba::TRANSPARENT);
    assert_eq!(t.color(-3.0, ColorSelectionMode::Exact), Rgba::TRANSPARENT);
}

#[test]
fn two_entry_midpoint() {
    let file = color_file("0 0 0 0 255\n100 255 255 255 255\n");
    let mut dem: Raster<f32> = Raster::new(1, 1);
    let t = ColorBreakpointTable::from_path(file.path(), &mut dem, ColorSelectionMode::Interpolate).unwrap();
    assert_eq!(t.query(50.0, ColorSelectionMode::Interpolate), Some(Rgba::new(128, 128, 128, 255)));
}

#[test]
fn missing_file() {
    let mut dem: Raster<f32> = Raster::new(1, 1);
    let err = ColorBreakpointTable::from_path("/nonexistent/ramp.txt", &mut dem, ColorSelectionMode::Interpolate)
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ColorTable);
    assert_eq!(err.to_string(), "Cannot find /nonexistent/ramp.txt");
}

#[test]
fn percent_and_nodata_entries_against_uint16_dem() {
    let file = color_file("nv 0 0 0 0\n0% blue\n100% red\n");
    let values: Vec<u16> = (0..300 * 300).map(|i| (i % 1000) as u16 + 1).collect();
    let mut dem = Raster::from_vec(values, 300, 300).unwrap();
    dem.set_nodata(Some(0));

    let mode = ColorSelectionMode::Interpolate;
    let t = ColorBreakpointTable::from_path(file.path(), &mut dem, mode).unwrap();
    assert_eq!(t.query(0.0, mode), Some(Rgba::TRANSPARENT));
    assert_eq!(t.query(1.0, mode), Some(Rgba::opaque(0, 0, 255)));
    assert_eq!(t.query(1000.0, mode), Some(Rgba::opaque(255, 0, 0)));

    let relief = ColorRelief::new(t.clone(), mode, true);
    let lut = relief.lut_for(&dem).unwrap();
    for v in 0..65536u32 {
        assert_eq!(lut.get(v as f64), Some(t.color(v as f64, mode)));
    }

    let mut sink = MemorySink::like(&dem, 4, DataType::Byte);
    relief.run(&mut dem, &mut sink, &mut NoProgress).unwrap();
    assert_eq!(sink.value(2, 0, 0), Some(255.0));
    assert_eq!(sink.value(3, 0, 0), Some(255.0));
}

#[test]
fn lut_agrees_with_live_query_for_int16() {
    let file = color_file("-500 0 0 255\n0 white\n0 black\n2000 255 0 0 128\n");
    let mut dem: Raster<i16> = Raster::filled(300, 300, 5);
    for mode in [ColorSelectionMode::Interpolate, ColorSelectionMode::Exact, ColorSelectionMode::Nearest] {
        let t = ColorBreakpointTable::from_path(file.path(), &mut dem, mode).unwrap();
        let lut = PrecomputedColorLut::build(&t, mode, DataType::Int16, 300, 300).unwrap();
        for v in -32768..32768i32 {
            assert_eq!(lut.get(v as f64), Some(t.color(v as f64, mode)), "{} in {:?}", v, mode);
        }
    }
}
