//! demkit CLI - gdaldem-style DEM processing

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use demkit_algorithms::dem::{ColorTableSource, DemAlgorithm, DemOptions, DemProcessing};
use demkit_algorithms::terrain::{
    AngleConvention, GradientAlgorithm, HillshadeMode, SlopeUnits, TriAlgorithm,
};
use demkit_colormap::ColorSelectionMode;
use demkit_core::io::{compute_min_max, read_geotiff, write_geotiff, AnyRaster, MemorySink, RasterSource};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "demkit")]
#[command(author, version, about = "DEM analysis: hillshade, slope, aspect, color relief, TRI, TPI, roughness", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Input/output arguments shared by every product
#[derive(Args)]
struct IoArgs {
    /// Input DEM file
    input: PathBuf,
    /// Output file
    output: PathBuf,
    /// Source band (1-based)
    #[arg(short = 'b', long, default_value = "1")]
    band: usize,
    /// Compute values at raster edges and next to nodata instead of writing nodata
    #[arg(long)]
    compute_edges: bool,
    /// Pull rows through the lazy band adapter instead of streaming
    #[arg(long)]
    lazy: bool,
}

/// Horizontal-to-vertical unit ratios
#[derive(Args)]
struct ScaleArgs {
    /// Ratio of horizontal to vertical units, both axes (111120 for degrees vs meters)
    #[arg(short, long, conflicts_with_all = ["xscale", "yscale"])]
    scale: Option<f64>,
    /// Ratio along x only
    #[arg(long)]
    xscale: Option<f64>,
    /// Ratio along y only
    #[arg(long)]
    yscale: Option<f64>,
}

impl ScaleArgs {
    fn apply(&self, mut options: DemOptions) -> DemOptions {
        if let Some(s) = self.scale {
            options = options.with_scale(s);
        }
        if let Some(x) = self.xscale {
            options = options.with_xscale(x);
        }
        if let Some(y) = self.yscale {
            options = options.with_yscale(y);
        }
        options
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
        /// Band to describe (1-based)
        #[arg(short = 'b', long, default_value = "1")]
        band: usize,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Shaded relief
    #[command(alias = "shade")]
    Hillshade {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        scale: ScaleArgs,
        /// Vertical exaggeration
        #[arg(short, long, default_value = "1.0")]
        z: f64,
        /// Light azimuth in degrees (0 = North, clockwise)
        #[arg(long = "az", alias = "azimuth", conflicts_with = "multidirectional")]
        azimuth: Option<f64>,
        /// Light altitude in degrees above the horizon
        #[arg(long = "alt", alias = "altitude", default_value = "45")]
        altitude: f64,
        /// Darken shading by slope
        #[arg(long, conflicts_with_all = ["multidirectional", "igor"])]
        combined: bool,
        /// Blend four light directions
        #[arg(long, conflicts_with = "igor")]
        multidirectional: bool,
        /// Soft shading without self-shadowing
        #[arg(long)]
        igor: bool,
        /// Gradient: Horn or ZevenbergenThorne
        #[arg(long)]
        alg: Option<GradientAlgorithm>,
    },
    /// Steepest slope
    Slope {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        scale: ScaleArgs,
        /// Express slope as a percentage instead of degrees
        #[arg(short)]
        p: bool,
        /// Gradient: Horn or ZevenbergenThorne
        #[arg(long)]
        alg: Option<GradientAlgorithm>,
    },
    /// Downslope direction
    Aspect {
        #[command(flatten)]
        io: IoArgs,
        /// Angles counter-clockwise from East instead of clockwise from North
        #[arg(long)]
        trigonometric: bool,
        /// Write 0 instead of nodata on flat areas
        #[arg(long)]
        zero_for_flat: bool,
        /// Gradient: Horn or ZevenbergenThorne
        #[arg(long)]
        alg: Option<GradientAlgorithm>,
    },
    /// Color the DEM through a value-to-color table
    ColorRelief {
        /// Input DEM file
        input: PathBuf,
        /// Color table (plain text or GMT CPT)
        color_file: PathBuf,
        /// Output file
        output: PathBuf,
        /// Source band (1-based)
        #[arg(short = 'b', long, default_value = "1")]
        band: usize,
        /// Pull rows through the lazy band adapter instead of streaming
        #[arg(long)]
        lazy: bool,
        /// Add an alpha band
        #[arg(long)]
        alpha: bool,
        /// Only color exact table values, others become transparent black
        #[arg(long, conflicts_with = "nearest_color_entry")]
        exact_color_entry: bool,
        /// Use the color of the closest table value
        #[arg(long)]
        nearest_color_entry: bool,
    },
    /// Terrain Ruggedness Index
    Tri {
        #[command(flatten)]
        io: IoArgs,
        /// Wilson (mean absolute difference) or Riley (root of squared differences)
        #[arg(long)]
        tri_alg: Option<TriAlgorithm>,
    },
    /// Topographic Position Index
    Tpi {
        #[command(flatten)]
        io: IoArgs,
    },
    /// Elevation range of each 3x3 window
    Roughness {
        #[command(flatten)]
        io: IoArgs,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set default subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

const PROGRESS_STEPS: u64 = 1000;

fn progress_bar(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(PROGRESS_STEPS);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {percent:>3}% ({elapsed})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_message(msg.to_string());
    pb
}

fn read_dem(path: &Path, band: usize) -> Result<AnyRaster> {
    let pb = spinner("Reading raster...");
    let raster = read_geotiff(path, band)
        .with_context(|| format!("Failed to read band {} of {}", band, path.display()))?;
    pb.finish_and_clear();
    let (rows, cols) = raster.shape();
    info!("Input: {} x {} {}", cols, rows, raster.data_type());
    Ok(raster)
}

fn write_result(sink: &MemorySink, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(sink, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// Read, process and write one product.
fn process(
    algorithm: DemAlgorithm,
    input: &Path,
    output: &Path,
    lazy: bool,
    options: DemOptions,
    colors: Option<PathBuf>,
) -> Result<()> {
    let band = options.band;
    let processing = DemProcessing::new(algorithm, options, colors.map(ColorTableSource::Path))
        .with_context(|| format!("Invalid {} options", algorithm))?;

    let mut raster = read_dem(input, band)?;
    let start = Instant::now();

    let source = raster.as_source_mut();
    let mut op = if lazy {
        processing.lazy(source)
    } else {
        processing.streaming(source)
    }
    .with_context(|| format!("Failed to set up {}", algorithm))?;

    let mut sink = MemorySink::new(
        op.width(),
        op.height(),
        op.output_band_count(),
        op.output_data_type(),
    );
    sink.set_transform(op.geo_transform());

    let pb = progress_bar(algorithm.name());
    let mut report = |fraction: f64| {
        pb.set_position((fraction * PROGRESS_STEPS as f64).round() as u64);
        true
    };
    op.run(&mut sink, &mut report)
        .with_context(|| format!("Failed to compute {}", algorithm))?;
    pb.finish_and_clear();
    let elapsed = start.elapsed();

    write_result(&sink, output)?;
    done(algorithm.name(), output, elapsed);
    Ok(())
}

fn base_options(io: &IoArgs) -> DemOptions {
    DemOptions::default()
        .with_band(io.band)
        .with_compute_edges(io.compute_edges)
}

fn with_gradient(options: DemOptions, alg: Option<GradientAlgorithm>) -> DemOptions {
    match alg {
        Some(g) => options.with_gradient(g),
        None => options,
    }
}

fn describe(input: &Path, band: usize, json: bool) -> Result<()> {
    let mut raster = read_dem(input, band)?;
    let (rows, cols) = raster.shape();
    let data_type = raster.data_type();
    let source = raster.as_source_mut();
    let transform = source.geo_transform();
    let nodata = source.nodata_value();
    let range = compute_min_max(source).context("Failed to scan raster")?;

    if json {
        let value = serde_json::json!({
            "file": input.display().to_string(),
            "band": band,
            "width": cols,
            "height": rows,
            "data_type": data_type.name(),
            "geo_transform": transform.to_gdal(),
            "nodata": nodata,
            "min": range.map(|r| r.0),
            "max": range.map(|r| r.1),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("File: {}", input.display());
    println!("Band: {}", band);
    println!("Dimensions: {} x {} ({} cells)", cols, rows, rows * cols);
    println!("Data type: {}", data_type);
    println!(
        "Origin: ({:.6}, {:.6}), pixel size: ({}, {})",
        transform.origin_x, transform.origin_y, transform.pixel_width, transform.pixel_height
    );
    if let Some(nodata) = nodata {
        println!("NoData: {}", nodata);
    }
    match range {
        Some((min, max)) => println!("Min/Max: {:.4} / {:.4}", min, max),
        None => println!("Min/Max: no valid samples"),
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input, band, json } => describe(&input, band, json)?,

        Commands::Hillshade {
            io,
            scale,
            z,
            azimuth,
            altitude,
            combined,
            multidirectional,
            igor,
            alg,
        } => {
            let mode = if combined {
                HillshadeMode::Combined
            } else if multidirectional {
                HillshadeMode::MultiDirectional
            } else if igor {
                HillshadeMode::Igor
            } else {
                HillshadeMode::Standard
            };
            let mut options = scale
                .apply(base_options(&io))
                .with_z_factor(z)
                .with_altitude(altitude)
                .with_hillshade_mode(mode);
            if let Some(az) = azimuth {
                options = options.with_azimuth(az);
            }
            let options = with_gradient(options, alg);
            process(DemAlgorithm::Hillshade, &io.input, &io.output, io.lazy, options, None)?;
        }

        Commands::Slope { io, scale, p, alg } => {
            let units = if p { SlopeUnits::Percent } else { SlopeUnits::Degrees };
            let options = with_gradient(scale.apply(base_options(&io)).with_slope_units(units), alg);
            process(DemAlgorithm::Slope, &io.input, &io.output, io.lazy, options, None)?;
        }

        Commands::Aspect {
            io,
            trigonometric,
            zero_for_flat,
            alg,
        } => {
            let convention = if trigonometric {
                AngleConvention::Trigonometric
            } else {
                AngleConvention::Azimuth
            };
            let options = base_options(&io)
                .with_angle_convention(convention)
                .with_zero_for_flat(zero_for_flat);
            let options = with_gradient(options, alg);
            process(DemAlgorithm::Aspect, &io.input, &io.output, io.lazy, options, None)?;
        }

        Commands::ColorRelief {
            input,
            color_file,
            output,
            band,
            lazy,
            alpha,
            exact_color_entry,
            nearest_color_entry,
        } => {
            let mode = if exact_color_entry {
                ColorSelectionMode::Exact
            } else if nearest_color_entry {
                ColorSelectionMode::Nearest
            } else {
                ColorSelectionMode::Interpolate
            };
            let options = DemOptions::default()
                .with_band(band)
                .with_alpha(alpha)
                .with_color_mode(mode);
            process(DemAlgorithm::ColorRelief, &input, &output, lazy, options, Some(color_file))?;
        }

        Commands::Tri { io, tri_alg } => {
            let mut options = base_options(&io);
            if let Some(alg) = tri_alg {
                options = options.with_tri_algorithm(alg);
            }
            process(DemAlgorithm::Tri, &io.input, &io.output, io.lazy, options, None)?;
        }

        Commands::Tpi { io } => {
            process(DemAlgorithm::Tpi, &io.input, &io.output, io.lazy, base_options(&io), None)?;
        }

        Commands::Roughness { io } => {
            process(DemAlgorithm::Roughness, &io.input, &io.output, io.lazy, base_options(&io), None)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_shade_alias_and_flags() {
        let cli = Cli::try_parse_from([
            "demkit", "shade", "in.tif", "out.tif", "--az", "90", "--alt", "30", "-z", "2",
            "--alg", "ZevenbergenThorne", "--compute-edges",
        ])
        .unwrap();
        match cli.command {
            Commands::Hillshade {
                io,
                azimuth,
                altitude,
                z,
                alg,
                ..
            } => {
                assert_eq!(azimuth, Some(90.0));
                assert_eq!(altitude, 30.0);
                assert_eq!(z, 2.0);
                assert_eq!(alg, Some(GradientAlgorithm::ZevenbergenThorne));
                assert!(io.compute_edges);
            }
            _ => panic!("expected hillshade"),
        }
    }

    #[test]
    fn test_conflicting_flags() {
        assert!(Cli::try_parse_from([
            "demkit", "hillshade", "a.tif", "b.tif", "--combined", "--igor"
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "demkit", "hillshade", "a.tif", "b.tif", "--multidirectional", "--az", "10"
        ])
        .is_err());
        assert!(Cli::try_parse_from([
            "demkit", "color-relief", "a.tif", "c.txt", "b.tif", "--exact-color-entry",
            "--nearest-color-entry"
        ])
        .is_err());
    }

    #[test]
    fn test_tri_algorithm_parsing() {
        let cli = Cli::try_parse_from(["demkit", "tri", "a.tif", "b.tif", "--tri-alg", "riley"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Tri {
                tri_alg: Some(TriAlgorithm::Riley),
                ..
            }
        ));
        assert!(Cli::try_parse_from(["demkit", "tri", "a.tif", "b.tif", "--tri-alg", "max"]).is_err());
    }
}
