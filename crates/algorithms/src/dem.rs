//! DEM processing factory
//!
//! Turns an algorithm name and a [`DemOptions`] bundle into a ready-to-run
//! [`Operation`], either streaming (push rows into a sink) or lazy (bands
//! that a generic copy pulls from).
//!
//! ```ignore
//! use demkit_algorithms::dem::{DemAlgorithm, DemOptions, DemProcessing};
//!
//! let algorithm: DemAlgorithm = "slope".parse()?;
//! let options = DemOptions::default().with_slope_units(SlopeUnits::Percent);
//! let mut op = DemProcessing::new(algorithm, options, None)?.streaming(&mut dem)?;
//! let mut sink = MemorySink::new(op.width(), op.height(), op.output_band_count(), op.output_data_type());
//! op.run(&mut sink, &mut NoProgress)?;
//! ```

use crate::terrain::{
    AngleConvention, AspectContext, AspectParams, GradientAlgorithm, HillshadeContext,
    HillshadeMode, HillshadeParams, Kernel, SlopeContext, SlopeParams, SlopeUnits,
    TerrainKernel, TriAlgorithm,
};
use crate::windowed::{WindowedKernelBand, WindowedRasterProcessor};
use demkit_colormap::{ColorBreakpointTable, ColorRelief, ColorReliefDataset, ColorSelectionMode};
use demkit_core::io::{copy_bands, ProgressReporter, RasterSink, RasterSource};
use demkit_core::raster::{DataType, GeoTransform};
use demkit_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

// ─── Algorithm selection ─────────────────────────────────────────────

/// The seven gdaldem-style products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DemAlgorithm {
    Hillshade,
    Slope,
    Aspect,
    ColorRelief,
    Tri,
    Tpi,
    Roughness,
}

impl DemAlgorithm {
    pub const ALL: [DemAlgorithm; 7] = [
        DemAlgorithm::Hillshade,
        DemAlgorithm::Slope,
        DemAlgorithm::Aspect,
        DemAlgorithm::ColorRelief,
        DemAlgorithm::Tri,
        DemAlgorithm::Tpi,
        DemAlgorithm::Roughness,
    ];

    /// Case-insensitive lookup; `shade` is an alias of `hillshade`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "hillshade" | "shade" => Ok(DemAlgorithm::Hillshade),
            "slope" => Ok(DemAlgorithm::Slope),
            "aspect" => Ok(DemAlgorithm::Aspect),
            "color-relief" => Ok(DemAlgorithm::ColorRelief),
            "tri" => Ok(DemAlgorithm::Tri),
            "tpi" => Ok(DemAlgorithm::Tpi),
            "roughness" => Ok(DemAlgorithm::Roughness),
            _ => Err(Error::UnknownAlgorithm(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DemAlgorithm::Hillshade => "hillshade",
            DemAlgorithm::Slope => "slope",
            DemAlgorithm::Aspect => "aspect",
            DemAlgorithm::ColorRelief => "color-relief",
            DemAlgorithm::Tri => "TRI",
            DemAlgorithm::Tpi => "TPI",
            DemAlgorithm::Roughness => "roughness",
        }
    }

    /// Everything except color relief runs through a 3x3 window.
    pub fn is_windowed(&self) -> bool {
        !matches!(self, DemAlgorithm::ColorRelief)
    }

    fn uses_gradient(&self) -> bool {
        matches!(
            self,
            DemAlgorithm::Hillshade | DemAlgorithm::Slope | DemAlgorithm::Aspect
        )
    }
}

impl fmt::Display for DemAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DemAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

// ─── Options ─────────────────────────────────────────────────────────

/// Parameter bundle shared by every algorithm.
///
/// Defaults are those of gdaldem. Fields that only make sense for some
/// algorithms are checked by [`DemOptions::validate`]; the `Option` fields
/// distinguish "left at default" from "explicitly requested".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemOptions {
    /// Vertical exaggeration
    pub z_factor: f64,
    /// Ratio of horizontal to vertical units along x
    pub xscale: f64,
    /// Ratio of horizontal to vertical units along y
    pub yscale: f64,
    /// Light azimuth in degrees; 315 when unset
    pub azimuth: Option<f64>,
    /// Light altitude in degrees
    pub altitude: f64,
    pub hillshade_mode: HillshadeMode,
    /// Horn when unset
    pub gradient: Option<GradientAlgorithm>,
    pub slope_units: SlopeUnits,
    pub angle_convention: AngleConvention,
    pub zero_for_flat: bool,
    /// Wilson when unset
    pub tri_algorithm: Option<TriAlgorithm>,
    pub color_mode: ColorSelectionMode,
    /// Emit a fourth, alpha band from color relief
    pub alpha: bool,
    pub compute_edges: bool,
    /// 1-based source band
    pub band: usize,
}

impl Default for DemOptions {
    fn default() -> Self {
        Self {
            z_factor: 1.0,
            xscale: 1.0,
            yscale: 1.0,
            azimuth: None,
            altitude: 45.0,
            hillshade_mode: HillshadeMode::Standard,
            gradient: None,
            slope_units: SlopeUnits::Degrees,
            angle_convention: AngleConvention::Azimuth,
            zero_for_flat: false,
            tri_algorithm: None,
            color_mode: ColorSelectionMode::Interpolate,
            alpha: false,
            compute_edges: false,
            band: 1,
        }
    }
}

impl DemOptions {
    pub fn with_z_factor(mut self, z: f64) -> Self {
        self.z_factor = z;
        self
    }

    /// Same horizontal-to-vertical ratio on both axes
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.xscale = scale;
        self.yscale = scale;
        self
    }

    pub fn with_xscale(mut self, xscale: f64) -> Self {
        self.xscale = xscale;
        self
    }

    pub fn with_yscale(mut self, yscale: f64) -> Self {
        self.yscale = yscale;
        self
    }

    pub fn with_azimuth(mut self, azimuth: f64) -> Self {
        self.azimuth = Some(azimuth);
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn with_hillshade_mode(mut self, mode: HillshadeMode) -> Self {
        self.hillshade_mode = mode;
        self
    }

    pub fn with_gradient(mut self, gradient: GradientAlgorithm) -> Self {
        self.gradient = Some(gradient);
        self
    }

    pub fn with_slope_units(mut self, units: SlopeUnits) -> Self {
        self.slope_units = units;
        self
    }

    pub fn with_angle_convention(mut self, convention: AngleConvention) -> Self {
        self.angle_convention = convention;
        self
    }

    pub fn with_zero_for_flat(mut self, zero_for_flat: bool) -> Self {
        self.zero_for_flat = zero_for_flat;
        self
    }

    pub fn with_tri_algorithm(mut self, algorithm: TriAlgorithm) -> Self {
        self.tri_algorithm = Some(algorithm);
        self
    }

    pub fn with_color_mode(mut self, mode: ColorSelectionMode) -> Self {
        self.color_mode = mode;
        self
    }

    pub fn with_alpha(mut self, alpha: bool) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_compute_edges(mut self, compute_edges: bool) -> Self {
        self.compute_edges = compute_edges;
        self
    }

    pub fn with_band(mut self, band: usize) -> Self {
        self.band = band;
        self
    }

    /// Check the options against `algorithm`.
    ///
    /// Rejects options that belong to another algorithm, a multidirectional
    /// hillshade with an explicit azimuth, and out-of-range numbers.
    pub fn validate(&self, algorithm: DemAlgorithm) -> Result<()> {
        let only_for = |option: &str, allowed: &str| {
            Err(Error::Configuration(format!(
                "{} is only valid for {}, not {}",
                option, allowed, algorithm
            )))
        };

        if self.hillshade_mode != HillshadeMode::Standard && algorithm != DemAlgorithm::Hillshade {
            return only_for(self.hillshade_mode.name(), "hillshade");
        }
        if self.hillshade_mode == HillshadeMode::MultiDirectional && self.azimuth.is_some() {
            return Err(Error::Configuration(
                "multidirectional hillshade does not take an azimuth".into(),
            ));
        }
        if self.gradient.is_some() && !algorithm.uses_gradient() {
            return only_for("the gradient algorithm", "hillshade, slope and aspect");
        }
        if self.tri_algorithm.is_some() && algorithm != DemAlgorithm::Tri {
            return only_for("the TRI algorithm", "TRI");
        }
        if self.slope_units != SlopeUnits::Degrees && algorithm != DemAlgorithm::Slope {
            return only_for("percent slope", "slope");
        }
        if algorithm != DemAlgorithm::Aspect {
            if self.angle_convention != AngleConvention::Azimuth {
                return only_for("the trigonometric angle", "aspect");
            }
            if self.zero_for_flat {
                return only_for("zero for flat", "aspect");
            }
        }
        if algorithm != DemAlgorithm::ColorRelief {
            if self.color_mode != ColorSelectionMode::Interpolate {
                return only_for("the color entry mode", "color-relief");
            }
            if self.alpha {
                return only_for("alpha", "color-relief");
            }
        }

        for (name, value) in [
            ("z factor", self.z_factor),
            ("xscale", self.xscale),
            ("yscale", self.yscale),
        ] {
            crate::terrain::check_factor(name, value)?;
        }
        if !(0.0..=90.0).contains(&self.altitude) {
            return Err(Error::InvalidParameter {
                name: "altitude",
                value: self.altitude.to_string(),
                reason: "must be between 0 and 90 degrees".into(),
            });
        }
        if let Some(az) = self.azimuth.filter(|a| !a.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "azimuth",
                value: az.to_string(),
                reason: "must be finite".into(),
            });
        }
        if self.band == 0 {
            return Err(Error::InvalidParameter {
                name: "band",
                value: "0".into(),
                reason: "bands are numbered from 1".into(),
            });
        }
        Ok(())
    }

    fn hillshade_params(&self) -> HillshadeParams {
        HillshadeParams {
            azimuth: self.azimuth.unwrap_or(315.0),
            altitude: self.altitude,
            z_factor: self.z_factor,
            xscale: self.xscale,
            yscale: self.yscale,
            mode: self.hillshade_mode,
            gradient: self.gradient.unwrap_or_default(),
            compute_edges: self.compute_edges,
        }
    }

    fn slope_params(&self) -> SlopeParams {
        SlopeParams {
            units: self.slope_units,
            xscale: self.xscale,
            yscale: self.yscale,
            gradient: self.gradient.unwrap_or_default(),
            compute_edges: self.compute_edges,
        }
    }

    fn aspect_params(&self) -> AspectParams {
        AspectParams {
            convention: self.angle_convention,
            zero_for_flat: self.zero_for_flat,
            gradient: self.gradient.unwrap_or_default(),
            compute_edges: self.compute_edges,
        }
    }
}

/// Where a color table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorTableSource {
    Path(PathBuf),
    /// Table text already in memory; `name` is used in error messages
    Text { name: String, text: String },
}

impl ColorTableSource {
    fn load<S: RasterSource + ?Sized>(
        &self,
        source: &mut S,
        mode: ColorSelectionMode,
    ) -> Result<ColorBreakpointTable> {
        match self {
            ColorTableSource::Path(path) => ColorBreakpointTable::from_path(path, source, mode),
            ColorTableSource::Text { name, text } => {
                ColorBreakpointTable::parse(text, name, source, mode)
            }
        }
    }
}

// ─── Factory ─────────────────────────────────────────────────────────

/// A validated algorithm configuration.
///
/// Kernel contexts depend on the source resolution and color tables on its
/// nodata and range, so they are built when a source is attached.
#[derive(Debug, Clone)]
pub struct DemProcessing {
    algorithm: DemAlgorithm,
    options: DemOptions,
    color_table: Option<ColorTableSource>,
}

impl DemProcessing {
    pub fn new(
        algorithm: DemAlgorithm,
        options: DemOptions,
        color_table: Option<ColorTableSource>,
    ) -> Result<Self> {
        options.validate(algorithm)?;
        match (algorithm, &color_table) {
            (DemAlgorithm::ColorRelief, None) => {
                return Err(Error::Configuration(
                    "color-relief requires a color configuration file".into(),
                ))
            }
            (other, Some(_)) if other != DemAlgorithm::ColorRelief => {
                return Err(Error::Configuration(format!(
                    "a color configuration file is only valid for color-relief, not {}",
                    other
                )))
            }
            _ => {}
        }
        debug!("{} configured: {:?}", algorithm, options);
        Ok(Self {
            algorithm,
            options,
            color_table,
        })
    }

    pub fn algorithm(&self) -> DemAlgorithm {
        self.algorithm
    }

    pub fn options(&self) -> &DemOptions {
        &self.options
    }

    /// Kernel for a source with geotransform `transform`; `None` for color relief.
    pub fn kernel(&self, transform: &GeoTransform) -> Result<Option<TerrainKernel>> {
        let opts = &self.options;
        let kernel = match self.algorithm {
            DemAlgorithm::Hillshade => {
                TerrainKernel::Hillshade(HillshadeContext::new(&opts.hillshade_params(), transform)?)
            }
            DemAlgorithm::Slope => {
                TerrainKernel::Slope(SlopeContext::new(&opts.slope_params(), transform)?)
            }
            DemAlgorithm::Aspect => TerrainKernel::Aspect(AspectContext::new(&opts.aspect_params())),
            DemAlgorithm::Tri => TerrainKernel::Tri(opts.tri_algorithm.unwrap_or_default()),
            DemAlgorithm::Tpi => TerrainKernel::Tpi,
            DemAlgorithm::Roughness => TerrainKernel::Roughness,
            DemAlgorithm::ColorRelief => return Ok(None),
        };
        debug!("{} kernel: {:?}", self.algorithm, kernel);
        Ok(Some(kernel))
    }

    fn engine<S: RasterSource + ?Sized>(&self, source: &mut S) -> Result<Engine> {
        if let Some(kernel) = self.kernel(&source.geo_transform())? {
            return Ok(Engine::Windowed(WindowedRasterProcessor::new(
                kernel,
                self.options.compute_edges,
            )));
        }
        let mode = self.options.color_mode;
        let table = match &self.color_table {
            Some(colors) => colors.load(source, mode)?,
            None => {
                return Err(Error::Configuration(
                    "color-relief requires a color configuration file".into(),
                ))
            }
        };
        Ok(Engine::ColorRelief(ColorRelief::new(table, mode, self.options.alpha)))
    }

    /// Attach `source` for a push-style run.
    pub fn streaming<S: RasterSource>(&self, mut source: S) -> Result<Operation<S>> {
        let engine = self.engine(&mut source)?;
        Ok(Operation::Streaming { source, engine })
    }

    /// Attach `source` behind lazy band adapters.
    pub fn lazy<S: RasterSource>(&self, mut source: S) -> Result<Operation<S>> {
        let bands = match self.engine(&mut source)? {
            Engine::Windowed(processor) => {
                let edges = processor.compute_edges();
                LazyBands::Windowed(WindowedKernelBand::new(source, processor.into_kernel(), edges))
            }
            Engine::ColorRelief(relief) => LazyBands::ColorRelief(relief.into_dataset(source)),
        };
        Ok(Operation::Lazy(bands))
    }
}

// ─── Operations ──────────────────────────────────────────────────────

/// Push-style producer of an operation.
#[derive(Debug, Clone)]
pub enum Engine {
    Windowed(WindowedRasterProcessor<TerrainKernel>),
    ColorRelief(ColorRelief),
}

impl Engine {
    fn band_count(&self) -> usize {
        match self {
            Engine::Windowed(_) => 1,
            Engine::ColorRelief(relief) => relief.band_count(),
        }
    }

    fn data_type(&self) -> DataType {
        match self {
            Engine::Windowed(p) => p.kernel().output_data_type(),
            Engine::ColorRelief(_) => DataType::Byte,
        }
    }

    fn dst_nodata(&self) -> Option<f64> {
        match self {
            Engine::Windowed(p) => p.kernel().dst_nodata().metadata(),
            Engine::ColorRelief(_) => None,
        }
    }
}

/// Lazily computed output bands.
#[derive(Debug)]
pub enum LazyBands<S> {
    Windowed(WindowedKernelBand<S, TerrainKernel>),
    ColorRelief(ColorReliefDataset<S>),
}

/// A configured algorithm bound to its source.
#[derive(Debug)]
pub enum Operation<S> {
    Streaming { source: S, engine: Engine },
    Lazy(LazyBands<S>),
}

impl<S: RasterSource> Operation<S> {
    pub fn is_lazy(&self) -> bool {
        matches!(self, Operation::Lazy(_))
    }

    pub fn width(&self) -> usize {
        match self {
            Operation::Streaming { source, .. } => source.width(),
            Operation::Lazy(LazyBands::Windowed(band)) => band.width(),
            Operation::Lazy(LazyBands::ColorRelief(ds)) => ds.width(),
        }
    }

    pub fn height(&self) -> usize {
        match self {
            Operation::Streaming { source, .. } => source.height(),
            Operation::Lazy(LazyBands::Windowed(band)) => band.height(),
            Operation::Lazy(LazyBands::ColorRelief(ds)) => ds.height(),
        }
    }

    pub fn geo_transform(&self) -> GeoTransform {
        match self {
            Operation::Streaming { source, .. } => source.geo_transform(),
            Operation::Lazy(LazyBands::Windowed(band)) => band.geo_transform(),
            Operation::Lazy(LazyBands::ColorRelief(ds)) => ds.geo_transform(),
        }
    }

    /// 1 for the windowed products, 3 or 4 for color relief
    pub fn output_band_count(&self) -> usize {
        match self {
            Operation::Streaming { engine, .. } => engine.band_count(),
            Operation::Lazy(LazyBands::Windowed(_)) => 1,
            Operation::Lazy(LazyBands::ColorRelief(ds)) => ds.band_count(),
        }
    }

    pub fn output_data_type(&self) -> DataType {
        match self {
            Operation::Streaming { engine, .. } => engine.data_type(),
            Operation::Lazy(LazyBands::Windowed(band)) => band.data_type(),
            Operation::Lazy(LazyBands::ColorRelief(_)) => DataType::Byte,
        }
    }

    /// Nodata value declared on the output bands
    pub fn dst_nodata(&self) -> Option<f64> {
        match self {
            Operation::Streaming { engine, .. } => engine.dst_nodata(),
            Operation::Lazy(LazyBands::Windowed(band)) => band.dst_nodata().metadata(),
            Operation::Lazy(LazyBands::ColorRelief(_)) => None,
        }
    }

    /// Produce every output row into `sink`.
    ///
    /// Progress runs from 0 to 1, one report per row; a `false` answer
    /// returns [`Error::Cancelled`] with the rows written so far left in
    /// the sink.
    pub fn run(&mut self, sink: &mut dyn RasterSink, progress: &mut dyn ProgressReporter) -> Result<()> {
        match self {
            Operation::Streaming { source, engine } => match engine {
                Engine::Windowed(processor) => processor.run(source, sink, progress),
                Engine::ColorRelief(relief) => relief.run(source, sink, progress),
            },
            Operation::Lazy(LazyBands::Windowed(band)) => {
                if sink.band_count() == 0 {
                    return Err(Error::InvalidBand { band: 1, count: 0 });
                }
                debug!("{}: lazy copy of {}x{}", band.kernel().name(), band.width(), band.height());
                sink.set_nodata(0, band.dst_nodata().metadata())?;
                copy_bands(&mut [band as &mut dyn RasterSource], sink, progress)
            }
            Operation::Lazy(LazyBands::ColorRelief(ds)) => {
                let count = ds.band_count();
                if sink.band_count() < count {
                    return Err(Error::InvalidBand {
                        band: count,
                        count: sink.band_count(),
                    });
                }
                debug!("color relief: lazy copy of {} band(s), lut: {}", count, ds.has_lut());
                for b in 0..count {
                    sink.set_nodata(b, None)?;
                }
                let mut bands = ds.bands();
                let mut refs: Vec<&mut dyn RasterSource> =
                    bands.iter_mut().map(|b| b as &mut dyn RasterSource).collect();
                copy_bands(&mut refs, sink, progress)
            }
        }
    }

    /// Give the source back.
    pub fn into_source(self) -> S {
        match self {
            Operation::Streaming { source, .. } => source,
            Operation::Lazy(LazyBands::Windowed(band)) => band.into_source(),
            Operation::Lazy(LazyBands::ColorRelief(ds)) => ds.into_source(),
        }
    }
}
