//! # demkit Colormap
//!
//! Color-relief classification for demkit.
//!
//! A [`ColorBreakpointTable`] maps scalar samples to RGBA through sorted
//! breakpoints with one of three [`ColorSelectionMode`]s. Tables are read
//! from gdaldem-style text files (plain or GMT CPT), can be expanded into a
//! [`PrecomputedColorLut`] for Byte and 16-bit sources, and drive either the
//! streaming [`ColorRelief::run`] or the lazy [`ColorReliefDataset`].
//!
//! ## Usage
//!
//! ```ignore
//! use demkit_colormap::{ColorBreakpointTable, ColorRelief, ColorSelectionMode};
//!
//! let mode = ColorSelectionMode::Interpolate;
//! let table = ColorBreakpointTable::from_path("ramp.txt", &mut dem, mode)?;
//! ColorRelief::new(table, mode, true).run(&mut dem, &mut sink, &mut NoProgress)?;
//! ```

mod color;
mod lut;
mod parse;
mod relief;
mod table;

pub use color::{color_names, named_color, Rgba};
pub use lut::PrecomputedColorLut;
pub use parse::parse_breakpoints;
pub use relief::{ColorRelief, ColorReliefBand, ColorReliefDataset};
pub use table::{ColorBreakpoint, ColorBreakpointTable, ColorSelectionMode};
