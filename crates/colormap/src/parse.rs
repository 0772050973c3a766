//! Text color-table reader.
//!
//! Two dialects are accepted. The plain one has one breakpoint per line:
//!
//! ```text
//! # elevation  R   G   B  [A]
//! 3500         white
//! 2500         235 220 175
//! 50%          190 185 135
//! 0            0   0   255  0
//! nv           0   0   0    0
//! ```
//!
//! A `# COLOR_MODEL = RGB` header switches to the GMT CPT dialect, where each
//! line holds two breakpoints (`v1 r1 g1 b1 v2 r2 g2 b2`) and `B`/`F`/`N`
//! control lines carry four tokens.
//!
//! Fields are separated by spaces, tabs, commas or colons.

use crate::color::{named_color, Rgba};
use crate::table::{ColorBreakpoint, ColorBreakpointTable, ColorSelectionMode};
use demkit_core::io::{resolve_min_max, RasterSource};
use demkit_core::{Error, Result};
use std::path::Path;
use tracing::{debug, warn};

const SEPARATORS: &[char] = &[' ', ',', '\t', ':'];

/// Per-line parser state.
struct LineParser<'a, F> {
    origin: &'a str,
    nodata: Option<f64>,
    range: F,
    resolved_range: Option<(f64, f64)>,
    gmt: bool,
}

impl<'a, F> LineParser<'a, F>
where
    F: FnMut() -> Result<Option<(f64, f64)>>,
{
    fn error(&self, line: usize, reason: impl Into<String>) -> Error {
        Error::color_table(self.origin, Some(line), reason)
    }

    fn number(&self, line: usize, token: &str) -> Result<f64> {
        token
            .parse::<f64>()
            .map_err(|_| self.error(line, format!("Invalid numeric value : {}", token)))
    }

    fn component(&self, line: usize, token: &str) -> Result<u8> {
        let v: i64 = token
            .parse()
            .map_err(|_| self.error(line, format!("Invalid color component : {}", token)))?;
        u8::try_from(v).map_err(|_| self.error(line, format!("Color component out of range : {}", token)))
    }

    fn rgb(&self, line: usize, tokens: &[&str], alpha: u8) -> Result<Rgba> {
        Ok(Rgba::new(
            self.component(line, tokens[0])?,
            self.component(line, tokens[1])?,
            self.component(line, tokens[2])?,
            alpha,
        ))
    }

    fn min_max(&mut self, line: usize) -> Result<(f64, f64)> {
        if let Some(known) = self.resolved_range {
            return Ok(known);
        }
        let range = (self.range)()?.ok_or_else(|| {
            self.error(line, "Cannot resolve a percentage: the source has no valid samples")
        })?;
        self.resolved_range = Some(range);
        Ok(range)
    }

    /// Breakpoint value of a plain-dialect line; `None` skips the line.
    fn value(&mut self, line: usize, token: &str) -> Result<Option<f64>> {
        if token.eq_ignore_ascii_case("nv") {
            if self.nodata.is_none() {
                warn!("{}:{}: 'nv' entry ignored, source has no nodata value", self.origin, line);
            }
            return Ok(self.nodata);
        }

        if let Some(pct) = token.strip_suffix('%').filter(|_| token.len() > 1) {
            let fraction = self.number(line, pct)? / 100.0;
            if !(0.0..=1.0).contains(&fraction) {
                return Err(self.error(line, format!("Wrong value for a percentage : {}", token)));
            }
            let (min, max) = self.min_max(line)?;
            return Ok(Some(min + fraction * (max - min)));
        }

        self.number(line, token).map(Some)
    }

    fn parse_line(&mut self, line: usize, text: &str, out: &mut Vec<ColorBreakpoint>) -> Result<()> {
        if text.starts_with('#') && text.contains("COLOR_MODEL") {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            if !compact.contains("COLOR_MODEL=RGB") {
                return Err(self.error(line, "Only COLOR_MODEL = RGB is supported"));
            }
            debug!("{}: GMT color palette", self.origin);
            self.gmt = true;
            return Ok(());
        }

        let tokens: Vec<&str> = text.split(SEPARATORS).filter(|t| !t.is_empty()).collect();
        match tokens.first() {
            None => return Ok(()),
            Some(first) if first.starts_with('#') || first.starts_with('/') => return Ok(()),
            Some(_) => {}
        }

        if self.gmt {
            return self.parse_gmt_line(line, &tokens, out);
        }

        if tokens.len() < 2 {
            return Err(self.error(line, format!("Missing color for value : {}", tokens[0])));
        }
        let Some(value) = self.value(line, tokens[0])? else {
            return Ok(());
        };

        let color = if tokens.len() >= 4 {
            let alpha = match tokens.get(4) {
                Some(a) => self.component(line, a)?,
                None => 255,
            };
            self.rgb(line, &tokens[1..4], alpha)?
        } else {
            let named = named_color(tokens[1])
                .ok_or_else(|| self.error(line, format!("Unknown color : {}", tokens[1])))?;
            match tokens.get(2) {
                Some(a) => Rgba { a: self.component(line, a)?, ..named },
                None => named,
            }
        };

        out.push(ColorBreakpoint::new(value, color));
        Ok(())
    }

    fn parse_gmt_line(&mut self, line: usize, tokens: &[&str], out: &mut Vec<ColorBreakpoint>) -> Result<()> {
        match tokens.len() {
            8 => {
                for half in tokens.chunks(4) {
                    let value = self.number(line, half[0])?;
                    out.push(ColorBreakpoint::new(value, self.rgb(line, &half[1..], 255)?));
                }
            }
            4 if tokens[0].eq_ignore_ascii_case("N") => match self.nodata {
                Some(nodata) => out.push(ColorBreakpoint::new(nodata, self.rgb(line, &tokens[1..], 255)?)),
                None => warn!("{}:{}: nodata entry ignored, source has no nodata value", self.origin, line),
            },
            4 => debug!("{}:{}: '{}' control line ignored", self.origin, line, tokens[0]),
            n => warn!("{}:{}: skipping line with {} fields", self.origin, line, n),
        }
        Ok(())
    }
}

/// Parse color-table text into unsorted breakpoints.
///
/// `origin` names the table in error messages. `range` supplies the source
/// min/max and is only called, at most once, when a percentage appears.
pub fn parse_breakpoints<F>(
    text: &str,
    origin: &str,
    nodata: Option<f64>,
    range: F,
) -> Result<Vec<ColorBreakpoint>>
where
    F: FnMut() -> Result<Option<(f64, f64)>>,
{
    let mut parser = LineParser {
        origin,
        nodata,
        range,
        resolved_range: None,
        gmt: false,
    };

    let mut breakpoints = Vec::new();
    for (i, line) in text.lines().enumerate() {
        parser.parse_line(i + 1, line.trim(), &mut breakpoints)?;
    }
    Ok(breakpoints)
}

impl ColorBreakpointTable {
    /// Parse a color table against `source`, which provides the nodata value
    /// for `nv` entries and the min/max for percentages.
    pub fn parse<S: RasterSource + ?Sized>(
        text: &str,
        origin: &str,
        source: &mut S,
        mode: ColorSelectionMode,
    ) -> Result<Self> {
        let nodata = source.nodata_value();
        let breakpoints = parse_breakpoints(text, origin, nodata, || resolve_min_max(&mut *source))?;
        Self::build(breakpoints, nodata, mode, origin)
    }

    /// Read and parse a color table file.
    pub fn from_path<S: RasterSource + ?Sized>(
        path: impl AsRef<Path>,
        source: &mut S,
        mode: ColorSelectionMode,
    ) -> Result<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::color_table(&origin, None, format!("Cannot find {}", origin)),
            _ => Error::color_table(&origin, None, format!("Cannot read {}: {}", origin, e)),
        })?;
        Self::parse(&text, &origin, source, mode)
    }
}
