//! Sorted value→color breakpoint table and its three query policies.

use crate::color::Rgba;
use demkit_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// How a sample between two breakpoints is colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorSelectionMode {
    /// Linear blend of the two bracketing colors
    #[default]
    Interpolate,
    /// Only exact breakpoint values are colored, everything else is unmatched
    Exact,
    /// Color of the closest breakpoint
    Nearest,
}

impl ColorSelectionMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Interpolate => "interpolate",
            Self::Exact => "exact",
            Self::Nearest => "nearest",
        }
    }
}

/// A (value, color) anchor. `value` may be NaN, which only ever matches NaN samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorBreakpoint {
    pub value: f64,
    pub color: Rgba,
}

impl ColorBreakpoint {
    pub const fn new(value: f64, color: Rgba) -> Self {
        Self { value, color }
    }
}

/// NaN sorts first, everything else ascending. Equal values keep their order.
fn compare_values(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn sort_breakpoints(entries: &mut [ColorBreakpoint]) {
    entries.sort_by(|a, b| compare_values(a.value, b.value));
}

/// Smallest f64 greater than `v`.
fn next_up(v: f64) -> f64 {
    if v.is_nan() || v == f64::INFINITY {
        return v;
    }
    if v == 0.0 {
        return f64::from_bits(1);
    }
    let bits = v.to_bits();
    f64::from_bits(if v > 0.0 { bits + 1 } else { bits - 1 })
}

/// Largest f64 smaller than `v`.
fn next_down(v: f64) -> f64 {
    -next_up(-v)
}

#[inline]
fn blend(c0: u8, c1: u8, ratio: f64) -> u8 {
    let v = (0.5 + c0 as f64 + ratio * (c1 as f64 - c0 as f64)) as i32;
    v.clamp(0, 255) as u8
}

/// Value→RGBA classification table.
///
/// Breakpoints are kept sorted ascending, with a NaN breakpoint (if any) in
/// first position. The table is immutable once built and can be shared by
/// any number of readers.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorBreakpointTable {
    breakpoints: Vec<ColorBreakpoint>,
}

impl ColorBreakpointTable {
    /// Build a table from unsorted breakpoints.
    ///
    /// `nodata` is the source nodata value. Unless `mode` is
    /// [`ColorSelectionMode::Exact`], a nodata breakpoint is fenced off from
    /// its neighbors and runs of equal values are spread apart so the table
    /// is strictly ordered.
    pub fn from_breakpoints(
        breakpoints: Vec<ColorBreakpoint>,
        nodata: Option<f64>,
        mode: ColorSelectionMode,
    ) -> Result<Self> {
        Self::build(breakpoints, nodata, mode, "<memory>")
    }

    pub(crate) fn build(
        mut breakpoints: Vec<ColorBreakpoint>,
        nodata: Option<f64>,
        mode: ColorSelectionMode,
        origin: &str,
    ) -> Result<Self> {
        if breakpoints.is_empty() {
            return Err(Error::color_table(
                origin,
                None,
                format!("No color association found in {}", origin),
            ));
        }

        sort_breakpoints(&mut breakpoints);
        if mode != ColorSelectionMode::Exact {
            Self::process(&mut breakpoints, nodata);
        }
        debug!(
            "color table {}: {} breakpoint(s), {} mode",
            origin,
            breakpoints.len(),
            mode.name()
        );

        Ok(Self { breakpoints })
    }

    fn process(entries: &mut Vec<ColorBreakpoint>, nodata: Option<f64>) {
        let nodata = nodata.filter(|v| !v.is_nan());
        let mut added = Vec::new();
        let mut repeated = 0usize;

        for i in 1..entries.len() {
            let prev = entries[i - 1].value;
            let cur = entries[i].value;

            if nodata == Some(cur) {
                let below = next_down(cur);
                if below > prev {
                    added.push(ColorBreakpoint::new(below, entries[i - 1].color));
                }
            } else if nodata == Some(prev) {
                let above = next_up(prev);
                if above < cur {
                    added.push(ColorBreakpoint::new(above, entries[i].color));
                }
            } else if repeated == 0 && cur == prev {
                // second entry of a run of equal values
                repeated = i;
            } else if repeated != 0 && cur != prev {
                let (total, left) = if repeated >= 2 {
                    let lower = entries[repeated - 2].value;
                    (cur - lower, prev - lower)
                } else {
                    (cur - prev, 0.0)
                };

                let count = (i - repeated + 1) as f64;
                let step = prev.abs() * f64::EPSILON;
                if total > step * count {
                    let mut multiplier = 0.5 - count * left / total;
                    for entry in &mut entries[repeated - 1..i] {
                        entry.value += step * multiplier;
                        multiplier += 1.0;
                    }
                }
                repeated = 0;
            }
        }

        if !added.is_empty() {
            debug!("isolated nodata breakpoint with {} extra entr(ies)", added.len());
            entries.extend(added);
            sort_breakpoints(entries);
        }
    }

    pub fn breakpoints(&self) -> &[ColorBreakpoint] {
        &self.breakpoints
    }

    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// Color of `value`, or `None` when no breakpoint matches.
    ///
    /// NaN matches only a NaN breakpoint. Outside the table range the end
    /// colors are used, except in exact mode.
    pub fn query(&self, value: f64, mode: ColorSelectionMode) -> Option<Rgba> {
        let first = self.breakpoints.first()?;
        let ordered = if first.value.is_nan() {
            if value.is_nan() {
                return Some(first.color);
            }
            &self.breakpoints[1..]
        } else {
            &self.breakpoints[..]
        };
        if value.is_nan() || ordered.is_empty() {
            return None;
        }

        let exact = mode == ColorSelectionMode::Exact;
        let i = ordered.partition_point(|b| b.value < value);

        if i == 0 || i == ordered.len() {
            let end = if i == 0 { ordered[0] } else { ordered[i - 1] };
            return (!exact || end.value == value).then_some(end.color);
        }

        let (lo, hi) = (ordered[i - 1], ordered[i]);
        if lo.value == value {
            return Some(lo.color);
        }
        if hi.value == value {
            return Some(hi.color);
        }

        match mode {
            ColorSelectionMode::Exact => None,
            ColorSelectionMode::Nearest => {
                if value - lo.value < hi.value - value {
                    Some(lo.color)
                } else {
                    Some(hi.color)
                }
            }
            ColorSelectionMode::Interpolate => {
                let ratio = (value - lo.value) / (hi.value - lo.value);
                Some(Rgba::new(
                    blend(lo.color.r, hi.color.r, ratio),
                    blend(lo.color.g, hi.color.g, ratio),
                    blend(lo.color.b, hi.color.b, ratio),
                    blend(lo.color.a, hi.color.a, ratio),
                ))
            }
        }
    }

    /// Like [`query`](Self::query), with unmatched samples as transparent black.
    #[inline]
    pub fn color(&self, value: f64, mode: ColorSelectionMode) -> Rgba {
        self.query(value, mode).unwrap_or(Rgba::TRANSPARENT)
    }
}
