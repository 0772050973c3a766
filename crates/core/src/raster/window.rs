//! 3x3 neighborhood window and edge synthesis
//!
//! Samples are indexed row-major:
//!
//! ```text
//! 0 1 2
//! 3 4 5
//! 6 7 8
//! ```
//!
//! Index 4 is always the pixel being computed, row 0..2 is the northern
//! row for north-up rasters.

use super::nodata::{is_nodata, SourceNoData};
use std::ops::Index;

/// Linear extrapolation `2a - b` of the sample beyond `a`, away from `b`.
///
/// Returns the nodata value when either operand is nodata. A result that
/// collides with nodata is nudged off it, except for a floating-point
/// nodata of 0, which a relative nudge cannot move.
#[inline]
pub fn extrapolate(a: f64, b: f64, nodata: Option<&SourceNoData>) -> f64 {
    match nodata {
        Some(nd) if nd.matches(a) || nd.matches(b) => nd.value(),
        Some(nd) => nd.avoid(2.0 * a - b),
        None => 2.0 * a - b,
    }
}

/// Synthesize a virtual row beyond `edge`, extrapolated away from `inner`.
///
/// Used for the row above row 0 (edge = row 0, inner = row 1) and the row
/// below the last row.
pub fn extrapolate_row(edge: &[f64], inner: &[f64], nodata: Option<&SourceNoData>, out: &mut [f64]) {
    for ((o, &a), &b) in out.iter_mut().zip(edge).zip(inner) {
        *o = extrapolate(a, b, nodata);
    }
}

/// A 3x3 sample around one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborhoodWindow {
    values: [f64; 9],
}

impl NeighborhoodWindow {
    /// Index of the center sample
    pub const CENTER: usize = 4;

    pub fn new(values: [f64; 9]) -> Self {
        Self { values }
    }

    /// Window with all nine samples equal
    pub fn flat(value: f64) -> Self {
        Self { values: [value; 9] }
    }

    /// Assemble the window centered on `col` from three row buffers.
    ///
    /// Columns 0 and `width - 1` get their missing outer column by
    /// horizontal extrapolation of each row.
    ///
    /// # Panics
    /// Panics if the rows are shorter than 2 samples or `col` is out of range.
    pub fn assemble(rows: [&[f64]; 3], col: usize, nodata: Option<&SourceNoData>) -> Self {
        let width = rows[1].len();
        let mut values = [0.0; 9];
        for (r, line) in rows.iter().enumerate() {
            let (left, right) = if col == 0 {
                (extrapolate(line[0], line[1], nodata), line[1])
            } else if col == width - 1 {
                (line[col - 1], extrapolate(line[col], line[col - 1], nodata))
            } else {
                (line[col - 1], line[col + 1])
            };
            values[r * 3] = left;
            values[r * 3 + 1] = line[col];
            values[r * 3 + 2] = right;
        }
        Self { values }
    }

    /// Index of the sample diametrically opposite `k` through the center
    #[inline]
    pub const fn opposite(k: usize) -> usize {
        8 - k
    }

    pub fn values(&self) -> &[f64; 9] {
        &self.values
    }

    #[inline]
    pub fn center(&self) -> f64 {
        self.values[Self::CENTER]
    }

    /// The 8 samples around the center
    pub fn neighbors(&self) -> impl Iterator<Item = f64> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != Self::CENTER)
            .map(|(_, &v)| v)
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Whether any of the nine samples is nodata
    pub fn has_nodata(&self, nodata: Option<&SourceNoData>) -> bool {
        nodata.is_some() && self.values.iter().any(|&v| is_nodata(nodata, v))
    }

    /// Replace nodata neighbors by extrapolating through the center.
    ///
    /// Neighbor `k` becomes `2 * center - w[opposite(k)]`; when the opposite
    /// sample is nodata as well, it takes the center value. The center must
    /// not be nodata.
    pub fn fill_missing(&mut self, nodata: &SourceNoData) {
        let original = self.values;
        let center = original[Self::CENTER];
        for k in 0..9 {
            if k == Self::CENTER || !nodata.matches(original[k]) {
                continue;
            }
            let opposite = original[Self::opposite(k)];
            self.values[k] = if nodata.matches(opposite) {
                center
            } else {
                nodata.avoid(2.0 * center - opposite)
            };
        }
    }
}

impl Index<usize> for NeighborhoodWindow {
    type Output = f64;

    #[inline]
    fn index(&self, k: usize) -> &f64 {
        &self.values[k]
    }
}

impl From<[f64; 9]> for NeighborhoodWindow {
    fn from(values: [f64; 9]) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::DataType;

    #[test]
    fn assemble_interior() {
        let above = [1.0, 2.0, 3.0];
        let center = [4.0, 5.0, 6.0];
        let below = [7.0, 8.0, 9.0];
        let w = NeighborhoodWindow::assemble([&above, &center, &below], 1, None);
        assert_eq!(w.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(w.center(), 5.0);
    }

    #[test]
    fn assemble_left_and_right_edges_extrapolate() {
        let line = [10.0, 12.0, 15.0];
        let w = NeighborhoodWindow::assemble([&line, &line, &line], 0, None);
        assert_eq!(w[3], 8.0);
        assert_eq!(w[5], 12.0);

        let w = NeighborhoodWindow::assemble([&line, &line, &line], 2, None);
        assert_eq!(w[3], 12.0);
        assert_eq!(w[5], 18.0);
    }

    #[test]
    fn extrapolate_propagates_nodata() {
        let nd = SourceNoData::new(-1.0, DataType::Float32);
        assert_eq!(extrapolate(-1.0, 3.0, Some(&nd)), -1.0);
        assert_eq!(extrapolate(3.0, -1.0, Some(&nd)), -1.0);
        assert_eq!(extrapolate(3.0, 2.0, Some(&nd)), 4.0);
    }

    #[test]
    fn extrapolate_onto_zero_nodata() {
        // 2 * 1 - 2 lands on a float nodata of 0 and stays there
        let nd = SourceNoData::new(0.0, DataType::Float32);
        assert_eq!(extrapolate(1.0, 2.0, Some(&nd)), 0.0);
        let int_nd = SourceNoData::new(0.0, DataType::Int16);
        assert_eq!(extrapolate(1.0, 2.0, Some(&int_nd)), 1.0);
    }

    #[test]
    fn extrapolated_row() {
        let edge = [5.0, 5.0];
        let inner = [4.0, 6.0];
        let mut out = [0.0; 2];
        extrapolate_row(&edge, &inner, None, &mut out);
        assert_eq!(out, [6.0, 4.0]);
    }

    #[test]
    fn fill_missing_through_center() {
        let nd = SourceNoData::new(-9999.0, DataType::Float32);
        let mut w = NeighborhoodWindow::new([
            -9999.0, 2.0, 3.0, //
            4.0, 5.0, 6.0, //
            7.0, 8.0, 9.0,
        ]);
        w.fill_missing(&nd);
        assert_eq!(w[0], 1.0);
        assert!(!w.has_nodata(Some(&nd)));
    }

    #[test]
    fn fill_missing_both_sides_uses_center() {
        let nd = SourceNoData::new(0.0, DataType::Int16);
        let mut w = NeighborhoodWindow::new([0.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 0.0]);
        w.fill_missing(&nd);
        assert_eq!(w[0], 5.0);
        assert_eq!(w[8], 5.0);
    }

    #[test]
    fn min_max_neighbors() {
        let w = NeighborhoodWindow::new([3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0, 5.0]);
        assert_eq!(w.min(), 1.0);
        assert_eq!(w.max(), 9.0);
        assert_eq!(w.neighbors().count(), 8);
        assert_eq!(w.neighbors().sum::<f64>(), 31.0);
    }
}
