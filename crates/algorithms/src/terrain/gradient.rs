//! Finite-difference gradient estimators shared by the slope, aspect and
//! hillshade kernels.
//!
//! Horn (1981) weights the 8 neighbors; Zevenbergen & Thorne (1987) uses
//! only the 4-neighbor cross. Both return the raw difference sums, leaving
//! resolution and z scaling to the caller.

use demkit_core::NeighborhoodWindow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gradient estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GradientAlgorithm {
    /// Horn (1981), 8-neighbor weighted differences
    #[default]
    Horn,
    /// Zevenbergen & Thorne (1987), 4-neighbor cross
    ZevenbergenThorne,
}

impl GradientAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            GradientAlgorithm::Horn => "Horn",
            GradientAlgorithm::ZevenbergenThorne => "ZevenbergenThorne",
        }
    }

    /// Weight sum the raw differences must be divided by (8 or 2)
    pub fn divisor(&self) -> f64 {
        match self {
            GradientAlgorithm::Horn => 8.0,
            GradientAlgorithm::ZevenbergenThorne => 2.0,
        }
    }

    /// West-minus-east and south-minus-north sums, scaled by the inverse
    /// resolutions.
    ///
    /// For a north-up raster `inv_nsres` is negative, so the y term points
    /// north.
    #[inline]
    pub fn scaled(&self, w: &NeighborhoodWindow, inv_ewres: f64, inv_nsres: f64) -> (f64, f64) {
        match self {
            GradientAlgorithm::Horn => (
                ((w[0] + w[3] + w[3] + w[6]) - (w[2] + w[5] + w[5] + w[8])) * inv_ewres,
                ((w[6] + w[7] + w[7] + w[8]) - (w[0] + w[1] + w[1] + w[2])) * inv_nsres,
            ),
            GradientAlgorithm::ZevenbergenThorne => {
                ((w[3] - w[5]) * inv_ewres, (w[7] - w[1]) * inv_nsres)
            }
        }
    }

    /// Unscaled east-minus-west and south-minus-north sums
    #[inline]
    pub fn deltas(&self, w: &NeighborhoodWindow) -> (f64, f64) {
        match self {
            GradientAlgorithm::Horn => (
                (w[2] + w[5] + w[5] + w[8]) - (w[0] + w[3] + w[3] + w[6]),
                (w[6] + w[7] + w[7] + w[8]) - (w[0] + w[1] + w[1] + w[2]),
            ),
            GradientAlgorithm::ZevenbergenThorne => (w[5] - w[3], w[7] - w[1]),
        }
    }
}

impl fmt::Display for GradientAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GradientAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "horn" => Ok(GradientAlgorithm::Horn),
            "zevenbergenthorne" | "zevenbergen-thorne" | "zt" => {
                Ok(GradientAlgorithm::ZevenbergenThorne)
            }
            _ => Err(format!("unknown gradient algorithm '{}' (expected Horn or ZevenbergenThorne)", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane() -> NeighborhoodWindow {
        // z = 2x - 3y (x east, y south in pixel steps)
        let mut v = [0.0; 9];
        for r in 0..3 {
            for c in 0..3 {
                v[r * 3 + c] = 2.0 * c as f64 - 3.0 * r as f64;
            }
        }
        NeighborhoodWindow::new(v)
    }

    #[test]
    fn horn_deltas_on_plane() {
        let (dx, dy) = GradientAlgorithm::Horn.deltas(&plane());
        assert_eq!(dx, 16.0);
        assert_eq!(dy, -24.0);
    }

    #[test]
    fn zt_deltas_on_plane() {
        let (dx, dy) = GradientAlgorithm::ZevenbergenThorne.deltas(&plane());
        assert_eq!(dx, 4.0);
        assert_eq!(dy, -6.0);
    }

    #[test]
    fn scaled_is_negated_x() {
        let w = plane();
        for alg in [GradientAlgorithm::Horn, GradientAlgorithm::ZevenbergenThorne] {
            let (x, y) = alg.scaled(&w, 1.0, 1.0);
            let (dx, dy) = alg.deltas(&w);
            assert_eq!(x, -dx);
            assert_eq!(y, dy);
            assert_eq!(x / alg.divisor(), -2.0);
        }
    }

    #[test]
    fn parse_names() {
        assert_eq!("horn".parse::<GradientAlgorithm>().unwrap(), GradientAlgorithm::Horn);
        assert_eq!(
            "ZevenbergenThorne".parse::<GradientAlgorithm>().unwrap(),
            GradientAlgorithm::ZevenbergenThorne
        );
        assert!("sobel".parse::<GradientAlgorithm>().is_err());
    }
}
