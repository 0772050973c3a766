//! Source and destination no-data descriptions

use super::DataType;

/// Near-equality used for nodata matching on float samples.
///
/// Exact equality, or a relative difference below 1e-10.
pub fn are_real_equal(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() < 1e-10 * (a.abs() + b.abs())
}

/// No-data declared by a raster source.
///
/// Absence of nodata is expressed as `Option<SourceNoData>::None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceNoData {
    value: f64,
    integer_domain: bool,
}

impl SourceNoData {
    /// Nodata `value` for a source whose samples are of `data_type`
    pub fn new(value: f64, data_type: DataType) -> Self {
        Self {
            value,
            integer_domain: data_type.is_integer(),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_nan(&self) -> bool {
        self.value.is_nan()
    }

    /// Whether `sample` is the nodata value
    #[inline]
    pub fn matches(&self, sample: f64) -> bool {
        if self.value.is_nan() {
            sample.is_nan()
        } else if self.integer_domain {
            sample == self.value
        } else {
            are_real_equal(sample, self.value)
        }
    }

    /// Move an extrapolated value off the nodata value.
    ///
    /// Integer domains step by one. Float domains scale by `1 + 3ε`, which
    /// leaves a nodata of exactly 0 in place.
    pub(crate) fn avoid(&self, value: f64) -> f64 {
        if !self.matches(value) {
            return value;
        }
        if self.integer_domain {
            value + 1.0
        } else {
            self.value * (1.0 + 3.0 * f32::EPSILON as f64)
        }
    }
}

/// Optional-nodata check in one call.
#[inline]
pub fn is_nodata(nodata: Option<&SourceNoData>, sample: f64) -> bool {
    nodata.map_or(false, |nd| nd.matches(sample))
}

/// Value emitted for pixels that have no computed result.
///
/// `declared` tells whether the value is also written as the destination
/// band's nodata. Aspect with zero-for-flat emits 0 without declaring it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestNoData {
    pub value: f64,
    pub declared: bool,
}

impl DestNoData {
    pub const fn declared(value: f64) -> Self {
        Self { value, declared: true }
    }

    pub const fn undeclared(value: f64) -> Self {
        Self { value, declared: false }
    }

    /// Nodata metadata to push to the sink
    pub fn metadata(&self) -> Option<f64> {
        self.declared.then_some(self.value)
    }
}
