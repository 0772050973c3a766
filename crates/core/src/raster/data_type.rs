//! Pixel data types of raster sources and sinks

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage type of a raster band.
///
/// Sources report it so the color relief engine can decide whether a dense
/// lookup table pays off; sinks use it to convert computed values on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Byte,
    Int8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl DataType {
    /// GDAL-style name (`Byte`, `Int16`, `Float32`, ...)
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Byte => "Byte",
            DataType::Int8 => "Int8",
            DataType::Int16 => "Int16",
            DataType::UInt16 => "UInt16",
            DataType::Int32 => "Int32",
            DataType::UInt32 => "UInt32",
            DataType::Float32 => "Float32",
            DataType::Float64 => "Float64",
        }
    }

    /// Whether values of this type are integers
    pub fn is_integer(&self) -> bool {
        !matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Inclusive value range for integer types, `None` for floats
    pub fn integer_range(&self) -> Option<(f64, f64)> {
        match self {
            DataType::Byte => Some((0.0, 255.0)),
            DataType::Int8 => Some((i8::MIN as f64, i8::MAX as f64)),
            DataType::Int16 => Some((i16::MIN as f64, i16::MAX as f64)),
            DataType::UInt16 => Some((0.0, u16::MAX as f64)),
            DataType::Int32 => Some((i32::MIN as f64, i32::MAX as f64)),
            DataType::UInt32 => Some((0.0, u32::MAX as f64)),
            DataType::Float32 | DataType::Float64 => None,
        }
    }

    /// Convert a computed value to what a band of this type would store.
    ///
    /// Integer types round half up and saturate at the type range, Float32
    /// drops precision through an `f32` cast, Float64 is unchanged. NaN maps
    /// to 0 for integer types.
    pub fn quantize(&self, value: f64) -> f64 {
        match self.integer_range() {
            Some((lo, hi)) => {
                if value.is_nan() {
                    return 0.0;
                }
                (value + 0.5).floor().clamp(lo, hi)
            }
            None => match self {
                DataType::Float32 => value as f32 as f64,
                _ => value,
            },
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
