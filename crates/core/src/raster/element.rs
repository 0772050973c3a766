//! Raster element trait for generic cell values

use super::DataType;
use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Every element type maps to exactly one [`DataType`], which is what a
/// `Raster<T>` reports when used as a raster source.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Storage type reported for rasters of this element
    const DATA_TYPE: DataType;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert from f64, saturating at the type range and rounding to
    /// nearest for integer types
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_raster_element_int {
    ($t:ty, $dt:expr) => {
        impl RasterElement for $t {
            const DATA_TYPE: DataType = $dt;

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata.map_or(false, |nd| *self == nd)
            }

            fn from_f64(value: f64) -> Self {
                // `as` saturates and maps NaN to zero
                (value + 0.5).floor() as $t
            }
        }
    };
}

macro_rules! impl_raster_element_float {
    ($t:ty, $dt:expr) => {
        impl RasterElement for $t {
            const DATA_TYPE: DataType = $dt;

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                match nodata {
                    Some(nd) if nd.is_nan() => self.is_nan(),
                    Some(nd) => *self == nd,
                    None => false,
                }
            }

            fn from_f64(value: f64) -> Self {
                value as $t
            }
        }
    };
}

impl_raster_element_int!(u8, DataType::Byte);
impl_raster_element_int!(i8, DataType::Int8);
impl_raster_element_int!(i16, DataType::Int16);
impl_raster_element_int!(u16, DataType::UInt16);
impl_raster_element_int!(i32, DataType::Int32);
impl_raster_element_int!(u32, DataType::UInt32);
impl_raster_element_float!(f32, DataType::Float32);
impl_raster_element_float!(f64, DataType::Float64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_mapping() {
        assert_eq!(<u8 as RasterElement>::DATA_TYPE, DataType::Byte);
        assert_eq!(<i16 as RasterElement>::DATA_TYPE, DataType::Int16);
        assert_eq!(<f32 as RasterElement>::DATA_TYPE, DataType::Float32);
    }

    #[test]
    fn nan_nodata_matches_nan_only() {
        assert!(f32::NAN.is_nodata(Some(f32::NAN)));
        assert!(!1.0f32.is_nodata(Some(f32::NAN)));
        assert!(!f64::NAN.is_nodata(None));
    }

    #[test]
    fn from_f64_saturates() {
        assert_eq!(<u8 as RasterElement>::from_f64(300.0), 255);
        assert_eq!(<u8 as RasterElement>::from_f64(180.6), 181);
        assert_eq!(<i16 as RasterElement>::from_f64(-40000.0), i16::MIN);
    }
}
