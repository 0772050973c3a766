//! Raster data structures and the 3x3 window

mod data_type;
mod element;
mod geotransform;
mod grid;
mod nodata;
mod window;

pub use data_type::DataType;
pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use nodata::{are_real_equal, is_nodata, DestNoData, SourceNoData};
pub use window::{extrapolate, extrapolate_row, NeighborhoodWindow};
