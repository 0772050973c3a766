//! Dense color lookup for small integer domains.

use crate::color::Rgba;
use crate::table::{ColorBreakpointTable, ColorSelectionMode};
use demkit_core::DataType;
use tracing::debug;

/// Pixel count above which a 16-bit table pays for itself.
const SIXTEEN_BIT_THRESHOLD: usize = 65536;

/// Precomputed RGBA for every value of a Byte or 16-bit integer domain.
///
/// Entry `i` holds the table's color for `i - offset`; the offset is 32768
/// for Int16 sources and 0 otherwise.
#[derive(Debug, Clone)]
pub struct PrecomputedColorLut {
    entries: Vec<Rgba>,
    offset: i64,
}

impl PrecomputedColorLut {
    /// Whether a source of this type and size gets a lookup table.
    pub fn applies_to(data_type: DataType, width: usize, height: usize) -> bool {
        match data_type {
            DataType::Byte => true,
            DataType::Int16 | DataType::UInt16 => width.saturating_mul(height) > SIXTEEN_BIT_THRESHOLD,
            _ => false,
        }
    }

    /// Build the table, or `None` when the source does not qualify.
    pub fn build(
        table: &ColorBreakpointTable,
        mode: ColorSelectionMode,
        data_type: DataType,
        width: usize,
        height: usize,
    ) -> Option<Self> {
        if !Self::applies_to(data_type, width, height) {
            return None;
        }

        let (size, offset) = match data_type {
            DataType::Byte => (256, 0),
            DataType::Int16 => (65536, 32768),
            _ => (65536, 0),
        };
        let entries = (0..size as i64).map(|i| table.color((i - offset) as f64, mode)).collect();
        debug!("precomputed {} color entries for {} source", size, data_type);

        Some(Self { entries, offset })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Color of an integral sample, `None` when it falls outside the domain.
    #[inline]
    pub fn get(&self, sample: f64) -> Option<Rgba> {
        if sample.fract() != 0.0 {
            return None;
        }
        let index = (sample as i64).checked_add(self.offset)?;
        usize::try_from(index).ok().and_then(|i| self.entries.get(i)).copied()
    }
}
