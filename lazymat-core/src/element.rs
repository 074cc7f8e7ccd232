//! Element type constraints for stored values
//!
//! Values are always floating point: missing entries are NaN. `Pod` lets
//! mapped bytes be viewed as typed slices without copying.

use crate::format::DataType;

/// Trait for types that can be stored as dataset values
pub trait Element:
    Copy + PartialEq + PartialOrd + Default + core::fmt::Debug + bytemuck::Pod + Send + Sync + 'static
{
    /// Stored representation of this element type
    fn data_type() -> DataType;

    fn size_bytes() -> usize {
        core::mem::size_of::<Self>()
    }

    /// Convert from f64; narrowing is silent
    fn from_f64(value: f64) -> Self;

    fn to_f64(self) -> f64;

    fn nan() -> Self;

    fn is_nan(self) -> bool;
}

impl Element for f32 {
    fn data_type() -> DataType {
        DataType::F32
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn nan() -> Self {
        f32::NAN
    }

    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

impl Element for f64 {
    fn data_type() -> DataType {
        DataType::F64
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn nan() -> Self {
        f64::NAN
    }

    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}
