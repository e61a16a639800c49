//! Data type system for numla matrices
//!
//! This module provides the `DType` enum naming the element types the dense
//! linear algebra routines understand, and the [`Element`] trait connecting
//! Rust types to it.
//!
//! Full-precision routines (GEMM, TRSM, TRMM, POTRF, POTRI) are defined for
//! [`DType::F32`] and [`DType::F64`]. [`DType::F16`] is an I/O type only: it is
//! accepted by the accelerator GEMM, which computes in F32.

mod element;

pub use element::{Element, LinalgElement};

use std::fmt;

/// Element types known to numla
///
/// # Discriminant Values (Serialization Stability)
///
/// The discriminant values are never changed: F64=0, F32=1, F16=2.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
#[repr(u8)]
pub enum DType {
    /// 64-bit floating point
    F64 = 0,
    /// 32-bit floating point (most common)
    F32 = 1,
    /// 16-bit floating point (IEEE 754)
    F16 = 2,
}

impl DType {
    /// Size of one element in bytes
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::F64 => 8,
            Self::F32 => 4,
            Self::F16 => 2,
        }
    }

    /// Short name for display (e.g., "f32")
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::F16 => "f16",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
