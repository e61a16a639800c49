//! Runtime backends for dense linear algebra
//!
//! This module defines the `Runtime` trait and provides implementations
//! for the host CPU and, behind the `cuda` feature, NVIDIA GPUs.
//!
//! # Architecture
//!
//! ```text
//! Runtime (backend identity)
//! ├── Device (identifies a specific GPU/CPU)
//! ├── Client (dispatches operations, owns stream and library handles)
//! └── Allocator (transient scratch and matrix storage)
//! ```
//!
//! Accelerator backends share one generic implementation of the BLAS3/LAPACK
//! operations in [`accel`]; a concrete accelerator only supplies the vendor
//! entry points (column-major BLAS, dense solver, two helper kernels).

mod allocator;
mod traits;

pub mod accel;
pub mod cpu;

#[cfg(feature = "cuda")]
pub mod cuda;

pub use allocator::{Allocator, DefaultAllocator, ScratchBuffer};
pub use traits::{Device, Runtime, RuntimeClient};
