//! CPU runtime implementation
//!
//! The CPU runtime uses standard heap allocation and runs every operation on
//! the calling thread through the host BLAS3/LAPACK kernels in [`kernels`].
//!
//! Batched forms are plain sequential loops over the per-matrix routine.

mod client;
mod device;
pub mod kernels;
mod linalg;
mod runtime;

pub use client::{CpuAllocator, CpuClient};
pub use device::CpuDevice;
pub use runtime::CpuRuntime;
