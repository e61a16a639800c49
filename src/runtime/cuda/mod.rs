//! CUDA runtime implementation
//!
//! GPU backend built on cudarc:
//!
//! - `CudaDevice` - a CUDA GPU by ordinal
//! - `CudaClient` - context, stream, cuBLAS and cuSOLVER handles and the
//!   helper kernels, all bound to one stream
//! - `CudaRuntime` - implements the generic Runtime trait
//!
//! The dense operations ([`GemmOps`](crate::ops::GemmOps),
//! [`TriangularOps`](crate::ops::TriangularOps),
//! [`CholeskyOps`](crate::ops::CholeskyOps)) are the shared accelerator
//! implementation in [`accel`](crate::runtime::accel) driven through the
//! cuBLAS/cuSOLVER bindings of this module. Every call is enqueued on the
//! client's stream and returns without waiting for the device.
//!
//! # Panics
//!
//! `Runtime::default_client` panics if the CUDA context, stream or library
//! handles of a device cannot be created. Use [`CudaClient::new`] to handle
//! that failure instead.

mod blas;
mod cache;
mod client;
mod device;
mod kernels;
mod linalg;
mod runtime;
mod solver;

pub use blas::CublasElement;
pub use client::{CudaAllocator, CudaClient};
pub use device::CudaDevice;
pub use runtime::CudaRuntime;
pub use solver::CusolverElement;
