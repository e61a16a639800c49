//! # numla
//!
//! **Device-polymorphic dense linear algebra for Rust.**
//!
//! numla provides the BLAS3/LAPACK routines a deep-learning operator layer
//! needs (GEMM, TRSM, TRMM, POTRF, POTRI) with identical semantics on the host
//! CPU and on accelerators, for `f32` and `f64`, plus an `f16` GEMM that
//! computes in `f32` on accelerators. Every routine has a batched form that
//! processes a stack of same-shaped matrices as one call.
//!
//! ## Design
//!
//! - **Static dispatch**: operations are traits implemented by runtime
//!   clients, keyed on the `(Runtime, Element)` pair
//! - **Row-major views**: operands are non-owning [`matrix::MatrixView`]s with
//!   an explicit leading dimension; accelerator backends translate to the
//!   column-major vendor convention internally
//! - **Checked**: dimension, batch and device preconditions are validated
//!   before any work is issued and reported as [`error::Error`]
//!
//! ## Quick Start
//!
//! ```
//! use numla::prelude::*;
//!
//! let device = CpuRuntime::default_device();
//! let client = CpuRuntime::default_client(&device);
//!
//! let a = Storage::<CpuRuntime>::from_slice(&[2.0f64, 0.0, 0.0, 2.0], &device)?;
//! let b = Storage::<CpuRuntime>::from_slice(&[1.0f64, 0.0, 0.0, 1.0], &device)?;
//! let c = Storage::<CpuRuntime>::from_slice(&[2.0f64, 0.0, 0.0, 2.0], &device)?;
//!
//! client.gemm_request(
//!     &a.matrix::<f64>(2, 2)?,
//!     &b.matrix::<f64>(2, 2)?,
//!     &c.matrix::<f64>(2, 2)?,
//!     false,
//!     false,
//!     WriteRequest::AddTo,
//! )?;
//! assert_eq!(c.to_vec::<f64>()?, vec![4.0, 0.0, 0.0, 4.0]);
//! # Ok::<(), numla::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `f16` (default): half-precision element type
//! - `cuda`: NVIDIA CUDA backend (cuBLAS, cuSOLVER, NVRTC helper kernels)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod dtype;
pub mod error;
pub mod matrix;
pub mod ops;
pub mod runtime;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::AcceleratorConfig;
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::matrix::{BatchView, MatrixView, Storage};
    pub use crate::ops::{CholeskyOps, GemmOps, Side, Triangle, TriangularOps, WriteRequest};
    pub use crate::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
    pub use crate::runtime::{Device, Runtime, RuntimeClient};

    #[cfg(feature = "cuda")]
    pub use crate::runtime::cuda::{CudaClient, CudaDevice, CudaRuntime};
}

/// Default runtime based on enabled features
///
/// - With `cuda` feature: `CudaRuntime`
/// - Otherwise: `CpuRuntime`
#[cfg(feature = "cuda")]
pub type DefaultRuntime = runtime::cuda::CudaRuntime;

/// Default runtime based on enabled features
#[cfg(not(feature = "cuda"))]
pub type DefaultRuntime = runtime::cpu::CpuRuntime;
