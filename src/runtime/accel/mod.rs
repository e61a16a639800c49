//! Generic accelerator backend
//!
//! The BLAS3/LAPACK operations are implemented once here, against a small
//! set of vendor entry points a concrete accelerator client provides:
//!
//! - [`AcceleratorBlas<T>`]: column-major GEMM, TRSM, TRMM and their
//!   pointer-array batched forms
//! - [`AcceleratorSolver<T>`]: dense Cholesky with a caller-provided workspace
//! - [`AcceleratorKernels`]: the batch-offset and identity helper kernels and
//!   a stream-ordered device copy
//! - [`MixedPrecisionGemm`]: GEMM with f16 I/O and f32 compute
//!
//! A client implements those traits and then forwards the operation traits
//! ([`GemmOps`](crate::ops::GemmOps) etc.) to the functions of this module,
//! which validate the operands, translate the row-major problem with
//! [`layout`], acquire scratch from the client's allocator and issue the
//! vendor calls on the client's stream.
//!
//! All calls are asynchronous with respect to the host: they return once the
//! work is enqueued.

mod blas;
mod cholesky;
#[cfg(feature = "f16")]
mod mixed;
pub mod layout;
mod potri;

pub use blas::{batch_gemm, batch_trmm, batch_trsm, gemm, trmm, trsm};
pub use cholesky::{batch_potrf, potrf};
#[cfg(feature = "f16")]
pub use mixed::{MathModeGuard, batch_gemm_f16, gemm_f16};
pub use layout::{CholeskyCall, GemmCall, TriangularCall};
pub use potri::{batch_potri, potri};

use crate::config::AcceleratorConfig;
use crate::dtype::{DType, Element};
use crate::error::Result;
use crate::runtime::{Runtime, RuntimeClient};

/// Runtime client of an accelerator
pub trait AcceleratorClient<R: Runtime>: RuntimeClient<R> + AcceleratorKernels {
    /// Settings captured when the client was created
    fn config(&self) -> AcceleratorConfig;
}

/// Column-major BLAS3 entry points for element type `T`
///
/// Pointer arguments of the batched forms are device arrays of `batch`
/// matrix pointers.
pub trait AcceleratorBlas<T: Element> {
    /// Single GEMM
    fn blas_gemm(&self, call: &GemmCall<T>) -> Result<()>;

    /// GEMM over `batch` pointer triples
    fn blas_gemm_batched(&self, call: &GemmCall<T>, batch: usize) -> Result<()>;

    /// Single triangular solve, overwriting `B`
    fn blas_trsm(&self, call: &TriangularCall<T>) -> Result<()>;

    /// Triangular solve over `batch` pointer pairs
    fn blas_trsm_batched(&self, call: &TriangularCall<T>, batch: usize) -> Result<()>;

    /// Single triangular multiply with `B` as both input and output
    fn blas_trmm(&self, call: &TriangularCall<T>) -> Result<()>;
}

/// Dense solver entry points for element type `T`
pub trait AcceleratorSolver<T: Element> {
    /// Workspace needed by [`solver_potrf`](Self::solver_potrf), in elements
    fn potrf_buffer_size(&self, call: &CholeskyCall) -> Result<usize>;

    /// Cholesky factorization
    ///
    /// `workspace` holds `workspace_len` elements of `T`; `info` is a device
    /// `i32` receiving the solver status. The status stays on the device.
    fn solver_potrf(
        &self,
        call: &CholeskyCall,
        workspace: u64,
        workspace_len: usize,
        info: u64,
    ) -> Result<()>;
}

/// Helper kernels launched on the client's stream
pub trait AcceleratorKernels {
    /// `dst[i] = base + i * stride_bytes` for `i < count` (u64 pointers)
    fn collect_batch_offsets(
        &self,
        dst: u64,
        base: u64,
        stride_bytes: usize,
        count: usize,
    ) -> Result<()>;

    /// Fill `numel` elements of `T` at `dst` with stacked identities
    ///
    /// Element `i` is one iff `(i % matrix_stride) / ld == (i % matrix_stride) % ld`.
    fn init_identity<T: Element>(
        &self,
        dst: u64,
        matrix_stride: usize,
        ld: usize,
        numel: usize,
    ) -> Result<()>;

    /// Device-to-device copy ordered after previously enqueued work
    fn copy_device(&self, src: u64, dst: u64, size_bytes: usize) -> Result<()>;
}

/// Math mode of the BLAS handle
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MathMode {
    /// Library default
    Default,
    /// Allow tensor-core kernels
    TensorOp,
}

/// Reduced-precision GEMM: element type `io_dtype`, f32 scalars and compute
pub trait MixedPrecisionGemm {
    /// Whether the vendor library provides mixed-precision GEMM
    fn supports_mixed_precision(&self) -> bool;

    /// Current math mode of the BLAS handle
    fn math_mode(&self) -> Result<MathMode>;

    /// Set the math mode of the BLAS handle
    fn set_math_mode(&self, mode: MathMode) -> Result<()>;

    /// GEMM with `io_dtype` buffers
    fn gemm_ex(&self, call: &GemmCall<f32>, io_dtype: DType) -> Result<()>;
}
