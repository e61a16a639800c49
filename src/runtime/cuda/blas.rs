//! cuBLAS bindings
//!
//! Raw `cudarc::cublas::sys` calls on the client's handle, which is bound to
//! the client's stream. All arguments arrive already translated to the
//! column-major convention by [`accel::layout`](crate::runtime::accel::layout).

use super::CudaClient;
use super::solver::to_int;
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::ops::{Side, Triangle};
use crate::runtime::accel::{AcceleratorBlas, GemmCall, MathMode, MixedPrecisionGemm, TriangularCall};
use cudarc::cublas::sys::{
    cublasComputeType_t, cublasDiagType_t, cublasFillMode_t, cublasGemmAlgo_t, cublasGemmEx,
    cublasGetMathMode, cublasHandle_t, cublasMath_t, cublasOperation_t, cublasSetMathMode,
    cublasSideMode_t, cublasStatus_t, cudaDataType_t,
};
use std::ffi::c_void;

/// Lowest compute capability with f16 GEMM in cuBLAS
const MIXED_PRECISION_MIN_CC: (u32, u32) = (5, 3);

fn check(routine: &'static str, status: cublasStatus_t) -> Result<()> {
    if status != cublasStatus_t::CUBLAS_STATUS_SUCCESS {
        return Err(Error::library_failure(routine, status as i64));
    }
    Ok(())
}

#[inline]
fn op(transpose: bool) -> cublasOperation_t {
    if transpose {
        cublasOperation_t::CUBLAS_OP_T
    } else {
        cublasOperation_t::CUBLAS_OP_N
    }
}

#[inline]
fn side_mode(side: Side) -> cublasSideMode_t {
    match side {
        Side::Left => cublasSideMode_t::CUBLAS_SIDE_LEFT,
        Side::Right => cublasSideMode_t::CUBLAS_SIDE_RIGHT,
    }
}

#[inline]
fn fill_mode(fill: Triangle) -> cublasFillMode_t {
    match fill {
        Triangle::Lower => cublasFillMode_t::CUBLAS_FILL_MODE_LOWER,
        Triangle::Upper => cublasFillMode_t::CUBLAS_FILL_MODE_UPPER,
    }
}

/// Element types with cuBLAS BLAS3 routines
///
/// Implemented for `f32` (`cublasS*`) and `f64` (`cublasD*`). The methods are
/// thin forwards to the vendor symbols.
pub trait CublasElement: Element {
    /// Routine names used in error reports
    const GEMM: &'static str;
    /// See [`GEMM`](Self::GEMM)
    const GEMM_BATCHED: &'static str;
    /// See [`GEMM`](Self::GEMM)
    const TRSM: &'static str;
    /// See [`GEMM`](Self::GEMM)
    const TRSM_BATCHED: &'static str;
    /// See [`GEMM`](Self::GEMM)
    const TRMM: &'static str;

    /// `cublas?gemm`
    ///
    /// # Safety
    ///
    /// Every pointer must reference device memory of the handle's device
    /// covering the matrices the dimensions describe.
    #[allow(clippy::too_many_arguments)]
    unsafe fn gemm(
        handle: cublasHandle_t,
        transa: cublasOperation_t,
        transb: cublasOperation_t,
        m: i32,
        n: i32,
        k: i32,
        alpha: *const Self,
        a: *const Self,
        lda: i32,
        b: *const Self,
        ldb: i32,
        beta: *const Self,
        c: *mut Self,
        ldc: i32,
    ) -> cublasStatus_t;

    /// `cublas?gemmBatched`
    ///
    /// # Safety
    ///
    /// As [`gemm`](Self::gemm); `a`, `b` and `c` are device arrays of
    /// `batch` matrix pointers.
    #[allow(clippy::too_many_arguments)]
    unsafe fn gemm_batched(
        handle: cublasHandle_t,
        transa: cublasOperation_t,
        transb: cublasOperation_t,
        m: i32,
        n: i32,
        k: i32,
        alpha: *const Self,
        a: *const *const Self,
        lda: i32,
        b: *const *const Self,
        ldb: i32,
        beta: *const Self,
        c: *const *mut Self,
        ldc: i32,
        batch: i32,
    ) -> cublasStatus_t;

    /// `cublas?trsm`
    ///
    /// # Safety
    ///
    /// As [`gemm`](Self::gemm).
    #[allow(clippy::too_many_arguments)]
    unsafe fn trsm(
        handle: cublasHandle_t,
        side: cublasSideMode_t,
        uplo: cublasFillMode_t,
        trans: cublasOperation_t,
        diag: cublasDiagType_t,
        m: i32,
        n: i32,
        alpha: *const Self,
        a: *const Self,
        lda: i32,
        b: *mut Self,
        ldb: i32,
    ) -> cublasStatus_t;

    /// `cublas?trsmBatched`
    ///
    /// # Safety
    ///
    /// As [`gemm_batched`](Self::gemm_batched).
    #[allow(clippy::too_many_arguments)]
    unsafe fn trsm_batched(
        handle: cublasHandle_t,
        side: cublasSideMode_t,
        uplo: cublasFillMode_t,
        trans: cublasOperation_t,
        diag: cublasDiagType_t,
        m: i32,
        n: i32,
        alpha: *const Self,
        a: *const *const Self,
        lda: i32,
        b: *const *mut Self,
        ldb: i32,
        batch: i32,
    ) -> cublasStatus_t;

    /// `cublas?trmm` (out-of-place form; `b` and `c` may alias)
    ///
    /// # Safety
    ///
    /// As [`gemm`](Self::gemm).
    #[allow(clippy::too_many_arguments)]
    unsafe fn trmm(
        handle: cublasHandle_t,
        side: cublasSideMode_t,
        uplo: cublasFillMode_t,
        trans: cublasOperation_t,
        diag: cublasDiagType_t,
        m: i32,
        n: i32,
        alpha: *const Self,
        a: *const Self,
        lda: i32,
        b: *const Self,
        ldb: i32,
        c: *mut Self,
        ldc: i32,
    ) -> cublasStatus_t;
}

macro_rules! impl_cublas_element {
    ($ty:ty, $prefix:literal, $gemm:ident, $gemm_batched:ident, $trsm:ident, $trsm_batched:ident, $trmm:ident) => {
        impl CublasElement for $ty {
            const GEMM: &'static str = concat!("cublas", $prefix, "gemm");
            const GEMM_BATCHED: &'static str = concat!("cublas", $prefix, "gemmBatched");
            const TRSM: &'static str = concat!("cublas", $prefix, "trsm");
            const TRSM_BATCHED: &'static str = concat!("cublas", $prefix, "trsmBatched");
            const TRMM: &'static str = concat!("cublas", $prefix, "trmm");

            unsafe fn gemm(
                handle: cublasHandle_t,
                transa: cublasOperation_t,
                transb: cublasOperation_t,
                m: i32,
                n: i32,
                k: i32,
                alpha: *const Self,
                a: *const Self,
                lda: i32,
                b: *const Self,
                ldb: i32,
                beta: *const Self,
                c: *mut Self,
                ldc: i32,
            ) -> cublasStatus_t {
                // SAFETY: forwarded caller contract.
                unsafe {
                    cudarc::cublas::sys::$gemm(
                        handle, transa, transb, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc,
                    )
                }
            }

            unsafe fn gemm_batched(
                handle: cublasHandle_t,
                transa: cublasOperation_t,
                transb: cublasOperation_t,
                m: i32,
                n: i32,
                k: i32,
                alpha: *const Self,
                a: *const *const Self,
                lda: i32,
                b: *const *const Self,
                ldb: i32,
                beta: *const Self,
                c: *const *mut Self,
                ldc: i32,
                batch: i32,
            ) -> cublasStatus_t {
                // SAFETY: forwarded caller contract.
                unsafe {
                    cudarc::cublas::sys::$gemm_batched(
                        handle, transa, transb, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc,
                        batch,
                    )
                }
            }

            unsafe fn trsm(
                handle: cublasHandle_t,
                side: cublasSideMode_t,
                uplo: cublasFillMode_t,
                trans: cublasOperation_t,
                diag: cublasDiagType_t,
                m: i32,
                n: i32,
                alpha: *const Self,
                a: *const Self,
                lda: i32,
                b: *mut Self,
                ldb: i32,
            ) -> cublasStatus_t {
                // SAFETY: forwarded caller contract.
                unsafe {
                    cudarc::cublas::sys::$trsm(
                        handle, side, uplo, trans, diag, m, n, alpha, a, lda, b, ldb,
                    )
                }
            }

            unsafe fn trsm_batched(
                handle: cublasHandle_t,
                side: cublasSideMode_t,
                uplo: cublasFillMode_t,
                trans: cublasOperation_t,
                diag: cublasDiagType_t,
                m: i32,
                n: i32,
                alpha: *const Self,
                a: *const *const Self,
                lda: i32,
                b: *const *mut Self,
                ldb: i32,
                batch: i32,
            ) -> cublasStatus_t {
                // SAFETY: forwarded caller contract.
                unsafe {
                    cudarc::cublas::sys::$trsm_batched(
                        handle, side, uplo, trans, diag, m, n, alpha, a, lda, b, ldb, batch,
                    )
                }
            }

            unsafe fn trmm(
                handle: cublasHandle_t,
                side: cublasSideMode_t,
                uplo: cublasFillMode_t,
                trans: cublasOperation_t,
                diag: cublasDiagType_t,
                m: i32,
                n: i32,
                alpha: *const Self,
                a: *const Self,
                lda: i32,
                b: *const Self,
                ldb: i32,
                c: *mut Self,
                ldc: i32,
            ) -> cublasStatus_t {
                // SAFETY: forwarded caller contract.
                unsafe {
                    cudarc::cublas::sys::$trmm(
                        handle, side, uplo, trans, diag, m, n, alpha, a, lda, b, ldb, c, ldc,
                    )
                }
            }
        }
    };
}

impl_cublas_element!(
    f32,
    "S",
    cublasSgemm_v2,
    cublasSgemmBatched,
    cublasStrsm_v2,
    cublasStrsmBatched,
    cublasStrmm_v2
);
impl_cublas_element!(
    f64,
    "D",
    cublasDgemm_v2,
    cublasDgemmBatched,
    cublasDtrsm_v2,
    cublasDtrsmBatched,
    cublasDtrmm_v2
);

impl CudaClient {
    #[inline]
    fn blas_handle(&self) -> cublasHandle_t {
        *self.cublas.handle()
    }
}

impl<T: CublasElement> AcceleratorBlas<T> for CudaClient {
    fn blas_gemm(&self, call: &GemmCall<T>) -> Result<()> {
        // SAFETY: the call describes validated device matrices of this client.
        let status = unsafe {
            T::gemm(
                self.blas_handle(),
                op(call.transa),
                op(call.transb),
                to_int("m", call.m)?,
                to_int("n", call.n)?,
                to_int("k", call.k)?,
                &call.alpha,
                call.a as *const T,
                to_int("lda", call.lda)?,
                call.b as *const T,
                to_int("ldb", call.ldb)?,
                &call.beta,
                call.c as *mut T,
                to_int("ldc", call.ldc)?,
            )
        };
        check(T::GEMM, status)
    }

    fn blas_gemm_batched(&self, call: &GemmCall<T>, batch: usize) -> Result<()> {
        // SAFETY: a, b and c are device pointer arrays of `batch` entries.
        let status = unsafe {
            T::gemm_batched(
                self.blas_handle(),
                op(call.transa),
                op(call.transb),
                to_int("m", call.m)?,
                to_int("n", call.n)?,
                to_int("k", call.k)?,
                &call.alpha,
                call.a as *const *const T,
                to_int("lda", call.lda)?,
                call.b as *const *const T,
                to_int("ldb", call.ldb)?,
                &call.beta,
                call.c as *const *mut T,
                to_int("ldc", call.ldc)?,
                to_int("batch", batch)?,
            )
        };
        check(T::GEMM_BATCHED, status)
    }

    fn blas_trsm(&self, call: &TriangularCall<T>) -> Result<()> {
        // SAFETY: the call describes validated device matrices of this client.
        let status = unsafe {
            T::trsm(
                self.blas_handle(),
                side_mode(call.side),
                fill_mode(call.fill),
                op(call.transa),
                cublasDiagType_t::CUBLAS_DIAG_NON_UNIT,
                to_int("m", call.m)?,
                to_int("n", call.n)?,
                &call.alpha,
                call.a as *const T,
                to_int("lda", call.lda)?,
                call.b as *mut T,
                to_int("ldb", call.ldb)?,
            )
        };
        check(T::TRSM, status)
    }

    fn blas_trsm_batched(&self, call: &TriangularCall<T>, batch: usize) -> Result<()> {
        // SAFETY: a and b are device pointer arrays of `batch` entries.
        let status = unsafe {
            T::trsm_batched(
                self.blas_handle(),
                side_mode(call.side),
                fill_mode(call.fill),
                op(call.transa),
                cublasDiagType_t::CUBLAS_DIAG_NON_UNIT,
                to_int("m", call.m)?,
                to_int("n", call.n)?,
                &call.alpha,
                call.a as *const *const T,
                to_int("lda", call.lda)?,
                call.b as *const *mut T,
                to_int("ldb", call.ldb)?,
                to_int("batch", batch)?,
            )
        };
        check(T::TRSM_BATCHED, status)
    }

    fn blas_trmm(&self, call: &TriangularCall<T>) -> Result<()> {
        let ldb = to_int("ldb", call.ldb)?;
        // SAFETY: B is both input and output, which the out-of-place TRMM allows.
        let status = unsafe {
            T::trmm(
                self.blas_handle(),
                side_mode(call.side),
                fill_mode(call.fill),
                op(call.transa),
                cublasDiagType_t::CUBLAS_DIAG_NON_UNIT,
                to_int("m", call.m)?,
                to_int("n", call.n)?,
                &call.alpha,
                call.a as *const T,
                to_int("lda", call.lda)?,
                call.b as *const T,
                ldb,
                call.b as *mut T,
                ldb,
            )
        };
        check(T::TRMM, status)
    }
}

impl MixedPrecisionGemm for CudaClient {
    fn supports_mixed_precision(&self) -> bool {
        self.device
            .compute_capability()
            .is_ok_and(|cc| cc >= MIXED_PRECISION_MIN_CC)
    }

    fn math_mode(&self) -> Result<MathMode> {
        let mut mode = cublasMath_t::CUBLAS_DEFAULT_MATH;
        // SAFETY: the handle is live; mode is written on success.
        check("cublasGetMathMode", unsafe {
            cublasGetMathMode(self.blas_handle(), &mut mode)
        })?;
        Ok(match mode {
            cublasMath_t::CUBLAS_TENSOR_OP_MATH => MathMode::TensorOp,
            _ => MathMode::Default,
        })
    }

    fn set_math_mode(&self, mode: MathMode) -> Result<()> {
        let mode = match mode {
            MathMode::Default => cublasMath_t::CUBLAS_DEFAULT_MATH,
            MathMode::TensorOp => cublasMath_t::CUBLAS_TENSOR_OP_MATH,
        };
        // SAFETY: the handle is live.
        check("cublasSetMathMode", unsafe {
            cublasSetMathMode(self.blas_handle(), mode)
        })
    }

    fn gemm_ex(&self, call: &GemmCall<f32>, io_dtype: DType) -> Result<()> {
        let cuda_dtype = match io_dtype {
            DType::F16 => cudaDataType_t::CUDA_R_16F,
            other => {
                return Err(Error::UnsupportedDType {
                    dtype: other,
                    op: "gemm_ex",
                });
            }
        };

        // SAFETY: the call describes validated device matrices of `io_dtype`
        // on this client; the scalars are f32 as COMPUTE_32F requires.
        let status = unsafe {
            cublasGemmEx(
                self.blas_handle(),
                op(call.transa),
                op(call.transb),
                to_int("m", call.m)?,
                to_int("n", call.n)?,
                to_int("k", call.k)?,
                &call.alpha as *const f32 as *const c_void,
                call.a as *const c_void,
                cuda_dtype,
                to_int("lda", call.lda)?,
                call.b as *const c_void,
                cuda_dtype,
                to_int("ldb", call.ldb)?,
                &call.beta as *const f32 as *const c_void,
                call.c as *mut c_void,
                cuda_dtype,
                to_int("ldc", call.ldc)?,
                cublasComputeType_t::CUBLAS_COMPUTE_32F,
                cublasGemmAlgo_t::CUBLAS_GEMM_DEFAULT,
            )
        };
        check("cublasGemmEx", status)
    }
}
