//! Dense linear algebra on CUDA
//!
//! Thin forwards to the shared accelerator implementation. Full precision
//! needs both the cuBLAS and the cuSOLVER bindings of the element type; f16
//! only has GEMM, computed in f32 through `cublasGemmEx`.

use super::blas::CublasElement;
use super::solver::CusolverElement;
use super::{CudaClient, CudaRuntime};
use crate::error::Result;
use crate::matrix::{BatchView, MatrixView};
use crate::ops::{CholeskyOps, GemmOps, Side, Triangle, TriangularOps};
use crate::runtime::accel;

impl<T: CublasElement> GemmOps<CudaRuntime, T> for CudaClient {
    fn gemm(
        &self,
        a: &MatrixView<'_, CudaRuntime, T>,
        b: &MatrixView<'_, CudaRuntime, T>,
        c: &MatrixView<'_, CudaRuntime, T>,
        alpha: T,
        beta: T,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<()> {
        accel::gemm(self, a, b, c, alpha, beta, transpose_a, transpose_b)
    }

    fn batch_gemm(
        &self,
        a: &BatchView<'_, CudaRuntime, T>,
        b: &BatchView<'_, CudaRuntime, T>,
        c: &BatchView<'_, CudaRuntime, T>,
        alpha: T,
        beta: T,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<()> {
        accel::batch_gemm(self, a, b, c, alpha, beta, transpose_a, transpose_b)
    }
}

impl GemmOps<CudaRuntime, half::f16> for CudaClient {
    fn gemm(
        &self,
        a: &MatrixView<'_, CudaRuntime, half::f16>,
        b: &MatrixView<'_, CudaRuntime, half::f16>,
        c: &MatrixView<'_, CudaRuntime, half::f16>,
        alpha: half::f16,
        beta: half::f16,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<()> {
        accel::gemm_f16(self, a, b, c, alpha, beta, transpose_a, transpose_b)
    }

    fn batch_gemm(
        &self,
        a: &BatchView<'_, CudaRuntime, half::f16>,
        b: &BatchView<'_, CudaRuntime, half::f16>,
        c: &BatchView<'_, CudaRuntime, half::f16>,
        alpha: half::f16,
        beta: half::f16,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<()> {
        accel::batch_gemm_f16(self, a, b, c, alpha, beta, transpose_a, transpose_b)
    }
}

impl<T: CublasElement> TriangularOps<CudaRuntime, T> for CudaClient {
    fn trsm(
        &self,
        a: &MatrixView<'_, CudaRuntime, T>,
        b: &MatrixView<'_, CudaRuntime, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        accel::trsm(self, a, b, alpha, side, triangle, transpose)
    }

    fn batch_trsm(
        &self,
        a: &BatchView<'_, CudaRuntime, T>,
        b: &BatchView<'_, CudaRuntime, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        accel::batch_trsm(self, a, b, alpha, side, triangle, transpose)
    }

    fn trmm(
        &self,
        a: &MatrixView<'_, CudaRuntime, T>,
        b: &MatrixView<'_, CudaRuntime, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        accel::trmm(self, a, b, alpha, side, triangle, transpose)
    }

    fn batch_trmm(
        &self,
        a: &BatchView<'_, CudaRuntime, T>,
        b: &BatchView<'_, CudaRuntime, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        accel::batch_trmm(self, a, b, alpha, side, triangle, transpose)
    }
}

impl<T: CublasElement + CusolverElement> CholeskyOps<CudaRuntime, T> for CudaClient {
    fn potrf(&self, a: &MatrixView<'_, CudaRuntime, T>, triangle: Triangle) -> Result<()> {
        accel::potrf(self, a, triangle)
    }

    fn batch_potrf(&self, a: &BatchView<'_, CudaRuntime, T>, triangle: Triangle) -> Result<()> {
        accel::batch_potrf(self, a, triangle)
    }

    fn potri(&self, a: &MatrixView<'_, CudaRuntime, T>, triangle: Triangle) -> Result<()> {
        accel::potri(self, a, triangle)
    }

    fn batch_potri(&self, a: &BatchView<'_, CudaRuntime, T>, triangle: Triangle) -> Result<()> {
        accel::batch_potri(self, a, triangle)
    }
}
