//! Dense linear algebra on the host
//!
//! Each call validates its operands, then runs the host kernel on the calling
//! thread. Batched forms loop over the slices in order.

use super::kernels::{
    StridedMatrix, gemm_kernel, potrf_kernel, potri_kernel, trmm_kernel, trsm_kernel,
};
use super::{CpuClient, CpuRuntime};
use crate::dtype::LinalgElement;
use crate::error::Result;
use crate::matrix::{BatchView, MatrixView};
use crate::ops::validate::{
    check_batch_gemm, check_batch_square, check_batch_triangular, check_gemm, check_square,
    check_triangular, ensure_device,
};
use crate::ops::{CholeskyOps, GemmOps, Side, Triangle, TriangularOps};
use crate::runtime::Device;

/// Kernel descriptor for a row-major host view
#[inline]
fn host<T: LinalgElement>(view: &MatrixView<'_, CpuRuntime, T>) -> StridedMatrix<T> {
    // SAFETY: the view's construction contract covers its footprint.
    unsafe { StridedMatrix::row_major(view.ptr() as *mut T, view.rows(), view.cols(), view.ld()) }
}

impl CpuClient {
    fn ensure_host(&self, operands: &[usize]) -> Result<()> {
        ensure_device(self.device.id(), operands)
    }
}

#[allow(clippy::too_many_arguments)]
fn gemm_unchecked<T: LinalgElement>(
    a: &MatrixView<'_, CpuRuntime, T>,
    b: &MatrixView<'_, CpuRuntime, T>,
    c: &MatrixView<'_, CpuRuntime, T>,
    alpha: T,
    beta: T,
    transpose_a: bool,
    transpose_b: bool,
) {
    // SAFETY: shapes validated by the caller; views are in bounds.
    unsafe {
        gemm_kernel(
            host(a).op(transpose_a),
            host(b).op(transpose_b),
            host(c),
            alpha,
            beta,
        )
    }
}

impl<T: LinalgElement> GemmOps<CpuRuntime, T> for CpuClient {
    fn gemm(
        &self,
        a: &MatrixView<'_, CpuRuntime, T>,
        b: &MatrixView<'_, CpuRuntime, T>,
        c: &MatrixView<'_, CpuRuntime, T>,
        alpha: T,
        beta: T,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<()> {
        self.ensure_host(&[a.device_id(), b.device_id(), c.device_id()])?;
        check_gemm(a, b, c, transpose_a, transpose_b)?;
        tracing::trace!(
            backend = "cpu",
            op = "gemm",
            dtype = %T::DTYPE,
            m = c.rows(),
            n = c.cols(),
            k = a.op_shape(transpose_a).1,
            transpose_a,
            transpose_b
        );
        gemm_unchecked(a, b, c, alpha, beta, transpose_a, transpose_b);
        Ok(())
    }

    fn batch_gemm(
        &self,
        a: &BatchView<'_, CpuRuntime, T>,
        b: &BatchView<'_, CpuRuntime, T>,
        c: &BatchView<'_, CpuRuntime, T>,
        alpha: T,
        beta: T,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<()> {
        self.ensure_host(&[a.device_id(), b.device_id(), c.device_id()])?;
        check_batch_gemm(a, b, c, transpose_a, transpose_b)?;
        tracing::trace!(backend = "cpu", op = "batch_gemm", dtype = %T::DTYPE, batch = a.batch());
        for i in 0..a.batch() {
            gemm_unchecked(
                &a.matrix(i),
                &b.matrix(i),
                &c.matrix(i),
                alpha,
                beta,
                transpose_a,
                transpose_b,
            );
        }
        Ok(())
    }
}

impl<T: LinalgElement> TriangularOps<CpuRuntime, T> for CpuClient {
    fn trsm(
        &self,
        a: &MatrixView<'_, CpuRuntime, T>,
        b: &MatrixView<'_, CpuRuntime, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        self.ensure_host(&[a.device_id(), b.device_id()])?;
        check_triangular("trsm", a, b, side)?;
        tracing::trace!(backend = "cpu", op = "trsm", dtype = %T::DTYPE, ?side, ?triangle, transpose);
        // SAFETY: shapes validated above.
        unsafe { trsm_kernel(host(a), host(b), alpha, side, triangle, transpose) };
        Ok(())
    }

    fn batch_trsm(
        &self,
        a: &BatchView<'_, CpuRuntime, T>,
        b: &BatchView<'_, CpuRuntime, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        self.ensure_host(&[a.device_id(), b.device_id()])?;
        check_batch_triangular("trsm", a, b, side)?;
        tracing::trace!(backend = "cpu", op = "batch_trsm", dtype = %T::DTYPE, batch = a.batch());
        for i in 0..a.batch() {
            let (ai, bi) = (a.matrix(i), b.matrix(i));
            // SAFETY: every slice has the validated shape of slice 0.
            unsafe { trsm_kernel(host(&ai), host(&bi), alpha, side, triangle, transpose) };
        }
        Ok(())
    }

    fn trmm(
        &self,
        a: &MatrixView<'_, CpuRuntime, T>,
        b: &MatrixView<'_, CpuRuntime, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        self.ensure_host(&[a.device_id(), b.device_id()])?;
        check_triangular("trmm", a, b, side)?;
        tracing::trace!(backend = "cpu", op = "trmm", dtype = %T::DTYPE, ?side, ?triangle, transpose);
        // SAFETY: shapes validated above.
        unsafe { trmm_kernel(host(a), host(b), alpha, side, triangle, transpose) };
        Ok(())
    }

    fn batch_trmm(
        &self,
        a: &BatchView<'_, CpuRuntime, T>,
        b: &BatchView<'_, CpuRuntime, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        self.ensure_host(&[a.device_id(), b.device_id()])?;
        check_batch_triangular("trmm", a, b, side)?;
        tracing::trace!(backend = "cpu", op = "batch_trmm", dtype = %T::DTYPE, batch = a.batch());
        for i in 0..a.batch() {
            let (ai, bi) = (a.matrix(i), b.matrix(i));
            // SAFETY: every slice has the validated shape of slice 0.
            unsafe { trmm_kernel(host(&ai), host(&bi), alpha, side, triangle, transpose) };
        }
        Ok(())
    }
}

impl<T: LinalgElement> CholeskyOps<CpuRuntime, T> for CpuClient {
    fn potrf(&self, a: &MatrixView<'_, CpuRuntime, T>, triangle: Triangle) -> Result<()> {
        self.ensure_host(&[a.device_id()])?;
        check_square("potrf", a)?;
        tracing::trace!(backend = "cpu", op = "potrf", dtype = %T::DTYPE, n = a.rows(), ?triangle);
        // SAFETY: square view validated above.
        unsafe { potrf_kernel(host(a), triangle) }
    }

    fn batch_potrf(&self, a: &BatchView<'_, CpuRuntime, T>, triangle: Triangle) -> Result<()> {
        self.ensure_host(&[a.device_id()])?;
        check_batch_square("potrf", a)?;
        tracing::trace!(backend = "cpu", op = "batch_potrf", dtype = %T::DTYPE, batch = a.batch());
        for ai in a.matrices() {
            // SAFETY: every slice is square like slice 0.
            unsafe { potrf_kernel(host(&ai), triangle)? };
        }
        Ok(())
    }

    fn potri(&self, a: &MatrixView<'_, CpuRuntime, T>, triangle: Triangle) -> Result<()> {
        self.ensure_host(&[a.device_id()])?;
        check_square("potri", a)?;
        tracing::trace!(backend = "cpu", op = "potri", dtype = %T::DTYPE, n = a.rows(), ?triangle);
        // SAFETY: square view validated above.
        unsafe { potri_kernel(host(a), triangle) }
    }

    fn batch_potri(&self, a: &BatchView<'_, CpuRuntime, T>, triangle: Triangle) -> Result<()> {
        self.ensure_host(&[a.device_id()])?;
        check_batch_square("potri", a)?;
        tracing::trace!(backend = "cpu", op = "batch_potri", dtype = %T::DTYPE, batch = a.batch());
        for ai in a.matrices() {
            // SAFETY: every slice is square like slice 0.
            unsafe { potri_kernel(host(&ai), triangle)? };
        }
        Ok(())
    }
}
