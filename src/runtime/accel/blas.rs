//! GEMM, TRSM and TRMM on an accelerator

use super::layout::{gemm_call, triangular_call};
use super::{AcceleratorBlas, AcceleratorClient};
use crate::dtype::Element;
use crate::error::Result;
use crate::matrix::{BatchView, MatrixView};
use crate::ops::validate::{
    check_batch_gemm, check_batch_triangular, check_gemm, check_triangular, ensure_device,
};
use crate::ops::{Side, Triangle};
use crate::runtime::{Device, Runtime, ScratchBuffer};
use tracing::instrument;

/// Device array with the pointer of every matrix of `batch`
///
/// Filled by the batch-offset kernel on the client's stream; freed when the
/// returned guard drops.
pub(super) fn pointer_array<'c, R, T, C>(
    client: &'c C,
    batch: &BatchView<'_, R, T>,
) -> Result<ScratchBuffer<'c, R::Allocator>>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R>,
{
    let array = ScratchBuffer::for_elements::<u64>(client.allocator(), batch.batch())?;
    client.collect_batch_offsets(
        array.ptr(),
        batch.ptr(),
        batch.matrix_stride() * std::mem::size_of::<T>(),
        batch.batch(),
    )?;
    Ok(array)
}

/// `C := alpha · op(A) · op(B) + beta · C` through the vendor GEMM
#[allow(clippy::too_many_arguments)]
pub fn gemm<R, T, C>(
    client: &C,
    a: &MatrixView<'_, R, T>,
    b: &MatrixView<'_, R, T>,
    c: &MatrixView<'_, R, T>,
    alpha: T,
    beta: T,
    transpose_a: bool,
    transpose_b: bool,
) -> Result<()>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R> + AcceleratorBlas<T>,
{
    ensure_device(
        client.device().id(),
        &[a.device_id(), b.device_id(), c.device_id()],
    )?;
    check_gemm(a, b, c, transpose_a, transpose_b)?;

    let call = gemm_call(a, b, c, alpha, beta, transpose_a, transpose_b);
    tracing::trace!(backend = R::name(), op = "gemm", dtype = %T::DTYPE, m = call.m, n = call.n, k = call.k);
    client.blas_gemm(&call)
}

/// Batched GEMM through the vendor pointer-array GEMM
///
/// Three pointer arrays are built on the device and released after the call
/// is enqueued, on success and on failure.
#[allow(clippy::too_many_arguments)]
#[instrument(skip_all, fields(backend = R::name(), op = "batch_gemm", batch = a.batch()))]
pub fn batch_gemm<R, T, C>(
    client: &C,
    a: &BatchView<'_, R, T>,
    b: &BatchView<'_, R, T>,
    c: &BatchView<'_, R, T>,
    alpha: T,
    beta: T,
    transpose_a: bool,
    transpose_b: bool,
) -> Result<()>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R> + AcceleratorBlas<T>,
{
    ensure_device(
        client.device().id(),
        &[a.device_id(), b.device_id(), c.device_id()],
    )?;
    check_batch_gemm(a, b, c, transpose_a, transpose_b)?;

    let a_ptrs = pointer_array(client, a)?;
    let b_ptrs = pointer_array(client, b)?;
    let c_ptrs = pointer_array(client, c)?;

    let call = gemm_call(
        &a.matrix(0),
        &b.matrix(0),
        &c.matrix(0),
        alpha,
        beta,
        transpose_a,
        transpose_b,
    )
    // operands trade places in the column-major call
    .with_pointers(b_ptrs.ptr(), a_ptrs.ptr(), c_ptrs.ptr());
    client.blas_gemm_batched(&call, a.batch())
}

/// Triangular solve through the vendor TRSM
pub fn trsm<R, T, C>(
    client: &C,
    a: &MatrixView<'_, R, T>,
    b: &MatrixView<'_, R, T>,
    alpha: T,
    side: Side,
    triangle: Triangle,
    transpose: bool,
) -> Result<()>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R> + AcceleratorBlas<T>,
{
    ensure_device(client.device().id(), &[a.device_id(), b.device_id()])?;
    check_triangular("trsm", a, b, side)?;

    let call = triangular_call(a, b, alpha, side, triangle, transpose);
    tracing::trace!(backend = R::name(), op = "trsm", dtype = %T::DTYPE, m = call.m, n = call.n);
    client.blas_trsm(&call)
}

/// Batched triangular solve through the vendor pointer-array TRSM
#[instrument(skip_all, fields(backend = R::name(), op = "batch_trsm", batch = a.batch()))]
pub fn batch_trsm<R, T, C>(
    client: &C,
    a: &BatchView<'_, R, T>,
    b: &BatchView<'_, R, T>,
    alpha: T,
    side: Side,
    triangle: Triangle,
    transpose: bool,
) -> Result<()>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R> + AcceleratorBlas<T>,
{
    ensure_device(client.device().id(), &[a.device_id(), b.device_id()])?;
    check_batch_triangular("trsm", a, b, side)?;

    let a_ptrs = pointer_array(client, a)?;
    let b_ptrs = pointer_array(client, b)?;

    let call = triangular_call(&a.matrix(0), &b.matrix(0), alpha, side, triangle, transpose)
        .with_pointers(a_ptrs.ptr(), b_ptrs.ptr());
    client.blas_trsm_batched(&call, a.batch())
}

/// Triangular multiply through the vendor TRMM, `B` in place
pub fn trmm<R, T, C>(
    client: &C,
    a: &MatrixView<'_, R, T>,
    b: &MatrixView<'_, R, T>,
    alpha: T,
    side: Side,
    triangle: Triangle,
    transpose: bool,
) -> Result<()>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R> + AcceleratorBlas<T>,
{
    ensure_device(client.device().id(), &[a.device_id(), b.device_id()])?;
    check_triangular("trmm", a, b, side)?;

    let call = triangular_call(a, b, alpha, side, triangle, transpose);
    tracing::trace!(backend = R::name(), op = "trmm", dtype = %T::DTYPE, m = call.m, n = call.n);
    client.blas_trmm(&call)
}

/// Batched triangular multiply, one vendor TRMM per slice
pub fn batch_trmm<R, T, C>(
    client: &C,
    a: &BatchView<'_, R, T>,
    b: &BatchView<'_, R, T>,
    alpha: T,
    side: Side,
    triangle: Triangle,
    transpose: bool,
) -> Result<()>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R> + AcceleratorBlas<T>,
{
    ensure_device(client.device().id(), &[a.device_id(), b.device_id()])?;
    check_batch_triangular("trmm", a, b, side)?;

    for i in 0..a.batch() {
        let call = triangular_call(&a.matrix(i), &b.matrix(i), alpha, side, triangle, transpose);
        client.blas_trmm(&call)?;
    }
    Ok(())
}
