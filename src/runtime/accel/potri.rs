//! Inverse from a Cholesky factor, composed from BLAS3 calls
//!
//! With `A = L · Lᵀ`, `A⁻¹ = L⁻ᵀ · L⁻¹`: starting from `X = I`, one TRSM
//! gives `L⁻¹` and a second, transposed TRSM gives `L⁻ᵀ · L⁻¹`. For an upper
//! factor `A = Uᵀ · U` the two transposes swap. The identity lives in device
//! scratch laid out like `A` (same leading dimension, same per-matrix stride)
//! and the result is copied back over `A`.

use super::blas::{batch_trsm, trsm};
use super::{AcceleratorBlas, AcceleratorClient};
use crate::dtype::Element;
use crate::error::Result;
use crate::matrix::{BatchView, MatrixView};
use crate::ops::validate::{check_batch_square, check_square, ensure_device};
use crate::ops::{Side, Triangle};
use crate::runtime::{Device, Runtime, ScratchBuffer};
use tracing::instrument;

/// Transpose flags of the two solves for a factor in `triangle`
#[inline]
fn solve_order(triangle: Triangle) -> (bool, bool) {
    let lower = triangle.is_lower();
    (!lower, lower)
}

/// Copy the `rows x cols` region at `src` (laid out like `dst`) over `dst`
///
/// Padding between `cols` and `ld` in `dst` is left alone.
fn copy_back<R, T, C>(client: &C, src: u64, dst: &MatrixView<'_, R, T>) -> Result<()>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R>,
{
    let elem = std::mem::size_of::<T>();
    if dst.is_contiguous() {
        return client.copy_device(src, dst.ptr(), dst.footprint() * elem);
    }
    let row_bytes = dst.cols() * elem;
    for row in 0..dst.rows() {
        let offset = (row * dst.ld() * elem) as u64;
        client.copy_device(src + offset, dst.row_ptr(row), row_bytes)?;
    }
    Ok(())
}

/// Overwrite a Cholesky factor with the inverse of the factored matrix
#[instrument(skip_all, fields(backend = R::name(), op = "potri", n = a.rows()))]
pub fn potri<R, T, C>(client: &C, a: &MatrixView<'_, R, T>, triangle: Triangle) -> Result<()>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R> + AcceleratorBlas<T>,
{
    ensure_device(client.device().id(), &[a.device_id()])?;
    check_square("potri", a)?;

    let stride = a.rows() * a.ld();
    let scratch = ScratchBuffer::for_elements::<T>(client.allocator(), stride.max(1))?;
    client.init_identity::<T>(scratch.ptr(), stride, a.ld(), stride)?;

    // SAFETY: scratch holds rows * ld elements on the client's device and
    // outlives the view.
    let x = unsafe {
        MatrixView::<R, T>::from_raw_parts(scratch.ptr(), a.rows(), a.cols(), a.ld(), client.device())?
    };

    let (first, second) = solve_order(triangle);
    trsm(client, a, &x, T::one(), Side::Left, triangle, first)?;
    trsm(client, a, &x, T::one(), Side::Left, triangle, second)?;
    copy_back(client, scratch.ptr(), a)
}

/// [`potri`] on every slice, with batched solves over one stacked identity
#[instrument(skip_all, fields(backend = R::name(), op = "batch_potri", batch = a.batch()))]
pub fn batch_potri<R, T, C>(client: &C, a: &BatchView<'_, R, T>, triangle: Triangle) -> Result<()>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R> + AcceleratorBlas<T>,
{
    ensure_device(client.device().id(), &[a.device_id()])?;
    check_batch_square("potri", a)?;

    let stride = a.matrix_stride();
    let numel = a.footprint();
    let scratch = ScratchBuffer::for_elements::<T>(client.allocator(), numel.max(1))?;
    client.init_identity::<T>(scratch.ptr(), stride, a.ld(), numel)?;

    // SAFETY: scratch holds batch * rows * ld elements on the client's device.
    let x = unsafe {
        BatchView::<R, T>::from_raw_parts(
            scratch.ptr(),
            a.batch(),
            a.rows(),
            a.cols(),
            a.ld(),
            client.device(),
        )?
    };

    let (first, second) = solve_order(triangle);
    batch_trsm(client, a, &x, T::one(), Side::Left, triangle, first)?;
    batch_trsm(client, a, &x, T::one(), Side::Left, triangle, second)?;

    if a.matrix(0).is_contiguous() {
        return client.copy_device(scratch.ptr(), a.ptr(), numel * std::mem::size_of::<T>());
    }
    for i in 0..a.batch() {
        copy_back(client, x.matrix(i).ptr(), &a.matrix(i))?;
    }
    Ok(())
}
