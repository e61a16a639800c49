//! Cholesky factorization through the vendor dense solver
//!
//! The solver protocol is: query the workspace size, allocate the workspace
//! and a status word, factor, release both. The status word is written on
//! the device and never read back, so numerical failure of the factorization
//! is not reported by this backend.

use super::layout::cholesky_call;
use super::{AcceleratorClient, AcceleratorSolver};
use crate::dtype::Element;
use crate::error::Result;
use crate::matrix::{BatchView, MatrixView};
use crate::ops::Triangle;
use crate::ops::validate::{check_batch_square, check_square, ensure_device};
use crate::runtime::{Device, Runtime, ScratchBuffer};
use tracing::instrument;

/// Workspace sized for one factorization of the given shape
fn workspace<'c, R, T, C>(
    client: &'c C,
    a: &MatrixView<'_, R, T>,
    triangle: Triangle,
) -> Result<(ScratchBuffer<'c, R::Allocator>, usize)>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R> + AcceleratorSolver<T>,
{
    let len = client.potrf_buffer_size(&cholesky_call(a, triangle))?;
    // Zero-sized device allocations are not portable
    let buffer = ScratchBuffer::for_elements::<T>(client.allocator(), len.max(1))?;
    Ok((buffer, len))
}

/// In-place Cholesky factorization of one matrix
#[instrument(skip_all, fields(backend = R::name(), op = "potrf", n = a.rows()))]
pub fn potrf<R, T, C>(client: &C, a: &MatrixView<'_, R, T>, triangle: Triangle) -> Result<()>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R> + AcceleratorSolver<T>,
{
    ensure_device(client.device().id(), &[a.device_id()])?;
    check_square("potrf", a)?;

    let (work, len) = workspace(client, a, triangle)?;
    let info = ScratchBuffer::for_elements::<i32>(client.allocator(), 1)?;
    client.solver_potrf(&cholesky_call(a, triangle), work.ptr(), len, info.ptr())
}

/// Cholesky factorization of every slice
///
/// One workspace, sized from slice 0, serves all slices.
#[instrument(skip_all, fields(backend = R::name(), op = "batch_potrf", batch = a.batch()))]
pub fn batch_potrf<R, T, C>(client: &C, a: &BatchView<'_, R, T>, triangle: Triangle) -> Result<()>
where
    R: Runtime,
    T: Element,
    C: AcceleratorClient<R> + AcceleratorSolver<T>,
{
    ensure_device(client.device().id(), &[a.device_id()])?;
    check_batch_square("potrf", a)?;

    let (work, len) = workspace(client, &a.matrix(0), triangle)?;
    let info = ScratchBuffer::for_elements::<i32>(client.allocator(), 1)?;
    for slice in a.matrices() {
        client.solver_potrf(&cholesky_call(&slice, triangle), work.ptr(), len, info.ptr())?;
    }
    Ok(())
}
