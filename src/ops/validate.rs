//! Precondition checks shared by every backend
//!
//! Each check runs before any numerical work is issued and reports the first
//! inconsistent operand pair.

use super::Side;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::{BatchView, MatrixView};
use crate::runtime::Runtime;

/// Check the batch counts of a batched call: all equal and non-zero
pub fn check_batch_size(a: usize, b: usize, c: usize) -> Result<()> {
    if a != b || a != c {
        return Err(Error::BatchSizeMismatch { a, b, c });
    }
    if a == 0 {
        return Err(Error::EmptyBatch);
    }
    Ok(())
}

/// Check `C = op(A) · op(B)` shapes
pub fn check_gemm<R: Runtime, T: Element>(
    a: &MatrixView<'_, R, T>,
    b: &MatrixView<'_, R, T>,
    c: &MatrixView<'_, R, T>,
    transpose_a: bool,
    transpose_b: bool,
) -> Result<()> {
    let (a_rows, a_cols) = a.op_shape(transpose_a);
    let (b_rows, b_cols) = b.op_shape(transpose_b);

    if a_rows != c.rows() {
        return Err(Error::dimension_mismatch(
            "gemm",
            "Non compatible matrix dimensions between inputs A and C",
        ));
    }
    if b_cols != c.cols() {
        return Err(Error::dimension_mismatch(
            "gemm",
            "Non compatible matrix dimensions between inputs B and C",
        ));
    }
    if a_cols != b_rows {
        return Err(Error::dimension_mismatch(
            "gemm",
            "Non compatible matrix dimensions between inputs A and B",
        ));
    }
    Ok(())
}

/// Check shapes for a triangular solve or multiply named `op`
///
/// `A` must be square and match `B.cols` (right side) or `B.rows` (left side).
pub fn check_triangular<R: Runtime, T: Element>(
    op: &'static str,
    a: &MatrixView<'_, R, T>,
    b: &MatrixView<'_, R, T>,
    side: Side,
) -> Result<()> {
    if !a.is_square() {
        return Err(Error::dimension_mismatch(
            op,
            "First input is not a square matrix",
        ));
    }
    let matches = match side {
        Side::Right => b.cols() == a.rows(),
        Side::Left => b.rows() == a.cols(),
    };
    if !matches {
        return Err(Error::dimension_mismatch(
            op,
            "Non compatible matrix dimensions between inputs A and B",
        ));
    }
    Ok(())
}

/// Check shapes for [`trsm`](super::TriangularOps::trsm)
#[inline]
pub fn check_trsm<R: Runtime, T: Element>(
    a: &MatrixView<'_, R, T>,
    b: &MatrixView<'_, R, T>,
    side: Side,
) -> Result<()> {
    check_triangular("trsm", a, b, side)
}

/// Check shapes for [`trmm`](super::TriangularOps::trmm)
#[inline]
pub fn check_trmm<R: Runtime, T: Element>(
    a: &MatrixView<'_, R, T>,
    b: &MatrixView<'_, R, T>,
    side: Side,
) -> Result<()> {
    check_triangular("trmm", a, b, side)
}

/// Check that the single input of `op` (potrf, potri) is square
pub fn check_square<R: Runtime, T: Element>(
    op: &'static str,
    a: &MatrixView<'_, R, T>,
) -> Result<()> {
    if !a.is_square() {
        return Err(Error::dimension_mismatch(op, "No square matrix as input"));
    }
    Ok(())
}

/// Batched form of [`check_gemm`]
pub fn check_batch_gemm<R: Runtime, T: Element>(
    a: &BatchView<'_, R, T>,
    b: &BatchView<'_, R, T>,
    c: &BatchView<'_, R, T>,
    transpose_a: bool,
    transpose_b: bool,
) -> Result<()> {
    check_batch_size(a.batch(), b.batch(), c.batch())?;
    check_gemm(&a.matrix(0), &b.matrix(0), &c.matrix(0), transpose_a, transpose_b)
}

/// Batched form of [`check_triangular`]
pub fn check_batch_triangular<R: Runtime, T: Element>(
    op: &'static str,
    a: &BatchView<'_, R, T>,
    b: &BatchView<'_, R, T>,
    side: Side,
) -> Result<()> {
    check_batch_size(a.batch(), b.batch(), b.batch())?;
    check_triangular(op, &a.matrix(0), &b.matrix(0), side)
}

/// Batched form of [`check_square`]
pub fn check_batch_square<R: Runtime, T: Element>(
    op: &'static str,
    a: &BatchView<'_, R, T>,
) -> Result<()> {
    check_batch_size(a.batch(), a.batch(), a.batch())?;
    check_square(op, &a.matrix(0))
}

/// Check that every operand lives on the client's device
pub fn ensure_device(client: usize, operands: &[usize]) -> Result<()> {
    match operands.iter().find(|&&id| id != client) {
        Some(&operand) => Err(Error::DeviceMismatch { operand, client }),
        None => Ok(()),
    }
}
