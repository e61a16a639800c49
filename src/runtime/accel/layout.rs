//! Row-major to column-major argument translation
//!
//! Vendor BLAS and solver libraries are column-major. A row-major matrix
//! `X` (r × c, leading dimension `ld`) is, byte for byte, the column-major
//! matrix `Xᵀ` (c × r, same `ld`). Every accelerator call is therefore issued
//! on the transposed problem:
//!
//! ```text
//! C = op(A)·op(B)     =>  Cᵀ = op(B)ᵀ·op(A)ᵀ          (operands swapped)
//! op(A)·X = B         =>  Xᵀ·op(A)ᵀ = Bᵀ               (side swapped)
//! A lower             =>  Aᵀ upper                      (fill swapped)
//! ```
//!
//! The adapters below are the only place this translation happens.

use crate::dtype::Element;
use crate::matrix::MatrixView;
use crate::ops::{Side, Triangle};
use crate::runtime::Runtime;

/// Column-major GEMM arguments: `C := alpha · op(A) · op(B) + beta · C`
///
/// `a`, `b` and `c` are matrix pointers for a single call and device arrays of
/// per-matrix pointers for a batched call.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GemmCall<S> {
    /// Transpose the first operand
    pub transa: bool,
    /// Transpose the second operand
    pub transb: bool,
    /// Rows of `op(A)` and `C`
    pub m: usize,
    /// Columns of `op(B)` and `C`
    pub n: usize,
    /// Inner dimension
    pub k: usize,
    /// Scale of the product
    pub alpha: S,
    /// First operand
    pub a: u64,
    /// Leading dimension of the first operand
    pub lda: usize,
    /// Second operand
    pub b: u64,
    /// Leading dimension of the second operand
    pub ldb: usize,
    /// Scale of the prior output
    pub beta: S,
    /// Output
    pub c: u64,
    /// Leading dimension of the output
    pub ldc: usize,
}

impl<S> GemmCall<S> {
    /// Same call on different operand pointers (pointer arrays for batches)
    pub fn with_pointers(self, a: u64, b: u64, c: u64) -> Self {
        Self { a, b, c, ..self }
    }
}

/// Column-major TRSM/TRMM arguments
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TriangularCall<T> {
    /// Side of `A` in the column-major problem
    pub side: Side,
    /// Triangle of `A` in the column-major problem
    pub fill: Triangle,
    /// Transpose `A`
    pub transa: bool,
    /// Rows of `B`
    pub m: usize,
    /// Columns of `B`
    pub n: usize,
    /// Scale of `B`
    pub alpha: T,
    /// Triangular operand
    pub a: u64,
    /// Leading dimension of `A`
    pub lda: usize,
    /// In/out operand
    pub b: u64,
    /// Leading dimension of `B`
    pub ldb: usize,
}

impl<T> TriangularCall<T> {
    /// Same call on different operand pointers (pointer arrays for batches)
    pub fn with_pointers(self, a: u64, b: u64) -> Self {
        Self { a, b, ..self }
    }
}

/// Column-major Cholesky arguments
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CholeskyCall {
    /// Triangle holding the factor in the column-major problem
    pub fill: Triangle,
    /// Order of the matrix
    pub n: usize,
    /// Matrix pointer
    pub a: u64,
    /// Leading dimension
    pub lda: usize,
}

/// Translate a row-major GEMM
///
/// The scalars may have a different type than the elements (f16 I/O with f32
/// scalars).
#[allow(clippy::too_many_arguments)]
pub fn gemm_call<R: Runtime, T: Element, S>(
    a: &MatrixView<'_, R, T>,
    b: &MatrixView<'_, R, T>,
    c: &MatrixView<'_, R, T>,
    alpha: S,
    beta: S,
    transpose_a: bool,
    transpose_b: bool,
) -> GemmCall<S> {
    GemmCall {
        transa: transpose_b,
        transb: transpose_a,
        m: c.cols(),
        n: c.rows(),
        k: b.op_shape(transpose_b).0,
        alpha,
        a: b.ptr(),
        lda: b.ld(),
        b: a.ptr(),
        ldb: a.ld(),
        beta,
        c: c.ptr(),
        ldc: c.ld(),
    }
}

/// Translate a row-major TRSM or TRMM
pub fn triangular_call<R: Runtime, T: Element>(
    a: &MatrixView<'_, R, T>,
    b: &MatrixView<'_, R, T>,
    alpha: T,
    side: Side,
    triangle: Triangle,
    transpose: bool,
) -> TriangularCall<T> {
    TriangularCall {
        side: side.flipped(),
        fill: triangle.flipped(),
        transa: transpose,
        m: b.cols(),
        n: b.rows(),
        alpha,
        a: a.ptr(),
        lda: a.ld(),
        b: b.ptr(),
        ldb: b.ld(),
    }
}

/// Translate a row-major POTRF
pub fn cholesky_call<R: Runtime, T: Element>(
    a: &MatrixView<'_, R, T>,
    triangle: Triangle,
) -> CholeskyCall {
    CholeskyCall {
        fill: triangle.flipped(),
        n: a.rows(),
        a: a.ptr(),
        lda: a.ld(),
    }
}
