//! GEMM, TRSM and TRMM kernels

use super::StridedMatrix;
use crate::dtype::Element;
use crate::ops::{Side, Triangle};

/// `C := alpha · A · B + beta · C`
///
/// Transposes are expressed through the views (see
/// [`StridedMatrix::op`]). With `beta == 0` the old contents of `C` are never
/// read.
///
/// # Safety
/// - All views must be valid for their dimensions and strides
/// - `c` must not alias `a` or `b`
/// - Shapes must agree: `a` is m × k, `b` is k × n, `c` is m × n
pub unsafe fn gemm_kernel<T: Element>(
    a: StridedMatrix<T>,
    b: StridedMatrix<T>,
    c: StridedMatrix<T>,
    alpha: T,
    beta: T,
) {
    let (m, n, k) = (c.rows(), c.cols(), a.cols());
    let read_c = beta != T::zero();

    for i in 0..m {
        for j in 0..n {
            let mut acc = T::zero();
            for p in 0..k {
                // SAFETY: indices within the shapes guaranteed by the caller.
                acc = acc + unsafe { a.get(i, p) * b.get(p, j) };
            }
            let mut value = alpha * acc;
            if read_c {
                value = value + beta * unsafe { c.get(i, j) };
            }
            unsafe { c.set(i, j, value) };
        }
    }
}

/// Triangular solve, overwriting `b` with `X`
///
/// Solves `op(A) · X = alpha · B` for [`Side::Left`] and
/// `X · op(A) = alpha · B` for [`Side::Right`]. Only the `triangle` part of
/// `a` is read; the diagonal is not assumed to be unit.
///
/// # Safety
/// - Views must be valid for their dimensions and strides
/// - `a` is n × n with n = rows of `b` (left) or cols of `b` (right)
/// - `b` must not alias `a`
pub unsafe fn trsm_kernel<T: Element>(
    a: StridedMatrix<T>,
    b: StridedMatrix<T>,
    alpha: T,
    side: Side,
    triangle: Triangle,
    transpose: bool,
) {
    // X · op(A) = αB  <=>  op(A)ᵀ · Xᵀ = αBᵀ
    let (b, transpose) = match side {
        Side::Left => (b, transpose),
        Side::Right => (b.transposed(), !transpose),
    };
    let (m, lower) = effective_triangle(a, triangle, transpose);
    let n = m.rows();

    for j in 0..b.cols() {
        if lower {
            for i in 0..n {
                // SAFETY: i, p < n and j < cols of b.
                let mut x = alpha * unsafe { b.get(i, j) };
                for p in 0..i {
                    x = x - unsafe { m.get(i, p) * b.get(p, j) };
                }
                unsafe { b.set(i, j, x / m.get(i, i)) };
            }
        } else {
            for i in (0..n).rev() {
                let mut x = alpha * unsafe { b.get(i, j) };
                for p in (i + 1)..n {
                    x = x - unsafe { m.get(i, p) * b.get(p, j) };
                }
                unsafe { b.set(i, j, x / m.get(i, i)) };
            }
        }
    }
}

/// Triangular multiply in place
///
/// `B := alpha · op(A) · B` for [`Side::Left`], `B := alpha · B · op(A)` for
/// [`Side::Right`].
///
/// # Safety
/// Same contract as [`trsm_kernel`].
pub unsafe fn trmm_kernel<T: Element>(
    a: StridedMatrix<T>,
    b: StridedMatrix<T>,
    alpha: T,
    side: Side,
    triangle: Triangle,
    transpose: bool,
) {
    // B · op(A) = (op(A)ᵀ · Bᵀ)ᵀ
    let (b, transpose) = match side {
        Side::Left => (b, transpose),
        Side::Right => (b.transposed(), !transpose),
    };
    let (m, lower) = effective_triangle(a, triangle, transpose);
    let n = m.rows();

    // Row i of the product only reads rows on its side of the diagonal, so
    // walking away from them keeps the inputs intact until consumed.
    for j in 0..b.cols() {
        if lower {
            for i in (0..n).rev() {
                let mut s = T::zero();
                for p in 0..=i {
                    // SAFETY: p <= i < n.
                    s = s + unsafe { m.get(i, p) * b.get(p, j) };
                }
                unsafe { b.set(i, j, alpha * s) };
            }
        } else {
            for i in 0..n {
                let mut s = T::zero();
                for p in i..n {
                    s = s + unsafe { m.get(i, p) * b.get(p, j) };
                }
                unsafe { b.set(i, j, alpha * s) };
            }
        }
    }
}

/// `op(A)` and whether it is lower triangular
#[inline]
fn effective_triangle<T: Copy>(
    a: StridedMatrix<T>,
    triangle: Triangle,
    transpose: bool,
) -> (StridedMatrix<T>, bool) {
    let triangle = if transpose {
        triangle.flipped()
    } else {
        triangle
    };
    (a.op(transpose), triangle.is_lower())
}
