//! Cholesky factorization and inverse kernels

use super::StridedMatrix;
use crate::dtype::LinalgElement;
use crate::error::{Error, Result};
use crate::ops::Triangle;

/// View whose lower triangle holds the factor stored in `triangle`
///
/// The upper triangle of `A` is the lower triangle of `Aᵀ`, and `A = Uᵀ · U`
/// is `Aᵀ = L · Lᵀ` with `L = Uᵀ`, so both cases run the lower algorithm.
#[inline]
fn lower_view<T: Copy>(a: StridedMatrix<T>, triangle: Triangle) -> StridedMatrix<T> {
    a.op(!triangle.is_lower())
}

/// In-place Cholesky factorization (Cholesky–Crout, column by column)
///
/// Only the selected triangle is read or written.
///
/// # Errors
///
/// `LibraryFailure { routine: "potrf", status }` where `status` is the
/// 1-based order of the first leading minor that is not positive. Columns
/// before it have already been overwritten, as in LAPACK.
///
/// # Safety
/// `a` must be a valid square view.
pub unsafe fn potrf_kernel<T: LinalgElement>(a: StridedMatrix<T>, triangle: Triangle) -> Result<()> {
    let l = lower_view(a, triangle);
    let n = l.rows();

    for j in 0..n {
        // SAFETY: every index below is < n.
        let mut d = unsafe { l.get(j, j) };
        for p in 0..j {
            let v = unsafe { l.get(j, p) };
            d = d - v * v;
        }
        // Negated comparison also rejects NaN
        if !(d > T::zero()) {
            return Err(Error::library_failure("potrf", (j + 1) as i64));
        }
        let diag = d.sqrt_val();
        unsafe { l.set(j, j, diag) };

        for i in (j + 1)..n {
            let mut s = unsafe { l.get(i, j) };
            for p in 0..j {
                s = s - unsafe { l.get(i, p) * l.get(j, p) };
            }
            unsafe { l.set(i, j, s / diag) };
        }
    }
    Ok(())
}

/// Inverse of `A = L · Lᵀ` from its factor, written to both triangles
///
/// Computes `W = L⁻¹` into host scratch, then `A⁻¹ = Wᵀ · W`. Nothing is
/// written when the factor is singular.
///
/// # Errors
///
/// `LibraryFailure { routine: "potri", status }` when diagonal entry
/// `status` (1-based) of the factor is zero.
///
/// # Safety
/// `a` must be a valid square view.
pub unsafe fn potri_kernel<T: LinalgElement>(a: StridedMatrix<T>, triangle: Triangle) -> Result<()> {
    let l = lower_view(a, triangle);
    let n = l.rows();

    for j in 0..n {
        // SAFETY: j < n.
        if unsafe { l.get(j, j) } == T::zero() {
            return Err(Error::library_failure("potri", (j + 1) as i64));
        }
    }

    // W = L⁻¹, lower triangular, row-major n x n
    let mut w = vec![T::zero(); n * n];
    for j in 0..n {
        w[j * n + j] = T::one() / unsafe { l.get(j, j) };
        for i in (j + 1)..n {
            let mut s = T::zero();
            for p in j..i {
                s = s + unsafe { l.get(i, p) } * w[p * n + j];
            }
            w[i * n + j] = (s / unsafe { l.get(i, i) }).neg_val();
        }
    }

    // (Wᵀ W)(i, j) = Σ_{p ≥ max(i, j)} W(p, i) · W(p, j)
    for i in 0..n {
        for j in 0..=i {
            let mut s = T::zero();
            for p in i..n {
                s = s + w[p * n + i] * w[p * n + j];
            }
            unsafe {
                l.set(i, j, s);
                l.set(j, i, s);
            }
        }
    }
    Ok(())
}
