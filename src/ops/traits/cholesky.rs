//! Cholesky factorization and inverse operations trait.

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::{BatchView, MatrixView};
use crate::ops::Triangle;
use crate::runtime::Runtime;

/// Cholesky routines on symmetric positive-definite matrices
pub trait CholeskyOps<R: Runtime, T: Element> {
    /// Factor `A` in place
    ///
    /// `Triangle::Lower` leaves `L` with `A = L · Lᵀ` in the lower triangle,
    /// `Triangle::Upper` leaves `U` with `A = Uᵀ · U` in the upper triangle.
    /// The other triangle is not touched.
    ///
    /// # Errors
    ///
    /// `LibraryFailure` naming `potrf` when a leading minor is not positive
    /// (host backend; the status is the 1-based order of that minor).
    fn potrf(&self, a: &MatrixView<'_, R, T>, triangle: Triangle) -> Result<()> {
        let _ = (a, triangle);
        Err(Error::NotImplemented {
            feature: "CholeskyOps::potrf",
        })
    }

    /// [`potrf`](Self::potrf) on every slice of a batch
    fn batch_potrf(&self, a: &BatchView<'_, R, T>, triangle: Triangle) -> Result<()> {
        let _ = (a, triangle);
        Err(Error::NotImplemented {
            feature: "CholeskyOps::batch_potrf",
        })
    }

    /// Overwrite a Cholesky factor with the inverse of the factored matrix
    ///
    /// `triangle` names where the factor lives, as passed to
    /// [`potrf`](Self::potrf). The full symmetric inverse is written, both
    /// triangles.
    fn potri(&self, a: &MatrixView<'_, R, T>, triangle: Triangle) -> Result<()> {
        let _ = (a, triangle);
        Err(Error::NotImplemented {
            feature: "CholeskyOps::potri",
        })
    }

    /// [`potri`](Self::potri) on every slice of a batch
    fn batch_potri(&self, a: &BatchView<'_, R, T>, triangle: Triangle) -> Result<()> {
        let _ = (a, triangle);
        Err(Error::NotImplemented {
            feature: "CholeskyOps::batch_potri",
        })
    }
}
