//! Triangular solve and multiply operations trait.

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::{BatchView, MatrixView};
use crate::ops::{Side, Triangle};
use crate::runtime::Runtime;

/// Triangular BLAS3 routines
///
/// `A` is square and triangular with a non-unit diagonal. Only the triangle
/// selected by `triangle` is read. `B` is overwritten with the result and
/// must not overlap `A`.
pub trait TriangularOps<R: Runtime, T: Element> {
    /// Solve `op(A) · X = alpha · B` (left) or `X · op(A) = alpha · B` (right)
    fn trsm(
        &self,
        a: &MatrixView<'_, R, T>,
        b: &MatrixView<'_, R, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        let _ = (a, b, alpha, side, triangle, transpose);
        Err(Error::NotImplemented {
            feature: "TriangularOps::trsm",
        })
    }

    /// [`trsm`](Self::trsm) over every slice of equally sized batches
    fn batch_trsm(
        &self,
        a: &BatchView<'_, R, T>,
        b: &BatchView<'_, R, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        let _ = (a, b, alpha, side, triangle, transpose);
        Err(Error::NotImplemented {
            feature: "TriangularOps::batch_trsm",
        })
    }

    /// `B := alpha · op(A) · B` (left) or `B := alpha · B · op(A)` (right)
    fn trmm(
        &self,
        a: &MatrixView<'_, R, T>,
        b: &MatrixView<'_, R, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        let _ = (a, b, alpha, side, triangle, transpose);
        Err(Error::NotImplemented {
            feature: "TriangularOps::trmm",
        })
    }

    /// [`trmm`](Self::trmm) over every slice of equally sized batches
    fn batch_trmm(
        &self,
        a: &BatchView<'_, R, T>,
        b: &BatchView<'_, R, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        let _ = (a, b, alpha, side, triangle, transpose);
        Err(Error::NotImplemented {
            feature: "TriangularOps::batch_trmm",
        })
    }
}
