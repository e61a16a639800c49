//! General matrix multiply operations trait.

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::{BatchView, MatrixView};
use crate::ops::WriteRequest;
use crate::runtime::Runtime;

/// General matrix multiply: `C := alpha · op(A) · op(B) + beta · C`
///
/// `op(X)` is `X` or `Xᵀ` according to the transpose flag of each operand.
/// When `beta` is zero the prior contents of `C` are not read, so NaN or
/// uninitialized values in `C` do not reach the result.
///
/// `C` must not overlap the memory of `A` or `B`. Backends read the operands
/// while writing the output, so overlapping views give unspecified results.
pub trait GemmOps<R: Runtime, T: Element> {
    /// Multiply one matrix pair into `c`
    ///
    /// `c` must not alias `a` or `b`.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` naming the inconsistent operand pair
    /// - `DeviceMismatch` if an operand is not on the client's device
    /// - `LibraryFailure` / `BackendLimitation` reported by the backend
    #[allow(clippy::too_many_arguments)]
    fn gemm(
        &self,
        a: &MatrixView<'_, R, T>,
        b: &MatrixView<'_, R, T>,
        c: &MatrixView<'_, R, T>,
        alpha: T,
        beta: T,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<()> {
        let _ = (a, b, c, alpha, beta, transpose_a, transpose_b);
        Err(Error::NotImplemented {
            feature: "GemmOps::gemm",
        })
    }

    /// [`gemm`](Self::gemm) applied to every slice of equally sized batches
    #[allow(clippy::too_many_arguments)]
    fn batch_gemm(
        &self,
        a: &BatchView<'_, R, T>,
        b: &BatchView<'_, R, T>,
        c: &BatchView<'_, R, T>,
        alpha: T,
        beta: T,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<()> {
        let _ = (a, b, c, alpha, beta, transpose_a, transpose_b);
        Err(Error::NotImplemented {
            feature: "GemmOps::batch_gemm",
        })
    }

    /// GEMM driven by an output write intent
    ///
    /// `NullOp` issues nothing (no validation either), `WriteTo` and
    /// `WriteInplace` compute `op(A) · op(B)`, `AddTo` adds it to `C`.
    fn gemm_request(
        &self,
        a: &MatrixView<'_, R, T>,
        b: &MatrixView<'_, R, T>,
        c: &MatrixView<'_, R, T>,
        transpose_a: bool,
        transpose_b: bool,
        req: WriteRequest,
    ) -> Result<()> {
        match req.coefficients::<T>() {
            Some((alpha, beta)) => self.gemm(a, b, c, alpha, beta, transpose_a, transpose_b),
            None => Ok(()),
        }
    }

    /// Batched form of [`gemm_request`](Self::gemm_request)
    fn batch_gemm_request(
        &self,
        a: &BatchView<'_, R, T>,
        b: &BatchView<'_, R, T>,
        c: &BatchView<'_, R, T>,
        transpose_a: bool,
        transpose_b: bool,
        req: WriteRequest,
    ) -> Result<()> {
        match req.coefficients::<T>() {
            Some((alpha, beta)) => {
                self.batch_gemm(a, b, c, alpha, beta, transpose_a, transpose_b)
            }
            None => Ok(()),
        }
    }
}
