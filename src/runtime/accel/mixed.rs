//! f16 GEMM with f32 compute

use super::layout::gemm_call;
use super::{AcceleratorClient, MathMode, MixedPrecisionGemm};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::matrix::{BatchView, MatrixView};
use crate::ops::validate::{check_batch_gemm, check_gemm, ensure_device};
use crate::runtime::{Device, Runtime};
use half::f16;

/// Sets a BLAS math mode and restores the previous one when dropped
///
/// Restoration happens on every exit path of the scope holding the guard,
/// including early returns with an error.
pub struct MathModeGuard<'c, C: MixedPrecisionGemm> {
    client: &'c C,
    previous: MathMode,
}

impl<'c, C: MixedPrecisionGemm> MathModeGuard<'c, C> {
    /// Capture the current mode of `client`, then switch to `mode`
    pub fn engage(client: &'c C, mode: MathMode) -> Result<Self> {
        let previous = client.math_mode()?;
        client.set_math_mode(mode)?;
        Ok(Self { client, previous })
    }

    /// Mode restored on drop
    pub fn previous(&self) -> MathMode {
        self.previous
    }
}

impl<C: MixedPrecisionGemm> Drop for MathModeGuard<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.client.set_math_mode(self.previous) {
            tracing::warn!(error = %e, previous = ?self.previous, "failed to restore BLAS math mode");
        }
    }
}

fn ensure_mixed_precision<R: Runtime, C: MixedPrecisionGemm>(client: &C) -> Result<()> {
    if !client.supports_mixed_precision() {
        return Err(Error::backend_limitation(
            R::name(),
            "gemm",
            "f16 GEMM needs mixed-precision support in the BLAS library",
        ));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn gemm_f16_unchecked<R, C>(
    client: &C,
    a: &MatrixView<'_, R, f16>,
    b: &MatrixView<'_, R, f16>,
    c: &MatrixView<'_, R, f16>,
    alpha: f32,
    beta: f32,
    transpose_a: bool,
    transpose_b: bool,
) -> Result<()>
where
    R: Runtime,
    C: AcceleratorClient<R> + MixedPrecisionGemm,
{
    let mode = if client.config().allow_tensor_core {
        MathMode::TensorOp
    } else {
        MathMode::Default
    };
    let _mode = MathModeGuard::engage(client, mode)?;

    let call = gemm_call(a, b, c, alpha, beta, transpose_a, transpose_b);
    tracing::trace!(backend = R::name(), op = "gemm", dtype = %DType::F16, ?mode, m = call.m, n = call.n, k = call.k);
    client.gemm_ex(&call, DType::F16)
}

/// `C := alpha · op(A) · op(B) + beta · C` with f16 buffers and f32 math
///
/// The scalars are widened to f32. When the client's config allows it the
/// BLAS handle runs in tensor-op math for this call only.
///
/// # Errors
///
/// `BackendLimitation` if the BLAS library has no mixed-precision GEMM; no
/// fallback is attempted.
#[allow(clippy::too_many_arguments)]
pub fn gemm_f16<R, C>(
    client: &C,
    a: &MatrixView<'_, R, f16>,
    b: &MatrixView<'_, R, f16>,
    c: &MatrixView<'_, R, f16>,
    alpha: f16,
    beta: f16,
    transpose_a: bool,
    transpose_b: bool,
) -> Result<()>
where
    R: Runtime,
    C: AcceleratorClient<R> + MixedPrecisionGemm,
{
    ensure_device(
        client.device().id(),
        &[a.device_id(), b.device_id(), c.device_id()],
    )?;
    check_gemm(a, b, c, transpose_a, transpose_b)?;
    ensure_mixed_precision::<R, C>(client)?;

    gemm_f16_unchecked(
        client,
        a,
        b,
        c,
        alpha.to_f32(),
        beta.to_f32(),
        transpose_a,
        transpose_b,
    )
}

/// Batched [`gemm_f16`], one mixed-precision GEMM per slice
#[allow(clippy::too_many_arguments)]
pub fn batch_gemm_f16<R, C>(
    client: &C,
    a: &BatchView<'_, R, f16>,
    b: &BatchView<'_, R, f16>,
    c: &BatchView<'_, R, f16>,
    alpha: f16,
    beta: f16,
    transpose_a: bool,
    transpose_b: bool,
) -> Result<()>
where
    R: Runtime,
    C: AcceleratorClient<R> + MixedPrecisionGemm,
{
    ensure_device(
        client.device().id(),
        &[a.device_id(), b.device_id(), c.device_id()],
    )?;
    check_batch_gemm(a, b, c, transpose_a, transpose_b)?;
    ensure_mixed_precision::<R, C>(client)?;

    let (alpha, beta) = (alpha.to_f32(), beta.to_f32());
    for i in 0..a.batch() {
        gemm_f16_unchecked(
            client,
            &a.matrix(i),
            &b.matrix(i),
            &c.matrix(i),
            alpha,
            beta,
            transpose_a,
            transpose_b,
        )?;
    }
    Ok(())
}
