//! cuSOLVER dense bindings
//!
//! Only the Cholesky pair is bound: the workspace query and the
//! factorization. The status word is left on the device.

use super::CudaClient;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::ops::Triangle;
use crate::runtime::accel::{AcceleratorSolver, CholeskyCall};
use cudarc::cusolver::sys::{
    cublasFillMode_t, cusolverDnCreate, cusolverDnDestroy, cusolverDnDpotrf,
    cusolverDnDpotrf_bufferSize, cusolverDnHandle_t, cusolverDnSetStream, cusolverDnSpotrf,
    cusolverDnSpotrf_bufferSize, cusolverStatus_t,
};
use cudarc::driver::safe::CudaStream;

fn check(routine: &'static str, status: cusolverStatus_t) -> Result<()> {
    if status != cusolverStatus_t::CUSOLVER_STATUS_SUCCESS {
        return Err(Error::library_failure(routine, status as i64));
    }
    Ok(())
}

/// Owned cuSOLVER dense handle, destroyed on drop
pub(crate) struct CusolverHandle(cusolverDnHandle_t);

// SAFETY: the handle is only used through the client, whose stream
// serializes the work it issues.
unsafe impl Send for CusolverHandle {}
// SAFETY: as above.
unsafe impl Sync for CusolverHandle {}

impl CusolverHandle {
    /// Create a handle bound to `stream`
    pub(crate) fn new(stream: &CudaStream) -> Result<Self> {
        let mut handle: cusolverDnHandle_t = std::ptr::null_mut();
        // SAFETY: handle is written on success.
        check("cusolverDnCreate", unsafe { cusolverDnCreate(&mut handle) })?;
        let handle = Self(handle);
        // SAFETY: the handle is live and the stream outlives the client.
        check("cusolverDnSetStream", unsafe {
            cusolverDnSetStream(handle.0, stream.cu_stream() as _)
        })?;
        Ok(handle)
    }

    #[inline]
    fn raw(&self) -> cusolverDnHandle_t {
        self.0
    }
}

impl Drop for CusolverHandle {
    fn drop(&mut self) {
        // SAFETY: created by cusolverDnCreate and destroyed once.
        let status = unsafe { cusolverDnDestroy(self.0) };
        if status != cusolverStatus_t::CUSOLVER_STATUS_SUCCESS {
            tracing::warn!(?status, "cusolverDnDestroy failed");
        }
    }
}

#[inline]
fn fill_mode(fill: Triangle) -> cublasFillMode_t {
    match fill {
        Triangle::Lower => cublasFillMode_t::CUBLAS_FILL_MODE_LOWER,
        Triangle::Upper => cublasFillMode_t::CUBLAS_FILL_MODE_UPPER,
    }
}

/// Element types with a cuSOLVER Cholesky routine
pub trait CusolverElement: Element {
    /// Routine name used in error reports
    const POTRF: &'static str;

    /// `cusolverDn?potrf_bufferSize`
    ///
    /// # Safety
    ///
    /// `handle` must be live and `a` must point to an `n x n` matrix with
    /// leading dimension `lda` on the handle's device.
    unsafe fn potrf_buffer_size(
        handle: cusolverDnHandle_t,
        uplo: cublasFillMode_t,
        n: i32,
        a: *mut Self,
        lda: i32,
        lwork: *mut i32,
    ) -> cusolverStatus_t;

    /// `cusolverDn?potrf`
    ///
    /// # Safety
    ///
    /// As [`potrf_buffer_size`](Self::potrf_buffer_size); `work` holds
    /// `lwork` elements and `info` one device `i32`.
    #[allow(clippy::too_many_arguments)]
    unsafe fn potrf(
        handle: cusolverDnHandle_t,
        uplo: cublasFillMode_t,
        n: i32,
        a: *mut Self,
        lda: i32,
        work: *mut Self,
        lwork: i32,
        info: *mut i32,
    ) -> cusolverStatus_t;
}

macro_rules! impl_cusolver_element {
    ($ty:ty, $name:literal, $buffer_size:ident, $potrf:ident) => {
        impl CusolverElement for $ty {
            const POTRF: &'static str = $name;

            unsafe fn potrf_buffer_size(
                handle: cusolverDnHandle_t,
                uplo: cublasFillMode_t,
                n: i32,
                a: *mut Self,
                lda: i32,
                lwork: *mut i32,
            ) -> cusolverStatus_t {
                // SAFETY: forwarded caller contract.
                unsafe { $buffer_size(handle, uplo, n, a, lda, lwork) }
            }

            unsafe fn potrf(
                handle: cusolverDnHandle_t,
                uplo: cublasFillMode_t,
                n: i32,
                a: *mut Self,
                lda: i32,
                work: *mut Self,
                lwork: i32,
                info: *mut i32,
            ) -> cusolverStatus_t {
                // SAFETY: forwarded caller contract.
                unsafe { $potrf(handle, uplo, n, a, lda, work, lwork, info) }
            }
        }
    };
}

impl_cusolver_element!(f32, "cusolverDnSpotrf", cusolverDnSpotrf_bufferSize, cusolverDnSpotrf);
impl_cusolver_element!(f64, "cusolverDnDpotrf", cusolverDnDpotrf_bufferSize, cusolverDnDpotrf);

/// Narrow a dimension to the `int` the vendor API takes
pub(super) fn to_int(arg: &'static str, value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::InvalidArgument {
        arg,
        reason: format!("{value} exceeds the 32-bit range of the vendor library"),
    })
}

impl<T: CusolverElement> AcceleratorSolver<T> for CudaClient {
    fn potrf_buffer_size(&self, call: &CholeskyCall) -> Result<usize> {
        let mut lwork: i32 = 0;
        // SAFETY: the call describes a validated device matrix of this client.
        let status = unsafe {
            T::potrf_buffer_size(
                self.cusolver.raw(),
                fill_mode(call.fill),
                to_int("n", call.n)?,
                call.a as *mut T,
                to_int("lda", call.lda)?,
                &mut lwork,
            )
        };
        check(T::POTRF, status)?;
        Ok(lwork.max(0) as usize)
    }

    fn solver_potrf(
        &self,
        call: &CholeskyCall,
        workspace: u64,
        workspace_len: usize,
        info: u64,
    ) -> Result<()> {
        // SAFETY: workspace and info were allocated on this client's stream
        // with the sizes given.
        let status = unsafe {
            T::potrf(
                self.cusolver.raw(),
                fill_mode(call.fill),
                to_int("n", call.n)?,
                call.a as *mut T,
                to_int("lda", call.lda)?,
                workspace as *mut T,
                to_int("workspace", workspace_len)?,
                info as *mut i32,
            )
        };
        check(T::POTRF, status)
    }
}
