//! One shared CUDA client per device
//!
//! `CudaRuntime::default_client` and the storage copy paths go through here, so
//! operations and transfers on a device share one stream.

use super::client::CudaClient;
use super::device::CudaDevice;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// Device index -> cached client
///
/// Creating a client builds a context, a stream, two library handles and
/// compiles the helper kernels; the runtime-level entry points reuse one per
/// device.
static CLIENT_CACHE: OnceLock<Mutex<HashMap<usize, CudaClient>>> = OnceLock::new();

/// True when the calling thread has a current CUDA context
///
/// # Safety
///
/// Calls the driver API directly; the answer holds for the calling thread only.
#[inline]
pub(super) unsafe fn is_cuda_context_valid() -> bool {
    let mut ctx: cudarc::driver::sys::CUcontext = std::ptr::null_mut();
    // SAFETY: cuCtxGetCurrent only writes to the provided pointer.
    let result = unsafe { cudarc::driver::sys::cuCtxGetCurrent(&mut ctx) };
    result == cudarc::driver::sys::CUresult::CUDA_SUCCESS && !ctx.is_null()
}

/// Lock the cache, ignoring poison
///
/// Inserting a client is the only mutation, so the map stays consistent even
/// if a holder panicked.
#[inline]
fn lock_client_cache(
    cache: &Mutex<HashMap<usize, CudaClient>>,
) -> MutexGuard<'_, HashMap<usize, CudaClient>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared client for `device`, built on first use
pub(super) fn get_or_create_client(device: &CudaDevice) -> Result<CudaClient> {
    let cache = CLIENT_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut cache_guard = lock_client_cache(cache);

    if let Some(client) = cache_guard.get(&device.index) {
        return Ok(client.clone());
    }

    let client = CudaClient::new(device.clone())?;
    cache_guard.insert(device.index, client.clone());
    tracing::debug!(device = device.index, "created cached CUDA client");

    Ok(client)
}

/// Stream of the shared client for a device index, if one was built
#[inline]
pub(super) fn try_get_cached_stream(device_index: usize) -> Option<cudarc::driver::sys::CUstream> {
    let cache = CLIENT_CACHE.get()?;
    let guard = lock_client_cache(cache);
    guard
        .get(&device_index)
        .map(|client| client.stream.cu_stream())
}

/// Log a failed device free (deallocation cannot return an error)
#[cold]
#[inline(never)]
pub(super) fn log_cuda_memory_error(
    operation: &str,
    ptr: u64,
    result: cudarc::driver::sys::CUresult,
) {
    tracing::warn!(operation, ptr, ?result, "CUDA memory release failed");
}
