//! CUDA runtime implementation

use super::cache::{
    get_or_create_client, is_cuda_context_valid, log_cuda_memory_error, try_get_cached_stream,
};
use super::client::{CudaAllocator, CudaClient};
use super::device::CudaDevice;
use crate::error::Result;
use crate::runtime::{Allocator, Runtime};
use cudarc::driver::DriverError;
use cudarc::driver::sys::CUresult;

#[inline]
fn driver_check(result: CUresult) -> Result<()> {
    if result != CUresult::CUDA_SUCCESS {
        return Err(DriverError(result).into());
    }
    Ok(())
}

/// CUDA Runtime adapter
///
/// Implements the generic Runtime trait for the CUDA backend. The
/// runtime-level memory functions go through the cached client of the
/// device, so they are ordered on the same stream as the operations.
#[derive(Clone, Debug, Default)]
pub struct CudaRuntime;

impl Runtime for CudaRuntime {
    type Device = CudaDevice;
    type Client = CudaClient;
    type Allocator = CudaAllocator;

    fn name() -> &'static str {
        "cuda"
    }

    fn allocate(size_bytes: usize, device: &Self::Device) -> Result<u64> {
        get_or_create_client(device)?.allocator.allocate(size_bytes)
    }

    fn deallocate(ptr: u64, _size_bytes: usize, device: &Self::Device) {
        if ptr == 0 {
            return;
        }

        // SAFETY: ptr was allocated by this runtime on `device`.
        unsafe {
            if !is_cuda_context_valid() {
                // Context is gone, the driver reclaims the memory
                return;
            }

            let result = match try_get_cached_stream(device.index) {
                Some(stream) => cudarc::driver::sys::cuMemFreeAsync(ptr, stream),
                None => cudarc::driver::sys::cuMemFree_v2(ptr),
            };

            if result != CUresult::CUDA_SUCCESS && result != CUresult::CUDA_ERROR_ILLEGAL_ADDRESS {
                log_cuda_memory_error("cuMemFree", ptr, result);
            }
        }
    }

    /// Copy host bytes to the device and wait for the copy.
    fn copy_to_device(src: &[u8], dst: u64, device: &Self::Device) -> Result<()> {
        if src.is_empty() || dst == 0 {
            return Ok(());
        }

        let client = get_or_create_client(device)?;
        client.context.bind_to_thread()?;

        // SAFETY: dst holds at least src.len() bytes; the host buffer stays
        // borrowed until the stream is synchronized below.
        driver_check(unsafe {
            cudarc::driver::sys::cuMemcpyHtoDAsync_v2(
                dst,
                src.as_ptr() as *const std::ffi::c_void,
                src.len(),
                client.stream.cu_stream(),
            )
        })?;
        client.stream.synchronize()?;
        Ok(())
    }

    /// Copy device bytes to the host, waiting for prior work on the stream.
    fn copy_from_device(src: u64, dst: &mut [u8], device: &Self::Device) -> Result<()> {
        if dst.is_empty() || src == 0 {
            return Ok(());
        }

        let client = get_or_create_client(device)?;
        client.context.bind_to_thread()?;

        // SAFETY: src holds at least dst.len() bytes; dst stays borrowed
        // until the stream is synchronized below.
        driver_check(unsafe {
            cudarc::driver::sys::cuMemcpyDtoHAsync_v2(
                dst.as_mut_ptr() as *mut std::ffi::c_void,
                src,
                dst.len(),
                client.stream.cu_stream(),
            )
        })?;
        client.stream.synchronize()?;
        Ok(())
    }

    fn copy_within_device(
        src: u64,
        dst: u64,
        size_bytes: usize,
        device: &Self::Device,
    ) -> Result<()> {
        if size_bytes == 0 || src == 0 || dst == 0 {
            return Ok(());
        }

        let client = get_or_create_client(device)?;
        client.context.bind_to_thread()?;

        // SAFETY: both regions are device memory of at least size_bytes.
        driver_check(unsafe {
            cudarc::driver::sys::cuMemcpyDtoDAsync_v2(
                dst,
                src,
                size_bytes,
                client.stream.cu_stream(),
            )
        })
    }

    fn default_device() -> Self::Device {
        CudaDevice::new(0)
    }

    /// Cached client of `device`
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be created (no such device, driver or
    /// library failure). [`CudaClient::new`] reports the same failure as an
    /// error.
    fn default_client(device: &Self::Device) -> Self::Client {
        match get_or_create_client(device) {
            Ok(client) => client,
            Err(e) => panic!("failed to create CUDA client for device {}: {e}", device.index),
        }
    }
}
