//! CPU runtime implementation

use super::client::{CpuAllocator, CpuClient};
use super::device::CpuDevice;
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use std::alloc::{Layout as AllocLayout, alloc_zeroed, dealloc};

/// Alignment of host allocations (one cache line, wide enough for AVX-512)
pub(crate) const HOST_ALIGN: usize = 64;

/// CPU compute runtime
///
/// Memory is allocated on the heap using the system allocator, and every
/// operation runs to completion on the calling thread.
#[derive(Clone, Debug, Default)]
pub struct CpuRuntime;

/// Allocate zeroed, aligned host memory
pub(crate) fn host_allocate(size_bytes: usize) -> Result<u64> {
    if size_bytes == 0 {
        return Ok(0);
    }

    let layout = AllocLayout::from_size_align(size_bytes, HOST_ALIGN).map_err(|e| {
        Error::InvalidArgument {
            arg: "size_bytes",
            reason: e.to_string(),
        }
    })?;

    // SAFETY: layout has non-zero size.
    let ptr = unsafe { alloc_zeroed(layout) };
    if ptr.is_null() {
        return Err(Error::OutOfMemory { size: size_bytes });
    }

    Ok(ptr as u64)
}

/// Release memory obtained from [`host_allocate`]
pub(crate) fn host_deallocate(ptr: u64, size_bytes: usize) {
    if ptr == 0 || size_bytes == 0 {
        return;
    }

    if let Ok(layout) = AllocLayout::from_size_align(size_bytes, HOST_ALIGN) {
        // SAFETY: ptr was returned by host_allocate with this exact layout.
        unsafe {
            dealloc(ptr as *mut u8, layout);
        }
    }
}

impl Runtime for CpuRuntime {
    type Device = CpuDevice;
    type Client = CpuClient;
    type Allocator = CpuAllocator;

    fn name() -> &'static str {
        "cpu"
    }

    fn allocate(size_bytes: usize, _device: &Self::Device) -> Result<u64> {
        host_allocate(size_bytes)
    }

    fn deallocate(ptr: u64, size_bytes: usize, _device: &Self::Device) {
        host_deallocate(ptr, size_bytes)
    }

    fn copy_to_device(src: &[u8], dst: u64, _device: &Self::Device) -> Result<()> {
        if src.is_empty() || dst == 0 {
            return Ok(());
        }

        // SAFETY: dst was allocated by this runtime with at least src.len() bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), dst as *mut u8, src.len());
        }
        Ok(())
    }

    fn copy_from_device(src: u64, dst: &mut [u8], _device: &Self::Device) -> Result<()> {
        if dst.is_empty() || src == 0 {
            return Ok(());
        }

        // SAFETY: src was allocated by this runtime with at least dst.len() bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }

    fn copy_within_device(
        src: u64,
        dst: u64,
        size_bytes: usize,
        _device: &Self::Device,
    ) -> Result<()> {
        if size_bytes == 0 || src == 0 || dst == 0 {
            return Ok(());
        }

        // SAFETY: both regions are host memory of at least size_bytes; copy
        // (not copy_nonoverlapping) tolerates overlap.
        unsafe {
            std::ptr::copy(src as *const u8, dst as *mut u8, size_bytes);
        }
        Ok(())
    }

    fn default_device() -> Self::Device {
        CpuDevice::new()
    }

    fn default_client(device: &Self::Device) -> Self::Client {
        CpuClient::new(*device)
    }
}
