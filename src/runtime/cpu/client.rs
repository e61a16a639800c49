//! CPU client and allocator implementation

use super::device::CpuDevice;
use super::runtime::{CpuRuntime, host_allocate, host_deallocate};
use crate::runtime::{DefaultAllocator, RuntimeClient};

/// CPU client for operation dispatch
///
/// The host backend has no stream and no library handles: each call is a
/// blocking invocation of the host kernels on the calling thread.
#[derive(Clone, Debug)]
pub struct CpuClient {
    pub(crate) device: CpuDevice,
    allocator: CpuAllocator,
}

impl CpuClient {
    /// Create a new CPU client
    pub fn new(device: CpuDevice) -> Self {
        let allocator = DefaultAllocator::new(
            device,
            |size, _dev| host_allocate(size),
            |ptr, size, _dev| host_deallocate(ptr, size),
        );
        Self { device, allocator }
    }
}

impl RuntimeClient<CpuRuntime> for CpuClient {
    fn device(&self) -> &CpuDevice {
        &self.device
    }

    fn synchronize(&self) {
        // CPU operations are synchronous, nothing to do
    }

    fn allocator(&self) -> &CpuAllocator {
        &self.allocator
    }
}

/// CPU-specific allocator type alias
pub type CpuAllocator = DefaultAllocator<CpuDevice>;
