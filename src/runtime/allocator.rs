//! Memory allocator trait, default implementation and scoped scratch buffers
//!
//! Accelerator calls need short-lived device memory (batched pointer arrays,
//! solver workspace, identity matrices). [`ScratchBuffer`] ties such an
//! allocation to a scope: it is released when the guard drops, on every exit
//! path of the call that acquired it.

use crate::error::Result;

/// Memory allocator trait for runtime backends
pub trait Allocator: Clone + Send + Sync {
    /// Allocate memory of given size
    ///
    /// Returns a device pointer (u64) that can be used for operations.
    /// Returns `Err(OutOfMemory)` if allocation fails.
    fn allocate(&self, size_bytes: usize) -> Result<u64>;

    /// Deallocate memory
    ///
    /// On stream-ordered backends the release is enqueued after all work
    /// previously submitted to the allocator's stream.
    fn deallocate(&self, ptr: u64, size_bytes: usize);

    /// Get the total allocated bytes
    fn allocated_bytes(&self) -> usize {
        0 // Default: tracking not supported
    }
}

/// Default allocator that delegates to plain allocation functions
///
/// It doesn't support memory tracking.
#[derive(Clone, Debug)]
pub struct DefaultAllocator<D> {
    device: D,
    allocate_fn: fn(usize, &D) -> Result<u64>,
    deallocate_fn: fn(u64, usize, &D),
}

impl<D: Clone + Send + Sync> DefaultAllocator<D> {
    /// Create a new default allocator
    pub fn new(
        device: D,
        allocate_fn: fn(usize, &D) -> Result<u64>,
        deallocate_fn: fn(u64, usize, &D),
    ) -> Self {
        Self {
            device,
            allocate_fn,
            deallocate_fn,
        }
    }

    /// Get the device this allocator is associated with
    pub fn device(&self) -> &D {
        &self.device
    }
}

impl<D: Clone + Send + Sync> Allocator for DefaultAllocator<D> {
    fn allocate(&self, size_bytes: usize) -> Result<u64> {
        (self.allocate_fn)(size_bytes, &self.device)
    }

    fn deallocate(&self, ptr: u64, size_bytes: usize) {
        (self.deallocate_fn)(ptr, size_bytes, &self.device)
    }
}

/// Transient device allocation released when dropped
///
/// # Example
///
/// ```
/// use numla::runtime::{Runtime, RuntimeClient, ScratchBuffer};
/// use numla::runtime::cpu::CpuRuntime;
///
/// let client = CpuRuntime::default_client(&CpuRuntime::default_device());
/// let scratch = ScratchBuffer::new(client.allocator(), 64)?;
/// assert_eq!(scratch.size_in_bytes(), 64);
/// // freed here
/// # Ok::<(), numla::error::Error>(())
/// ```
pub struct ScratchBuffer<'a, A: Allocator> {
    allocator: &'a A,
    ptr: u64,
    size_bytes: usize,
}

impl<'a, A: Allocator> ScratchBuffer<'a, A> {
    /// Acquire `size_bytes` bytes from `allocator`
    pub fn new(allocator: &'a A, size_bytes: usize) -> Result<Self> {
        let ptr = allocator.allocate(size_bytes)?;
        Ok(Self {
            allocator,
            ptr,
            size_bytes,
        })
    }

    /// Acquire room for `count` values of `T`
    pub fn for_elements<T>(allocator: &'a A, count: usize) -> Result<Self> {
        Self::new(allocator, count * std::mem::size_of::<T>())
    }

    /// Device pointer to the start of the buffer
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.ptr
    }

    /// Size of the buffer in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.size_bytes
    }
}

impl<A: Allocator> Drop for ScratchBuffer<'_, A> {
    fn drop(&mut self) {
        self.allocator.deallocate(self.ptr, self.size_bytes);
    }
}
