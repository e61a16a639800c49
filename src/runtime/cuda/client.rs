//! CUDA Client implementation
//!
//! CudaClient owns the context, stream and library handles of one device.
//!
//! # Thread Safety
//!
//! `CudaClient` is `Clone` and can be shared across threads; clones share
//! the same stream and handles through `Arc`. Operations enqueued from
//! different threads on the same client are serialized by the stream, not
//! by the client.

use cudarc::cublas::CudaBlas;
use cudarc::driver::safe::{CudaContext, CudaStream};
use std::sync::Arc;

use super::CudaRuntime;
use super::cache::{is_cuda_context_valid, log_cuda_memory_error};
use super::device::CudaDevice;
use super::kernels::HelperKernels;
use super::solver::CusolverHandle;
use crate::config::AcceleratorConfig;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::accel::{AcceleratorClient, AcceleratorKernels};
use crate::runtime::{Allocator, RuntimeClient};

// ============================================================================
// CudaClient
// ============================================================================

/// CUDA Runtime Client
///
/// All work of every operation is enqueued on `self.stream`: vendor library
/// calls (both handles are bound to it), helper kernels, scratch allocation
/// and release. Work issued on another stream is not ordered against it.
#[derive(Clone)]
pub struct CudaClient {
    /// GPU device index
    pub(crate) device: CudaDevice,

    /// CUDA context for this device
    pub(crate) context: Arc<CudaContext>,

    /// Stream on which all work launches
    pub(crate) stream: Arc<CudaStream>,

    /// cuBLAS handle bound to `stream`
    pub(crate) cublas: Arc<CudaBlas>,

    /// cuSOLVER dense handle bound to `stream`
    pub(crate) cusolver: Arc<CusolverHandle>,

    /// Batch-offset and identity kernels
    pub(crate) kernels: Arc<HelperKernels>,

    /// Stream-ordered allocator for scratch and storage
    pub(crate) allocator: CudaAllocator,

    /// Settings read when the client was created
    pub(crate) config: AcceleratorConfig,
}

impl std::fmt::Debug for CudaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaClient")
            .field("device", &self.device)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// CudaAllocator
// ============================================================================

/// CUDA allocator that uses stream-ordered allocation.
///
/// `cuMemAllocAsync` and `cuMemFreeAsync` on the client's stream: a release
/// takes effect after every kernel enqueued before it, so scratch can be
/// freed as soon as the call that uses it has been issued.
#[derive(Clone)]
pub struct CudaAllocator {
    context: Arc<CudaContext>,
    stream: Arc<CudaStream>,
}

impl CudaAllocator {
    pub(crate) fn new(context: Arc<CudaContext>, stream: Arc<CudaStream>) -> Self {
        Self { context, stream }
    }
}

impl Allocator for CudaAllocator {
    fn allocate(&self, size_bytes: usize) -> Result<u64> {
        if size_bytes == 0 {
            return Ok(0);
        }
        self.context.bind_to_thread()?;

        let mut ptr: u64 = 0;
        // SAFETY: the stream belongs to the bound context; ptr is written on success.
        let result = unsafe {
            cudarc::driver::sys::cuMemAllocAsync(&mut ptr, size_bytes, self.stream.cu_stream())
        };

        match result {
            cudarc::driver::sys::CUresult::CUDA_SUCCESS => Ok(ptr),
            cudarc::driver::sys::CUresult::CUDA_ERROR_OUT_OF_MEMORY => {
                Err(Error::OutOfMemory { size: size_bytes })
            }
            other => Err(cudarc::driver::DriverError(other).into()),
        }
    }

    fn deallocate(&self, ptr: u64, _size_bytes: usize) {
        if ptr == 0 {
            return;
        }

        // SAFETY: ptr came from cuMemAllocAsync on this stream.
        unsafe {
            if !is_cuda_context_valid() && self.context.bind_to_thread().is_err() {
                // Context is gone, the driver reclaims the memory
                return;
            }

            let result = cudarc::driver::sys::cuMemFreeAsync(ptr, self.stream.cu_stream());
            if result != cudarc::driver::sys::CUresult::CUDA_SUCCESS
                && result != cudarc::driver::sys::CUresult::CUDA_ERROR_ILLEGAL_ADDRESS
            {
                log_cuda_memory_error("cuMemFreeAsync", ptr, result);
            }
        }
    }
}

// ============================================================================
// CudaClient Implementation
// ============================================================================

impl CudaClient {
    /// Create a new CUDA client for a device.
    ///
    /// Creates the context and a stream, binds fresh cuBLAS and cuSOLVER
    /// handles to it, loads the helper kernels and reads
    /// [`AcceleratorConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Returns an error if the device does not exist, a library handle
    /// cannot be created or the helper kernels fail to compile.
    pub fn new(device: CudaDevice) -> Result<Self> {
        Self::with_config(device, AcceleratorConfig::from_env())
    }

    /// Create a client with explicit settings instead of the environment
    pub fn with_config(device: CudaDevice, config: AcceleratorConfig) -> Result<Self> {
        let context = CudaContext::new(device.index)?;
        context.bind_to_thread()?;

        let stream = context.new_stream()?;

        let cublas = CudaBlas::new(stream.clone())
            .map_err(|e| Error::Internal(format!("Failed to initialize cuBLAS: {e:?}")))?;
        let cusolver = CusolverHandle::new(&stream)?;
        let kernels = HelperKernels::load(&context, &device)?;

        let allocator = CudaAllocator::new(context.clone(), stream.clone());

        tracing::debug!(device = device.index, ?config, "created CUDA client");
        Ok(Self {
            device,
            context,
            stream,
            cublas: Arc::new(cublas),
            cusolver: Arc::new(cusolver),
            kernels: Arc::new(kernels),
            allocator,
            config,
        })
    }

    /// Get reference to the CUDA stream.
    ///
    /// Work that reads or writes operands of this client's operations must be
    /// enqueued here, or synchronized with it.
    #[inline]
    pub fn stream(&self) -> &CudaStream {
        &self.stream
    }

    /// Get reference to the CUDA context.
    #[inline]
    pub fn context(&self) -> &Arc<CudaContext> {
        &self.context
    }

    /// Get reference to the cuBLAS handle.
    #[inline]
    pub fn cublas(&self) -> &CudaBlas {
        &self.cublas
    }
}

impl RuntimeClient<CudaRuntime> for CudaClient {
    fn device(&self) -> &CudaDevice {
        &self.device
    }

    fn synchronize(&self) {
        if let Err(e) = self.stream.synchronize() {
            tracing::error!(device = self.device.index, error = ?e, "stream synchronization failed");
        }
    }

    fn allocator(&self) -> &CudaAllocator {
        &self.allocator
    }
}

impl AcceleratorKernels for CudaClient {
    fn collect_batch_offsets(
        &self,
        dst: u64,
        base: u64,
        stride_bytes: usize,
        count: usize,
    ) -> Result<()> {
        self.kernels
            .collect_batch_offsets(&self.stream, dst, base, stride_bytes, count)
    }

    fn init_identity<T: Element>(
        &self,
        dst: u64,
        matrix_stride: usize,
        ld: usize,
        numel: usize,
    ) -> Result<()> {
        self.kernels
            .init_identity(&self.stream, T::DTYPE, dst, matrix_stride, ld, numel)
    }

    fn copy_device(&self, src: u64, dst: u64, size_bytes: usize) -> Result<()> {
        if size_bytes == 0 || src == dst {
            return Ok(());
        }
        self.context.bind_to_thread()?;

        // SAFETY: both regions are device memory of at least size_bytes.
        let result = unsafe {
            cudarc::driver::sys::cuMemcpyDtoDAsync_v2(dst, src, size_bytes, self.stream.cu_stream())
        };
        if result != cudarc::driver::sys::CUresult::CUDA_SUCCESS {
            return Err(cudarc::driver::DriverError(result).into());
        }
        Ok(())
    }
}

impl AcceleratorClient<CudaRuntime> for CudaClient {
    fn config(&self) -> AcceleratorConfig {
        self.config
    }
}
