//! NVRTC compilation, per-device module cache and launch wrappers

use super::{BLOCK_SIZE, HELPER_SOURCE, grid_size, names};
use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::runtime::cuda::CudaDevice;
use cudarc::driver::PushKernelArg;
use cudarc::driver::safe::{CudaContext, CudaFunction, CudaModule, CudaStream, LaunchConfig};
use cudarc::nvrtc::{CompileOptions, compile_ptx_with_opts};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// Compiled helper module per device index
static MODULE_CACHE: OnceLock<Mutex<HashMap<usize, Arc<CudaModule>>>> = OnceLock::new();

/// NVRTC target for a compute capability
///
/// Native `sm_XY` code avoids PTX ISA mismatches between the toolkit and the
/// driver. Compile options hold `&'static str`, and the result is cached per
/// device, so one small string per device is leaked.
fn target_arch(major: u32, minor: u32) -> &'static str {
    Box::leak(format!("sm_{major}{minor}").into_boxed_str())
}

/// Compile the helper source for `device`, or reuse the cached module.
fn get_or_load_module(context: &Arc<CudaContext>, device: &CudaDevice) -> Result<Arc<CudaModule>> {
    let cache = MODULE_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().map_err(|e| {
        Error::Internal(format!(
            "Failed to acquire module cache lock (Mutex poisoned): {e}"
        ))
    })?;

    if let Some(module) = guard.get(&device.index) {
        return Ok(module.clone());
    }

    let (major, minor) = device.compute_capability()?;
    let opts = CompileOptions {
        arch: Some(target_arch(major, minor)),
        ..Default::default()
    };
    let ptx = compile_ptx_with_opts(HELPER_SOURCE, opts)
        .map_err(|e| Error::Internal(format!("NVRTC compilation of helper kernels failed: {e:?}")))?;
    let module = context.load_module(ptx)?;
    tracing::debug!(device = device.index, major, minor, "compiled helper kernels");

    guard.insert(device.index, module.clone());
    Ok(module)
}

fn load_function(module: &Arc<CudaModule>, name: &'static str) -> Result<CudaFunction> {
    module
        .load_function(name)
        .map_err(|e| Error::Internal(format!("Failed to get kernel '{name}': {e:?}")))
}

#[inline]
fn launch_config(count: usize) -> LaunchConfig {
    LaunchConfig {
        grid_dim: (grid_size(count), 1, 1),
        block_dim: (BLOCK_SIZE, 1, 1),
        shared_mem_bytes: 0,
    }
}

/// Loaded helper kernels of one device
pub(crate) struct HelperKernels {
    batch_offsets: CudaFunction,
    identity_f32: CudaFunction,
    identity_f64: CudaFunction,
}

impl HelperKernels {
    /// Compile (once per device) and load the helper kernels
    pub(crate) fn load(context: &Arc<CudaContext>, device: &CudaDevice) -> Result<Self> {
        let module = get_or_load_module(context, device)?;
        Ok(Self {
            batch_offsets: load_function(&module, names::BATCH_OFFSETS)?,
            identity_f32: load_function(&module, names::IDENTITY_F32)?,
            identity_f64: load_function(&module, names::IDENTITY_F64)?,
        })
    }

    /// `dst[i] = base + i * stride_bytes` for `i < count`
    pub(crate) fn collect_batch_offsets(
        &self,
        stream: &CudaStream,
        dst: u64,
        base: u64,
        stride_bytes: usize,
        count: usize,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let count_u32 = u32::try_from(count).map_err(|_| Error::InvalidArgument {
            arg: "batch",
            reason: format!("{count} matrices exceed the batch-offset kernel range"),
        })?;
        let stride = stride_bytes as u64;

        let mut builder = stream.launch_builder(&self.batch_offsets);
        builder.arg(&dst);
        builder.arg(&base);
        builder.arg(&stride);
        builder.arg(&count_u32);

        // SAFETY: dst holds `count` u64 slots on the stream's device; the
        // argument list matches the kernel signature.
        unsafe { builder.launch(launch_config(count)) }?;
        Ok(())
    }

    /// Stacked identities of `dtype` over `numel` elements at `dst`
    pub(crate) fn init_identity(
        &self,
        stream: &CudaStream,
        dtype: DType,
        dst: u64,
        matrix_stride: usize,
        ld: usize,
        numel: usize,
    ) -> Result<()> {
        if numel == 0 {
            return Ok(());
        }
        let func = match dtype {
            DType::F32 => &self.identity_f32,
            DType::F64 => &self.identity_f64,
            _ => {
                return Err(Error::UnsupportedDType {
                    dtype,
                    op: "init_identity",
                });
            }
        };
        let (matrix_stride, ld, numel_u64) = (matrix_stride as u64, ld as u64, numel as u64);

        let mut builder = stream.launch_builder(func);
        builder.arg(&dst);
        builder.arg(&matrix_stride);
        builder.arg(&ld);
        builder.arg(&numel_u64);

        // SAFETY: dst holds `numel` elements of `dtype`; matrix_stride and ld
        // are non-zero whenever numel is.
        unsafe { builder.launch(launch_config(numel)) }?;
        Ok(())
    }
}
