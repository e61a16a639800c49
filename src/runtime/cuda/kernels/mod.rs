//! Helper kernels for the accelerator operations
//!
//! Two small kernels support the vendor calls: one writes the per-matrix
//! pointer array a batched cuBLAS call consumes, the other fills stacked
//! identity matrices for the inverse-from-factor composition. They are
//! compiled with NVRTC for the device's architecture the first time a client
//! is created on that device.

mod loader;

pub(super) use loader::HelperKernels;

/// CUDA C source of the helper kernels
const HELPER_SOURCE: &str = r#"
extern "C" __global__ void collect_batch_offsets(
    unsigned long long* dst,
    unsigned long long base,
    unsigned long long stride,
    unsigned int count)
{
    unsigned int step = blockDim.x * gridDim.x;
    for (unsigned int i = blockIdx.x * blockDim.x + threadIdx.x; i < count; i += step) {
        dst[i] = base + (unsigned long long)i * stride;
    }
}

#define INIT_IDENTITY(T, NAME)                                                  \
extern "C" __global__ void NAME(                                                \
    T* dst,                                                                     \
    unsigned long long matrix_stride,                                           \
    unsigned long long ld,                                                      \
    unsigned long long numel)                                                   \
{                                                                               \
    unsigned long long step = (unsigned long long)blockDim.x * gridDim.x;      \
    for (unsigned long long i = (unsigned long long)blockIdx.x * blockDim.x    \
             + threadIdx.x; i < numel; i += step) {                             \
        unsigned long long j = i % matrix_stride;                               \
        dst[i] = (j / ld == j % ld) ? (T)1 : (T)0;                              \
    }                                                                           \
}

INIT_IDENTITY(float, init_identity_f32)
INIT_IDENTITY(double, init_identity_f64)
"#;

/// Kernel names in [`HELPER_SOURCE`]
mod names {
    pub const BATCH_OFFSETS: &str = "collect_batch_offsets";
    pub const IDENTITY_F32: &str = "init_identity_f32";
    pub const IDENTITY_F64: &str = "init_identity_f64";
}

/// Threads per block for the helper kernels
const BLOCK_SIZE: u32 = 256;

/// Grid-stride kernels never need more blocks than this
const MAX_GRID: u32 = 65_535;

/// 1D grid covering `count` threads, capped at [`MAX_GRID`] blocks
#[inline]
fn grid_size(count: usize) -> u32 {
    let blocks = count.div_ceil(BLOCK_SIZE as usize);
    blocks.clamp(1, MAX_GRID as usize) as u32
}
