//! Host-memory emulation of a column-major accelerator
//!
//! `EmuRuntime` keeps its buffers in host memory but only offers the vendor
//! interface of an accelerator: column-major BLAS entry points, a dense
//! Cholesky with a caller-provided workspace and a status word, the two
//! helper kernels, and a BLAS math mode. The numerical work is done by the
//! host kernels on column-major descriptors, so the generic accelerator
//! implementation (layout translation, pointer arrays, scratch, POTRI
//! synthesis) runs unchanged and can be compared against the CPU backend.

use numla::config::AcceleratorConfig;
use numla::dtype::{DType, Element, LinalgElement};
use numla::error::{Error, Result};
use numla::matrix::{BatchView, MatrixView};
use numla::ops::{CholeskyOps, GemmOps, Side, Triangle, TriangularOps};
use numla::runtime::accel::{
    self, AcceleratorBlas, AcceleratorClient, AcceleratorKernels, AcceleratorSolver, CholeskyCall,
    GemmCall, MathMode, MixedPrecisionGemm, TriangularCall,
};
use numla::runtime::cpu::kernels::{
    StridedMatrix, gemm_kernel, potrf_kernel, trmm_kernel, trsm_kernel,
};
use numla::runtime::cpu::{CpuDevice, CpuRuntime};
use numla::runtime::{Allocator, Device, Runtime, RuntimeClient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Runtime, device, allocator
// ============================================================================

#[derive(Clone, Debug)]
pub struct EmuDevice {
    id: usize,
}

impl EmuDevice {
    pub fn new(id: usize) -> Self {
        Self { id }
    }
}

impl Device for EmuDevice {
    fn id(&self) -> usize {
        self.id
    }

    fn name(&self) -> String {
        format!("emu:{}", self.id)
    }
}

/// Host allocator that tracks live bytes
#[derive(Clone, Default)]
pub struct EmuAllocator {
    live: Arc<AtomicUsize>,
}

impl Allocator for EmuAllocator {
    fn allocate(&self, size_bytes: usize) -> Result<u64> {
        let ptr = CpuRuntime::allocate(size_bytes, &CpuDevice::new())?;
        self.live.fetch_add(size_bytes, Ordering::SeqCst);
        Ok(ptr)
    }

    fn deallocate(&self, ptr: u64, size_bytes: usize) {
        CpuRuntime::deallocate(ptr, size_bytes, &CpuDevice::new());
        self.live.fetch_sub(size_bytes, Ordering::SeqCst);
    }

    fn allocated_bytes(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Debug, Default)]
pub struct EmuRuntime;

impl Runtime for EmuRuntime {
    type Device = EmuDevice;
    type Client = EmuClient;
    type Allocator = EmuAllocator;

    fn name() -> &'static str {
        "emu"
    }

    fn allocate(size_bytes: usize, _device: &Self::Device) -> Result<u64> {
        CpuRuntime::allocate(size_bytes, &CpuDevice::new())
    }

    fn deallocate(ptr: u64, size_bytes: usize, _device: &Self::Device) {
        CpuRuntime::deallocate(ptr, size_bytes, &CpuDevice::new())
    }

    fn copy_to_device(src: &[u8], dst: u64, _device: &Self::Device) -> Result<()> {
        CpuRuntime::copy_to_device(src, dst, &CpuDevice::new())
    }

    fn copy_from_device(src: u64, dst: &mut [u8], _device: &Self::Device) -> Result<()> {
        CpuRuntime::copy_from_device(src, dst, &CpuDevice::new())
    }

    fn copy_within_device(
        src: u64,
        dst: u64,
        size_bytes: usize,
        _device: &Self::Device,
    ) -> Result<()> {
        CpuRuntime::copy_within_device(src, dst, size_bytes, &CpuDevice::new())
    }

    fn default_device() -> Self::Device {
        EmuDevice::new(0)
    }

    fn default_client(device: &Self::Device) -> Self::Client {
        EmuClient::new(device.clone(), AcceleratorConfig::default())
    }
}

// ============================================================================
// Client
// ============================================================================

/// Emulated accelerator client
///
/// Records every vendor entry point it serves in `calls` and every math-mode
/// change in `mode_history`.
#[derive(Clone)]
pub struct EmuClient {
    device: EmuDevice,
    allocator: EmuAllocator,
    config: AcceleratorConfig,
    mixed_precision: bool,
    fail_mixed_gemm: bool,
    mode: Arc<Mutex<MathMode>>,
    mode_history: Arc<Mutex<Vec<MathMode>>>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl EmuClient {
    pub fn new(device: EmuDevice, config: AcceleratorConfig) -> Self {
        Self {
            device,
            allocator: EmuAllocator::default(),
            config,
            mixed_precision: true,
            fail_mixed_gemm: false,
            mode: Arc::new(Mutex::new(MathMode::Default)),
            mode_history: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pretend the BLAS library has no mixed-precision GEMM
    pub fn without_mixed_precision(mut self) -> Self {
        self.mixed_precision = false;
        self
    }

    /// Make the mixed-precision GEMM report a failure after the mode switch
    pub fn failing_mixed_gemm(mut self) -> Self {
        self.fail_mixed_gemm = true;
        self
    }

    pub fn current_mode(&self) -> MathMode {
        *self.mode.lock().unwrap()
    }

    pub fn mode_history(&self) -> Vec<MathMode> {
        self.mode_history.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RuntimeClient<EmuRuntime> for EmuClient {
    fn device(&self) -> &EmuDevice {
        &self.device
    }

    fn synchronize(&self) {}

    fn allocator(&self) -> &EmuAllocator {
        &self.allocator
    }
}

impl AcceleratorClient<EmuRuntime> for EmuClient {
    fn config(&self) -> AcceleratorConfig {
        self.config
    }
}

impl AcceleratorKernels for EmuClient {
    fn collect_batch_offsets(
        &self,
        dst: u64,
        base: u64,
        stride_bytes: usize,
        count: usize,
    ) -> Result<()> {
        self.record("collect_batch_offsets");
        let dst = dst as *mut u64;
        for i in 0..count {
            // SAFETY: dst holds `count` slots.
            unsafe { *dst.add(i) = base + (i * stride_bytes) as u64 };
        }
        Ok(())
    }

    fn init_identity<T: Element>(
        &self,
        dst: u64,
        matrix_stride: usize,
        ld: usize,
        numel: usize,
    ) -> Result<()> {
        self.record("init_identity");
        let dst = dst as *mut T;
        for i in 0..numel {
            let j = i % matrix_stride;
            let value = if j / ld == j % ld { T::one() } else { T::zero() };
            // SAFETY: dst holds `numel` elements.
            unsafe { *dst.add(i) = value };
        }
        Ok(())
    }

    fn copy_device(&self, src: u64, dst: u64, size_bytes: usize) -> Result<()> {
        self.record("copy_device");
        EmuRuntime::copy_within_device(src, dst, size_bytes, &self.device)
    }
}

// ============================================================================
// Column-major vendor entry points
// ============================================================================

/// Column-major `rows x cols` descriptor, optionally transposed
fn cm<T: Copy>(ptr: u64, rows: usize, cols: usize, ld: usize) -> StridedMatrix<T> {
    // SAFETY: the accelerator layer only issues calls on validated views.
    unsafe { StridedMatrix::col_major(ptr as *mut T, rows, cols, ld) }
}

/// Stored shape of an operand whose `op` is `rows x cols`
fn stored(rows: usize, cols: usize, transpose: bool) -> (usize, usize) {
    if transpose { (cols, rows) } else { (rows, cols) }
}

fn pointer_at(array: u64, i: usize) -> u64 {
    // SAFETY: pointer arrays hold one u64 per batch entry.
    unsafe { *(array as *const u64).add(i) }
}

fn run_gemm<T: Element>(call: &GemmCall<T>) {
    let (ar, ac) = stored(call.m, call.k, call.transa);
    let (br, bc) = stored(call.k, call.n, call.transb);
    // SAFETY: shapes validated by the accelerator layer.
    unsafe {
        gemm_kernel(
            cm::<T>(call.a, ar, ac, call.lda).op(call.transa),
            cm::<T>(call.b, br, bc, call.ldb).op(call.transb),
            cm::<T>(call.c, call.m, call.n, call.ldc),
            call.alpha,
            call.beta,
        )
    }
}

fn triangular_order<T>(call: &TriangularCall<T>) -> usize {
    match call.side {
        Side::Left => call.m,
        Side::Right => call.n,
    }
}

/// Element types the emulated vendor library computes in
pub trait EmuElement: LinalgElement {}

impl EmuElement for f32 {}
impl EmuElement for f64 {}

impl<T: EmuElement> AcceleratorBlas<T> for EmuClient {
    fn blas_gemm(&self, call: &GemmCall<T>) -> Result<()> {
        self.record("gemm");
        run_gemm(call);
        Ok(())
    }

    fn blas_gemm_batched(&self, call: &GemmCall<T>, batch: usize) -> Result<()> {
        self.record("gemm_batched");
        for i in 0..batch {
            let slice = call.with_pointers(
                pointer_at(call.a, i),
                pointer_at(call.b, i),
                pointer_at(call.c, i),
            );
            run_gemm(&slice);
        }
        Ok(())
    }

    fn blas_trsm(&self, call: &TriangularCall<T>) -> Result<()> {
        self.record("trsm");
        let n = triangular_order(call);
        // SAFETY: shapes validated by the accelerator layer.
        unsafe {
            trsm_kernel(
                cm::<T>(call.a, n, n, call.lda),
                cm::<T>(call.b, call.m, call.n, call.ldb),
                call.alpha,
                call.side,
                call.fill,
                call.transa,
            )
        }
        Ok(())
    }

    fn blas_trsm_batched(&self, call: &TriangularCall<T>, batch: usize) -> Result<()> {
        self.record("trsm_batched");
        let n = triangular_order(call);
        for i in 0..batch {
            // SAFETY: as for blas_trsm, one slice at a time.
            unsafe {
                trsm_kernel(
                    cm::<T>(pointer_at(call.a, i), n, n, call.lda),
                    cm::<T>(pointer_at(call.b, i), call.m, call.n, call.ldb),
                    call.alpha,
                    call.side,
                    call.fill,
                    call.transa,
                )
            }
        }
        Ok(())
    }

    fn blas_trmm(&self, call: &TriangularCall<T>) -> Result<()> {
        self.record("trmm");
        let n = triangular_order(call);
        // SAFETY: shapes validated by the accelerator layer.
        unsafe {
            trmm_kernel(
                cm::<T>(call.a, n, n, call.lda),
                cm::<T>(call.b, call.m, call.n, call.ldb),
                call.alpha,
                call.side,
                call.fill,
                call.transa,
            )
        }
        Ok(())
    }
}

impl<T: EmuElement> AcceleratorSolver<T> for EmuClient {
    fn potrf_buffer_size(&self, call: &CholeskyCall) -> Result<usize> {
        self.record("potrf_buffer_size");
        Ok(call.n * 4)
    }

    fn solver_potrf(
        &self,
        call: &CholeskyCall,
        workspace: u64,
        workspace_len: usize,
        info: u64,
    ) -> Result<()> {
        self.record("potrf");
        assert!(workspace != 0 && workspace_len >= call.n * 4, "workspace too small");

        // The vendor routine reports numerical failure through `info` only
        // SAFETY: shapes validated by the accelerator layer; info is one i32.
        let status = match unsafe { potrf_kernel(cm::<T>(call.a, call.n, call.n, call.lda), call.fill) }
        {
            Ok(()) => 0,
            Err(Error::LibraryFailure { status, .. }) => status as i32,
            Err(e) => return Err(e),
        };
        unsafe { *(info as *mut i32) = status };
        Ok(())
    }
}

impl MixedPrecisionGemm for EmuClient {
    fn supports_mixed_precision(&self) -> bool {
        self.mixed_precision
    }

    fn math_mode(&self) -> Result<MathMode> {
        Ok(self.current_mode())
    }

    fn set_math_mode(&self, mode: MathMode) -> Result<()> {
        *self.mode.lock().unwrap() = mode;
        self.mode_history.lock().unwrap().push(mode);
        Ok(())
    }

    fn gemm_ex(&self, call: &GemmCall<f32>, io_dtype: DType) -> Result<()> {
        self.record("gemm_ex");
        if self.fail_mixed_gemm {
            return Err(Error::library_failure("cublasGemmEx", 13));
        }
        if io_dtype != DType::F16 {
            return Err(Error::UnsupportedDType {
                dtype: io_dtype,
                op: "gemm_ex",
            });
        }
        half_gemm(call);
        Ok(())
    }
}

/// Column-major footprint of `rows x cols` with leading dimension `ld`
fn cm_footprint(rows: usize, cols: usize, ld: usize) -> usize {
    if rows == 0 || cols == 0 {
        0
    } else {
        ld * (cols - 1) + rows
    }
}

#[cfg(feature = "f16")]
fn half_gemm(call: &GemmCall<f32>) {
    use half::f16;

    fn widen(ptr: u64, len: usize) -> Vec<f32> {
        // SAFETY: len is the operand's footprint.
        let src = unsafe { std::slice::from_raw_parts(ptr as *const f16, len) };
        src.iter().map(|x| x.to_f32()).collect()
    }

    let (ar, ac) = stored(call.m, call.k, call.transa);
    let (br, bc) = stored(call.k, call.n, call.transb);
    let mut a = widen(call.a, cm_footprint(ar, ac, call.lda));
    let mut b = widen(call.b, cm_footprint(br, bc, call.ldb));
    let c_len = cm_footprint(call.m, call.n, call.ldc);
    let mut c = widen(call.c, c_len);

    let wide = call.with_pointers(
        a.as_mut_ptr() as u64,
        b.as_mut_ptr() as u64,
        c.as_mut_ptr() as u64,
    );
    run_gemm(&wide);

    // SAFETY: c_len is the output footprint.
    let dst = unsafe { std::slice::from_raw_parts_mut(call.c as *mut f16, c_len) };
    for (d, s) in dst.iter_mut().zip(&c) {
        *d = f16::from_f32(*s);
    }
}

#[cfg(not(feature = "f16"))]
fn half_gemm(_call: &GemmCall<f32>) {}

// ============================================================================
// Operation traits, forwarded to the generic accelerator implementation
// ============================================================================

impl<T: EmuElement> GemmOps<EmuRuntime, T> for EmuClient {
    fn gemm(
        &self,
        a: &MatrixView<'_, EmuRuntime, T>,
        b: &MatrixView<'_, EmuRuntime, T>,
        c: &MatrixView<'_, EmuRuntime, T>,
        alpha: T,
        beta: T,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<()> {
        accel::gemm(self, a, b, c, alpha, beta, transpose_a, transpose_b)
    }

    fn batch_gemm(
        &self,
        a: &BatchView<'_, EmuRuntime, T>,
        b: &BatchView<'_, EmuRuntime, T>,
        c: &BatchView<'_, EmuRuntime, T>,
        alpha: T,
        beta: T,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<()> {
        accel::batch_gemm(self, a, b, c, alpha, beta, transpose_a, transpose_b)
    }
}

#[cfg(feature = "f16")]
impl GemmOps<EmuRuntime, half::f16> for EmuClient {
    fn gemm(
        &self,
        a: &MatrixView<'_, EmuRuntime, half::f16>,
        b: &MatrixView<'_, EmuRuntime, half::f16>,
        c: &MatrixView<'_, EmuRuntime, half::f16>,
        alpha: half::f16,
        beta: half::f16,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<()> {
        accel::gemm_f16(self, a, b, c, alpha, beta, transpose_a, transpose_b)
    }

    fn batch_gemm(
        &self,
        a: &BatchView<'_, EmuRuntime, half::f16>,
        b: &BatchView<'_, EmuRuntime, half::f16>,
        c: &BatchView<'_, EmuRuntime, half::f16>,
        alpha: half::f16,
        beta: half::f16,
        transpose_a: bool,
        transpose_b: bool,
    ) -> Result<()> {
        accel::batch_gemm_f16(self, a, b, c, alpha, beta, transpose_a, transpose_b)
    }
}

impl<T: EmuElement> TriangularOps<EmuRuntime, T> for EmuClient {
    fn trsm(
        &self,
        a: &MatrixView<'_, EmuRuntime, T>,
        b: &MatrixView<'_, EmuRuntime, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        accel::trsm(self, a, b, alpha, side, triangle, transpose)
    }

    fn batch_trsm(
        &self,
        a: &BatchView<'_, EmuRuntime, T>,
        b: &BatchView<'_, EmuRuntime, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        accel::batch_trsm(self, a, b, alpha, side, triangle, transpose)
    }

    fn trmm(
        &self,
        a: &MatrixView<'_, EmuRuntime, T>,
        b: &MatrixView<'_, EmuRuntime, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        accel::trmm(self, a, b, alpha, side, triangle, transpose)
    }

    fn batch_trmm(
        &self,
        a: &BatchView<'_, EmuRuntime, T>,
        b: &BatchView<'_, EmuRuntime, T>,
        alpha: T,
        side: Side,
        triangle: Triangle,
        transpose: bool,
    ) -> Result<()> {
        accel::batch_trmm(self, a, b, alpha, side, triangle, transpose)
    }
}

impl<T: EmuElement> CholeskyOps<EmuRuntime, T> for EmuClient {
    fn potrf(&self, a: &MatrixView<'_, EmuRuntime, T>, triangle: Triangle) -> Result<()> {
        accel::potrf(self, a, triangle)
    }

    fn batch_potrf(&self, a: &BatchView<'_, EmuRuntime, T>, triangle: Triangle) -> Result<()> {
        accel::batch_potrf(self, a, triangle)
    }

    fn potri(&self, a: &MatrixView<'_, EmuRuntime, T>, triangle: Triangle) -> Result<()> {
        accel::potri(self, a, triangle)
    }

    fn batch_potri(&self, a: &BatchView<'_, EmuRuntime, T>, triangle: Triangle) -> Result<()> {
        accel::batch_potri(self, a, triangle)
    }
}
