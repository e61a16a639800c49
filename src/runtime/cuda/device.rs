//! CUDA Device implementation

use crate::error::Result;
use crate::runtime::Device;
use cudarc::driver::sys::CUdevice_attribute;

/// CUDA Device using cudarc
///
/// Names a single GPU by ordinal. Matrix views record this ordinal and every
/// operation checks it against the device of the dispatching client.
#[derive(Clone, Debug)]
pub struct CudaDevice {
    /// Index of the GPU device (0, 1, 2, ...)
    pub(crate) index: usize,
}

impl CudaDevice {
    /// Create a new CUDA device
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// Get the compute capability of this CUDA device
    ///
    /// Returns (major, minor) version numbers (e.g., (8, 6) for sm_86 / RTX 3090)
    pub fn compute_capability(&self) -> Result<(u32, u32)> {
        let device = cudarc::driver::result::device::get(self.index as i32)?;

        // SAFETY: device is a valid handle returned by the driver.
        let major = unsafe {
            cudarc::driver::result::device::get_attribute(
                device,
                CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR,
            )
        }?;
        // SAFETY: as above.
        let minor = unsafe {
            cudarc::driver::result::device::get_attribute(
                device,
                CUdevice_attribute::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR,
            )
        }?;

        Ok((major as u32, minor as u32))
    }
}

impl Device for CudaDevice {
    fn id(&self) -> usize {
        self.index
    }

    fn name(&self) -> String {
        format!("cuda:{}", self.index)
    }
}

impl Default for CudaDevice {
    fn default() -> Self {
        Self::new(0)
    }
}
