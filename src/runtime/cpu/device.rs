//! The host as a device

use crate::runtime::Device;

/// Device id carried by every view of host memory
pub(crate) const HOST_DEVICE_ID: usize = 0;

/// Host memory and the host BLAS3/LAPACK kernels
///
/// There is a single host device. All instances compare equal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuDevice;

impl CpuDevice {
    /// The host device
    pub fn new() -> Self {
        Self
    }
}

impl Device for CpuDevice {
    fn id(&self) -> usize {
        HOST_DEVICE_ID
    }

    fn name(&self) -> String {
        "cpu".to_string()
    }
}
