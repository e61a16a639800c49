//! Storage: device memory management with Arc-based sharing

use super::view::{batch_span, matrix_span};
use super::{BatchView, MatrixView};
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::Runtime;
use std::sync::Arc;

/// Typed buffer of matrix elements on a device
///
/// Storage wraps device memory with reference counting. Matrix and batch
/// views borrow it, so several views (with different shapes or leading
/// dimensions) can address the same buffer.
///
/// Memory is automatically deallocated when the last reference is dropped.
pub struct Storage<R: Runtime> {
    inner: Arc<StorageInner<R>>,
}

struct StorageInner<R: Runtime> {
    /// Raw device pointer (GPU address or CPU ptr cast to u64)
    ptr: u64,
    /// Number of elements (not bytes)
    len: usize,
    dtype: DType,
    device: R::Device,
}

impl<R: Runtime> Storage<R> {
    /// Allocate `len` zeros of type `T` on `device`
    pub fn zeros<T: Element>(len: usize, device: &R::Device) -> Result<Self> {
        Self::from_slice(&vec![T::zero(); len], device)
    }

    /// Copy `data` to the device; the dtype is inferred from `T`
    pub fn from_slice<T: Element>(data: &[T], device: &R::Device) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let ptr = R::allocate(bytes.len(), device)?;

        if let Err(e) = R::copy_to_device(bytes, ptr, device) {
            R::deallocate(ptr, bytes.len(), device);
            return Err(e);
        }

        Ok(Self {
            inner: Arc::new(StorageInner {
                ptr,
                len: data.len(),
                dtype: T::DTYPE,
                device: device.clone(),
            }),
        })
    }

    /// Get the raw device pointer
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.inner.ptr
    }

    /// Get the number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len
    }

    /// Check if storage is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.inner.dtype
    }

    /// Get the device
    #[inline]
    pub fn device(&self) -> &R::Device {
        &self.inner.device
    }

    /// Get size in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.inner.len * self.inner.dtype.size_in_bytes()
    }

    /// Get the reference count
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Copy the whole buffer back to the host
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        self.check_dtype::<T>()?;
        // Allocate with correct alignment for T, then cast to bytes for copy.
        let mut result = vec![T::zeroed(); self.inner.len];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut result);
        R::copy_from_device(self.inner.ptr, bytes, &self.inner.device)?;
        Ok(result)
    }

    /// View the buffer as a dense `rows x cols` matrix (`ld == cols`)
    pub fn matrix<T: Element>(&self, rows: usize, cols: usize) -> Result<MatrixView<'_, R, T>> {
        self.matrix_with_ld(rows, cols, cols)
    }

    /// View the buffer as a `rows x cols` matrix with leading dimension `ld`
    pub fn matrix_with_ld<T: Element>(
        &self,
        rows: usize,
        cols: usize,
        ld: usize,
    ) -> Result<MatrixView<'_, R, T>> {
        self.check_dtype::<T>()?;
        self.check_fits(matrix_span::<T>(rows, cols, ld)?)?;
        // SAFETY: the buffer holds the whole span of elements of T and lives
        // as long as the borrow of self.
        unsafe { MatrixView::from_raw_parts(self.ptr(), rows, cols, ld, self.device()) }
    }

    /// View the buffer as `batch` dense `rows x cols` matrices
    pub fn batch<T: Element>(
        &self,
        batch: usize,
        rows: usize,
        cols: usize,
    ) -> Result<BatchView<'_, R, T>> {
        self.batch_with_ld(batch, rows, cols, cols)
    }

    /// View the buffer as `batch` matrices of `rows x cols` with leading dimension `ld`
    pub fn batch_with_ld<T: Element>(
        &self,
        batch: usize,
        rows: usize,
        cols: usize,
        ld: usize,
    ) -> Result<BatchView<'_, R, T>> {
        self.check_dtype::<T>()?;
        self.check_fits(batch_span::<T>(batch, rows, ld)?)?;
        // SAFETY: as in matrix_with_ld.
        unsafe { BatchView::from_raw_parts(self.ptr(), batch, rows, cols, ld, self.device()) }
    }

    fn check_dtype<T: Element>(&self) -> Result<()> {
        if T::DTYPE != self.inner.dtype {
            return Err(Error::InvalidArgument {
                arg: "T",
                reason: format!(
                    "storage holds {} elements, requested {}",
                    self.inner.dtype, T::DTYPE
                ),
            });
        }
        Ok(())
    }

    fn check_fits(&self, needed: usize) -> Result<()> {
        if needed > self.inner.len {
            return Err(Error::InvalidArgument {
                arg: "shape",
                reason: format!(
                    "view spans {} elements but storage holds {}",
                    needed, self.inner.len
                ),
            });
        }
        Ok(())
    }
}

impl<R: Runtime> Clone for Storage<R> {
    /// Clone increments the reference count (zero-copy)
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Runtime> Drop for StorageInner<R> {
    fn drop(&mut self) {
        if self.ptr != 0 {
            R::deallocate(
                self.ptr,
                self.len * self.dtype.size_in_bytes(),
                &self.device,
            );
        }
    }
}

impl<R: Runtime> std::fmt::Debug for Storage<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("ptr", &format!("0x{:x}", self.inner.ptr))
            .field("len", &self.inner.len)
            .field("dtype", &self.inner.dtype)
            .finish()
    }
}
