//! Host BLAS3/LAPACK kernels
//!
//! Kernels operate on [`StridedMatrix`] descriptors: a raw pointer plus
//! independent row and column strides. A row-major matrix with leading
//! dimension `ld` has strides `(ld, 1)`, a column-major one `(1, ld)`, and a
//! transpose is a stride swap. Every routine is written once, for the
//! non-transposed lower/left case where that simplifies the code, and the
//! other cases are reduced to it by transposing views.
//!
//! Kernels are `pub` so other host-memory backends (for instance a
//! column-major vendor emulation) can reuse them.

mod blas3;
mod cholesky;

pub use blas3::{gemm_kernel, trmm_kernel, trsm_kernel};
pub use cholesky::{potrf_kernel, potri_kernel};

/// Raw strided 2-D matrix in host memory
#[derive(Copy, Clone, Debug)]
pub struct StridedMatrix<T> {
    ptr: *mut T,
    rows: usize,
    cols: usize,
    row_stride: usize,
    col_stride: usize,
}

impl<T: Copy> StridedMatrix<T> {
    /// Describe a matrix with explicit strides (in elements)
    ///
    /// # Safety
    ///
    /// Every `ptr + i * row_stride + j * col_stride` with `i < rows`,
    /// `j < cols` must be valid for reads and writes while the descriptor is
    /// used.
    #[inline]
    pub unsafe fn new(
        ptr: *mut T,
        rows: usize,
        cols: usize,
        row_stride: usize,
        col_stride: usize,
    ) -> Self {
        Self {
            ptr,
            rows,
            cols,
            row_stride,
            col_stride,
        }
    }

    /// Row-major matrix with leading dimension `ld`
    ///
    /// # Safety
    ///
    /// See [`StridedMatrix::new`].
    #[inline]
    pub unsafe fn row_major(ptr: *mut T, rows: usize, cols: usize, ld: usize) -> Self {
        // SAFETY: forwarded contract.
        unsafe { Self::new(ptr, rows, cols, ld, 1) }
    }

    /// Column-major matrix with leading dimension `ld`
    ///
    /// # Safety
    ///
    /// See [`StridedMatrix::new`].
    #[inline]
    pub unsafe fn col_major(ptr: *mut T, rows: usize, cols: usize, ld: usize) -> Self {
        // SAFETY: forwarded contract.
        unsafe { Self::new(ptr, rows, cols, 1, ld) }
    }

    /// Number of rows
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The transpose, sharing the same memory
    #[inline]
    pub fn transposed(self) -> Self {
        Self {
            ptr: self.ptr,
            rows: self.cols,
            cols: self.rows,
            row_stride: self.col_stride,
            col_stride: self.row_stride,
        }
    }

    /// `self` or its transpose
    #[inline]
    pub fn op(self, transpose: bool) -> Self {
        if transpose { self.transposed() } else { self }
    }

    /// Read element (i, j)
    ///
    /// # Safety
    ///
    /// `i < rows` and `j < cols`.
    #[inline]
    pub unsafe fn get(&self, i: usize, j: usize) -> T {
        // SAFETY: in bounds per caller, memory valid per constructor contract.
        unsafe { *self.ptr.add(i * self.row_stride + j * self.col_stride) }
    }

    /// Write element (i, j)
    ///
    /// # Safety
    ///
    /// `i < rows` and `j < cols`.
    #[inline]
    pub unsafe fn set(&self, i: usize, j: usize, value: T) {
        // SAFETY: as in get.
        unsafe { *self.ptr.add(i * self.row_stride + j * self.col_stride) = value }
    }
}
