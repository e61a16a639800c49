//! Non-owning row-major matrix views over device memory

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::runtime::{Device, Runtime};
use std::fmt;
use std::marker::PhantomData;

/// Row-major view of one matrix in device memory
///
/// A view is a base pointer, a shape, and a leading dimension `ld` (the
/// distance in elements between the starts of consecutive rows). It carries
/// two tags: the runtime `R` plus the id of the device the memory lives on,
/// and the element type `T`.
///
/// Invariant: `ld >= max(cols, 1)` and the byte span of the view fits in a
/// `usize`, both checked at construction.
///
/// Views never own memory. Operations read and write through them, so a view
/// of a [`Storage`](super::Storage) borrows it for `'a`.
pub struct MatrixView<'a, R: Runtime, T: Element> {
    ptr: u64,
    rows: usize,
    cols: usize,
    ld: usize,
    device_id: usize,
    _marker: PhantomData<(&'a (), fn() -> (R, T))>,
}

impl<R: Runtime, T: Element> Clone for MatrixView<'_, R, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Runtime, T: Element> Copy for MatrixView<'_, R, T> {}

impl<'a, R: Runtime, T: Element> MatrixView<'a, R, T> {
    /// Create a view from raw parts
    ///
    /// # Safety
    ///
    /// `ptr` must address device memory of `device` holding at least
    /// `(rows - 1) * ld + cols` elements of `T`, valid for reads and writes
    /// for `'a`.
    pub unsafe fn from_raw_parts(
        ptr: u64,
        rows: usize,
        cols: usize,
        ld: usize,
        device: &R::Device,
    ) -> Result<Self> {
        check_leading_dimension(cols, ld)?;
        matrix_span::<T>(rows, cols, ld)?;
        Ok(Self {
            ptr,
            rows,
            cols,
            ld,
            device_id: device.id(),
            _marker: PhantomData,
        })
    }

    /// Device pointer of element (0, 0)
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.ptr
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

    /// Leading dimension (row stride in elements)
    #[inline]
    pub fn ld(&self) -> usize {
        self.ld
    }

    /// Id of the device holding the memory
    #[inline]
    pub fn device_id(&self) -> usize {
        self.device_id
    }

    /// Element type tag
    #[inline]
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Shape as `(rows, cols)`
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Shape of `op(self)`, where `op` transposes when `transpose` is set
    #[inline]
    pub fn op_shape(&self, transpose: bool) -> (usize, usize) {
        if transpose {
            (self.cols, self.rows)
        } else {
            (self.rows, self.cols)
        }
    }

    /// Returns true if rows == cols
    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Returns true if rows are stored back to back
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.ld == self.cols
    }

    /// Number of elements spanned in memory, from (0, 0) to the last element
    #[inline]
    pub fn footprint(&self) -> usize {
        if self.rows == 0 {
            0
        } else {
            (self.rows - 1) * self.ld + self.cols
        }
    }

    /// Device pointer of the first element of row `row`
    #[inline]
    pub fn row_ptr(&self, row: usize) -> u64 {
        self.ptr + (row * self.ld * std::mem::size_of::<T>()) as u64
    }
}

impl<R: Runtime, T: Element> fmt::Debug for MatrixView<'_, R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixView")
            .field("runtime", &R::name())
            .field("dtype", &T::DTYPE)
            .field("ptr", &format!("0x{:x}", self.ptr))
            .field("shape", &(self.rows, self.cols))
            .field("ld", &self.ld)
            .field("device", &self.device_id)
            .finish()
    }
}

/// Row-major view of a stack of same-shaped matrices
///
/// Matrix `i` starts `i * rows * ld` elements after the base pointer, i.e.
/// the per-matrix stride is the product of the row count and the leading
/// dimension. The byte span of the whole stack is checked to fit in a `usize`
/// at construction, so the stride and offset arithmetic below cannot wrap.
pub struct BatchView<'a, R: Runtime, T: Element> {
    ptr: u64,
    batch: usize,
    rows: usize,
    cols: usize,
    ld: usize,
    device_id: usize,
    _marker: PhantomData<(&'a (), fn() -> (R, T))>,
}

impl<R: Runtime, T: Element> Clone for BatchView<'_, R, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Runtime, T: Element> Copy for BatchView<'_, R, T> {}

impl<'a, R: Runtime, T: Element> BatchView<'a, R, T> {
    /// Create a batch view from raw parts
    ///
    /// # Safety
    ///
    /// `ptr` must address device memory of `device` holding at least
    /// `batch * rows * ld` elements of `T`, valid for reads and writes for
    /// `'a`.
    pub unsafe fn from_raw_parts(
        ptr: u64,
        batch: usize,
        rows: usize,
        cols: usize,
        ld: usize,
        device: &R::Device,
    ) -> Result<Self> {
        check_leading_dimension(cols, ld)?;
        batch_span::<T>(batch, rows, ld)?;
        Ok(Self {
            ptr,
            batch,
            rows,
            cols,
            ld,
            device_id: device.id(),
            _marker: PhantomData,
        })
    }

    /// Device pointer of the first matrix
    #[inline]
    pub fn ptr(&self) -> u64 {
        self.ptr
    }

    /// Number of matrices
    #[inline]
    pub fn batch(&self) -> usize {
        self.batch
    }

    /// Rows of each matrix
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Columns of each matrix
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Leading dimension of each matrix
    #[inline]
    pub fn ld(&self) -> usize {
        self.ld
    }

    /// Id of the device holding the memory
    #[inline]
    pub fn device_id(&self) -> usize {
        self.device_id
    }

    /// Element type tag
    #[inline]
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Distance in elements between the starts of consecutive matrices
    #[inline]
    pub fn matrix_stride(&self) -> usize {
        self.rows * self.ld
    }

    /// Number of elements covered by the whole stack
    #[inline]
    pub fn footprint(&self) -> usize {
        self.batch * self.matrix_stride()
    }

    /// View of matrix `index`
    ///
    /// # Panics
    ///
    /// Panics if `index >= batch`.
    pub fn matrix(&self, index: usize) -> MatrixView<'a, R, T> {
        assert!(
            index < self.batch,
            "batch index {} out of range for batch of {}",
            index,
            self.batch
        );
        MatrixView {
            ptr: self.ptr + (index * self.matrix_stride() * std::mem::size_of::<T>()) as u64,
            rows: self.rows,
            cols: self.cols,
            ld: self.ld,
            device_id: self.device_id,
            _marker: PhantomData,
        }
    }

    /// Iterate over the per-matrix views
    pub fn matrices(&self) -> impl Iterator<Item = MatrixView<'a, R, T>> + '_ {
        (0..self.batch).map(move |i| self.matrix(i))
    }
}

impl<R: Runtime, T: Element> fmt::Debug for BatchView<'_, R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchView")
            .field("runtime", &R::name())
            .field("dtype", &T::DTYPE)
            .field("ptr", &format!("0x{:x}", self.ptr))
            .field("shape", &(self.batch, self.rows, self.cols))
            .field("ld", &self.ld)
            .field("device", &self.device_id)
            .finish()
    }
}

fn check_leading_dimension(cols: usize, ld: usize) -> Result<()> {
    if ld < cols.max(1) {
        return Err(Error::InvalidArgument {
            arg: "ld",
            reason: format!("leading dimension {} is smaller than column count {}", ld, cols),
        });
    }
    Ok(())
}

fn shape_overflow(what: &str) -> Error {
    Error::InvalidArgument {
        arg: "shape",
        reason: format!("{} overflows the address space", what),
    }
}

/// Elements spanned by a `rows x cols` matrix with leading dimension `ld`
pub(crate) fn matrix_span<T: Element>(rows: usize, cols: usize, ld: usize) -> Result<usize> {
    let span = match rows.checked_sub(1) {
        None => 0,
        Some(last) => last
            .checked_mul(ld)
            .and_then(|n| n.checked_add(cols))
            .ok_or_else(|| shape_overflow("matrix span"))?,
    };
    span.checked_mul(std::mem::size_of::<T>())
        .ok_or_else(|| shape_overflow("matrix byte span"))?;
    Ok(span)
}

/// Elements spanned by `batch` matrices of `rows` rows with leading dimension `ld`
pub(crate) fn batch_span<T: Element>(batch: usize, rows: usize, ld: usize) -> Result<usize> {
    let stride = rows
        .checked_mul(ld)
        .ok_or_else(|| shape_overflow("matrix stride"))?;
    stride
        .checked_mul(std::mem::size_of::<T>())
        .ok_or_else(|| shape_overflow("matrix byte stride"))?;
    let span = batch
        .checked_mul(stride)
        .ok_or_else(|| shape_overflow("batch span"))?;
    span.checked_mul(std::mem::size_of::<T>())
        .ok_or_else(|| shape_overflow("batch byte span"))?;
    Ok(span)
}
