//! Error types for numla

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using numla's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in numla operations
///
/// Two classes of failure exist: precondition violations detected before any
/// numerical work (dimension, batch, device and argument errors), and failures
/// reported by the underlying numerical library after a call was issued.
/// Neither class is recovered inside the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Operand dimensions are incompatible for an operation
    #[error("{detail} for {op}")]
    DimensionMismatch {
        /// The operation name (e.g. "gemm")
        op: &'static str,
        /// Which operand pair is inconsistent
        detail: String,
    },

    /// Batch counts of the operands of a batched call differ
    #[error(
        "Inconsistent batch size between arguments to linear algebra operator ({a} vs {b} vs {c})"
    )]
    BatchSizeMismatch {
        /// Batch count of the first operand
        a: usize,
        /// Batch count of the second operand
        b: usize,
        /// Batch count of the third operand
        c: usize,
    },

    /// A batched call was issued with zero matrices
    #[error("Zero batch size for arguments to linear algebra operator")]
    EmptyBatch,

    /// Unsupported dtype for an operation
    #[error("Unsupported dtype {dtype:?} for operation '{op}'")]
    UnsupportedDType {
        /// The unsupported dtype
        dtype: DType,
        /// The operation name
        op: &'static str,
    },

    /// Device mismatch between an operand and the client
    #[error("Device mismatch: operand on device {operand}, client on device {client}")]
    DeviceMismatch {
        /// Device id of the operand
        operand: usize,
        /// Device id of the client
        client: usize,
    },

    /// Out of memory
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// A numerical library routine reported a non-zero status
    #[error("{routine} failed (status {status})")]
    LibraryFailure {
        /// Name of the failing routine (e.g. "potrf", "cublasSgemm")
        routine: &'static str,
        /// Status code reported by the routine
        status: i64,
    },

    /// Backend limitation - operation valid but exceeds backend capabilities
    #[error("{backend} limitation: {operation} - {reason}")]
    BackendLimitation {
        /// The backend that has the limitation
        backend: &'static str,
        /// The operation being attempted
        operation: &'static str,
        /// Description of the limitation
        reason: String,
    },

    /// CUDA driver error
    #[cfg(feature = "cuda")]
    #[error("CUDA error: {0}")]
    Cuda(#[from] cudarc::driver::DriverError),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Operation not provided by this backend
    #[error("Not implemented: {feature}")]
    NotImplemented {
        /// Description of the unimplemented feature
        feature: &'static str,
    },
}

impl Error {
    /// Create a dimension mismatch error
    pub fn dimension_mismatch(op: &'static str, detail: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            op,
            detail: detail.into(),
        }
    }

    /// Create a library failure error
    pub fn library_failure(routine: &'static str, status: impl Into<i64>) -> Self {
        Self::LibraryFailure {
            routine,
            status: status.into(),
        }
    }

    /// Create a backend limitation error
    pub fn backend_limitation(
        backend: &'static str,
        operation: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::BackendLimitation {
            backend,
            operation,
            reason: reason.into(),
        }
    }

    /// Returns true for errors raised before any numerical work was issued.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. }
                | Self::BatchSizeMismatch { .. }
                | Self::EmptyBatch
                | Self::DeviceMismatch { .. }
                | Self::InvalidArgument { .. }
                | Self::UnsupportedDType { .. }
        )
    }
}
