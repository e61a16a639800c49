//! Operation traits for dense linear algebra.
//!
//! Implementations live with each backend (`runtime::cpu`, `runtime::cuda`).

mod cholesky;
mod gemm;
mod triangular;

pub use cholesky::CholeskyOps;
pub use gemm::GemmOps;
pub use triangular::TriangularOps;
