//! Dense linear algebra operations
//!
//! Operations are traits implemented by runtime clients, keyed on the
//! `(Runtime, Element)` pair so the backend is chosen at compile time.
//!
//! ```text
//! RuntimeClient<R>
//!   ├── GemmOps<R, T>        gemm, batch_gemm, gemm_request
//!   ├── TriangularOps<R, T>  trsm, trmm (+ batched)
//!   └── CholeskyOps<R, T>    potrf, potri (+ batched)
//! ```
//!
//! Every implementation runs the shared checks in [`validate`] before issuing
//! any work, so all backends reject the same inputs with the same errors.
//!
//! # Implementing Operations for a New Backend
//!
//! Implement the traits for your client type; unimplemented methods fall back
//! to `Error::NotImplemented`. Accelerators exposing column-major vendor BLAS
//! and a dense solver can instead implement the traits in
//! [`runtime::accel`](crate::runtime::accel) and delegate to its functions.

mod flags;
mod request;
mod traits;
pub mod validate;

pub use flags::{Side, Triangle};
pub use request::WriteRequest;
pub use traits::{CholeskyOps, GemmOps, TriangularOps};
