//! Matrix storage and views
//!
//! Operations take [`MatrixView`] and [`BatchView`] operands: non-owning,
//! row-major descriptions of device memory with an explicit leading
//! dimension. [`Storage`] owns device buffers and hands out views over them.

mod storage;
mod view;

pub use storage::Storage;
pub use view::{BatchView, MatrixView};
