//! Write intent of an operator output

use crate::dtype::Element;
use crate::error::{Error, Result};

/// How an operation's result is combined with the output buffer
///
/// The integer codes match the operator framework's request codes, so a
/// request received from there converts with [`WriteRequest::try_from`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum WriteRequest {
    /// Leave the output untouched; no work is issued
    NullOp = 0,
    /// Overwrite the output
    WriteTo = 1,
    /// Overwrite the output, which aliases an input
    WriteInplace = 2,
    /// Accumulate into the output
    AddTo = 3,
}

impl WriteRequest {
    /// GEMM `(alpha, beta)` realizing this request, `None` for [`WriteRequest::NullOp`]
    #[inline]
    pub fn coefficients<T: Element>(self) -> Option<(T, T)> {
        match self {
            Self::NullOp => None,
            Self::WriteTo | Self::WriteInplace => Some((T::one(), T::zero())),
            Self::AddTo => Some((T::one(), T::one())),
        }
    }
}

impl TryFrom<u32> for WriteRequest {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::NullOp),
            1 => Ok(Self::WriteTo),
            2 => Ok(Self::WriteInplace),
            3 => Ok(Self::AddTo),
            other => Err(Error::InvalidArgument {
                arg: "req",
                reason: format!("unknown write request code {}", other),
            }),
        }
    }
}
