//! Side and triangle selectors for the triangular routines

/// Which side of `B` the triangular matrix `A` is applied from
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// `op(A) · X` / `op(A) · B`
    Left,
    /// `X · op(A)` / `B · op(A)`
    Right,
}

impl Side {
    /// The opposite side
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Which triangle of `A` is referenced
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Triangle {
    /// Entries on and below the diagonal
    Lower,
    /// Entries on and above the diagonal
    Upper,
}

impl Triangle {
    /// The opposite triangle
    ///
    /// Transposing a matrix swaps its triangles, so a row-major lower
    /// triangle is an upper triangle when the same memory is read
    /// column-major.
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Self::Lower => Self::Upper,
            Self::Upper => Self::Lower,
        }
    }

    /// Returns true for [`Triangle::Lower`]
    #[inline]
    pub fn is_lower(self) -> bool {
        self == Self::Lower
    }
}
