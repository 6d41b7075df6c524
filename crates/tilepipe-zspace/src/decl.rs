use core::fmt::Display;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{INLINE_DIMS, MAX_RANK, Shape, ShapeError};

/// A declared extent: either fixed when the kernel is written or supplied when it runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dim {
    /// Extent known when the descriptor is declared.
    Static(usize),
    /// Extent supplied at run time.
    Dynamic,
}

impl Dim {
    /// Resolve the extent against a runtime value.
    pub fn resolve(self, dim: usize, value: usize) -> Result<usize, ShapeError> {
        match self {
            Dim::Static(expected) if expected != value => Err(ShapeError::StaticMismatch {
                dim,
                expected,
                actual: value,
            }),
            _ => Ok(value),
        }
    }

    /// The static extent, if any.
    pub fn as_static(self) -> Option<usize> {
        match self {
            Dim::Static(value) => Some(value),
            Dim::Dynamic => None,
        }
    }

    pub fn is_dynamic(self) -> bool {
        matches!(self, Dim::Dynamic)
    }
}

impl From<usize> for Dim {
    fn from(value: usize) -> Self {
        Dim::Static(value)
    }
}

impl Display for Dim {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Dim::Static(value) => write!(f, "{value}"),
            Dim::Dynamic => f.write_str("?"),
        }
    }
}

/// Declared shape of a descriptor: its rank is fixed, its extents may be dynamic.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeDecl {
    dims: SmallVec<[Dim; INLINE_DIMS]>,
}

impl ShapeDecl {
    /// Declare a shape, failing when the rank exceeds [MAX_RANK].
    pub fn new(dims: &[Dim]) -> Result<Self, ShapeError> {
        if dims.len() > MAX_RANK {
            return Err(ShapeError::RankTooLarge {
                rank: dims.len(),
                max: MAX_RANK,
            });
        }

        Ok(Self {
            dims: SmallVec::from_slice(dims),
        })
    }

    /// Declare a shape where every extent is supplied at run time.
    pub fn dynamic(rank: usize) -> Result<Self, ShapeError> {
        let dims: SmallVec<[Dim; INLINE_DIMS]> = smallvec::smallvec![Dim::Dynamic; rank];
        Self::new(&dims)
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    /// Resolve the declaration against runtime extents.
    ///
    /// The runtime shape must have the declared rank and agree with every static extent.
    pub fn resolve(&self, runtime: &[usize]) -> Result<Shape, ShapeError> {
        if runtime.len() != self.rank() {
            return Err(ShapeError::RankMismatch {
                left: self.rank(),
                right: runtime.len(),
            });
        }

        self.dims
            .iter()
            .zip(runtime)
            .enumerate()
            .map(|(dim, (decl, value))| decl.resolve(dim, *value))
            .collect()
    }
}

impl<const N: usize> From<[usize; N]> for ShapeDecl {
    fn from(dims: [usize; N]) -> Self {
        assert!(N <= MAX_RANK, "rank {N} exceeds the maximum rank");
        Self {
            dims: dims.into_iter().map(Dim::Static).collect(),
        }
    }
}
