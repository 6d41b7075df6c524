//! Shape errors.

use thiserror::Error;

/// Errors raised while building or addressing shape descriptors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// Two descriptors that must agree in rank do not.
    #[error("Rank mismatch: left has rank {left}, right has rank {right}")]
    RankMismatch {
        /// Rank of the left operand.
        left: usize,
        /// Rank of the right operand.
        right: usize,
    },

    /// The rank exceeds what descriptors can carry.
    #[error("Rank {rank} exceeds the maximum rank of {max}")]
    RankTooLarge {
        /// Requested rank.
        rank: usize,
        /// Maximum supported rank.
        max: usize,
    },

    /// A runtime extent disagrees with a statically declared one.
    #[error("Dimension {dim} is declared with extent {expected} but {actual} was provided")]
    StaticMismatch {
        /// Dimension index.
        dim: usize,
        /// Declared extent.
        expected: usize,
        /// Provided extent.
        actual: usize,
    },

    /// An index is outside of its dimension.
    #[error("Index {index} is out of bounds for dimension {dim} of extent {extent}")]
    OutOfBounds {
        /// Dimension index.
        dim: usize,
        /// Offending index.
        index: usize,
        /// Extent of the dimension.
        extent: usize,
    },
}
