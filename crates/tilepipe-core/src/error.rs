use thiserror::Error;
use tilepipe_common::DType;
use tilepipe_runtime::{MemoryError, tier::TierKind};
use tilepipe_zspace::ShapeError;

use crate::TileLayout;

/// Precondition violations of tiles, global tensors and operators.
///
/// They are reported when an operator is issued, before anything reaches a pipe.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TileError {
    /// The tile was used before it was given a place in its tier.
    #[error("A tile of the {tier} tier was used before being assigned an offset")]
    Unassigned {
        /// Tier of the tile.
        tier: TierKind,
    },

    /// The valid shape exceeds the declared shape.
    #[error("Valid shape {valid_rows}x{valid_cols} exceeds the declared shape {rows}x{cols}")]
    InvalidShape {
        /// Declared rows.
        rows: usize,
        /// Declared columns.
        cols: usize,
        /// Valid rows.
        valid_rows: usize,
        /// Valid columns.
        valid_cols: usize,
    },

    /// The declared shape isn't a whole number of fractal blocks.
    #[error("Shape {rows}x{cols} isn't a multiple of the {block_rows}x{block_cols} block")]
    BlockMismatch {
        /// Declared rows.
        rows: usize,
        /// Declared columns.
        cols: usize,
        /// Block rows.
        block_rows: usize,
        /// Block columns.
        block_cols: usize,
    },

    /// Operand shapes don't agree.
    #[error("{op}: expected shape {}x{}, got {}x{}", expected.0, expected.1, actual.0, actual.1)]
    ShapeMismatch {
        /// The operator.
        op: &'static str,
        /// Expected (rows, columns).
        expected: (usize, usize),
        /// Actual (rows, columns).
        actual: (usize, usize),
    },

    /// An operand lives in the wrong tier.
    #[error("{op}: expected an operand in the {expected} tier, got {actual}")]
    TierMismatch {
        /// The operator.
        op: &'static str,
        /// Expected tier.
        expected: TierKind,
        /// Actual tier.
        actual: TierKind,
    },

    /// An operand has a layout the operator doesn't support.
    #[error("{op}: unsupported layout {actual:?}, expected {expected}")]
    LayoutMismatch {
        /// The operator.
        op: &'static str,
        /// Description of the supported layouts.
        expected: &'static str,
        /// Actual layout.
        actual: TileLayout,
    },

    /// Operand element types don't agree.
    #[error("{op}: expected elements of type {expected}, got {actual}")]
    DTypeMismatch {
        /// The operator.
        op: &'static str,
        /// Expected type.
        expected: DType,
        /// Actual type.
        actual: DType,
    },

    /// No pipe copies between the two tiers.
    #[error("No pipe moves tiles from the {src} tier to the {dst} tier")]
    UnsupportedMove {
        /// Source tier.
        src: TierKind,
        /// Destination tier.
        dst: TierKind,
    },

    /// A region addresses outside of its tile or tensor.
    #[error(
        "{op}: region at ({row}, {col}) of size {}x{} exceeds the {}x{} extent",
        size.0, size.1, extent.0, extent.1
    )]
    OutOfBounds {
        /// The operator.
        op: &'static str,
        /// First row of the region.
        row: usize,
        /// First column of the region.
        col: usize,
        /// Size of the region.
        size: (usize, usize),
        /// Extent of the addressed tile or tensor.
        extent: (usize, usize),
    },

    /// The global tensor layout doesn't match its strides.
    #[error("Layout {layout} requires a unit stride on dimension {dim}, got {stride}")]
    Stride {
        /// Name of the layout.
        layout: &'static str,
        /// Dimension expected to be contiguous.
        dim: usize,
        /// Its stride.
        stride: usize,
    },

    /// The global tensor addresses past the end of its buffer.
    #[error("Global tensor addresses element {max_index} of a buffer holding {len} elements")]
    BufferTooSmall {
        /// Largest addressed element.
        max_index: usize,
        /// Elements in the buffer.
        len: usize,
    },

    /// Invalid shape or strides.
    #[error("Invalid descriptor\nCaused by:\n  {0}")]
    Shape(#[from] ShapeError),

    /// Placement or issue failure.
    #[error("Memory error\nCaused by:\n  {0}")]
    Memory(#[from] MemoryError),
}
