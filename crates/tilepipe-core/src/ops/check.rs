use tilepipe_common::Element;
use tilepipe_runtime::tier::TierKind;

use crate::{Placed, Tile, TileError, TileLayout};

pub(crate) fn expect_tier<E: Element>(
    op: &'static str,
    tile: &Tile<E>,
    expected: TierKind,
) -> Result<(), TileError> {
    if tile.tier() != expected {
        return Err(TileError::TierMismatch {
            op,
            expected,
            actual: tile.tier(),
        });
    }
    Ok(())
}

pub(crate) fn expect_valid(
    op: &'static str,
    expected: (usize, usize),
    actual: (usize, usize),
) -> Result<(), TileError> {
    if expected != actual {
        return Err(TileError::ShapeMismatch {
            op,
            expected,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn expect_fractal<E: Element>(op: &'static str, tile: &Tile<E>) -> Result<(), TileError> {
    if !tile.layout().is_fractal() {
        return Err(TileError::LayoutMismatch {
            op,
            expected: "fractal",
            actual: tile.layout(),
        });
    }
    Ok(())
}

/// A row-major tile of the vector tier, placed.
pub(crate) fn vector_operand<E: Element>(
    op: &'static str,
    tile: &Tile<E>,
) -> Result<Placed<E>, TileError> {
    expect_tier(op, tile, TierKind::Vector)?;
    if tile.layout() != TileLayout::RowMajor {
        return Err(TileError::LayoutMismatch {
            op,
            expected: "row-major",
            actual: tile.layout(),
        });
    }
    tile.placed()
}
