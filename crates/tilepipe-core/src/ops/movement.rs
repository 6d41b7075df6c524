use tilepipe_common::Element;
use tilepipe_runtime::{
    KernelContext,
    memory::{read_elem, write_elem},
    pipe::{PipeKind, PipeOp, Resource},
    tier::TierKind,
};

use alloc::vec::Vec;

use crate::{GlobalTensor, Tile, TileError, ops::check::expect_valid};

/// Copy a global tensor window into the valid region of a staging or vector tile.
///
/// The window must have the valid shape of the tile. Elements are converted to the tile layout
/// one by one and the padding region is filled.
pub fn load<E: Element>(
    ctx: &mut KernelContext<'_>,
    tile: &Tile<E>,
    global: &GlobalTensor<E>,
) -> Result<(), TileError> {
    expect_valid("load", tile.valid_shape(), global.shape())?;
    let dst = tile.placed()?;
    let src = global.clone();
    let id = src.buffer();
    let tier = tile.tier();

    let op = PipeOp::new("load", move |memory| {
        let (tier, global) = memory.split_mut(tier);
        let bytes = global.get(id)?;
        let (rows, cols) = src.shape();
        for row in 0..rows {
            for col in 0..cols {
                dst.write(tier, row, col, read_elem(bytes, src.index(row, col)));
            }
        }
        dst.fill_pad(tier);
        Ok(())
    })
    .writes(Resource::Tier(tier), dst.range());
    let op = global
        .byte_ranges()
        .into_iter()
        .fold(op, |op, range| op.reads(Resource::Global(id), range));

    ctx.issue(PipeKind::Load, op)?;
    Ok(())
}

/// Write the valid region of a tile to a global tensor window.
///
/// Vector tiles are stored by the store pipe and need matching element types. Accumulator
/// tiles go through the fixup pipe, which converts their elements.
pub fn store<O: Element, E: Element>(
    ctx: &mut KernelContext<'_>,
    global: &GlobalTensor<O>,
    tile: &Tile<E>,
) -> Result<(), TileError> {
    let pipe = match tile.tier() {
        TierKind::Vector => {
            if O::DTYPE != E::DTYPE {
                return Err(TileError::DTypeMismatch {
                    op: "store",
                    expected: E::DTYPE,
                    actual: O::DTYPE,
                });
            }
            PipeKind::Store
        }
        TierKind::Accumulator => PipeKind::Fixup,
        actual => {
            return Err(TileError::TierMismatch {
                op: "store",
                expected: TierKind::Vector,
                actual,
            });
        }
    };
    expect_valid("store", tile.valid_shape(), global.shape())?;
    let src = tile.placed()?;
    let dst = global.clone();
    let id = dst.buffer();
    let tier = tile.tier();

    let op = PipeOp::new("store", move |memory| {
        let (tier, global) = memory.split_mut(tier);
        let bytes = global.get_mut(id)?;
        let (rows, cols) = dst.shape();
        for row in 0..rows {
            for col in 0..cols {
                let value = src.read(tier, row, col);
                write_elem(bytes, dst.index(row, col), convert::<E, O>(value));
            }
        }
        Ok(())
    })
    .reads(Resource::Tier(tier), src.range());
    let op = global
        .byte_ranges()
        .into_iter()
        .fold(op, |op, range| op.writes(Resource::Global(id), range));

    ctx.issue(pipe, op)?;
    Ok(())
}

/// Copy a tile to another tier or layout without touching global memory.
///
/// Staging feeds the matrix operand tiers through the move pipe, the vector tier copies to
/// itself and the accumulator drains to staging or the vector tier through the fixup pipe, the
/// only one converting elements. Valid shapes must agree and the destination padding is filled.
pub fn move_tile<D: Element, S: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<D>,
    src: &Tile<S>,
) -> Result<(), TileError> {
    let pipe = move_pipe::<D, S>("move", dst, src)?;
    expect_valid("move", src.valid_shape(), dst.valid_shape())?;

    copy(ctx, "move", pipe, dst, src, |row, col| (row, col))
}

/// Copy the `dst` valid region of `src` starting at `(row, col)`.
///
/// The region may cover padding of the source, which lets edge slices carry their padding.
pub fn extract<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
    row: usize,
    col: usize,
) -> Result<(), TileError> {
    let pipe = move_pipe::<E, E>("extract", dst, src)?;
    let size = dst.valid_shape();
    if row + size.0 > src.rows() || col + size.1 > src.cols() {
        return Err(TileError::OutOfBounds {
            op: "extract",
            row,
            col,
            size,
            extent: src.shape(),
        });
    }

    copy(ctx, "extract", pipe, dst, src, move |r, c| (row + r, col + c))
}

/// Write the transpose of the `src` valid region into `dst`.
pub fn transpose<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
) -> Result<(), TileError> {
    let pipe = move_pipe::<E, E>("transpose", dst, src)?;
    expect_valid(
        "transpose",
        (src.valid_cols(), src.valid_rows()),
        dst.valid_shape(),
    )?;

    copy(ctx, "transpose", pipe, dst, src, |row, col| (col, row))
}

/// Write the padding value to the invalid region of a tile, with the pipe owning its tier.
///
/// Operators only write the valid region, so a tile produced by one needs this before a
/// reduction relies on its padding.
pub fn fill_pad<E: Element>(ctx: &mut KernelContext<'_>, tile: &Tile<E>) -> Result<(), TileError> {
    let placed = tile.placed()?;
    let tier = tile.tier();
    let pipe = match tier {
        TierKind::Staging => PipeKind::Load,
        TierKind::Left | TierKind::Right => PipeKind::Move,
        TierKind::Accumulator => PipeKind::Matrix,
        TierKind::Vector => PipeKind::Vector,
    };

    let op = PipeOp::new("fill_pad", move |memory| {
        placed.fill_pad(memory.tier_mut(tier));
        Ok(())
    })
    .writes(Resource::Tier(tier), placed.range());

    ctx.issue(pipe, op)?;
    Ok(())
}

fn move_pipe<D: Element, S: Element>(
    op: &'static str,
    dst: &Tile<D>,
    src: &Tile<S>,
) -> Result<PipeKind, TileError> {
    let pipe = match (src.tier(), dst.tier()) {
        (TierKind::Staging, TierKind::Left | TierKind::Right) => PipeKind::Move,
        (TierKind::Vector, TierKind::Vector) => PipeKind::Vector,
        (TierKind::Accumulator, TierKind::Staging | TierKind::Vector) => PipeKind::Fixup,
        (src, dst) => return Err(TileError::UnsupportedMove { src, dst }),
    };

    if pipe != PipeKind::Fixup && D::DTYPE != S::DTYPE {
        return Err(TileError::DTypeMismatch {
            op,
            expected: S::DTYPE,
            actual: D::DTYPE,
        });
    }

    Ok(pipe)
}

/// Issue a tile-to-tile copy of the `dst` valid region, filling the `dst` padding afterwards.
///
/// `source` maps a destination element to the source element it copies.
fn copy<D: Element, S: Element, F>(
    ctx: &mut KernelContext<'_>,
    name: &'static str,
    pipe: PipeKind,
    dst: &Tile<D>,
    src: &Tile<S>,
    source: F,
) -> Result<(), TileError>
where
    F: Fn(usize, usize) -> (usize, usize) + 'static,
{
    let dst = dst.placed()?;
    let src = src.placed()?;
    let (dst_tier, src_tier) = (dst.tile().tier(), src.tile().tier());

    let op = PipeOp::new(name, move |memory| {
        let (rows, cols) = dst.tile().valid_shape();

        // Read everything first, both tiles may share bytes of the same tier.
        let tier = memory.tier(src_tier);
        let values: Vec<S> = (0..rows * cols)
            .map(|i| {
                let (row, col) = source(i / cols, i % cols);
                src.read(tier, row, col)
            })
            .collect();

        let tier = memory.tier_mut(dst_tier);
        for (i, value) in values.into_iter().enumerate() {
            dst.write(tier, i / cols, i % cols, convert::<S, D>(value));
        }
        dst.fill_pad(tier);
        Ok(())
    })
    .reads(Resource::Tier(src_tier), src.range())
    .writes(Resource::Tier(dst_tier), dst.range());

    ctx.issue(pipe, op)?;
    Ok(())
}

fn convert<S: Element, D: Element>(value: S) -> D {
    D::from_f64(value.to_f64())
}
