use tilepipe_common::Element;
use tilepipe_runtime::{
    KernelContext,
    pipe::{PipeKind, PipeOp, Resource},
    tier::TierKind,
};

use crate::{
    Tile, TileError,
    ops::check::{expect_valid, vector_operand},
};

/// Which way a reduction folds a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Row,
    Col,
}

/// Reduce every valid row into a `rows x 1` tile.
///
/// The whole declared row is read, so the padding of `src` decides what its invalid columns
/// contribute. Use zero padding for sums and minus infinity for maximums.
pub fn row_sum<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
) -> Result<(), TileError> {
    reduce(ctx, "row_sum", Axis::Row, dst, src, 0.0, |acc, x| acc + x)
}

/// Maximum of every row, see [row_sum].
pub fn row_max<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
) -> Result<(), TileError> {
    reduce(ctx, "row_max", Axis::Row, dst, src, f64::NEG_INFINITY, f64::max)
}

/// Minimum of every row, see [row_sum].
pub fn row_min<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
) -> Result<(), TileError> {
    reduce(ctx, "row_min", Axis::Row, dst, src, f64::INFINITY, f64::min)
}

/// Reduce every valid column into a `1 x cols` tile, reading the declared column span.
pub fn col_sum<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
) -> Result<(), TileError> {
    reduce(ctx, "col_sum", Axis::Col, dst, src, 0.0, |acc, x| acc + x)
}

/// Maximum of every column.
pub fn col_max<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
) -> Result<(), TileError> {
    reduce(ctx, "col_max", Axis::Col, dst, src, f64::NEG_INFINITY, f64::max)
}

/// Minimum of every column.
pub fn col_min<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
) -> Result<(), TileError> {
    reduce(ctx, "col_min", Axis::Col, dst, src, f64::INFINITY, f64::min)
}

fn reduce<E: Element, F>(
    ctx: &mut KernelContext<'_>,
    name: &'static str,
    axis: Axis,
    dst: &Tile<E>,
    src: &Tile<E>,
    init: f64,
    func: F,
) -> Result<(), TileError>
where
    F: Fn(f64, f64) -> f64 + 'static,
{
    let out = vector_operand(name, dst)?;
    let src = vector_operand(name, src)?;
    let (rows, cols) = src.tile().valid_shape();
    let expected = match axis {
        Axis::Row => (rows, 1),
        Axis::Col => (1, cols),
    };
    expect_valid(name, expected, dst.valid_shape())?;

    let op = PipeOp::new(name, move |memory| {
        let tier = memory.tier(TierKind::Vector);
        let (outer, span) = match axis {
            Axis::Row => (rows, src.tile().cols()),
            Axis::Col => (cols, src.tile().rows()),
        };

        let values: alloc::vec::Vec<f64> = (0..outer)
            .map(|i| {
                (0..span).fold(init, |acc, j| {
                    let value = match axis {
                        Axis::Row => src.read(tier, i, j),
                        Axis::Col => src.read(tier, j, i),
                    };
                    func(acc, value.to_f64())
                })
            })
            .collect();
        out.write_valid(memory.tier_mut(TierKind::Vector), &values);
        Ok(())
    })
    .reads(Resource::Tier(TierKind::Vector), src.range())
    .writes(Resource::Tier(TierKind::Vector), out.range());

    ctx.issue(PipeKind::Vector, op)?;
    Ok(())
}
