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

/// Broadcast the `rows x 1` tile `src` over every column of `dst`.
pub fn row_expand<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
) -> Result<(), TileError> {
    let out = vector_operand("row_expand", dst)?;
    let src = vector_operand("row_expand", src)?;
    let (rows, cols) = dst.valid_shape();
    expect_valid("row_expand", (rows, 1), src.tile().valid_shape())?;

    let op = PipeOp::new("row_expand", move |memory| {
        let tier = memory.tier_mut(TierKind::Vector);
        let column = src.read_valid(tier);
        let values: alloc::vec::Vec<f64> = (0..rows * cols).map(|i| column[i / cols]).collect();
        out.write_valid(tier, &values);
        Ok(())
    })
    .reads(Resource::Tier(TierKind::Vector), src.range())
    .writes(Resource::Tier(TierKind::Vector), out.range());

    ctx.issue(PipeKind::Vector, op)?;
    Ok(())
}

/// Broadcast the `1 x cols` tile `src` over every row of `dst`.
pub fn col_expand<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
) -> Result<(), TileError> {
    let out = vector_operand("col_expand", dst)?;
    let src = vector_operand("col_expand", src)?;
    let (rows, cols) = dst.valid_shape();
    expect_valid("col_expand", (1, cols), src.tile().valid_shape())?;

    let op = PipeOp::new("col_expand", move |memory| {
        let tier = memory.tier_mut(TierKind::Vector);
        let row = src.read_valid(tier);
        let values: alloc::vec::Vec<f64> = (0..rows * cols).map(|i| row[i % cols]).collect();
        out.write_valid(tier, &values);
        Ok(())
    })
    .reads(Resource::Tier(TierKind::Vector), src.range())
    .writes(Resource::Tier(TierKind::Vector), out.range());

    ctx.issue(PipeKind::Vector, op)?;
    Ok(())
}

/// `dst[r][c] = lhs[r][c] - row[r]`.
pub fn row_expand_sub<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    lhs: &Tile<E>,
    row: &Tile<E>,
) -> Result<(), TileError> {
    row_expand_binary(ctx, "row_expand_sub", dst, lhs, row, |a, b| a - b)
}

/// `dst[r][c] = lhs[r][c] * row[r]`.
pub fn row_expand_mul<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    lhs: &Tile<E>,
    row: &Tile<E>,
) -> Result<(), TileError> {
    row_expand_binary(ctx, "row_expand_mul", dst, lhs, row, |a, b| a * b)
}

/// `dst[r][c] = lhs[r][c] / row[r]`.
pub fn row_expand_div<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    lhs: &Tile<E>,
    row: &Tile<E>,
) -> Result<(), TileError> {
    row_expand_binary(ctx, "row_expand_div", dst, lhs, row, |a, b| a / b)
}

fn row_expand_binary<E: Element, F>(
    ctx: &mut KernelContext<'_>,
    name: &'static str,
    dst: &Tile<E>,
    lhs: &Tile<E>,
    row: &Tile<E>,
    func: F,
) -> Result<(), TileError>
where
    F: Fn(f64, f64) -> f64 + 'static,
{
    let out = vector_operand(name, dst)?;
    let lhs = vector_operand(name, lhs)?;
    let row = vector_operand(name, row)?;
    let (rows, cols) = dst.valid_shape();
    expect_valid(name, (rows, cols), lhs.tile().valid_shape())?;
    expect_valid(name, (rows, 1), row.tile().valid_shape())?;

    let op = PipeOp::new(name, move |memory| {
        let tier = memory.tier_mut(TierKind::Vector);
        let column = row.read_valid(tier);
        let values: alloc::vec::Vec<f64> = lhs
            .read_valid(tier)
            .into_iter()
            .enumerate()
            .map(|(i, value)| func(value, column[i / cols]))
            .collect();
        out.write_valid(tier, &values);
        Ok(())
    })
    .reads(Resource::Tier(TierKind::Vector), lhs.range())
    .reads(Resource::Tier(TierKind::Vector), row.range())
    .writes(Resource::Tier(TierKind::Vector), out.range());

    ctx.issue(PipeKind::Vector, op)?;
    Ok(())
}
