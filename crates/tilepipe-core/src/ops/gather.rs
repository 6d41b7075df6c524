use alloc::{string::ToString, vec::Vec};

use tilepipe_common::{Element, backtrace::BackTrace};
use tilepipe_runtime::{
    ExecutionError, KernelContext,
    pipe::{PipeKind, PipeOp, Resource},
    tier::TierKind,
};

use crate::{
    Tile, TileError,
    ops::check::{expect_valid, vector_operand},
};

/// `dst[i] = src[indices[i]]`, with `src` flattened row-major over its valid region.
///
/// Indices are only known when the operation runs, an index outside of the source fails it with
/// [ExecutionError::IndexOutOfBounds] before anything is written.
pub fn gather<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
    indices: &Tile<i32>,
) -> Result<(), TileError> {
    let out = vector_operand("gather", dst)?;
    let src = vector_operand("gather", src)?;
    let idx = vector_operand("gather", indices)?;
    expect_valid("gather", dst.valid_shape(), indices.valid_shape())?;

    let op = PipeOp::new("gather", move |memory| {
        let tier = memory.tier_mut(TierKind::Vector);
        let (src_rows, src_cols) = src.tile().valid_shape();
        let positions = checked_positions("gather", &idx.read_valid(tier), src_rows * src_cols)?;

        let values: Vec<E> = positions
            .iter()
            .map(|&i| src.read(tier, i / src_cols, i % src_cols))
            .collect();
        let cols = out.tile().valid_cols();
        for (i, value) in values.into_iter().enumerate() {
            out.write(tier, i / cols, i % cols, value);
        }
        Ok(())
    })
    .reads(Resource::Tier(TierKind::Vector), src.range())
    .reads(Resource::Tier(TierKind::Vector), idx.range())
    .writes(Resource::Tier(TierKind::Vector), out.range());

    ctx.issue(PipeKind::Vector, op)?;
    Ok(())
}

/// `dst[indices[i]] = src[i]`, with `dst` flattened row-major over its valid region.
///
/// Later elements win when indices repeat. Out of range indices fail like [gather].
pub fn scatter<E: Element>(
    ctx: &mut KernelContext<'_>,
    dst: &Tile<E>,
    src: &Tile<E>,
    indices: &Tile<i32>,
) -> Result<(), TileError> {
    let out = vector_operand("scatter", dst)?;
    let src = vector_operand("scatter", src)?;
    let idx = vector_operand("scatter", indices)?;
    expect_valid("scatter", src.tile().valid_shape(), indices.valid_shape())?;

    let op = PipeOp::new("scatter", move |memory| {
        let tier = memory.tier_mut(TierKind::Vector);
        let (dst_rows, dst_cols) = out.tile().valid_shape();
        let positions = checked_positions("scatter", &idx.read_valid(tier), dst_rows * dst_cols)?;

        let cols = src.tile().valid_cols();
        let values: Vec<E> = (0..positions.len())
            .map(|i| src.read(tier, i / cols, i % cols))
            .collect();
        for (position, value) in positions.into_iter().zip(values) {
            out.write(tier, position / dst_cols, position % dst_cols, value);
        }
        Ok(())
    })
    .reads(Resource::Tier(TierKind::Vector), src.range())
    .reads(Resource::Tier(TierKind::Vector), idx.range())
    .writes(Resource::Tier(TierKind::Vector), out.range());

    ctx.issue(PipeKind::Vector, op)?;
    Ok(())
}

fn checked_positions(op: &str, indices: &[f64], len: usize) -> Result<Vec<usize>, ExecutionError> {
    indices
        .iter()
        .map(|&index| {
            let index = index as i64;
            if index < 0 || index as usize >= len {
                return Err(ExecutionError::IndexOutOfBounds {
                    op: op.to_string(),
                    index,
                    len,
                    backtrace: BackTrace::capture(),
                });
            }
            Ok(index as usize)
        })
        .collect()
}
